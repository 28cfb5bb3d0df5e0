//! Category rule matching
//!
//! Rules are evaluated in ascending priority order and the first match wins.
//! Ties keep their stored order, so two rules with equal priority never
//! produce an ambiguity error: the earlier one is used.
//!
//! The matcher itself holds no state beyond the rule list it was built
//! from. [`RuleCache`] keeps one matcher per user for callers that
//! categorize many rows in a row, and must be invalidated when rules change.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::debug;

use crate::error::ForecastResult;
use crate::models::{
    Category, CategoryId, CategoryRule, Money, RuleField, RuleId, RuleOperator, Transaction,
    UserId,
};
use crate::storage::{lock_error, CategoryRepository};

use super::similarity::{extract_keywords, normalize_description, similarity};

/// Category names must score strictly above this to be suggested
pub const FUZZY_THRESHOLD: f64 = 0.3;

/// Fuzzy suggestions are scaled down by this factor
pub const FUZZY_WEIGHT: f64 = 0.5;

/// Round amounts below this never become amount rules
pub const MIN_LEARNED_AMOUNT: Money = Money::from_dollars(10);

const ANALYSIS_SAMPLE_SIZE: usize = 100;
const ANALYSIS_GROUP_LIMIT: usize = 10;
const ANALYSIS_SAMPLES_PER_GROUP: usize = 3;

/// Whether `rule` matches a description and amount
///
/// Text comparisons ignore case. Amount rules compare against the amount's
/// plain rendering ("50", "49.5"), except `equals` which compares cents when
/// the rule value is a valid amount.
pub fn matches(rule: &CategoryRule, description: &str, amount: Money) -> bool {
    let value = rule.value.to_lowercase();

    if rule.operator.is_numeric() {
        let Ok(threshold) = Money::parse(&rule.value) else {
            return false;
        };
        let subject = match rule.field {
            RuleField::Amount => amount,
            RuleField::Description => match Money::parse(description) {
                Ok(parsed) => parsed,
                Err(_) => return false,
            },
        };
        return match rule.operator {
            RuleOperator::GreaterThan => subject > threshold,
            _ => subject < threshold,
        };
    }

    let subject = match rule.field {
        RuleField::Description => description.to_lowercase(),
        RuleField::Amount => {
            if rule.operator == RuleOperator::Equals {
                if let Ok(expected) = Money::parse(&rule.value) {
                    return expected == amount;
                }
            }
            amount.to_plain_string()
        }
    };

    match rule.operator {
        RuleOperator::Contains => subject.contains(&value),
        RuleOperator::Equals => subject == value,
        RuleOperator::StartsWith => subject.starts_with(&value),
        RuleOperator::EndsWith => subject.ends_with(&value),
        RuleOperator::GreaterThan | RuleOperator::LessThan => false,
    }
}

/// Rules ordered by priority, ties in their original order
fn by_priority(rules: &[CategoryRule]) -> Vec<&CategoryRule> {
    let mut ordered: Vec<&CategoryRule> = rules.iter().collect();
    ordered.sort_by_key(|r| r.priority);
    ordered
}

/// The first rule, by priority, matching the description and amount
pub fn find_matching_category<'r>(
    rules: &'r [CategoryRule],
    description: &str,
    amount: Money,
) -> Option<&'r CategoryRule> {
    by_priority(rules)
        .into_iter()
        .find(|rule| matches(rule, description, amount))
}

/// Confidence of a rule match, in (0, 1]
pub fn confidence(rule: &CategoryRule) -> f64 {
    let mut base = match rule.operator {
        RuleOperator::Equals => 1.0,
        RuleOperator::StartsWith => 0.9,
        RuleOperator::Contains => 0.8,
        RuleOperator::EndsWith => 0.7,
        RuleOperator::GreaterThan | RuleOperator::LessThan => 0.6,
    };

    if rule.field == RuleField::Description {
        let length = rule.value.chars().count() as f64;
        base *= (1.0 + (length - 3.0) * 0.05).min(1.2);
    }

    let priority = (1.0 + (5 - rule.priority) as f64 * 0.1).max(0.1);
    (base * priority).clamp(0.01, 1.0)
}

/// Human-readable explanation of a match
pub fn match_reason(rule: &CategoryRule) -> String {
    let (field, value) = (rule.field, &rule.value);
    match rule.operator {
        RuleOperator::Equals => format!("Exact match for {}: '{}'", field, value),
        RuleOperator::Contains => format!("Contains '{}' in {}", value, field),
        RuleOperator::StartsWith => format!("{} starts with '{}'", field, value),
        RuleOperator::EndsWith => format!("{} ends with '{}'", field, value),
        RuleOperator::GreaterThan => format!("{} is greater than {}", field, value),
        RuleOperator::LessThan => format!("{} is less than {}", field, value),
    }
}

/// The winning rule for a description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMatch {
    pub category_id: CategoryId,
    pub rule: CategoryRule,
    pub confidence: f64,
    pub reason: String,
}

impl CategoryMatch {
    fn from_rule(rule: &CategoryRule) -> Self {
        Self {
            category_id: rule.category_id,
            rule: rule.clone(),
            confidence: confidence(rule),
            reason: match_reason(rule),
        }
    }
}

pub fn match_category(
    rules: &[CategoryRule],
    description: &str,
    amount: Money,
) -> Option<CategoryMatch> {
    find_matching_category(rules, description, amount).map(CategoryMatch::from_rule)
}

/// A ranked category suggestion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySuggestion {
    pub category_id: CategoryId,
    /// The rule behind the suggestion; `None` for category-name matches
    pub rule_id: Option<RuleId>,
    pub confidence: f64,
    pub reason: String,
}

/// Rule matches plus fuzzy category-name matches, best first
///
/// Name matches only fill slots the rules leave free, and a category already
/// suggested by a rule is not suggested again by name.
pub fn suggest_categories(
    rules: &[CategoryRule],
    categories: &[Category],
    description: &str,
    amount: Money,
    limit: usize,
) -> Vec<CategorySuggestion> {
    let mut suggestions: Vec<CategorySuggestion> = by_priority(rules)
        .into_iter()
        .filter(|rule| matches(rule, description, amount))
        .map(|rule| CategorySuggestion {
            category_id: rule.category_id,
            rule_id: Some(rule.id),
            confidence: confidence(rule),
            reason: match_reason(rule),
        })
        .collect();

    if suggestions.len() < limit {
        let suggested: HashSet<CategoryId> = suggestions.iter().map(|s| s.category_id).collect();
        let mut fuzzy: Vec<CategorySuggestion> = categories
            .iter()
            .filter(|c| !suggested.contains(&c.id))
            .filter_map(|category| {
                let score = similarity(description, &category.name);
                (score > FUZZY_THRESHOLD).then(|| CategorySuggestion {
                    category_id: category.id,
                    rule_id: None,
                    confidence: score * FUZZY_WEIGHT,
                    reason: format!("Similar to category name: {}", category.name),
                })
            })
            .collect();
        fuzzy.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        fuzzy.truncate(limit - suggestions.len());
        suggestions.extend(fuzzy);
    }

    suggestions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    suggestions.truncate(limit);
    suggestions
}

/// Priority for a learned keyword rule: longer keywords rank first
fn keyword_priority(keyword: &str) -> i32 {
    match keyword.chars().count() {
        n if n >= 8 => 1,
        n if n >= 5 => 2,
        _ => 3,
    }
}

/// Rules worth adding after a user assigns `category` to a description
///
/// One `contains` rule per keyword, plus an amount rule for round amounts of
/// at least ten. Rules already present in `existing` are left out.
pub fn learn_rules(
    existing: &[CategoryRule],
    category: CategoryId,
    description: &str,
    amount: Money,
) -> Vec<CategoryRule> {
    let mut proposed: Vec<CategoryRule> = extract_keywords(description)
        .into_iter()
        .map(|keyword| {
            let priority = keyword_priority(&keyword);
            CategoryRule::new(
                category,
                RuleField::Description,
                RuleOperator::Contains,
                keyword,
                priority,
            )
        })
        .collect();

    if amount.is_whole() && amount >= MIN_LEARNED_AMOUNT {
        proposed.push(CategoryRule::new(
            category,
            RuleField::Amount,
            RuleOperator::Equals,
            amount.to_plain_string(),
            2,
        ));
    }

    proposed.retain(|rule| !existing.iter().any(|e| e.same_predicate(rule)));
    proposed
}

/// Uncategorized transactions sharing a normalized description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptionGroup {
    pub description: String,
    pub count: usize,
    pub total_amount: Money,
    pub samples: Vec<Transaction>,
}

/// A keyword seen across a group of uncategorized transactions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSuggestion {
    pub field: RuleField,
    pub operator: RuleOperator,
    pub value: String,
    /// Size of the group the keyword came from
    pub frequency: usize,
}

impl RuleSuggestion {
    /// Turn the suggestion into a rule for a category the user picked
    pub fn into_rule(self, category: CategoryId) -> CategoryRule {
        let priority = keyword_priority(&self.value);
        CategoryRule::new(category, self.field, self.operator, self.value, priority)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatternAnalysis {
    pub uncategorized_count: usize,
    pub groups: Vec<DescriptionGroup>,
    pub suggested_rules: Vec<RuleSuggestion>,
}

/// Find repeated descriptions among uncategorized transactions
///
/// Looks at the first hundred uncategorized transactions, keeps groups of at
/// least two, and returns the ten largest.
pub fn analyze_uncategorized(transactions: &[Transaction]) -> PatternAnalysis {
    let uncategorized: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.is_uncategorized())
        .take(ANALYSIS_SAMPLE_SIZE)
        .collect();

    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<&Transaction>> = HashMap::new();
    for txn in &uncategorized {
        let key = normalize_description(&txn.description);
        if !grouped.contains_key(&key) {
            order.push(key.clone());
        }
        grouped.entry(key).or_default().push(txn);
    }

    let mut groups: Vec<DescriptionGroup> = order
        .into_iter()
        .filter_map(|key| {
            let members = grouped.remove(&key)?;
            (members.len() >= 2).then(|| DescriptionGroup {
                count: members.len(),
                total_amount: members.iter().map(|t| t.amount).sum(),
                samples: members
                    .iter()
                    .take(ANALYSIS_SAMPLES_PER_GROUP)
                    .map(|t| (*t).clone())
                    .collect(),
                description: key,
            })
        })
        .collect();
    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups.truncate(ANALYSIS_GROUP_LIMIT);

    let suggested_rules = groups
        .iter()
        .flat_map(|group| {
            extract_keywords(&group.description)
                .into_iter()
                .map(|keyword| RuleSuggestion {
                    field: RuleField::Description,
                    operator: RuleOperator::Contains,
                    value: keyword,
                    frequency: group.count,
                })
        })
        .collect();

    PatternAnalysis {
        uncategorized_count: uncategorized.len(),
        groups,
        suggested_rules,
    }
}

/// A priority-ordered rule set
#[derive(Debug, Clone, Default)]
pub struct CategoryMatcher {
    rules: Vec<CategoryRule>,
}

impl CategoryMatcher {
    pub fn new(mut rules: Vec<CategoryRule>) -> Self {
        rules.sort_by_key(|r| r.priority);
        Self { rules }
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn match_category(&self, description: &str, amount: Money) -> Option<CategoryMatch> {
        match_category(&self.rules, description, amount)
    }

    pub fn suggest(
        &self,
        categories: &[Category],
        description: &str,
        amount: Money,
        limit: usize,
    ) -> Vec<CategorySuggestion> {
        suggest_categories(&self.rules, categories, description, amount, limit)
    }
}

/// Per-user matchers built from the category repository
#[derive(Debug, Default)]
pub struct RuleCache {
    matchers: RwLock<HashMap<UserId, Arc<CategoryMatcher>>>,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The user's matcher, loading rules on first use
    pub fn matcher_for(
        &self,
        categories: &CategoryRepository,
        user: UserId,
    ) -> ForecastResult<Arc<CategoryMatcher>> {
        if let Some(matcher) = self.matchers.read().map_err(lock_error)?.get(&user) {
            return Ok(Arc::clone(matcher));
        }

        let matcher = Arc::new(CategoryMatcher::new(categories.rules_for_user(user)?));
        debug!(user = %user, rules = matcher.rules().len(), "loaded category rules");
        self.matchers
            .write()
            .map_err(lock_error)?
            .insert(user, Arc::clone(&matcher));
        Ok(matcher)
    }

    /// Drop the user's cached rules
    pub fn invalidate(&self, user: UserId) -> ForecastResult<()> {
        self.matchers.write().map_err(lock_error)?.remove(&user);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccountId;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn rule(category: CategoryId, field: RuleField, op: RuleOperator, value: &str, priority: i32) -> CategoryRule {
        CategoryRule::new(category, field, op, value, priority)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_description_operators_ignore_case() {
        let c = CategoryId::new();
        let amount = Money::from_cents(1_299);
        let desc = "NETFLIX.COM Subscription";

        assert!(matches(&rule(c, RuleField::Description, RuleOperator::Contains, "netflix", 1), desc, amount));
        assert!(matches(&rule(c, RuleField::Description, RuleOperator::StartsWith, "Netflix", 1), desc, amount));
        assert!(matches(&rule(c, RuleField::Description, RuleOperator::EndsWith, "SUBSCRIPTION", 1), desc, amount));
        assert!(matches(&rule(c, RuleField::Description, RuleOperator::Equals, "netflix.com subscription", 1), desc, amount));
        assert!(!matches(&rule(c, RuleField::Description, RuleOperator::Equals, "netflix", 1), desc, amount));
    }

    #[test]
    fn test_amount_operators() {
        let c = CategoryId::new();
        let fifty = Money::from_dollars(50);

        assert!(matches(&rule(c, RuleField::Amount, RuleOperator::Equals, "50.00", 1), "", fifty));
        assert!(matches(&rule(c, RuleField::Amount, RuleOperator::Equals, "50", 1), "", fifty));
        assert!(!matches(&rule(c, RuleField::Amount, RuleOperator::Equals, "50.01", 1), "", fifty));
        assert!(matches(&rule(c, RuleField::Amount, RuleOperator::GreaterThan, "49.99", 1), "", fifty));
        assert!(!matches(&rule(c, RuleField::Amount, RuleOperator::LessThan, "50", 1), "", fifty));
        assert!(matches(&rule(c, RuleField::Amount, RuleOperator::StartsWith, "5", 1), "", fifty));
        assert!(matches(&rule(c, RuleField::Amount, RuleOperator::EndsWith, ".5", 1), "", Money::from_cents(4_950)));
        assert!(!matches(&rule(c, RuleField::Amount, RuleOperator::GreaterThan, "lots", 1), "", fifty));
    }

    #[test]
    fn test_numeric_operator_on_text_description() {
        let c = CategoryId::new();
        let gt = rule(c, RuleField::Description, RuleOperator::GreaterThan, "10", 1);
        assert!(!matches(&gt, "Coffee", Money::from_dollars(50)));
        assert!(matches(&gt, "25", Money::zero()));
    }

    #[test]
    fn test_first_priority_wins() {
        let groceries = CategoryId::new();
        let coffee = CategoryId::new();
        let rules = vec![
            rule(groceries, RuleField::Description, RuleOperator::Contains, "market", 3),
            rule(coffee, RuleField::Description, RuleOperator::Contains, "starbucks", 1),
        ];

        let found = find_matching_category(&rules, "Starbucks Market St", Money::from_cents(450)).unwrap();
        assert_eq!(found.category_id, coffee);
        assert!(find_matching_category(&rules, "Shell Oil", Money::from_cents(450)).is_none());
    }

    #[test]
    fn test_equal_priority_keeps_stored_order() {
        let first = CategoryId::new();
        let second = CategoryId::new();
        let rules = vec![
            rule(first, RuleField::Description, RuleOperator::Contains, "uber", 2),
            rule(second, RuleField::Description, RuleOperator::Contains, "eats", 2),
        ];
        let found = match_category(&rules, "Uber Eats", Money::from_cents(2_000)).unwrap();
        assert_eq!(found.category_id, first);
        assert_eq!(found.reason, "Contains 'uber' in description");
    }

    #[test]
    fn test_confidence_values() {
        let c = CategoryId::new();
        // 0.8 * 1.05 (length 4) * 1.4 (priority 1), clamped
        assert!(close(confidence(&rule(c, RuleField::Description, RuleOperator::Contains, "uber", 1)), 1.0));
        // 0.7 * 1.0 * 1.0
        assert!(close(confidence(&rule(c, RuleField::Description, RuleOperator::EndsWith, "inc", 5)), 0.7));
        // amount rules skip the length factor: 0.6 * 1.2
        assert!(close(confidence(&rule(c, RuleField::Amount, RuleOperator::GreaterThan, "100", 3)), 0.72));
        // very low priority is floored
        let floored = confidence(&rule(c, RuleField::Amount, RuleOperator::Equals, "10", 100));
        assert!(close(floored, 0.1));
    }

    #[test]
    fn test_match_reasons() {
        let c = CategoryId::new();
        assert_eq!(
            match_reason(&rule(c, RuleField::Amount, RuleOperator::Equals, "50", 1)),
            "Exact match for amount: '50'"
        );
        assert_eq!(
            match_reason(&rule(c, RuleField::Description, RuleOperator::StartsWith, "amzn", 1)),
            "description starts with 'amzn'"
        );
        assert_eq!(
            match_reason(&rule(c, RuleField::Amount, RuleOperator::LessThan, "5", 1)),
            "amount is less than 5"
        );
    }

    #[test]
    fn test_suggest_categories_ranks_rules_and_names() {
        let user = UserId::new();
        let coffee = Category::new(user, "Coffee");
        let groceries = Category::new(user, "Groceries");
        let rent = Category::new(user, "Rent");
        let rules = vec![rule(coffee.id, RuleField::Description, RuleOperator::Contains, "starbucks", 2)];

        let suggestions = suggest_categories(
            &rules,
            &[coffee.clone(), rent],
            "Starbucks Coffee",
            Money::from_cents(450),
            5,
        );
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].category_id, coffee.id);
        assert!(suggestions[0].rule_id.is_some());

        let categories = vec![coffee, groceries.clone()];
        let by_name = suggest_categories(&[], &categories, "grocery run", Money::from_cents(450), 5);
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].category_id, groceries.id);
        assert!(by_name[0].rule_id.is_none());
        assert!(by_name[0].confidence <= FUZZY_WEIGHT);
        assert_eq!(by_name[0].reason, "Similar to category name: Groceries");
    }

    #[test]
    fn test_suggest_categories_respects_limit() {
        let c = CategoryId::new();
        let rules: Vec<_> = (1..=4)
            .map(|p| rule(c, RuleField::Description, RuleOperator::Contains, "shell", p))
            .collect();
        let suggestions = suggest_categories(&rules, &[], "Shell Oil", Money::from_dollars(40), 2);
        assert_eq!(suggestions.len(), 2);
        assert!(suggestions[0].confidence >= suggestions[1].confidence);
    }

    #[test]
    fn test_learn_rules() {
        let category = CategoryId::new();
        let existing = vec![rule(category, RuleField::Description, RuleOperator::Contains, "Whole", 2)];

        let learned = learn_rules(&existing, category, "WHOLE FOODS MARKET 1234", Money::from_dollars(40));
        let values: Vec<_> = learned.iter().map(|r| (r.value.as_str(), r.priority)).collect();
        assert_eq!(values, vec![("foods", 2), ("market", 2), ("40", 2)]);
        assert_eq!(learned[2].field, RuleField::Amount);
        assert_eq!(learned[2].operator, RuleOperator::Equals);

        let no_amount = learn_rules(&[], category, "Spotify", Money::from_cents(999));
        assert_eq!(no_amount.len(), 1);
        assert_eq!(no_amount[0].priority, 2);

        let long = learn_rules(&[], category, "Supermarket", Money::from_dollars(5));
        assert_eq!(long[0].priority, 1);
    }

    #[test]
    fn test_analyze_uncategorized() {
        let account = AccountId::new();
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let txn = |desc: &str, cents: i64| {
            Transaction::new(
                account,
                crate::models::TransactionKind::Expense,
                Money::from_cents(cents),
                desc,
                date,
            )
        };

        let transactions = vec![
            txn("UBER TRIP 1234", 1_500),
            txn("Uber Trip 5678", 2_000),
            txn("UBER TRIP 9999", 1_000),
            txn("Spotify", 999),
            txn("Shell Oil 11", 4_000),
            txn("SHELL OIL 12", 3_500),
            txn("Netflix", 1_299).with_category(CategoryId::new()),
            txn("Netflix", 1_299).with_category(CategoryId::new()),
        ];

        let analysis = analyze_uncategorized(&transactions);
        assert_eq!(analysis.uncategorized_count, 6);
        assert_eq!(analysis.groups.len(), 2);
        assert_eq!(analysis.groups[0].description, "uber trip");
        assert_eq!(analysis.groups[0].count, 3);
        assert_eq!(analysis.groups[0].total_amount, Money::from_cents(4_500));
        assert_eq!(analysis.groups[1].description, "shell oil");

        let values: Vec<_> = analysis.suggested_rules.iter().map(|s| s.value.as_str()).collect();
        assert_eq!(values, vec!["uber", "trip", "shell", "oil"]);
        assert_eq!(analysis.suggested_rules[0].frequency, 3);

        let category = CategoryId::new();
        let created = analysis.suggested_rules[0].clone().into_rule(category);
        assert_eq!(created.category_id, category);
        assert_eq!(created.priority, 3);
    }

    #[test]
    fn test_rule_cache_invalidation() {
        let temp_dir = TempDir::new().unwrap();
        let repo = CategoryRepository::new(temp_dir.path().join("categories.json"));
        let user = UserId::new();
        let coffee = Category::new(user, "Coffee");
        repo.upsert(coffee.clone()).unwrap();

        let cache = RuleCache::new();
        assert!(cache.matcher_for(&repo, user).unwrap().is_empty());

        repo.add_rules(vec![rule(coffee.id, RuleField::Description, RuleOperator::Contains, "latte", 1)])
            .unwrap();
        assert!(cache.matcher_for(&repo, user).unwrap().is_empty());

        cache.invalidate(user).unwrap();
        let matcher = cache.matcher_for(&repo, user).unwrap();
        assert_eq!(matcher.rules().len(), 1);
        assert!(matcher.match_category("Oat Latte", Money::from_cents(500)).is_some());
    }
}
