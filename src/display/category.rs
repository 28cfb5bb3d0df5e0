//! Category, rule and suggestion display formatting

use std::collections::HashMap;

use crate::models::{Category, CategoryId, CategoryRule};
use crate::services::CategorySuggestion;

use super::truncate;

/// Format categories, children indented under their parent
pub fn format_category_list(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "No categories found.\n".to_string();
    }

    let mut output = String::new();
    for parent in categories.iter().filter(|c| c.parent_id.is_none()) {
        output.push_str(&format!("{}\n", parent.name));
        for child in categories.iter().filter(|c| c.parent_id == Some(parent.id)) {
            output.push_str(&format!("  {}\n", child.name));
        }
    }

    // children whose parent is not in the list
    for orphan in categories.iter().filter(|c| {
        c.parent_id
            .is_some_and(|p| !categories.iter().any(|other| other.id == p))
    }) {
        output.push_str(&format!("{}\n", orphan.name));
    }

    output
}

/// Format rules in evaluation order
pub fn format_rule_list(rules: &[CategoryRule], names: &HashMap<CategoryId, String>) -> String {
    if rules.is_empty() {
        return "No category rules found.\n".to_string();
    }

    let mut ordered: Vec<&CategoryRule> = rules.iter().collect();
    ordered.sort_by_key(|r| r.priority);

    let mut output = String::new();
    output.push_str(&format!(
        "{:>4}  {:<20}  {:<12}  {:<12}  {}\n",
        "Prio", "Category", "Field", "Operator", "Value"
    ));
    output.push_str(&"-".repeat(70));
    output.push('\n');

    for rule in ordered {
        let category = names
            .get(&rule.category_id)
            .map(String::as_str)
            .unwrap_or("(unknown)");
        output.push_str(&format!(
            "{:>4}  {:<20}  {:<12}  {:<12}  {}\n",
            rule.priority,
            truncate(category, 20),
            rule.field.to_string(),
            rule.operator.to_string(),
            rule.value
        ));
    }

    output
}

/// Format ranked category suggestions
pub fn format_suggestions(
    suggestions: &[CategorySuggestion],
    names: &HashMap<CategoryId, String>,
) -> String {
    if suggestions.is_empty() {
        return "No category suggestions.\n".to_string();
    }

    let mut output = String::new();
    for (rank, suggestion) in suggestions.iter().enumerate() {
        let name = names
            .get(&suggestion.category_id)
            .map(String::as_str)
            .unwrap_or("(unknown)");
        output.push_str(&format!(
            "{}. {:<20} {:>4.0}%  {}\n",
            rank + 1,
            truncate(name, 20),
            suggestion.confidence * 100.0,
            suggestion.reason
        ));
    }
    output
}
