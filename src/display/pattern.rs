//! Recurring pattern display formatting

use std::collections::HashMap;

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::{AccountId, Occurrence, RecurringPattern};
use crate::services::recurrence;

use super::{truncate, DisplayStyle};

#[derive(Tabled)]
struct PatternRow {
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Every")]
    every: String,
    #[tabled(rename = "Next Due")]
    next_due: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "ID")]
    id: String,
}

fn every(pattern: &RecurringPattern) -> String {
    match pattern.interval() {
        1 => pattern.frequency.to_string(),
        n => format!("{} x {}", n, pattern.frequency),
    }
}

/// Format patterns with their next due date
pub fn format_pattern_list(
    patterns: &[RecurringPattern],
    account_names: &HashMap<AccountId, String>,
    style: &DisplayStyle,
) -> String {
    if patterns.is_empty() {
        return "No recurring patterns found.\n".to_string();
    }

    let rows: Vec<PatternRow> = patterns
        .iter()
        .map(|p| PatternRow {
            description: truncate(&p.description, 32),
            account: account_names
                .get(&p.account_id)
                .cloned()
                .unwrap_or_else(|| p.account_id.to_string()),
            amount: style.money(p.signed_amount()),
            every: every(p),
            next_due: match recurrence::pending_date(p) {
                Ok(date) if !p.has_ended_by(date) => style.date(date),
                Ok(_) => "ended".to_string(),
                Err(_) => "invalid".to_string(),
            },
            status: if p.is_active { "active" } else { "paused" }.to_string(),
            id: p.id.to_string(),
        })
        .collect();

    let mut output = Table::new(rows).with(Style::psql()).to_string();
    output.push('\n');
    output
}

/// Format expanded occurrences, one per line
pub fn format_occurrences(occurrences: &[Occurrence], style: &DisplayStyle) -> String {
    if occurrences.is_empty() {
        return "No occurrences in range.\n".to_string();
    }

    let mut output = String::new();
    for occurrence in occurrences {
        output.push_str(&format!(
            "{}  {:>12}  {}\n",
            style.date(occurrence.date),
            style.money(occurrence.signed_amount),
            occurrence.description
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frequency, Money, TransactionKind};
    use chrono::NaiveDate;

    #[test]
    fn test_format_pattern_list() {
        let account = AccountId::new();
        let pattern = RecurringPattern::new(
            account,
            TransactionKind::Expense,
            Money::from_cents(1_299),
            "Netflix",
            Frequency::Monthly,
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        );
        let mut names = HashMap::new();
        names.insert(account, "Checking".to_string());

        let formatted = format_pattern_list(&[pattern], &names, &DisplayStyle::default());
        assert!(formatted.contains("Netflix"));
        assert!(formatted.contains("Checking"));
        assert!(formatted.contains("-$12.99"));
        assert!(formatted.contains("2025-01-31"));
    }

    #[test]
    fn test_format_occurrences() {
        let pattern = RecurringPattern::new(
            AccountId::new(),
            TransactionKind::Income,
            Money::from_cents(250_000),
            "Salary",
            Frequency::BiWeekly,
            NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
        );
        let occurrences = recurrence::preview_next(&pattern, 2).unwrap();

        let formatted = format_occurrences(&occurrences, &DisplayStyle::default());
        assert!(formatted.contains("2025-01-06"));
        assert!(formatted.contains("2025-01-20"));
        assert!(!formatted.contains("2025-02-03"));
        assert!(formatted.contains("Salary (Recurring)"));
    }
}
