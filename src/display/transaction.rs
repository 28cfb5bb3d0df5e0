//! Transaction register formatting

use std::collections::HashMap;

use crate::models::{CategoryId, Transaction};

use super::{truncate, DisplayStyle};

/// Format a single register row
pub fn format_transaction_row(
    txn: &Transaction,
    categories: &HashMap<CategoryId, String>,
    style: &DisplayStyle,
) -> String {
    let marker = if txn.reconciled {
        "R"
    } else if txn.recurring_pattern_id.is_some() {
        "~"
    } else if txn.import_hash.is_some() {
        "i"
    } else {
        " "
    };

    let category = match txn.category_id {
        Some(id) => categories.get(&id).cloned().unwrap_or_default(),
        None if txn.is_transfer() => "(transfer)".to_string(),
        None => String::new(),
    };

    format!(
        "{} {:<10} {:<30} {:<16} {:>12}",
        marker,
        style.date(txn.date),
        truncate(&txn.description, 30),
        truncate(&category, 16),
        style.money(txn.signed_amount())
    )
}

/// Format transactions as a register, oldest first
pub fn format_transaction_register(
    transactions: &[Transaction],
    categories: &HashMap<CategoryId, String>,
    style: &DisplayStyle,
) -> String {
    if transactions.is_empty() {
        return "No transactions found.\n".to_string();
    }

    let mut sorted: Vec<&Transaction> = transactions.iter().collect();
    sorted.sort_by_key(|t| t.date);

    let mut output = String::new();
    output.push_str(&format!(
        "  {:<10} {:<30} {:<16} {:>12}\n",
        "Date", "Description", "Category", "Amount"
    ));
    output.push_str(&"-".repeat(74));
    output.push('\n');

    for txn in sorted {
        output.push_str(&format_transaction_row(txn, categories, style));
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountId, Money, PatternId, TransactionKind};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    #[test]
    fn test_register_sorted_with_markers() {
        let account = AccountId::new();
        let groceries = CategoryId::new();
        let names: HashMap<_, _> = [(groceries, "Groceries".to_string())].into_iter().collect();

        let rent = Transaction::new(account, TransactionKind::Expense, Money::from_cents(120_000), "Rent", d(5))
            .with_pattern(PatternId::new());
        let food = Transaction::new(account, TransactionKind::Expense, Money::from_cents(4_510), "Whole Foods", d(2))
            .with_category(groceries);

        let formatted = format_transaction_register(&[rent, food], &names, &DisplayStyle::default());
        let food_at = formatted.find("Whole Foods").unwrap();
        let rent_at = formatted.find("Rent").unwrap();
        assert!(food_at < rent_at);
        assert!(formatted.contains("Groceries"));
        assert!(formatted.contains("~ 2025-01-05"));
        assert!(formatted.contains("-$1200.00"));
    }

    #[test]
    fn test_empty_register() {
        let formatted = format_transaction_register(&[], &HashMap::new(), &DisplayStyle::default());
        assert_eq!(formatted, "No transactions found.\n");
    }
}
