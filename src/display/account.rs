//! Account display formatting
//!
//! Formats accounts with their current balances as a table.

use crate::models::{Account, Money};

use super::DisplayStyle;

/// An account with its balance before today's activity
#[derive(Debug, Clone)]
pub struct AccountBalance {
    pub account: Account,
    pub balance: Money,
}

/// Format a list of accounts with balances as a table
pub fn format_account_list(balances: &[AccountBalance], style: &DisplayStyle) -> String {
    if balances.is_empty() {
        return "No accounts found.\n".to_string();
    }

    let name_width = balances
        .iter()
        .map(|b| b.account.name.chars().count())
        .max()
        .unwrap_or(4)
        .max(5);

    let type_width = balances
        .iter()
        .map(|b| b.account.account_type.to_string().len())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<name_width$}  {:<type_width$}  {:>14}  {}\n",
        "Name",
        "Type",
        "Balance",
        "ID",
        name_width = name_width,
        type_width = type_width,
    ));
    output.push_str(&format!(
        "{:-<name_width$}  {:-<type_width$}  {:->14}  {:-<12}\n",
        "",
        "",
        "",
        "",
        name_width = name_width,
        type_width = type_width,
    ));

    for entry in balances {
        output.push_str(&format!(
            "{:<name_width$}  {:<type_width$}  {:>14}  {}\n",
            entry.account.name,
            entry.account.account_type.to_string(),
            style.money(entry.balance),
            entry.account.id,
            name_width = name_width,
            type_width = type_width,
        ));
    }

    let total: Money = balances.iter().map(|b| b.balance).sum();
    output.push_str(&format!(
        "{:-<name_width$}  {:-<type_width$}  {:->14}\n",
        "",
        "",
        "",
        name_width = name_width,
        type_width = type_width,
    ));
    output.push_str(&format!(
        "{:<name_width$}  {:<type_width$}  {:>14}\n",
        "TOTAL",
        "",
        style.money(total),
        name_width = name_width,
        type_width = type_width,
    ));

    output
}
