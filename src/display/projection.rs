//! Projection display formatting
//!
//! Daily series, negative-balance alerts, monthly rollups and the upcoming
//! feed, rendered as `tabled` tables.

use std::collections::HashMap;

use chrono::NaiveDate;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::{AccountId, DailyProjection, LedgerEntry, MonthSummary};

use super::{truncate, DisplayStyle};

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Income")]
    income: String,
    #[tabled(rename = "Expenses")]
    expenses: String,
    #[tabled(rename = "Transfers In")]
    transfers_in: String,
    #[tabled(rename = "Net")]
    net: String,
    #[tabled(rename = "Balance")]
    balance: String,
    #[tabled(rename = "")]
    flag: String,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Source")]
    source: String,
}

#[derive(Tabled)]
struct MonthRow {
    #[tabled(rename = "Month")]
    label: String,
    #[tabled(rename = "Income")]
    income: String,
    #[tabled(rename = "Expenses")]
    expenses: String,
    #[tabled(rename = "End Balance")]
    balance: String,
}

fn source_label(entry: &LedgerEntry) -> &'static str {
    match entry {
        LedgerEntry::Confirmed(_) => "confirmed",
        LedgerEntry::TransferIn(_) => "transfer in",
        LedgerEntry::Projected(_) => "projected",
    }
}

fn entry_account(entry: &LedgerEntry) -> AccountId {
    match entry {
        LedgerEntry::Confirmed(t) => t.account_id,
        LedgerEntry::TransferIn(t) => t.from_account_id,
        LedgerEntry::Projected(o) => o.account_id,
    }
}

fn entry_row(entry: &LedgerEntry, account: &str, style: &DisplayStyle) -> EntryRow {
    EntryRow {
        date: style.date(entry.date()),
        account: account.to_string(),
        description: truncate(entry.description(), 40),
        kind: entry.kind().to_string(),
        amount: style.money(entry.signed_amount()),
        source: source_label(entry).to_string(),
    }
}

/// Format an account's daily series, optionally followed by its entries
pub fn format_projection(
    account_name: &str,
    series: &[DailyProjection],
    style: &DisplayStyle,
    with_entries: bool,
) -> String {
    if series.is_empty() {
        return format!("No projection for {}: end date is before today.\n", account_name);
    }

    let rows: Vec<DayRow> = series
        .iter()
        .map(|day| DayRow {
            date: style.date(day.date),
            income: style.money(day.income),
            expenses: style.money(day.expenses),
            transfers_in: style.money(day.transfers_in),
            net: style.money(day.net),
            balance: style.money(day.balance),
            flag: if day.is_negative { "NEGATIVE".into() } else { String::new() },
        })
        .collect();

    let mut output = format!("Projection for {}\n", account_name);
    output.push_str(&Table::new(rows).with(Style::psql()).to_string());
    output.push('\n');

    if with_entries {
        let entries: Vec<EntryRow> = series
            .iter()
            .flat_map(|day| day.entries.iter())
            .map(|entry| entry_row(entry, account_name, style))
            .collect();
        if !entries.is_empty() {
            output.push('\n');
            output.push_str(&Table::new(entries).with(Style::psql()).to_string());
            output.push('\n');
        }
    }

    output
}

/// Format the dates on which an account goes below zero
pub fn format_negative_dates(account_name: &str, dates: &[NaiveDate], style: &DisplayStyle) -> String {
    if dates.is_empty() {
        return format!("{}: balance stays at or above zero.\n", account_name);
    }

    let mut output = format!(
        "{}: negative balance on {} day(s)\n",
        account_name,
        dates.len()
    );
    for date in dates {
        output.push_str(&format!("  {}\n", style.date(*date)));
    }
    output
}

/// Format month-by-month totals with a per-account breakdown
pub fn format_rollup(months: &[MonthSummary], style: &DisplayStyle) -> String {
    if months.is_empty() {
        return "No months to show.\n".to_string();
    }

    let rows: Vec<MonthRow> = months
        .iter()
        .map(|m| MonthRow {
            label: m.label.clone(),
            income: style.money(m.total_income),
            expenses: style.money(m.total_expenses),
            balance: style.money(m.total_balance),
        })
        .collect();

    let mut output = Table::new(rows).with(Style::psql()).to_string();
    output.push('\n');

    for month in months {
        if month.accounts.len() < 2 {
            continue;
        }
        output.push_str(&format!("\n{}\n", month.label));
        for account in &month.accounts {
            output.push_str(&format!(
                "  {:<24} {:>14}  (+{} / -{})\n",
                truncate(&account.name, 24),
                style.money(account.balance),
                style.money(account.income),
                style.money(account.expenses),
            ));
        }
    }

    output
}

/// Format the upcoming feed, naming each entry's account
pub fn format_upcoming(
    entries: &[LedgerEntry],
    account_names: &HashMap<AccountId, String>,
    style: &DisplayStyle,
) -> String {
    if entries.is_empty() {
        return "Nothing upcoming.\n".to_string();
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|entry| {
            let id = entry_account(entry);
            let name = account_names
                .get(&id)
                .cloned()
                .unwrap_or_else(|| id.to_string());
            entry_row(entry, &name, style)
        })
        .collect();

    let mut output = Table::new(rows).with(Style::psql()).to_string();
    output.push('\n');
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, Transaction, TransactionKind};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    #[test]
    fn test_format_projection_flags_negative_days() {
        let account = AccountId::new();
        let rent = Transaction::new(
            account,
            TransactionKind::Expense,
            Money::from_cents(120_000),
            "Rent",
            d(1, 5),
        );
        let series = vec![DailyProjection {
            date: d(1, 5),
            balance: Money::from_cents(-20_000),
            income: Money::zero(),
            expenses: Money::from_cents(120_000),
            transfers_in: Money::zero(),
            net: Money::from_cents(-120_000),
            is_negative: true,
            entries: vec![LedgerEntry::Confirmed(rent)],
        }];

        let formatted = format_projection("Checking", &series, &DisplayStyle::default(), true);
        assert!(formatted.contains("Projection for Checking"));
        assert!(formatted.contains("NEGATIVE"));
        assert!(formatted.contains("-$200.00"));
        assert!(formatted.contains("Rent"));
        assert!(formatted.contains("confirmed"));
    }

    #[test]
    fn test_format_empty_projection() {
        let formatted = format_projection("Checking", &[], &DisplayStyle::default(), false);
        assert!(formatted.contains("before today"));
    }

    #[test]
    fn test_format_negative_dates() {
        let style = DisplayStyle::default();
        assert!(format_negative_dates("Checking", &[], &style).contains("stays at or above zero"));

        let formatted = format_negative_dates("Checking", &[d(1, 5), d(1, 6)], &style);
        assert!(formatted.contains("2 day(s)"));
        assert!(formatted.contains("2025-01-06"));
    }
}
