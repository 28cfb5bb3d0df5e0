//! CSV export
//!
//! Amounts are written as signed decimals without a currency symbol.

use std::collections::HashMap;
use std::io::Write;

use crate::error::{ForecastError, ForecastResult};
use crate::models::{DailyProjection, Money, MonthSummary};
use crate::storage::Storage;

fn export_error(e: csv::Error) -> ForecastError {
    ForecastError::Export(e.to_string())
}

fn decimal(amount: Money) -> String {
    amount.format_with_symbol("")
}

/// Write one row per projected day
pub fn export_projection_csv<W: Write>(series: &[DailyProjection], writer: W) -> ForecastResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "date",
        "income",
        "expenses",
        "transfers_in",
        "net",
        "balance",
        "is_negative",
        "entries",
    ]).map_err(export_error)?;

    for day in series {
        csv.write_record([
            day.date.to_string(),
            decimal(day.income),
            decimal(day.expenses),
            decimal(day.transfers_in),
            decimal(day.net),
            decimal(day.balance),
            day.is_negative.to_string(),
            day.entries.len().to_string(),
        ]).map_err(export_error)?;
    }

    csv.flush()?;
    Ok(())
}

/// Write one row per month and account, plus a total row per month
pub fn export_rollup_csv<W: Write>(months: &[MonthSummary], writer: W) -> ForecastResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["month", "account", "income", "expenses", "balance"]).map_err(export_error)?;

    for month in months {
        for account in &month.accounts {
            csv.write_record([
                month.key(),
                account.name.clone(),
                decimal(account.income),
                decimal(account.expenses),
                decimal(account.balance),
            ]).map_err(export_error)?;
        }
        csv.write_record([
            month.key(),
            "TOTAL".to_string(),
            decimal(month.total_income),
            decimal(month.total_expenses),
            decimal(month.total_balance),
        ]).map_err(export_error)?;
    }

    csv.flush()?;
    Ok(())
}

/// Export every confirmed transaction, oldest first
pub fn export_transactions_csv<W: Write>(storage: &Storage, writer: W) -> ForecastResult<()> {
    let account_names: HashMap<_, _> = storage
        .accounts
        .get_all()?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect();
    let category_names: HashMap<_, _> = storage
        .categories
        .get_all()?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let mut transactions = storage.transactions.get_all()?;
    transactions.sort_by_key(|t| t.date);

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["id", "date", "account", "type", "description", "category", "amount"]).map_err(export_error)?;

    for txn in transactions {
        let account = account_names
            .get(&txn.account_id)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string());
        let category = txn
            .category_id
            .and_then(|id| category_names.get(&id).cloned())
            .unwrap_or_default();

        csv.write_record([
            txn.id.to_string(),
            txn.date.to_string(),
            account,
            txn.kind.to_string(),
            txn.description.clone(),
            category,
            decimal(txn.signed_amount()),
        ]).map_err(export_error)?;
    }

    csv.flush()?;
    Ok(())
}
