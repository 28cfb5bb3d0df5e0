//! JSON export
//!
//! Projections are exported with the account and window they cover; the
//! full ledger export carries every entity plus a schema version.

use std::collections::HashSet;
use std::io::Write;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{ForecastError, ForecastResult};
use crate::models::{
    Account, AccountId, Category, CategoryRule, DailyProjection, RecurringPattern, Transaction,
};
use crate::storage::Storage;

/// Current export schema version
pub const EXPORT_SCHEMA_VERSION: &str = "1.0.0";

/// A daily projection with its context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionExport {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub account_id: AccountId,
    pub account_name: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Days on which the balance is below zero
    pub negative_dates: Vec<NaiveDate>,
    pub days: Vec<DailyProjection>,
}

impl ProjectionExport {
    pub fn new(
        account: &Account,
        series: Vec<DailyProjection>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: EXPORT_SCHEMA_VERSION.to_string(),
            generated_at,
            account_id: account.id,
            account_name: account.name.clone(),
            from: series.first().map(|d| d.date),
            to: series.last().map(|d| d.date),
            negative_dates: series.iter().filter(|d| d.is_negative).map(|d| d.date).collect(),
            days: series,
        }
    }
}

/// Full ledger snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerExport {
    pub schema_version: String,
    pub exported_at: DateTime<Utc>,
    pub app_version: String,
    pub accounts: Vec<Account>,
    pub categories: Vec<Category>,
    pub rules: Vec<CategoryRule>,
    pub transactions: Vec<Transaction>,
    pub patterns: Vec<RecurringPattern>,
}

impl LedgerExport {
    pub fn from_storage(storage: &Storage) -> ForecastResult<Self> {
        Ok(Self {
            schema_version: EXPORT_SCHEMA_VERSION.to_string(),
            exported_at: storage.clock().now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            accounts: storage.accounts.get_all()?,
            categories: storage.categories.get_all()?,
            rules: storage.categories.all_rules()?,
            transactions: storage.transactions.get_all()?,
            patterns: storage.patterns.get_all()?,
        })
    }

    /// Check the schema version and that every reference resolves
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version != EXPORT_SCHEMA_VERSION {
            return Err(format!(
                "Schema version mismatch: expected {}, got {}",
                EXPORT_SCHEMA_VERSION, self.schema_version
            ));
        }

        let account_ids: HashSet<_> = self.accounts.iter().map(|a| a.id).collect();
        let category_ids: HashSet<_> = self.categories.iter().map(|c| c.id).collect();

        for txn in &self.transactions {
            if !account_ids.contains(&txn.account_id) {
                return Err(format!(
                    "Transaction {} references unknown account {}",
                    txn.id, txn.account_id
                ));
            }
            if let Some(cat_id) = txn.category_id {
                if !category_ids.contains(&cat_id) {
                    return Err(format!(
                        "Transaction {} references unknown category {}",
                        txn.id, cat_id
                    ));
                }
            }
        }

        for pattern in &self.patterns {
            if !account_ids.contains(&pattern.account_id) {
                return Err(format!(
                    "Pattern {} references unknown account {}",
                    pattern.id, pattern.account_id
                ));
            }
        }

        for rule in &self.rules {
            if !category_ids.contains(&rule.category_id) {
                return Err(format!(
                    "Rule {} references unknown category {}",
                    rule.id, rule.category_id
                ));
            }
        }

        Ok(())
    }
}

fn write_json<W: Write, T: Serialize>(writer: W, value: &T, pretty: bool) -> ForecastResult<()> {
    if pretty {
        serde_json::to_writer_pretty(writer, value)
    } else {
        serde_json::to_writer(writer, value)
    }
    .map_err(|e| ForecastError::Export(e.to_string()))
}

pub fn export_projection_json<W: Write>(
    export: &ProjectionExport,
    writer: W,
    pretty: bool,
) -> ForecastResult<()> {
    write_json(writer, export, pretty)
}

/// Export the full ledger to JSON
pub fn export_ledger_json<W: Write>(storage: &Storage, writer: W, pretty: bool) -> ForecastResult<()> {
    let export = LedgerExport::from_storage(storage)?;
    write_json(writer, &export, pretty)
}

/// Read back a ledger export and validate it
pub fn read_ledger_json(json: &str) -> ForecastResult<LedgerExport> {
    let export: LedgerExport = serde_json::from_str(json)?;
    export.validate().map_err(ForecastError::Validation)?;
    Ok(export)
}
