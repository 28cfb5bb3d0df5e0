//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod account;
pub mod category;
pub mod config;
pub mod export;
pub mod import;
pub mod pattern;
pub mod projection;
pub mod transaction;

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use chrono::NaiveDate;

use crate::error::{ForecastError, ForecastResult};
use crate::models::{Account, AccountId, Category, CategoryId, Money, RecurringPattern, UserId};
use crate::storage::Storage;

pub use account::{handle_account_command, AccountCommands};
pub use category::{handle_categorize_command, handle_category_command, handle_rule_command};
pub use category::{CategorizeCommands, CategoryCommands, RuleCommands};
pub use config::{handle_config_command, ConfigCommands};
pub use export::{handle_export_command, ExportCommands};
pub use import::{handle_import_command, ImportArgs};
pub use pattern::{handle_generate_command, handle_pattern_command, PatternCommands};
pub use projection::{handle_forecast_command, ForecastCommands, OutputFormat};
pub use transaction::{handle_transaction_command, TransactionCommands};

/// Find an account by name, short id or full id
pub(crate) fn resolve_account(storage: &Storage, value: &str) -> ForecastResult<Account> {
    if let Some(account) = storage.accounts.find_by_name(value)? {
        return Ok(account);
    }
    storage
        .accounts
        .get_all()?
        .into_iter()
        .find(|a| a.id.to_string() == value || AccountId::parse(value).is_ok_and(|id| id == a.id))
        .ok_or_else(|| ForecastError::account_not_found(value))
}

/// Find one of the user's categories by name or id
pub(crate) fn resolve_category(
    storage: &Storage,
    user: UserId,
    value: &str,
) -> ForecastResult<Category> {
    storage
        .categories
        .get_by_user(user)?
        .into_iter()
        .find(|c| {
            c.name.eq_ignore_ascii_case(value)
                || c.id.to_string() == value
                || CategoryId::parse(value).is_ok_and(|id| id == c.id)
        })
        .ok_or_else(|| ForecastError::category_not_found(value))
}

/// Find a pattern by short id, full id or description
pub(crate) fn resolve_pattern(storage: &Storage, value: &str) -> ForecastResult<RecurringPattern> {
    let patterns = storage.patterns.get_all()?;
    if let Some(pattern) = patterns.iter().find(|p| p.id.to_string() == value) {
        return Ok(pattern.clone());
    }

    let mut by_description = patterns
        .into_iter()
        .filter(|p| p.description.eq_ignore_ascii_case(value));
    match (by_description.next(), by_description.next()) {
        (Some(pattern), None) => Ok(pattern),
        (Some(_), Some(_)) => Err(ForecastError::Validation(format!(
            "More than one pattern is described as '{}'; use its id",
            value
        ))),
        (None, _) => Err(ForecastError::pattern_not_found(value)),
    }
}

pub(crate) fn parse_date(value: &str) -> ForecastResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ForecastError::Validation(format!("Invalid date: '{}'. Use YYYY-MM-DD", value))
    })
}

pub(crate) fn parse_money(value: &str) -> ForecastResult<Money> {
    Money::parse(value).map_err(|e| {
        ForecastError::Validation(format!(
            "Invalid amount: '{}'. Use a format like '1200.00' or '1200'. Error: {}",
            value, e
        ))
    })
}

/// Account names for the user's accounts
pub(crate) fn account_names(
    storage: &Storage,
    user: UserId,
) -> ForecastResult<HashMap<AccountId, String>> {
    Ok(storage
        .accounts
        .get_by_user(user)?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect())
}

pub(crate) fn category_names(
    storage: &Storage,
    user: UserId,
) -> ForecastResult<HashMap<CategoryId, String>> {
    Ok(storage
        .categories
        .get_by_user(user)?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect())
}

/// A file when a path is given, stdout otherwise
pub(crate) fn output_writer(path: Option<&Path>) -> ForecastResult<Box<dyn Write>> {
    match path {
        Some(path) => Ok(Box::new(File::create(path).map_err(|e| {
            ForecastError::Export(format!("Cannot create {}: {}", path.display(), e))
        })?)),
        None => Ok(Box::new(io::stdout().lock())),
    }
}
