//! User settings for the forecast ledger
//!
//! Display preferences, projection defaults and matching thresholds.

use serde::{Deserialize, Serialize};

use super::paths::LedgerPaths;
use crate::error::ForecastError;
use crate::models::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Owner of every account created through this data directory
    #[serde(default)]
    pub user_id: UserId,

    #[serde(default = "default_currency")]
    pub currency_symbol: String,

    /// strftime format for displayed dates
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Horizon used by `project` when no end date is given
    #[serde(default = "default_projection_days")]
    pub projection_days: u32,

    /// Months covered by `rollup` by default
    #[serde(default = "default_rollup_months")]
    pub rollup_months: u32,

    /// Days ahead shown by `upcoming`
    #[serde(default = "default_upcoming_days")]
    pub upcoming_days: u32,

    /// Maximum category suggestions returned per description
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,

    /// Default tracing directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_currency() -> String {
    "$".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_projection_days() -> u32 {
    30
}

fn default_rollup_months() -> u32 {
    6
}

fn default_upcoming_days() -> u32 {
    30
}

fn default_suggestion_limit() -> usize {
    5
}

fn default_log_filter() -> String {
    "forecast_ledger=warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            user_id: UserId::new(),
            currency_symbol: default_currency(),
            date_format: default_date_format(),
            projection_days: default_projection_days(),
            rollup_months: default_rollup_months(),
            upcoming_days: default_upcoming_days(),
            suggestion_limit: default_suggestion_limit(),
            log_filter: default_log_filter(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or fall back to defaults if the file is absent
    pub fn load_or_create(paths: &LedgerPaths) -> Result<Self, ForecastError> {
        let settings_path = paths.settings_file();
        if !settings_path.exists() {
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| ForecastError::Io(format!("Failed to read settings file: {}", e)))?;
        serde_json::from_str(&contents)
            .map_err(|e| ForecastError::Config(format!("Failed to parse settings file: {}", e)))
    }

    pub fn save(&self, paths: &LedgerPaths) -> Result<(), ForecastError> {
        paths.ensure_directories()?;
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ForecastError::Config(format!("Failed to serialize settings: {}", e)))?;
        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| ForecastError::Io(format!("Failed to write settings file: {}", e)))
    }

    /// Update one setting from its key and a string value
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ForecastError> {
        let number = |v: &str| {
            v.parse::<u32>()
                .map_err(|_| ForecastError::Config(format!("{} expects a number, got '{}'", key, v)))
        };

        match key {
            "currency_symbol" => self.currency_symbol = value.to_string(),
            "date_format" => self.date_format = value.to_string(),
            "projection_days" => self.projection_days = number(value)?,
            "rollup_months" => self.rollup_months = number(value)?,
            "upcoming_days" => self.upcoming_days = number(value)?,
            "suggestion_limit" => self.suggestion_limit = number(value)? as usize,
            "log_filter" => self.log_filter = value.to_string(),
            _ => return Err(ForecastError::Config(format!("Unknown setting: {}", key))),
        }
        Ok(())
    }
}
