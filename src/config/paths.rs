//! Path management for the forecast ledger
//!
//! ## Path Resolution Order
//!
//! 1. `FORECAST_LEDGER_DATA_DIR` environment variable (if set)
//! 2. The platform config directory from `directories`
//!    (`~/.config/forecast-ledger` on Linux)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::ForecastError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "FORECAST_LEDGER_DATA_DIR";

/// Manages all paths used by the ledger
#[derive(Debug, Clone)]
pub struct LedgerPaths {
    base_dir: PathBuf,
}

impl LedgerPaths {
    /// Resolve the base directory from the environment or platform defaults
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, ForecastError> {
        let base_dir = match std::env::var(DATA_DIR_ENV) {
            Ok(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => ProjectDirs::from("", "", "forecast-ledger")
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or_else(|| {
                    ForecastError::Config("Could not determine a home directory".into())
                })?,
        };

        Ok(Self { base_dir })
    }

    /// Use an explicit base directory (tests, `--data-dir`)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    pub fn accounts_file(&self) -> PathBuf {
        self.data_dir().join("accounts.json")
    }

    pub fn transactions_file(&self) -> PathBuf {
        self.data_dir().join("transactions.json")
    }

    /// Categories and category rules
    pub fn categories_file(&self) -> PathBuf {
        self.data_dir().join("categories.json")
    }

    pub fn patterns_file(&self) -> PathBuf {
        self.data_dir().join("patterns.json")
    }

    /// Create the base and data directories
    pub fn ensure_directories(&self) -> Result<(), ForecastError> {
        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| ForecastError::Io(format!("Failed to create data directory: {}", e)))
    }

    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}
