//! forecast-ledger - cash-flow projection for personal accounts
//!
//! This library projects account balances day by day from confirmed
//! transactions and recurring patterns, rolls projections up by month, and
//! supports bank CSV import with duplicate detection and rule-based
//! categorization.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (accounts, transactions, patterns, rules, projections)
//! - `storage`: JSON file storage layer and the read traits the engine consumes
//! - `services`: Recurrence engine, projections, duplicate detection, categorization, import
//! - `display`: Table rendering for the CLI
//! - `export`: Projection export to CSV and JSON
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use forecast_ledger::clock::SystemClock;
//! use forecast_ledger::config::paths::LedgerPaths;
//! use forecast_ledger::services::ProjectionService;
//! use forecast_ledger::storage::Storage;
//!
//! let storage = Storage::open(LedgerPaths::new()?, Arc::new(SystemClock))?;
//! let clock = storage.clock();
//! let days = ProjectionService::new(&storage, clock.as_ref()).project_account(account_id, end)?;
//! ```

pub mod cli;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{ForecastError, ForecastResult};

/// Initialize tracing with the given default filter directive
pub fn init(default_directive: &str) {
    logging::init_tracing(default_directive);
    tracing::debug!("forecast-ledger tracing initialized");
}
