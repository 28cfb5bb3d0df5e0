//! Error types for the forecast ledger
//!
//! Engine failures (bad patterns, missing balances, cancelled runs) share one
//! enum with the storage, configuration and import layers so callers can
//! propagate everything with `?`.

use thiserror::Error;

/// The main error type for forecast ledger operations
#[derive(Error, Debug)]
pub enum ForecastError {
    /// A recurring pattern cannot be expanded
    #[error("Invalid recurring pattern: {0}")]
    InvalidPattern(String),

    /// A required balance or account could not be read from storage
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// A date range is inverted or otherwise unusable
    #[error("Date range out of bounds: {0}")]
    OutOfRange(String),

    /// More than one rule matched with equal priority
    #[error("Ambiguous match: {0}")]
    AmbiguousMatch(String),

    /// The caller cancelled a long-running computation
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for data models
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Import errors
    #[error("Import error: {0}")]
    Import(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ForecastError {
    /// Create a "not found" error for accounts
    pub fn account_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Account",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for recurring patterns
    pub fn pattern_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Recurring pattern",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for categories
    pub fn category_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Category",
            identifier: identifier.into(),
        }
    }

    /// Create a "data unavailable" error for an account whose balance cannot be read
    pub fn balance_unavailable(identifier: impl std::fmt::Display) -> Self {
        Self::DataUnavailable(format!("no balance for account {}", identifier))
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<std::io::Error> for ForecastError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        Self::Import(err.to_string())
    }
}

/// Result type alias for forecast ledger operations
pub type ForecastResult<T> = Result<T, ForecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ForecastError::InvalidPattern("missing start date".into());
        assert_eq!(
            err.to_string(),
            "Invalid recurring pattern: missing start date"
        );
    }

    #[test]
    fn test_not_found_error() {
        let err = ForecastError::account_not_found("Checking");
        assert_eq!(err.to_string(), "Account not found: Checking");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_cancelled() {
        let err = ForecastError::Cancelled;
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ForecastError = io_err.into();
        assert!(matches!(err, ForecastError::Io(_)));
    }
}
