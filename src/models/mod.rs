//! Core data models for the forecast ledger
//!
//! Accounts, transactions, categories, recurring patterns and category
//! rules, plus the value types the projection engine produces.

pub mod account;
pub mod category;
pub mod date;
pub mod ids;
pub mod import;
pub mod money;
pub mod projection;
pub mod recurring;
pub mod rule;
pub mod transaction;

pub use account::{Account, AccountType};
pub use category::Category;
pub use date::CalendarDate;
pub use ids::{AccountId, CategoryId, PatternId, RuleId, TransactionId, UserId};
pub use import::{CsvRow, DuplicateCandidate};
pub use money::Money;
pub use projection::{
    AccountMonthSummary, DailyProjection, LedgerEntry, MonthSummary, Occurrence, TransferIn,
};
pub use recurring::{Frequency, RecurringPattern};
pub use rule::{CategoryRule, RuleField, RuleOperator};
pub use transaction::{Transaction, TransactionKind};
