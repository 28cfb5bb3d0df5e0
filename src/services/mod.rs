//! Service layer for the forecast ledger
//!
//! The recurrence engine, daily compositor and similarity scoring are pure
//! functions over their inputs. The projection, duplicate and import
//! services read the ledger through the storage traits.

pub mod categorize;
pub mod compositor;
pub mod duplicate;
pub mod import;
pub mod projection;
pub mod recurrence;
pub mod similarity;

pub use categorize::{CategoryMatch, CategoryMatcher, CategorySuggestion, RuleCache};
pub use duplicate::DuplicateDetector;
pub use import::{ColumnMapping, ImportService};
pub use projection::{CancellationToken, ProjectionService};
pub use recurrence::RecurrenceService;
