//! Export of projections, rollups and the full ledger
//!
//! - CSV: daily projection series and monthly rollups (spreadsheet-compatible)
//! - JSON: projections with metadata, and a full ledger snapshot

pub mod csv;
pub mod json;

pub use csv::{export_projection_csv, export_rollup_csv, export_transactions_csv};
pub use json::{
    export_ledger_json, export_projection_json, read_ledger_json, LedgerExport, ProjectionExport,
    EXPORT_SCHEMA_VERSION,
};
