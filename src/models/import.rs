//! Parsed CSV rows and duplicate candidates

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::money::Money;
use super::transaction::{Transaction, TransactionKind};

/// One parsed line of a bank CSV export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    /// 1-based line number in the file, header excluded
    pub row_number: usize,
    pub date: NaiveDate,
    /// Positive magnitude
    pub amount: Money,
    pub kind: TransactionKind,
    pub description: String,
    /// Original header -> cell values
    #[serde(default)]
    pub raw: BTreeMap<String, String>,
    /// Content hash identifying this row across imports
    pub hash: String,
}

impl CsvRow {
    pub fn signed_amount(&self) -> Money {
        self.kind.sign(self.amount)
    }
}

/// A CSV row that looks like transactions already on the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCandidate {
    pub row: CsvRow,
    pub content_hash: String,
    pub matches: Vec<Transaction>,
    /// Confidence against the first match, in [0, 1]
    pub confidence: f64,
}
