//! CSV import service
//!
//! Reads bank CSV exports, maps their columns, flags rows that already exist
//! on the account and suggests categories for the rest before anything is
//! written to the ledger.

use std::collections::HashMap;
use std::fmt::Write;
use std::io::Read;

use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{ForecastError, ForecastResult};
use crate::models::{
    AccountId, CategoryId, CsvRow, DuplicateCandidate, Money, Transaction, TransactionId,
    TransactionKind,
};
use crate::storage::Storage;

use super::categorize::{CategoryMatch, RuleCache};
use super::duplicate::DuplicateDetector;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%m/%d/%y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S"];

const DATE_HEADERS: &[&str] = &["date", "transaction_date", "posted_date", "trans_date"];
const DESCRIPTION_HEADERS: &[&str] = &["description", "memo", "details", "transaction_description"];
const AMOUNT_HEADERS: &[&str] = &["amount", "transaction_amount", "debit", "credit"];
const DEBIT_HEADERS: &[&str] = &["debit", "withdrawal", "outgoing"];
const CREDIT_HEADERS: &[&str] = &["credit", "deposit", "incoming"];
const BALANCE_HEADERS: &[&str] = &["balance", "running_balance", "account_balance"];

/// Column mapping configuration for CSV import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub date_column: usize,
    pub description_column: Option<usize>,
    /// Signed amount column; ignored when both debit and credit are mapped
    pub amount_column: Option<usize>,
    pub debit_column: Option<usize>,
    pub credit_column: Option<usize>,
    /// Running balance, kept in the raw row only
    pub balance_column: Option<usize>,
    /// Tried before the built-in formats
    pub date_format: Option<String>,
    pub has_header: bool,
    pub delimiter: u8,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date_column: 0,
            description_column: Some(1),
            amount_column: Some(2),
            debit_column: None,
            credit_column: None,
            balance_column: None,
            date_format: None,
            has_header: true,
            delimiter: b',',
        }
    }
}

fn find_column(headers: &[String], patterns: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| patterns.iter().any(|p| h.contains(p)))
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guess the mapping from a header row
    ///
    /// Each field takes the first header containing one of its patterns,
    /// compared case-insensitively with spaces read as underscores.
    ///
    /// # Errors
    ///
    /// Returns an import error when no date column or no amount source is
    /// found.
    pub fn detect(headers: &[String]) -> ForecastResult<Self> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| h.trim().to_lowercase().replace(' ', "_"))
            .collect();

        let date_column = find_column(&normalized, DATE_HEADERS).ok_or_else(|| {
            ForecastError::Import(format!("No date column among headers: {}", headers.join(", ")))
        })?;

        let mapping = Self {
            date_column,
            description_column: find_column(&normalized, DESCRIPTION_HEADERS),
            amount_column: find_column(&normalized, AMOUNT_HEADERS),
            debit_column: find_column(&normalized, DEBIT_HEADERS),
            credit_column: find_column(&normalized, CREDIT_HEADERS),
            balance_column: find_column(&normalized, BALANCE_HEADERS),
            ..Self::default()
        };

        if mapping.amount_column.is_none() && !mapping.has_split_amounts() {
            return Err(ForecastError::Import(format!(
                "No amount column among headers: {}",
                headers.join(", ")
            )));
        }
        Ok(mapping)
    }

    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = Some(format.to_string());
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// True when separate debit and credit columns carry the amount
    pub fn has_split_amounts(&self) -> bool {
        self.debit_column.is_some() && self.credit_column.is_some()
    }
}

/// A row that could not be turned into a [`CsvRow`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row_number: usize,
    pub message: String,
}

/// Result of reading a CSV file
#[derive(Debug, Clone)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub mapping: ColumnMapping,
    pub rows: Vec<CsvRow>,
    pub errors: Vec<RowError>,
}

impl ParsedCsv {
    pub fn total_rows(&self) -> usize {
        self.rows.len() + self.errors.len()
    }
}

/// Parse a date using the preferred format, then the built-in ones
pub fn parse_date(value: &str, preferred: Option<&str>) -> Option<NaiveDate> {
    let value = value.trim();
    preferred
        .into_iter()
        .chain(DATE_FORMATS.iter().copied())
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|dt| dt.date())
        })
}

/// Parse an amount cell, ignoring currency symbols and other noise
///
/// Empty cells parse as `None`.
pub fn parse_amount(value: &str) -> Result<Option<Money>, String> {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | '(' | ')'))
        .collect();
    if cleaned.is_empty() {
        return Ok(None);
    }
    Money::parse(&cleaned)
        .map(Some)
        .map_err(|e| format!("Could not parse amount '{}': {}", value.trim(), e))
}

/// Stable content hash of a raw row
///
/// SHA-256 over each header and cell, every field prefixed with its byte
/// length, rendered as `imp-` and 64 hex digits.
pub fn hash_row(headers: &[String], record: &StringRecord) -> String {
    let mut hasher = Sha256::new();
    for (header, value) in headers.iter().zip(record.iter()) {
        for field in [header.as_str(), value] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
    }
    hasher
        .finalize()
        .iter()
        .fold(String::from("imp-"), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        })
}

fn cell<'r>(record: &'r StringRecord, column: Option<usize>) -> &'r str {
    column.and_then(|c| record.get(c)).map(str::trim).unwrap_or("")
}

/// Kind and positive magnitude for a record
fn resolve_amount(
    record: &StringRecord,
    mapping: &ColumnMapping,
) -> Result<(TransactionKind, Money), String> {
    if mapping.has_split_amounts() {
        let debit = parse_amount(cell(record, mapping.debit_column))?.unwrap_or_default().abs();
        let credit = parse_amount(cell(record, mapping.credit_column))?.unwrap_or_default().abs();
        if debit.is_positive() {
            return Ok((TransactionKind::Expense, debit));
        }
        if credit.is_positive() {
            return Ok((TransactionKind::Income, credit));
        }
        return Err("Row has neither a debit nor a credit amount".to_string());
    }

    let amount = parse_amount(cell(record, mapping.amount_column))?
        .ok_or_else(|| "Missing amount".to_string())?;
    if amount.is_zero() {
        Err("Amount is zero".to_string())
    } else if amount.is_negative() {
        Ok((TransactionKind::Expense, amount.abs()))
    } else {
        Ok((TransactionKind::Income, amount))
    }
}

fn parse_record(
    headers: &[String],
    record: &StringRecord,
    row_number: usize,
    mapping: &ColumnMapping,
) -> Result<CsvRow, String> {
    if record.len() != headers.len() {
        return Err(format!(
            "Expected {} fields, found {}",
            headers.len(),
            record.len()
        ));
    }

    let date_cell = cell(record, Some(mapping.date_column));
    let date = parse_date(date_cell, mapping.date_format.as_deref())
        .ok_or_else(|| format!("Could not parse date: '{}'", date_cell))?;
    let (kind, amount) = resolve_amount(record, mapping)?;

    Ok(CsvRow {
        row_number,
        date,
        amount,
        kind,
        description: cell(record, mapping.description_column).to_string(),
        raw: headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect(),
        hash: hash_row(headers, record),
    })
}

/// Detect the mapping from the header row of `input`
pub fn detect_mapping<R: Read>(input: R, delimiter: u8) -> ForecastResult<ColumnMapping> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(input);
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    Ok(ColumnMapping::detect(&headers)?.with_delimiter(delimiter))
}

/// Read a CSV export into rows
///
/// Without a mapping the header row is required and the mapping is
/// detected from it. Rows that cannot be parsed are reported in
/// [`ParsedCsv::errors`] and skipped.
pub fn parse_csv<R: Read>(input: R, mapping: Option<ColumnMapping>) -> ForecastResult<ParsedCsv> {
    let (has_header, delimiter) = mapping
        .as_ref()
        .map(|m| (m.has_header, m.delimiter))
        .unwrap_or((true, b','));

    let mut reader = ReaderBuilder::new()
        .has_headers(has_header)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(input);

    let first = reader.headers()?.clone();
    let headers: Vec<String> = if has_header {
        first.iter().map(|h| h.trim().to_string()).collect()
    } else {
        (1..=first.len()).map(|i| format!("column_{}", i)).collect()
    };

    let mapping = match mapping {
        Some(mapping) => mapping,
        None => ColumnMapping::detect(&headers)?,
    };

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let row_number = idx + 1;
        let parsed = result
            .map_err(|e| format!("Error reading CSV record: {}", e))
            .and_then(|record| parse_record(&headers, &record, row_number, &mapping));

        match parsed {
            Ok(row) => rows.push(row),
            Err(message) => {
                warn!(row = row_number, %message, "skipping CSV row");
                errors.push(RowError {
                    row_number,
                    message,
                });
            }
        }
    }

    Ok(ParsedCsv {
        headers,
        mapping,
        rows,
        errors,
    })
}

/// What an import will do with a row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportStatus {
    /// Will be imported
    New,
    /// Resembles ledger transactions; skipped unless resolved
    Duplicate(DuplicateCandidate),
    /// This exact row was imported before
    AlreadyImported,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportPreviewEntry {
    pub row: CsvRow,
    pub status: ImportStatus,
    /// Category the rules would assign
    pub suggested: Option<CategoryMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportPreview {
    pub account_id: AccountId,
    pub entries: Vec<ImportPreviewEntry>,
    pub errors: Vec<RowError>,
}

impl ImportPreview {
    pub fn new_count(&self) -> usize {
        self.count(|s| matches!(s, ImportStatus::New))
    }

    pub fn duplicate_count(&self) -> usize {
        self.count(|s| matches!(s, ImportStatus::Duplicate(_)))
    }

    pub fn already_imported_count(&self) -> usize {
        self.count(|s| matches!(s, ImportStatus::AlreadyImported))
    }

    pub fn duplicates(&self) -> impl Iterator<Item = &DuplicateCandidate> {
        self.entries.iter().filter_map(|e| match &e.status {
            ImportStatus::Duplicate(candidate) => Some(candidate),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&ImportStatus) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.status)).count()
    }
}

/// Result of a completed import
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportResult {
    pub imported: usize,
    pub duplicates_skipped: usize,
    pub already_imported: usize,
    pub errors: usize,
    pub imported_ids: Vec<TransactionId>,
}

/// User decision for a duplicate candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionAction {
    Import,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateResolution {
    pub row_number: usize,
    pub action: ResolutionAction,
    /// Overrides the suggested category
    pub category_id: Option<CategoryId>,
}

/// Service for CSV import
pub struct ImportService<'a> {
    storage: &'a Storage,
    rules: &'a RuleCache,
}

impl<'a> ImportService<'a> {
    pub fn new(storage: &'a Storage, rules: &'a RuleCache) -> Self {
        Self { storage, rules }
    }

    /// Classify parsed rows against the account without writing anything
    pub fn preview(&self, account_id: AccountId, parsed: &ParsedCsv) -> ForecastResult<ImportPreview> {
        let account = self
            .storage
            .accounts
            .get(account_id)?
            .ok_or_else(|| ForecastError::account_not_found(account_id.to_string()))?;
        let matcher = self.rules.matcher_for(&self.storage.categories, account.user_id)?;

        let mut duplicates: HashMap<usize, DuplicateCandidate> =
            DuplicateDetector::new(self.storage)
                .detect_duplicates(account_id, &parsed.rows)?
                .into_iter()
                .map(|c| (c.row.row_number, c))
                .collect();

        let mut entries = Vec::with_capacity(parsed.rows.len());
        for row in &parsed.rows {
            let status = if self.storage.transactions.has_import_hash(&row.hash)? {
                ImportStatus::AlreadyImported
            } else if let Some(candidate) = duplicates.remove(&row.row_number) {
                ImportStatus::Duplicate(candidate)
            } else {
                ImportStatus::New
            };

            entries.push(ImportPreviewEntry {
                suggested: matcher.match_category(&row.description, row.amount),
                row: row.clone(),
                status,
            });
        }

        Ok(ImportPreview {
            account_id,
            entries,
            errors: parsed.errors.clone(),
        })
    }

    fn create_from_row(
        &self,
        account_id: AccountId,
        row: &CsvRow,
        category_id: Option<CategoryId>,
    ) -> ForecastResult<Transaction> {
        let mut txn = Transaction::new(account_id, row.kind, row.amount, &row.description, row.date)
            .with_import_hash(&row.hash);
        txn.category_id = category_id;
        self.storage.transactions.upsert(txn.clone())?;
        Ok(txn)
    }

    /// Import every new row of a preview
    pub fn import_preview(&self, preview: &ImportPreview) -> ForecastResult<ImportResult> {
        let mut result = ImportResult {
            errors: preview.errors.len(),
            ..ImportResult::default()
        };

        for entry in &preview.entries {
            match &entry.status {
                ImportStatus::New => {
                    let category = entry.suggested.as_ref().map(|m| m.category_id);
                    let txn = self.create_from_row(preview.account_id, &entry.row, category)?;
                    result.imported += 1;
                    result.imported_ids.push(txn.id);
                }
                ImportStatus::Duplicate(_) => result.duplicates_skipped += 1,
                ImportStatus::AlreadyImported => result.already_imported += 1,
            }
        }

        self.storage.transactions.save()?;
        info!(
            account = %preview.account_id,
            imported = result.imported,
            duplicates = result.duplicates_skipped,
            "CSV import finished"
        );
        Ok(result)
    }

    /// Import the duplicate candidates the user chose to keep
    ///
    /// Returns how many transactions were created.
    pub fn resolve_duplicates(
        &self,
        preview: &ImportPreview,
        resolutions: &[DuplicateResolution],
    ) -> ForecastResult<usize> {
        let mut resolved = 0;

        for resolution in resolutions {
            let entry = preview
                .entries
                .iter()
                .find(|e| {
                    e.row.row_number == resolution.row_number
                        && matches!(e.status, ImportStatus::Duplicate(_))
                })
                .ok_or_else(|| {
                    ForecastError::Import(format!(
                        "Row {} is not a duplicate candidate",
                        resolution.row_number
                    ))
                })?;

            if resolution.action == ResolutionAction::Import {
                let category = resolution
                    .category_id
                    .or_else(|| entry.suggested.as_ref().map(|m| m.category_id));
                self.create_from_row(preview.account_id, &entry.row, category)?;
                resolved += 1;
            }
        }

        if resolved > 0 {
            self.storage.transactions.save()?;
        }
        Ok(resolved)
    }
}
