//! Duplicate detection for imported rows
//!
//! A CSV row is a likely duplicate of a ledger transaction when the dates are
//! within a day of each other, the amounts agree to the cent and the raw
//! descriptions are more than 70% similar. Digits are compared like any other
//! text, so differing check numbers or store numbers lower the score.

use tracing::debug;

use crate::error::{ForecastError, ForecastResult};
use crate::models::{AccountId, CalendarDate, CsvRow, DuplicateCandidate, Transaction};
use crate::storage::TransactionSource;

use super::similarity::similarity;

/// Largest date gap, in days, between duplicates
pub const MAX_DATE_GAP_DAYS: i64 = 1;

/// Largest amount difference, in cents, between duplicates
pub const MAX_AMOUNT_DIFF_CENTS: i64 = 1;

/// Descriptions must score strictly above this
pub const MIN_DESCRIPTION_SIMILARITY: f64 = 0.70;

fn date_gap(existing: &Transaction, row: &CsvRow) -> i64 {
    existing.date.diff_in_days(row.date).abs()
}

/// True when `row` probably records the same activity as `existing`
pub fn is_likely_duplicate(existing: &Transaction, row: &CsvRow) -> bool {
    date_gap(existing, row) <= MAX_DATE_GAP_DAYS
        && existing.amount.abs_diff(row.amount).cents() <= MAX_AMOUNT_DIFF_CENTS
        && similarity(&existing.description, &row.description) > MIN_DESCRIPTION_SIMILARITY
}

/// Mean of the date, amount and description factors, in [0, 1]
pub fn duplicate_confidence(existing: &Transaction, row: &CsvRow) -> f64 {
    let date_factor = (1.0 - date_gap(existing, row) as f64 * 0.5).max(0.0);
    let amount_factor = if existing.amount == row.amount { 1.0 } else { 0.5 };
    let description_factor = similarity(&existing.description, &row.description);

    (date_factor + amount_factor + description_factor) / 3.0
}

/// Finds rows that already exist on an account
pub struct DuplicateDetector<'a, S: TransactionSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: TransactionSource + ?Sized> DuplicateDetector<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// One candidate per row that matches at least one ledger transaction
    ///
    /// The ledger is read once, over the rows' date range widened by a day on
    /// each side. Candidates keep the row order.
    pub fn detect_duplicates(
        &self,
        account: AccountId,
        rows: &[CsvRow],
    ) -> ForecastResult<Vec<DuplicateCandidate>> {
        let (Some(min), Some(max)) = (
            rows.iter().map(|r| r.date).min(),
            rows.iter().map(|r| r.date).max(),
        ) else {
            return Ok(Vec::new());
        };

        let existing = self
            .source
            .transactions_in_range(
                account,
                min.add_days(-MAX_DATE_GAP_DAYS),
                max.add_days(MAX_DATE_GAP_DAYS),
            )
            .map_err(|e| ForecastError::DataUnavailable(e.to_string()))?;

        let candidates: Vec<DuplicateCandidate> = rows
            .iter()
            .filter_map(|row| {
                let matches: Vec<Transaction> = existing
                    .iter()
                    .filter(|t| is_likely_duplicate(t, row))
                    .cloned()
                    .collect();
                let confidence = duplicate_confidence(matches.first()?, row);
                Some(DuplicateCandidate {
                    row: row.clone(),
                    content_hash: row.hash.clone(),
                    matches,
                    confidence,
                })
            })
            .collect();

        debug!(
            account = %account,
            rows = rows.len(),
            duplicates = candidates.len(),
            "duplicate scan finished"
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, TransactionKind};
    use chrono::NaiveDate;
    use std::collections::{BTreeMap, HashMap};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn row(date: NaiveDate, cents: i64, description: &str) -> CsvRow {
        CsvRow {
            row_number: 1,
            date,
            amount: Money::from_cents(cents),
            kind: TransactionKind::Expense,
            description: description.to_string(),
            raw: BTreeMap::new(),
            hash: format!("imp-{}-{}", date, cents),
        }
    }

    fn expense(account: AccountId, date: NaiveDate, cents: i64, description: &str) -> Transaction {
        Transaction::new(
            account,
            TransactionKind::Expense,
            Money::from_cents(cents),
            description,
            date,
        )
    }

    struct MemorySource(HashMap<AccountId, Vec<Transaction>>);

    impl TransactionSource for MemorySource {
        fn transactions_on(&self, account: AccountId, date: NaiveDate) -> ForecastResult<Vec<Transaction>> {
            self.transactions_in_range(account, date, date)
        }

        fn incoming_transfers_on(&self, _: AccountId, _: NaiveDate) -> ForecastResult<Vec<Transaction>> {
            Ok(Vec::new())
        }

        fn transactions_in_range(
            &self,
            account: AccountId,
            from: NaiveDate,
            to: NaiveDate,
        ) -> ForecastResult<Vec<Transaction>> {
            Ok(self
                .0
                .get(&account)
                .map(|txns| {
                    txns.iter()
                        .filter(|t| t.date >= from && t.date <= to)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    struct FailingSource;

    impl TransactionSource for FailingSource {
        fn transactions_on(&self, _: AccountId, _: NaiveDate) -> ForecastResult<Vec<Transaction>> {
            Err(ForecastError::Storage("offline".into()))
        }

        fn incoming_transfers_on(&self, _: AccountId, _: NaiveDate) -> ForecastResult<Vec<Transaction>> {
            Err(ForecastError::Storage("offline".into()))
        }

        fn transactions_in_range(
            &self,
            _: AccountId,
            _: NaiveDate,
            _: NaiveDate,
        ) -> ForecastResult<Vec<Transaction>> {
            Err(ForecastError::Storage("offline".into()))
        }
    }

    #[test]
    fn test_starbucks_scenario() {
        let account = AccountId::new();
        let existing = expense(account, d(3, 2), 4_999, "Starbucks Coffee");
        let incoming = row(d(3, 1), 4_999, "STARBUCKS #123");

        // 20 of 30 characters shared
        assert!(!is_likely_duplicate(&existing, &incoming));
        let expected = (0.5 + 1.0 + 2.0 / 3.0) / 3.0;
        assert!((duplicate_confidence(&existing, &incoming) - expected).abs() < 1e-9);

        let with_store = expense(account, d(3, 2), 4_999, "STARBUCKS COFFEE #123");
        assert!(is_likely_duplicate(&with_store, &row(d(3, 1), 4_999, "Starbucks Coffee")));
    }

    #[test]
    fn test_reference_numbers_count_against_match() {
        let account = AccountId::new();
        let existing = expense(account, d(3, 1), 150_000, "ACH 1234 RENT");
        let incoming = row(d(3, 2), 150_000, "ACH 9876 RENT");

        assert!(!is_likely_duplicate(&existing, &incoming));
        let expected = (0.5 + 1.0 + 18.0 / 26.0) / 3.0;
        assert!((duplicate_confidence(&existing, &incoming) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_thresholds() {
        let account = AccountId::new();
        let existing = expense(account, d(3, 14), 450, "Netflix");

        // one cent apart still counts, at half amount weight
        let near = row(d(3, 14), 451, "Netflix");
        assert!(is_likely_duplicate(&existing, &near));
        assert!((duplicate_confidence(&existing, &near) - 2.5 / 3.0).abs() < 1e-9);

        assert!(!is_likely_duplicate(&existing, &row(d(3, 14), 452, "Netflix")));
        assert!(!is_likely_duplicate(&existing, &row(d(3, 16), 450, "Netflix")));
        assert!(!is_likely_duplicate(&existing, &row(d(3, 14), 450, "Spotify")));
    }

    #[test]
    fn test_detect_duplicates_keeps_all_matches() {
        let account = AccountId::new();
        let other = AccountId::new();
        let first = expense(account, d(3, 13), 450, "STARBUCKS COFFEE #123");
        let second = expense(account, d(3, 14), 450, "Starbucks Coffee #9");
        let elsewhere = expense(other, d(3, 14), 450, "STARBUCKS COFFEE #123");

        let mut ledger = HashMap::new();
        ledger.insert(account, vec![first.clone(), second.clone()]);
        ledger.insert(other, vec![elsewhere]);
        let source = MemorySource(ledger);

        let rows = vec![
            row(d(3, 14), 450, "Starbucks Coffee"),
            row(d(3, 20), 1_299, "Netflix.com"),
        ];
        let candidates = DuplicateDetector::new(&source)
            .detect_duplicates(account, &rows)
            .unwrap();

        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert_eq!(candidate.content_hash, rows[0].hash);
        assert_eq!(candidate.matches.len(), 2);
        assert!(candidate.matches.iter().all(|t| t.account_id == account));
        let first_match = &candidate.matches[0];
        assert!(
            (candidate.confidence - duplicate_confidence(first_match, &rows[0])).abs() < 1e-9
        );
    }

    #[test]
    fn test_detect_duplicates_empty_rows() {
        let source = MemorySource(HashMap::new());
        let detector = DuplicateDetector::new(&source);
        assert!(detector.detect_duplicates(AccountId::new(), &[]).unwrap().is_empty());
    }

    #[test]
    fn test_detect_duplicates_source_failure() {
        let rows = vec![row(d(3, 14), 450, "Starbucks")];
        let err = DuplicateDetector::new(&FailingSource)
            .detect_duplicates(AccountId::new(), &rows)
            .unwrap_err();
        assert!(matches!(err, ForecastError::DataUnavailable(_)));
    }
}
