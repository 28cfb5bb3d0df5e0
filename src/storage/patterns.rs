//! Recurring pattern repository

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::ForecastError;
use crate::models::{AccountId, PatternId, RecurringPattern};

use super::file_io::{read_json, write_json_atomic};
use super::lock_error;

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct PatternData {
    patterns: Vec<RecurringPattern>,
}

pub struct PatternRepository {
    path: PathBuf,
    data: RwLock<HashMap<PatternId, RecurringPattern>>,
}

impl PatternRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), ForecastError> {
        let file_data: PatternData = read_json(&self.path)?;
        let mut data = self.data.write().map_err(lock_error)?;
        data.clear();
        for pattern in file_data.patterns {
            data.insert(pattern.id, pattern);
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), ForecastError> {
        let data = self.data.read().map_err(lock_error)?;
        let mut patterns: Vec<_> = data.values().cloned().collect();
        patterns.sort_by(|a, b| {
            a.start_date
                .cmp(&b.start_date)
                .then(a.description.cmp(&b.description))
        });
        write_json_atomic(&self.path, &PatternData { patterns })
    }

    pub fn get(&self, id: PatternId) -> Result<Option<RecurringPattern>, ForecastError> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.get(&id).cloned())
    }

    pub fn get_all(&self) -> Result<Vec<RecurringPattern>, ForecastError> {
        let data = self.data.read().map_err(lock_error)?;
        let mut patterns: Vec<_> = data.values().cloned().collect();
        patterns.sort_by_key(|p| p.start_date);
        Ok(patterns)
    }

    /// Active patterns for the given accounts, in start-date order
    pub fn get_active_for(
        &self,
        accounts: &[AccountId],
    ) -> Result<Vec<RecurringPattern>, ForecastError> {
        let data = self.data.read().map_err(lock_error)?;
        let mut patterns: Vec<_> = data
            .values()
            .filter(|p| p.is_active && accounts.contains(&p.account_id))
            .cloned()
            .collect();
        patterns.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
        Ok(patterns)
    }

    pub fn upsert(&self, pattern: RecurringPattern) -> Result<(), ForecastError> {
        pattern
            .validate()
            .map_err(|e| ForecastError::InvalidPattern(e.to_string()))?;
        let mut data = self.data.write().map_err(lock_error)?;
        data.insert(pattern.id, pattern);
        Ok(())
    }

    /// Mutate a pattern in place while holding the write lock
    ///
    /// `f` works on a copy; the stored pattern is replaced only when `f`
    /// succeeds.
    pub fn update_with<R>(
        &self,
        id: PatternId,
        f: impl FnOnce(&mut RecurringPattern) -> Result<R, ForecastError>,
    ) -> Result<R, ForecastError> {
        let mut data = self.data.write().map_err(lock_error)?;
        let current = data
            .get(&id)
            .ok_or_else(|| ForecastError::pattern_not_found(id.to_string()))?;

        let mut working = current.clone();
        let result = f(&mut working)?;
        working
            .validate()
            .map_err(|e| ForecastError::InvalidPattern(e.to_string()))?;
        data.insert(id, working);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frequency, Money, TransactionKind};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample(account: AccountId) -> RecurringPattern {
        RecurringPattern::new(
            account,
            TransactionKind::Expense,
            Money::from_cents(1599),
            "Streaming",
            Frequency::Monthly,
            NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
        )
    }

    #[test]
    fn test_active_filter() {
        let dir = TempDir::new().unwrap();
        let repo = PatternRepository::new(dir.path().join("patterns.json"));
        let account = AccountId::new();

        let active = sample(account);
        let mut paused = sample(account);
        paused.is_active = false;
        repo.upsert(active.clone()).unwrap();
        repo.upsert(paused).unwrap();
        repo.upsert(sample(AccountId::new())).unwrap();

        let found = repo.get_active_for(&[account]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, active.id);
    }

    #[test]
    fn test_update_with_is_all_or_nothing() {
        let dir = TempDir::new().unwrap();
        let repo = PatternRepository::new(dir.path().join("patterns.json"));
        let pattern = sample(AccountId::new());
        repo.upsert(pattern.clone()).unwrap();

        let failed: Result<(), _> = repo.update_with(pattern.id, |p| {
            p.is_active = false;
            Err(ForecastError::Cancelled)
        });
        assert!(failed.is_err());
        assert!(repo.get(pattern.id).unwrap().unwrap().is_active);

        repo.update_with(pattern.id, |p| {
            p.is_active = false;
            Ok(())
        })
        .unwrap();
        assert!(!repo.get(pattern.id).unwrap().unwrap().is_active);
    }
}
