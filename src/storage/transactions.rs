//! Transaction repository for JSON storage
//!
//! Keeps two date-ordered indexes: transactions by owning account, and
//! transfers by destination account. Both are keyed by `(account, date)` so
//! per-day and per-range lookups are range scans.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::NaiveDate;

use crate::error::ForecastError;
use crate::models::{AccountId, Transaction, TransactionId};

use super::file_io::{read_json, write_json_atomic};
use super::lock_error;

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct TransactionData {
    transactions: Vec<Transaction>,
}

type DateIndex = BTreeMap<(AccountId, NaiveDate), Vec<TransactionId>>;

#[derive(Default)]
struct Indexed {
    data: HashMap<TransactionId, Transaction>,
    by_account: DateIndex,
    incoming: DateIndex,
    import_hashes: HashSet<String>,
}

impl Indexed {
    fn insert(&mut self, txn: Transaction) {
        self.remove(txn.id);

        self.by_account
            .entry((txn.account_id, txn.date))
            .or_default()
            .push(txn.id);
        if let Some(to) = txn.transfer_to_account_id {
            self.incoming.entry((to, txn.date)).or_default().push(txn.id);
        }
        if let Some(hash) = &txn.import_hash {
            self.import_hashes.insert(hash.clone());
        }
        self.data.insert(txn.id, txn);
    }

    fn remove(&mut self, id: TransactionId) -> Option<Transaction> {
        let old = self.data.remove(&id)?;
        if let Some(ids) = self.by_account.get_mut(&(old.account_id, old.date)) {
            ids.retain(|&i| i != id);
        }
        if let Some(to) = old.transfer_to_account_id {
            if let Some(ids) = self.incoming.get_mut(&(to, old.date)) {
                ids.retain(|&i| i != id);
            }
        }
        if let Some(hash) = &old.import_hash {
            self.import_hashes.remove(hash);
        }
        Some(old)
    }

    fn collect(
        &self,
        index: &DateIndex,
        account: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<Transaction> {
        index
            .range((account, from)..=(account, to))
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| self.data.get(id).cloned())
            .collect()
    }
}

/// Repository for transaction persistence with date indexes
pub struct TransactionRepository {
    path: PathBuf,
    inner: RwLock<Indexed>,
}

impl TransactionRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            inner: RwLock::new(Indexed::default()),
        }
    }

    /// Load transactions from disk and rebuild indexes
    pub fn load(&self) -> Result<(), ForecastError> {
        let file_data: TransactionData = read_json(&self.path)?;
        let mut inner = self.inner.write().map_err(lock_error)?;
        *inner = Indexed::default();
        for txn in file_data.transactions {
            inner.insert(txn);
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), ForecastError> {
        let inner = self.inner.read().map_err(lock_error)?;
        let mut transactions: Vec<_> = inner.data.values().cloned().collect();
        transactions.sort_by(|a, b| a.date.cmp(&b.date).then(a.description.cmp(&b.description)));
        write_json_atomic(&self.path, &TransactionData { transactions })
    }

    pub fn get(&self, id: TransactionId) -> Result<Option<Transaction>, ForecastError> {
        let inner = self.inner.read().map_err(lock_error)?;
        Ok(inner.data.get(&id).cloned())
    }

    /// All transactions, oldest first
    pub fn get_all(&self) -> Result<Vec<Transaction>, ForecastError> {
        let inner = self.inner.read().map_err(lock_error)?;
        let mut all: Vec<_> = inner.data.values().cloned().collect();
        all.sort_by_key(|t| t.date);
        Ok(all)
    }

    /// An account's own transactions dated within `[from, to]`, oldest first
    pub fn get_by_account_range(
        &self,
        account: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Transaction>, ForecastError> {
        if to < from {
            return Ok(Vec::new());
        }
        let inner = self.inner.read().map_err(lock_error)?;
        Ok(inner.collect(&inner.by_account, account, from, to))
    }

    /// Transfers into `account` dated within `[from, to]`, oldest first
    pub fn get_incoming_range(
        &self,
        account: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Transaction>, ForecastError> {
        if to < from {
            return Ok(Vec::new());
        }
        let inner = self.inner.read().map_err(lock_error)?;
        Ok(inner.collect(&inner.incoming, account, from, to))
    }

    pub fn has_import_hash(&self, hash: &str) -> Result<bool, ForecastError> {
        let inner = self.inner.read().map_err(lock_error)?;
        Ok(inner.import_hashes.contains(hash))
    }

    /// Insert or update a transaction
    pub fn upsert(&self, txn: Transaction) -> Result<(), ForecastError> {
        txn.validate()
            .map_err(|e| ForecastError::Validation(e.to_string()))?;
        let mut inner = self.inner.write().map_err(lock_error)?;
        inner.insert(txn);
        Ok(())
    }

    pub fn delete(&self, id: TransactionId) -> Result<bool, ForecastError> {
        let mut inner = self.inner.write().map_err(lock_error)?;
        Ok(inner.remove(id).is_some())
    }

    pub fn count(&self) -> Result<usize, ForecastError> {
        Ok(self.inner.read().map_err(lock_error)?.data.len())
    }
}
