//! Account repository for JSON storage

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::ForecastError;
use crate::models::{Account, AccountId, UserId};

use super::file_io::{read_json, write_json_atomic};
use super::lock_error;

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct AccountData {
    accounts: Vec<Account>,
}

/// Repository for account persistence
pub struct AccountRepository {
    path: PathBuf,
    data: RwLock<HashMap<AccountId, Account>>,
}

impl AccountRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> Result<(), ForecastError> {
        let file_data: AccountData = read_json(&self.path)?;
        let mut data = self.data.write().map_err(lock_error)?;
        data.clear();
        for account in file_data.accounts {
            data.insert(account.id, account);
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), ForecastError> {
        let data = self.data.read().map_err(lock_error)?;
        let mut accounts: Vec<_> = data.values().cloned().collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        write_json_atomic(&self.path, &AccountData { accounts })
    }

    pub fn get(&self, id: AccountId) -> Result<Option<Account>, ForecastError> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.get(&id).cloned())
    }

    /// All accounts owned by a user, sorted by name
    pub fn get_by_user(&self, user_id: UserId) -> Result<Vec<Account>, ForecastError> {
        let data = self.data.read().map_err(lock_error)?;
        let mut accounts: Vec<_> = data
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }

    pub fn get_all(&self) -> Result<Vec<Account>, ForecastError> {
        let data = self.data.read().map_err(lock_error)?;
        let mut accounts: Vec<_> = data.values().cloned().collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }

    /// Case-insensitive lookup by name
    pub fn find_by_name(&self, name: &str) -> Result<Option<Account>, ForecastError> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data
            .values()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    pub fn upsert(&self, account: Account) -> Result<(), ForecastError> {
        account
            .validate()
            .map_err(|e| ForecastError::Validation(e.to_string()))?;
        let mut data = self.data.write().map_err(lock_error)?;
        data.insert(account.id, account);
        Ok(())
    }
}
