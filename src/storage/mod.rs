//! Storage layer
//!
//! The projection and matching services read ledger data only through the
//! [`TransactionSource`], [`AccountSource`] and [`PatternSource`] traits.
//! [`Storage`] is the JSON-file implementation used by the CLI.

pub mod accounts;
pub mod categories;
pub mod file_io;
pub mod patterns;
pub mod transactions;

pub use accounts::AccountRepository;
pub use categories::CategoryRepository;
pub use patterns::PatternRepository;
pub use transactions::TransactionRepository;

use std::fmt::Display;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::paths::LedgerPaths;
use crate::error::{ForecastError, ForecastResult};
use crate::models::{
    Account, AccountId, CalendarDate, Money, PatternId, RecurringPattern, Transaction, UserId,
};
use crate::services::recurrence::{self, Materialized};

pub(crate) fn lock_error<E: Display>(e: E) -> ForecastError {
    ForecastError::Storage(format!("Failed to acquire lock: {}", e))
}

/// Read access to confirmed transactions
pub trait TransactionSource: Send + Sync {
    /// The account's own transactions dated `date`
    fn transactions_on(&self, account: AccountId, date: NaiveDate)
        -> ForecastResult<Vec<Transaction>>;

    /// Confirmed transfers from other accounts into `account` dated `date`
    fn incoming_transfers_on(
        &self,
        account: AccountId,
        date: NaiveDate,
    ) -> ForecastResult<Vec<Transaction>>;

    /// The account's own transactions dated within `[from, to]`
    fn transactions_in_range(
        &self,
        account: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ForecastResult<Vec<Transaction>>;
}

/// Read access to accounts and their balances
pub trait AccountSource: Send + Sync {
    fn account(&self, id: AccountId) -> ForecastResult<Option<Account>>;

    fn accounts_for_user(&self, user: UserId) -> ForecastResult<Vec<Account>>;

    /// Balance before today's activity; `None` when the account is unknown
    fn current_balance(&self, id: AccountId) -> ForecastResult<Option<Money>>;

    fn initial_balance(&self, id: AccountId) -> ForecastResult<Option<Money>>;
}

/// Read access to recurring patterns
pub trait PatternSource: Send + Sync {
    fn pattern(&self, id: PatternId) -> ForecastResult<Option<RecurringPattern>>;

    fn active_patterns_for_account(
        &self,
        account: AccountId,
    ) -> ForecastResult<Vec<RecurringPattern>>;

    fn active_patterns_for_user(&self, user: UserId) -> ForecastResult<Vec<RecurringPattern>>;
}

/// Everything the projection builder needs
pub trait LedgerSource: TransactionSource + AccountSource + PatternSource {}

impl<T: TransactionSource + AccountSource + PatternSource> LedgerSource for T {}

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: LedgerPaths,
    clock: Arc<dyn Clock>,
    pub accounts: AccountRepository,
    pub categories: CategoryRepository,
    pub transactions: TransactionRepository,
    pub patterns: PatternRepository,
}

impl Storage {
    pub fn new(paths: LedgerPaths, clock: Arc<dyn Clock>) -> ForecastResult<Self> {
        paths.ensure_directories()?;

        Ok(Self {
            accounts: AccountRepository::new(paths.accounts_file()),
            categories: CategoryRepository::new(paths.categories_file()),
            transactions: TransactionRepository::new(paths.transactions_file()),
            patterns: PatternRepository::new(paths.patterns_file()),
            paths,
            clock,
        })
    }

    /// Create storage and load everything from disk
    pub fn open(paths: LedgerPaths, clock: Arc<dyn Clock>) -> ForecastResult<Self> {
        let storage = Self::new(paths, clock)?;
        storage.load_all()?;
        Ok(storage)
    }

    pub fn paths(&self) -> &LedgerPaths {
        &self.paths
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn load_all(&self) -> ForecastResult<()> {
        self.accounts.load()?;
        self.categories.load()?;
        self.transactions.load()?;
        self.patterns.load()?;
        Ok(())
    }

    pub fn save_all(&self) -> ForecastResult<()> {
        self.accounts.save()?;
        self.categories.save()?;
        self.transactions.save()?;
        self.patterns.save()?;
        Ok(())
    }

    /// Initial balance plus all confirmed activity dated strictly before `date`
    pub fn balance_before(&self, id: AccountId, date: NaiveDate) -> ForecastResult<Option<Money>> {
        let Some(account) = self.accounts.get(id)? else {
            return Ok(None);
        };
        let until = date.add_days(-1);

        let own: Money = self
            .transactions
            .get_by_account_range(id, NaiveDate::MIN, until)?
            .iter()
            .map(Transaction::signed_amount)
            .sum();
        let incoming: Money = self
            .transactions
            .get_incoming_range(id, NaiveDate::MIN, until)?
            .iter()
            .map(|t| t.amount)
            .sum();

        Ok(Some(account.initial_balance + own + incoming))
    }

    /// Materialize every outstanding occurrence of every active pattern
    ///
    /// Each pattern is caught up under its own write lock: the generated
    /// transactions and the advanced pattern are stored together or not at
    /// all.
    pub fn materialize_due(&self, as_of: NaiveDate) -> ForecastResult<Vec<Transaction>> {
        let mut generated = Vec::new();

        for pattern in self.patterns.get_all()? {
            if !pattern.is_active {
                continue;
            }

            let created = self.patterns.update_with(pattern.id, |current| {
                let mut pending = Vec::new();
                loop {
                    match recurrence::materialize(current, as_of)? {
                        Materialized::Generated {
                            transaction,
                            pattern,
                        } => {
                            pending.push(transaction);
                            *current = pattern;
                        }
                        Materialized::Deactivated(pattern) => {
                            warn!(pattern = %pattern.id, "recurring pattern ended; deactivated");
                            *current = pattern;
                            break;
                        }
                        Materialized::NotDue => break,
                    }
                }
                for transaction in &pending {
                    transaction
                        .validate()
                        .map_err(|e| ForecastError::Validation(e.to_string()))?;
                }
                for transaction in &pending {
                    self.transactions.upsert(transaction.clone())?;
                }
                Ok(pending)
            })?;

            if !created.is_empty() {
                info!(
                    pattern = %pattern.id,
                    count = created.len(),
                    "materialized recurring transactions"
                );
            }
            generated.extend(created);
        }

        Ok(generated)
    }
}

impl TransactionSource for Storage {
    fn transactions_on(
        &self,
        account: AccountId,
        date: NaiveDate,
    ) -> ForecastResult<Vec<Transaction>> {
        self.transactions.get_by_account_range(account, date, date)
    }

    fn incoming_transfers_on(
        &self,
        account: AccountId,
        date: NaiveDate,
    ) -> ForecastResult<Vec<Transaction>> {
        self.transactions.get_incoming_range(account, date, date)
    }

    fn transactions_in_range(
        &self,
        account: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ForecastResult<Vec<Transaction>> {
        self.transactions.get_by_account_range(account, from, to)
    }
}

impl AccountSource for Storage {
    fn account(&self, id: AccountId) -> ForecastResult<Option<Account>> {
        self.accounts.get(id)
    }

    fn accounts_for_user(&self, user: UserId) -> ForecastResult<Vec<Account>> {
        self.accounts.get_by_user(user)
    }

    fn current_balance(&self, id: AccountId) -> ForecastResult<Option<Money>> {
        self.balance_before(id, self.today())
    }

    fn initial_balance(&self, id: AccountId) -> ForecastResult<Option<Money>> {
        Ok(self.accounts.get(id)?.map(|a| a.initial_balance))
    }
}

impl PatternSource for Storage {
    fn pattern(&self, id: PatternId) -> ForecastResult<Option<RecurringPattern>> {
        self.patterns.get(id)
    }

    fn active_patterns_for_account(
        &self,
        account: AccountId,
    ) -> ForecastResult<Vec<RecurringPattern>> {
        self.patterns.get_active_for(&[account])
    }

    fn active_patterns_for_user(&self, user: UserId) -> ForecastResult<Vec<RecurringPattern>> {
        let ids: Vec<_> = self
            .accounts
            .get_by_user(user)?
            .into_iter()
            .map(|a| a.id)
            .collect();
        self.patterns.get_active_for(&ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::{AccountType, Frequency, TransactionKind};
    use tempfile::TempDir;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn storage(today: NaiveDate) -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(dir.path().to_path_buf());
        let storage = Storage::new(paths, Arc::new(FixedClock::new(today))).unwrap();
        (dir, storage)
    }

    #[test]
    fn test_current_balance_excludes_today() {
        let (_dir, storage) = storage(d(3, 10));
        let user = UserId::new();
        let checking = Account::new(user, "Checking", AccountType::Checking)
            .with_initial_balance(Money::from_cents(100_000));
        let savings = Account::new(user, "Savings", AccountType::Savings);
        storage.accounts.upsert(checking.clone()).unwrap();
        storage.accounts.upsert(savings.clone()).unwrap();

        storage
            .transactions
            .upsert(Transaction::new(
                checking.id,
                TransactionKind::Expense,
                Money::from_cents(20_000),
                "Rent share",
                d(3, 1),
            ))
            .unwrap();
        storage
            .transactions
            .upsert(Transaction::transfer(
                checking.id,
                savings.id,
                Money::from_cents(10_000),
                "Save",
                d(3, 5),
            ))
            .unwrap();
        storage
            .transactions
            .upsert(Transaction::new(
                checking.id,
                TransactionKind::Income,
                Money::from_cents(50_000),
                "Paycheck",
                d(3, 10),
            ))
            .unwrap();

        assert_eq!(
            storage.current_balance(checking.id).unwrap(),
            Some(Money::from_cents(70_000))
        );
        assert_eq!(
            storage.current_balance(savings.id).unwrap(),
            Some(Money::from_cents(10_000))
        );
        assert_eq!(storage.current_balance(AccountId::new()).unwrap(), None);
        assert_eq!(storage.incoming_transfers_on(savings.id, d(3, 5)).unwrap().len(), 1);
    }

    #[test]
    fn test_materialize_due_catches_up() {
        let (_dir, storage) = storage(d(3, 31));
        let user = UserId::new();
        let account = Account::new(user, "Checking", AccountType::Checking);
        storage.accounts.upsert(account.clone()).unwrap();

        let gym = RecurringPattern::new(
            account.id,
            TransactionKind::Expense,
            Money::from_cents(4_000),
            "Gym",
            Frequency::Monthly,
            d(1, 15),
        )
        .with_end_date(d(3, 31));
        storage.patterns.upsert(gym.clone()).unwrap();

        let generated = storage.materialize_due(storage.today()).unwrap();
        let dates: Vec<_> = generated.iter().map(|t| t.date).collect();
        assert_eq!(dates, vec![d(1, 15), d(2, 15), d(3, 15)]);

        let stored = storage.pattern(gym.id).unwrap().unwrap();
        assert_eq!(stored.last_generated_date, Some(d(3, 15)));
        assert!(!stored.is_active);

        assert!(storage.materialize_due(storage.today()).unwrap().is_empty());
        assert_eq!(storage.transactions.count().unwrap(), 3);
    }

    #[test]
    fn test_materialize_due_skips_ended_pattern() {
        let (_dir, storage) = storage(d(4, 20));
        let user = UserId::new();
        let account = Account::new(user, "Checking", AccountType::Checking);
        storage.accounts.upsert(account.clone()).unwrap();

        let gym = RecurringPattern::new(
            account.id,
            TransactionKind::Expense,
            Money::from_cents(4_000),
            "Gym",
            Frequency::Monthly,
            d(1, 15),
        )
        .with_end_date(d(3, 31));
        storage.patterns.upsert(gym.clone()).unwrap();

        assert!(storage.materialize_due(storage.today()).unwrap().is_empty());
        assert_eq!(storage.transactions.count().unwrap(), 0);
        let stored = storage.pattern(gym.id).unwrap().unwrap();
        assert_eq!(stored.last_generated_date, None);
    }

    #[test]
    fn test_save_and_open() {
        let (dir, storage) = storage(d(1, 1));
        let user = UserId::new();
        storage
            .accounts
            .upsert(Account::new(user, "Cash", AccountType::Cash))
            .unwrap();
        storage.save_all().unwrap();

        let paths = LedgerPaths::with_base_dir(dir.path().to_path_buf());
        let reopened = Storage::open(paths, Arc::new(FixedClock::new(d(1, 1)))).unwrap();
        assert_eq!(reopened.accounts_for_user(user).unwrap().len(), 1);
    }
}
