//! Projection builder
//!
//! Walks an account forward one day at a time from the clock's "today",
//! folding confirmed activity and recurring occurrences into a running
//! balance. Accounts are projected independently; only confirmed transfers
//! cross account boundaries.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{ForecastError, ForecastResult};
use crate::models::{
    Account, AccountId, AccountMonthSummary, CalendarDate, DailyProjection, LedgerEntry, Money,
    MonthSummary, Occurrence, TransferIn, UserId,
};
use crate::services::{compositor, recurrence};
use crate::storage::LedgerSource;

/// Shared flag checked between projected days
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> ForecastResult<()> {
        if self.is_cancelled() {
            Err(ForecastError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Service for balance projections
pub struct ProjectionService<'a, S: LedgerSource + ?Sized> {
    source: &'a S,
    clock: &'a dyn Clock,
    cancel: CancellationToken,
}

impl<'a, S: LedgerSource + ?Sized> ProjectionService<'a, S> {
    pub fn new(source: &'a S, clock: &'a dyn Clock) -> Self {
        Self {
            source,
            clock,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn load_account(&self, id: AccountId) -> ForecastResult<Account> {
        self.source
            .account(id)?
            .ok_or_else(|| ForecastError::DataUnavailable(format!("account {} not found", id)))
    }

    /// Day-by-day balances from today through `end_date` inclusive
    ///
    /// Returns an empty series when `end_date` is before today.
    pub fn project_account(
        &self,
        account_id: AccountId,
        end_date: NaiveDate,
    ) -> ForecastResult<Vec<DailyProjection>> {
        let today = self.today();
        if end_date < today {
            return Ok(Vec::new());
        }

        self.load_account(account_id)?;
        let mut balance = self
            .source
            .current_balance(account_id)?
            .ok_or_else(|| ForecastError::balance_unavailable(account_id))?;

        let mut projected: BTreeMap<NaiveDate, Vec<Occurrence>> = BTreeMap::new();
        for pattern in self.source.active_patterns_for_account(account_id)? {
            for occurrence in recurrence::expand(&pattern, today, end_date)? {
                projected.entry(occurrence.date).or_default().push(occurrence);
            }
        }

        let mut names: HashMap<AccountId, String> = HashMap::new();
        let mut series = Vec::with_capacity(today.diff_in_days(end_date) as usize + 1);

        for date in today.iter_days().take_while(|d| *d <= end_date) {
            self.cancel.check()?;

            let confirmed = self.source.transactions_on(account_id, date)?;
            let mut incoming = Vec::new();
            for transfer in self.source.incoming_transfers_on(account_id, date)? {
                let name = self.account_name(&mut names, transfer.account_id)?;
                incoming.push(TransferIn::from_transaction(&transfer, &name));
            }
            let occurrences = projected.remove(&date).unwrap_or_default();

            let day = compositor::compose_day(date, balance, confirmed, incoming, occurrences);
            balance = day.balance;
            series.push(day);
        }

        debug!(
            account = %account_id,
            days = series.len(),
            closing = %balance,
            "projected account"
        );
        Ok(series)
    }

    fn account_name(
        &self,
        cache: &mut HashMap<AccountId, String>,
        id: AccountId,
    ) -> ForecastResult<String> {
        if let Some(name) = cache.get(&id) {
            return Ok(name.clone());
        }
        let name = self
            .source
            .account(id)?
            .map(|a| a.name)
            .unwrap_or_else(|| id.to_string());
        cache.insert(id, name.clone());
        Ok(name)
    }

    /// Independent projections for several accounts, computed in parallel
    pub fn project_multi_account(
        &self,
        accounts: &[AccountId],
        end_date: NaiveDate,
    ) -> ForecastResult<BTreeMap<AccountId, Vec<DailyProjection>>> {
        accounts
            .par_iter()
            .map(|&id| self.project_account(id, end_date).map(|series| (id, series)))
            .collect()
    }

    /// Projections for every account the user owns
    pub fn project_all_accounts(
        &self,
        user: UserId,
        end_date: NaiveDate,
    ) -> ForecastResult<BTreeMap<AccountId, Vec<DailyProjection>>> {
        let ids: Vec<_> = self
            .source
            .accounts_for_user(user)?
            .into_iter()
            .map(|a| a.id)
            .collect();
        self.project_multi_account(&ids, end_date)
    }

    /// Dates on which the projected balance is below zero
    pub fn find_negative_balance_dates(
        &self,
        account_id: AccountId,
        end_date: NaiveDate,
    ) -> ForecastResult<Vec<NaiveDate>> {
        Ok(self
            .project_account(account_id, end_date)?
            .into_iter()
            .filter(|day| day.is_negative)
            .map(|day| day.date)
            .collect())
    }

    /// Month-by-month summaries starting with the current month
    ///
    /// Each month is projected from today's real balance rather than from
    /// the previous month's result. Income and expenses count only days that
    /// fall inside the month.
    pub fn monthly_rollup(
        &self,
        user: UserId,
        months_ahead: u32,
    ) -> ForecastResult<Vec<MonthSummary>> {
        let first = self.today().start_of_month();
        let accounts = self.source.accounts_for_user(user)?;

        let months: Vec<MonthSummary> = (0..months_ahead as i64)
            .into_par_iter()
            .map(|offset| self.month_summary(&accounts, first.add_months(offset)))
            .collect::<ForecastResult<_>>()?;

        info!(user = %user, months = months.len(), "built monthly rollup");
        Ok(months)
    }

    fn month_summary(&self, accounts: &[Account], month: NaiveDate) -> ForecastResult<MonthSummary> {
        let month_end = month.end_of_month();
        let mut summaries = Vec::with_capacity(accounts.len());

        for account in accounts {
            let series = self.project_account(account.id, month_end)?;
            let balance = match series.last() {
                Some(day) => day.balance,
                None => self
                    .source
                    .current_balance(account.id)?
                    .ok_or_else(|| ForecastError::balance_unavailable(account.id))?,
            };
            let (income, expenses) = series
                .iter()
                .filter(|day| day.date >= month)
                .fold((Money::zero(), Money::zero()), |(i, e), day| {
                    (i + day.income, e + day.expenses)
                });

            summaries.push(AccountMonthSummary {
                account_id: account.id,
                name: account.name.clone(),
                balance,
                income,
                expenses,
            });
        }

        Ok(MonthSummary {
            month,
            label: month.format("%B %Y").to_string(),
            total_balance: summaries.iter().map(|s| s.balance).sum(),
            total_income: summaries.iter().map(|s| s.income).sum(),
            total_expenses: summaries.iter().map(|s| s.expenses).sum(),
            accounts: summaries,
        })
    }

    /// Confirmed future-dated transactions and recurring occurrences
    ///
    /// Confirmed entries are taken after today; occurrences from today on.
    /// Both run through `today + days` and are returned in date order.
    pub fn upcoming_transactions(&self, user: UserId, days: u32) -> ForecastResult<Vec<LedgerEntry>> {
        let today = self.today();
        let end = today.add_days(days as i64);
        let mut entries = Vec::new();

        for account in self.source.accounts_for_user(user)? {
            if end > today {
                for t in self
                    .source
                    .transactions_in_range(account.id, today.add_days(1), end)?
                {
                    entries.push(LedgerEntry::Confirmed(t));
                }
            }
        }

        for pattern in self.source.active_patterns_for_user(user)? {
            for occurrence in recurrence::expand(&pattern, today, end)? {
                entries.push(LedgerEntry::Projected(occurrence));
            }
        }

        entries.sort_by(|a, b| a.date().cmp(&b.date()));
        Ok(entries)
    }

    /// Sum of the user's current balances
    pub fn total_current_balance(&self, user: UserId) -> ForecastResult<Money> {
        let mut total = Money::zero();
        for account in self.source.accounts_for_user(user)? {
            total += self
                .source
                .current_balance(account.id)?
                .ok_or_else(|| ForecastError::balance_unavailable(account.id))?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::LedgerPaths;
    use crate::models::{AccountType, Frequency, RecurringPattern, Transaction, TransactionKind};
    use crate::storage::Storage;
    use tempfile::TempDir;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    struct Fixture {
        _dir: TempDir,
        storage: Storage,
        clock: FixedClock,
        user: UserId,
        checking: Account,
        savings: Account,
    }

    fn fixture(today: NaiveDate) -> Fixture {
        let dir = TempDir::new().unwrap();
        let clock = FixedClock::new(today);
        let storage = Storage::new(
            LedgerPaths::with_base_dir(dir.path().to_path_buf()),
            Arc::new(clock),
        )
        .unwrap();
        let user = UserId::new();
        let checking = Account::new(user, "Checking", AccountType::Checking)
            .with_initial_balance(Money::from_cents(100_000));
        let savings = Account::new(user, "Savings", AccountType::Savings);
        storage.accounts.upsert(checking.clone()).unwrap();
        storage.accounts.upsert(savings.clone()).unwrap();
        Fixture {
            _dir: dir,
            storage,
            clock,
            user,
            checking,
            savings,
        }
    }

    #[test]
    fn test_negative_from_day_five() {
        let f = fixture(d(3, 1));
        f.storage
            .transactions
            .upsert(Transaction::new(
                f.checking.id,
                TransactionKind::Expense,
                Money::from_cents(120_000),
                "Laptop",
                d(3, 5),
            ))
            .unwrap();

        let service = ProjectionService::new(&f.storage, &f.clock);
        let series = service.project_account(f.checking.id, d(3, 10)).unwrap();
        assert_eq!(series.len(), 10);
        assert!(!series[3].is_negative);
        assert!(series[4].is_negative);
        assert_eq!(series[4].balance.cents(), -20_000);

        let negatives = service
            .find_negative_balance_dates(f.checking.id, d(3, 10))
            .unwrap();
        assert_eq!(negatives, (5..=10).map(|day| d(3, day)).collect::<Vec<_>>());
    }

    #[test]
    fn test_balance_recurrence_holds() {
        let f = fixture(d(3, 1));
        let salary = RecurringPattern::new(
            f.checking.id,
            TransactionKind::Income,
            Money::from_cents(250_000),
            "Salary",
            Frequency::BiWeekly,
            d(2, 21),
        );
        f.storage.patterns.upsert(salary).unwrap();

        let service = ProjectionService::new(&f.storage, &f.clock);
        let series = service.project_account(f.checking.id, d(4, 30)).unwrap();

        let mut previous = Money::from_cents(100_000);
        for day in &series {
            assert_eq!(day.balance, previous + day.net);
            previous = day.balance;
        }
        let paydays: Vec<_> = series
            .iter()
            .filter(|day| !day.income.is_zero())
            .map(|day| day.date)
            .collect();
        assert_eq!(paydays, vec![d(3, 7), d(3, 21), d(4, 4), d(4, 18)]);
    }

    #[test]
    fn test_end_before_today_is_empty() {
        let f = fixture(d(3, 10));
        let service = ProjectionService::new(&f.storage, &f.clock);
        assert!(service.project_account(f.checking.id, d(3, 9)).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_account_is_data_unavailable() {
        let f = fixture(d(3, 10));
        let service = ProjectionService::new(&f.storage, &f.clock);
        let err = service.project_account(AccountId::new(), d(3, 20)).unwrap_err();
        assert!(matches!(err, ForecastError::DataUnavailable(_)));
    }

    #[test]
    fn test_confirmed_transfer_reaches_destination() {
        let f = fixture(d(3, 1));
        f.storage
            .transactions
            .upsert(Transaction::transfer(
                f.checking.id,
                f.savings.id,
                Money::from_cents(30_000),
                "Move",
                d(3, 2),
            ))
            .unwrap();
        let projected_transfer = RecurringPattern::new(
            f.checking.id,
            TransactionKind::Transfer,
            Money::from_cents(5_000),
            "Auto save",
            Frequency::Weekly,
            d(2, 26),
        )
        .with_transfer_to(f.savings.id);
        f.storage.patterns.upsert(projected_transfer).unwrap();

        let service = ProjectionService::new(&f.storage, &f.clock);
        let all = service.project_all_accounts(f.user, d(3, 7)).unwrap();
        let savings = &all[&f.savings.id];
        let checking = &all[&f.checking.id];

        assert_eq!(savings[1].transfers_in.cents(), 30_000);
        assert_eq!(savings[1].entries[0].description(), "Transfer from Checking");
        assert_eq!(savings.last().unwrap().balance.cents(), 30_000);
        assert_eq!(checking[4].expenses.cents(), 5_000);
    }

    #[test]
    fn test_monthly_rollup() {
        let f = fixture(d(3, 15));
        let rent = RecurringPattern::new(
            f.checking.id,
            TransactionKind::Expense,
            Money::from_cents(40_000),
            "Rent",
            Frequency::Monthly,
            d(3, 1),
        );
        f.storage.patterns.upsert(rent).unwrap();

        let service = ProjectionService::new(&f.storage, &f.clock);
        let months = service.monthly_rollup(f.user, 3).unwrap();

        let labels: Vec<_> = months.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["March 2025", "April 2025", "May 2025"]);
        assert_eq!(months[1].key(), "2025-04");

        assert!(months[0].total_expenses.is_zero());
        assert_eq!(months[1].total_expenses.cents(), 40_000);
        assert_eq!(months[1].total_balance.cents(), 60_000);
        assert_eq!(months[2].total_balance.cents(), 20_000);
        assert_eq!(months[2].accounts.len(), 2);
    }

    #[test]
    fn test_upcoming_sorted() {
        let f = fixture(d(3, 1));
        f.storage
            .transactions
            .upsert(Transaction::new(
                f.savings.id,
                TransactionKind::Income,
                Money::from_cents(1_000),
                "Interest",
                d(3, 9),
            ))
            .unwrap();
        let phone = RecurringPattern::new(
            f.checking.id,
            TransactionKind::Expense,
            Money::from_cents(6_000),
            "Phone",
            Frequency::Weekly,
            d(2, 27),
        );
        f.storage.patterns.upsert(phone).unwrap();

        let service = ProjectionService::new(&f.storage, &f.clock);
        let upcoming = service.upcoming_transactions(f.user, 10).unwrap();
        let summary: Vec<_> = upcoming
            .iter()
            .map(|e| (e.date(), e.description().to_string()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (d(3, 6), "Phone (Recurring)".to_string()),
                (d(3, 9), "Interest".to_string()),
            ]
        );
    }

    #[test]
    fn test_cancelled_run_returns_error() {
        let f = fixture(d(3, 1));
        let token = CancellationToken::new();
        token.cancel();
        let service = ProjectionService::new(&f.storage, &f.clock).with_cancellation(token);
        let err = service.project_account(f.checking.id, d(12, 31)).unwrap_err();
        assert!(err.is_cancelled());
    }
}
