//! End-to-end forecasting scenarios against JSON storage

use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use forecast_ledger::clock::FixedClock;
use forecast_ledger::config::LedgerPaths;
use forecast_ledger::models::{
    Account, AccountType, Frequency, Money, RecurringPattern, Transaction, TransactionKind, UserId,
};
use forecast_ledger::services::import::{
    parse_csv, DuplicateResolution, ImportStatus, ResolutionAction,
};
use forecast_ledger::services::{duplicate, recurrence};
use forecast_ledger::services::{ImportService, ProjectionService, RuleCache};
use forecast_ledger::storage::Storage;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

struct Ledger {
    _dir: TempDir,
    storage: Storage,
    clock: FixedClock,
    user: UserId,
    checking: Account,
}

fn ledger(today: NaiveDate, opening_cents: i64) -> Ledger {
    let dir = TempDir::new().unwrap();
    let clock = FixedClock::new(today);
    let storage = Storage::open(
        LedgerPaths::with_base_dir(dir.path().to_path_buf()),
        Arc::new(clock),
    )
    .unwrap();
    let user = UserId::new();
    let checking = Account::new(user, "Checking", AccountType::Checking)
        .with_initial_balance(Money::from_cents(opening_cents));
    storage.accounts.upsert(checking.clone()).unwrap();

    Ledger {
        _dir: dir,
        storage,
        clock,
        user,
        checking,
    }
}

fn monthly(account: &Account, cents: i64, description: &str, start: NaiveDate) -> RecurringPattern {
    RecurringPattern::new(
        account.id,
        TransactionKind::Expense,
        Money::from_cents(cents),
        description,
        Frequency::Monthly,
        start,
    )
}

#[test]
fn month_end_anchor_clamps_to_february() {
    let l = ledger(d(2025, 3, 1), 100_000);
    let pattern = monthly(&l.checking, 1_299, "Netflix", d(2025, 1, 31));
    assert_eq!(recurrence::pending_date(&pattern).unwrap(), d(2025, 1, 31));
    assert_eq!(recurrence::next_due_date(&pattern).unwrap(), d(2025, 2, 28));

    l.storage.patterns.upsert(pattern).unwrap();
    let generated = l.storage.materialize_due(d(2025, 3, 1)).unwrap();
    let dates: Vec<_> = generated.iter().map(|t| t.date).collect();
    assert_eq!(dates, vec![d(2025, 1, 31), d(2025, 2, 28)]);
}

#[test]
fn rent_starting_next_month_is_projected_on_its_start_date() {
    let l = ledger(d(2025, 3, 15), 100_000);
    l.storage
        .patterns
        .upsert(monthly(&l.checking, 120_000, "Rent", d(2025, 4, 1)))
        .unwrap();

    let service = ProjectionService::new(&l.storage, &l.clock);
    let series = service.project_account(l.checking.id, d(2025, 5, 31)).unwrap();
    let rent_days: Vec<_> = series
        .iter()
        .filter(|day| !day.expenses.is_zero())
        .map(|day| day.date)
        .collect();
    assert_eq!(rent_days, vec![d(2025, 4, 1), d(2025, 5, 1)]);

    let negatives = service
        .find_negative_balance_dates(l.checking.id, d(2025, 4, 30))
        .unwrap();
    assert_eq!(negatives.first(), Some(&d(2025, 4, 1)));
    assert_eq!(negatives.len(), 30);
}

#[test]
fn rent_on_day_five_turns_balance_negative() {
    let l = ledger(d(2025, 1, 1), 100_000);
    l.storage
        .patterns
        .upsert(monthly(&l.checking, 120_000, "Rent", d(2024, 12, 5)))
        .unwrap();

    let service = ProjectionService::new(&l.storage, &l.clock);
    let negatives = service
        .find_negative_balance_dates(l.checking.id, d(2025, 1, 31))
        .unwrap();

    assert_eq!(negatives.first(), Some(&d(2025, 1, 5)));
    assert_eq!(negatives.len(), 27);

    let series = service.project_account(l.checking.id, d(2025, 1, 31)).unwrap();
    assert_eq!(series[4].date, d(2025, 1, 5));
    assert_eq!(series[4].balance.cents(), -20_000);
    assert!(series[4].entries.iter().all(|e| e.is_projected()));
}

#[test]
fn biweekly_grid_from_anchor() {
    let l = ledger(d(2025, 1, 1), 0);
    let mut salary = monthly(&l.checking, 250_000, "Salary", d(2025, 1, 6));
    salary.kind = TransactionKind::Income;
    salary.frequency = Frequency::BiWeekly;

    let grid: Vec<_> = recurrence::schedule(&salary).take(3).collect();
    assert_eq!(grid, vec![d(2025, 1, 6), d(2025, 1, 20), d(2025, 2, 3)]);

    let occurrences = recurrence::expand(&salary, d(2025, 1, 1), d(2025, 2, 10)).unwrap();
    let dates: Vec<_> = occurrences.iter().map(|o| o.date).collect();
    assert_eq!(dates, grid);
}

#[test]
fn generated_transactions_are_not_projected_twice() {
    let l = ledger(d(2025, 1, 20), 100_000);
    l.storage
        .patterns
        .upsert(monthly(&l.checking, 5_000, "Gym", d(2024, 12, 15)))
        .unwrap();

    let generated = l.storage.materialize_due(d(2025, 1, 20)).unwrap();
    let dates: Vec<_> = generated.iter().map(|t| t.date).collect();
    assert_eq!(dates, vec![d(2024, 12, 15), d(2025, 1, 15)]);

    let service = ProjectionService::new(&l.storage, &l.clock);
    let series = service.project_account(l.checking.id, d(2025, 2, 20)).unwrap();

    let gym_days: Vec<_> = series
        .iter()
        .filter(|day| !day.expenses.is_zero())
        .map(|day| day.date)
        .collect();
    assert_eq!(gym_days, vec![d(2025, 2, 15)]);
    assert_eq!(series[0].balance.cents(), 90_000);
    assert_eq!(series.last().unwrap().balance.cents(), 85_000);
}

#[test]
fn starbucks_row_is_flagged_then_resolved() {
    let l = ledger(d(2025, 3, 20), 100_000);
    l.storage
        .transactions
        .upsert(Transaction::new(
            l.checking.id,
            TransactionKind::Expense,
            Money::from_cents(450),
            "STARBUCKS COFFEE #123",
            d(2025, 3, 14),
        ))
        .unwrap();

    let csv_data = "Date,Description,Amount\n2025-03-15,Starbucks Coffee,-4.50\n2025-03-16,Netflix.com,-12.99\n";
    let parsed = parse_csv(csv_data.as_bytes(), None).unwrap();

    let rules = RuleCache::new();
    let service = ImportService::new(&l.storage, &rules);
    let preview = service.preview(l.checking.id, &parsed).unwrap();

    assert_eq!(preview.new_count(), 1);
    assert_eq!(preview.duplicate_count(), 1);
    let ImportStatus::Duplicate(candidate) = &preview.entries[0].status else {
        panic!("first row should be a duplicate");
    };
    let expected = (0.5 + 1.0 + 32.0 / 37.0) / 3.0;
    assert!((candidate.confidence - expected).abs() < 1e-9);
    assert_eq!(candidate.matches[0].description, "STARBUCKS COFFEE #123");

    let result = service.import_preview(&preview).unwrap();
    assert_eq!(result.imported, 1);
    assert_eq!(result.duplicates_skipped, 1);

    let kept = service
        .resolve_duplicates(
            &preview,
            &[DuplicateResolution {
                row_number: 1,
                action: ResolutionAction::Import,
                category_id: None,
            }],
        )
        .unwrap();
    assert_eq!(kept, 1);
    assert_eq!(l.storage.transactions.count().unwrap(), 3);
}

#[test]
fn store_number_row_scores_below_duplicate_threshold() {
    let l = ledger(d(2025, 3, 10), 100_000);
    l.storage
        .transactions
        .upsert(Transaction::new(
            l.checking.id,
            TransactionKind::Expense,
            Money::from_cents(4_999),
            "Starbucks Coffee",
            d(2025, 3, 2),
        ))
        .unwrap();

    let csv_data = "Date,Description,Amount
2025-03-01,STARBUCKS #123,-49.99
";
    let parsed = parse_csv(csv_data.as_bytes(), None).unwrap();
    let rules = RuleCache::new();
    let service = ImportService::new(&l.storage, &rules);
    let preview = service.preview(l.checking.id, &parsed).unwrap();

    assert_eq!(preview.duplicate_count(), 0);
    assert_eq!(preview.new_count(), 1);

    let existing = l.storage.transactions.get_all().unwrap();
    let confidence = duplicate::duplicate_confidence(&existing[0], &parsed.rows[0]);
    let expected = (0.5 + 1.0 + 2.0 / 3.0) / 3.0;
    assert!((confidence - expected).abs() < 1e-9);
}

#[test]
fn rollup_totals_follow_projection() {
    let l = ledger(d(2025, 3, 15), 100_000);
    l.storage
        .patterns
        .upsert(monthly(&l.checking, 40_000, "Rent", d(2025, 3, 1)))
        .unwrap();

    let service = ProjectionService::new(&l.storage, &l.clock);
    let months = service.monthly_rollup(l.user, 2).unwrap();
    let april = service.project_account(l.checking.id, d(2025, 4, 30)).unwrap();

    assert_eq!(months.len(), 2);
    assert_eq!(months[1].total_balance, april.last().unwrap().balance);
    assert_eq!(months[1].total_expenses.cents(), 40_000);
}
