//! Daily balance compositor
//!
//! Folds one day's confirmed transactions, incoming transfers and projected
//! occurrences into a [`DailyProjection`].

use chrono::NaiveDate;

use crate::models::{
    DailyProjection, LedgerEntry, Money, Occurrence, Transaction, TransactionKind, TransferIn,
};

/// Build the projection for a single account and day
///
/// `confirmed` holds the account's own transactions on `date`, `incoming`
/// the transfers other accounts sent it, and `projected` the occurrences of
/// its recurring patterns.
pub fn compose_day(
    date: NaiveDate,
    starting_balance: Money,
    confirmed: Vec<Transaction>,
    incoming: Vec<TransferIn>,
    projected: Vec<Occurrence>,
) -> DailyProjection {
    let mut income = Money::zero();
    let mut expenses = Money::zero();
    let mut transfers_in = Money::zero();

    let mut tally = |kind: TransactionKind, amount: Money| match kind {
        TransactionKind::Income => income += amount,
        TransactionKind::Expense | TransactionKind::Transfer => expenses += amount,
    };

    for t in &confirmed {
        tally(t.kind, t.amount);
    }
    for o in &projected {
        tally(o.kind, o.amount);
    }
    for t in &incoming {
        transfers_in += t.amount;
    }

    let net = income + transfers_in - expenses;
    let balance = starting_balance + net;

    let entries = confirmed
        .into_iter()
        .map(LedgerEntry::Confirmed)
        .chain(incoming.into_iter().map(LedgerEntry::TransferIn))
        .chain(projected.into_iter().map(LedgerEntry::Projected))
        .collect();

    DailyProjection {
        date,
        balance,
        income,
        expenses,
        transfers_in,
        net,
        is_negative: balance.is_negative(),
        entries,
    }
}
