//! Projection output types
//!
//! A day's ledger mixes three sources: confirmed transactions on the account,
//! confirmed transfers arriving from other accounts, and virtual occurrences
//! expanded from recurring patterns. `LedgerEntry` keeps them distinguishable
//! while exposing one accessor set.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ids::{AccountId, CategoryId, PatternId, TransactionId};
use super::money::Money;
use super::transaction::{Transaction, TransactionKind};

/// Suffix appended to descriptions of projected occurrences
pub const RECURRING_SUFFIX: &str = " (Recurring)";

/// A virtual transaction produced by expanding a recurring pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub pattern_id: PatternId,
    pub account_id: AccountId,
    pub date: NaiveDate,
    pub kind: TransactionKind,
    /// Positive magnitude
    pub amount: Money,
    pub signed_amount: Money,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_to_account_id: Option<AccountId>,
    pub is_projected: bool,
}

/// A confirmed transfer arriving from another account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferIn {
    pub transaction_id: TransactionId,
    pub from_account_id: AccountId,
    pub date: NaiveDate,
    /// Positive magnitude
    pub amount: Money,
    /// "Transfer from {source account name}"
    pub description: String,
}

impl TransferIn {
    pub fn from_transaction(transaction: &Transaction, source_name: &str) -> Self {
        Self {
            transaction_id: transaction.id,
            from_account_id: transaction.account_id,
            date: transaction.date,
            amount: transaction.amount,
            description: format!("Transfer from {}", source_name),
        }
    }
}

/// One line of a projected day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum LedgerEntry {
    Confirmed(Transaction),
    TransferIn(TransferIn),
    Projected(Occurrence),
}

impl LedgerEntry {
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Confirmed(t) => t.date,
            Self::TransferIn(t) => t.date,
            Self::Projected(o) => o.date,
        }
    }

    pub fn kind(&self) -> TransactionKind {
        match self {
            Self::Confirmed(t) => t.kind,
            Self::TransferIn(_) => TransactionKind::Transfer,
            Self::Projected(o) => o.kind,
        }
    }

    /// Positive magnitude
    pub fn amount(&self) -> Money {
        match self {
            Self::Confirmed(t) => t.amount,
            Self::TransferIn(t) => t.amount,
            Self::Projected(o) => o.amount,
        }
    }

    /// Effect on the account balance
    pub fn signed_amount(&self) -> Money {
        match self {
            Self::Confirmed(t) => t.signed_amount(),
            Self::TransferIn(t) => t.amount,
            Self::Projected(o) => o.signed_amount,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Confirmed(t) => &t.description,
            Self::TransferIn(t) => &t.description,
            Self::Projected(o) => &o.description,
        }
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        match self {
            Self::Confirmed(t) => t.category_id,
            Self::TransferIn(_) => None,
            Self::Projected(o) => o.category_id,
        }
    }

    pub fn is_projected(&self) -> bool {
        matches!(self, Self::Projected(_))
    }
}

/// Balance and activity for one account on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyProjection {
    pub date: NaiveDate,
    pub balance: Money,
    pub income: Money,
    pub expenses: Money,
    pub transfers_in: Money,
    pub net: Money,
    pub is_negative: bool,
    pub entries: Vec<LedgerEntry>,
}

/// One account's slice of a month summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountMonthSummary {
    pub account_id: AccountId,
    pub name: String,
    /// Projected balance on the last day of the month
    pub balance: Money,
    pub income: Money,
    pub expenses: Money,
}

/// Aggregated projection for a calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthSummary {
    /// First day of the month
    pub month: NaiveDate,
    /// e.g. "March 2025"
    pub label: String,
    pub accounts: Vec<AccountMonthSummary>,
    pub total_balance: Money,
    pub total_income: Money,
    pub total_expenses: Money,
}

impl MonthSummary {
    /// "YYYY-MM" key for the month
    pub fn key(&self) -> String {
        self.month.format("%Y-%m").to_string()
    }
}
