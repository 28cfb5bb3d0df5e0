//! Transaction model
//!
//! Amounts are stored as positive magnitudes; the sign comes from the
//! transaction kind (income adds, expense and transfer-out subtract).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{AccountId, CategoryId, PatternId, TransactionId};
use super::money::Money;

/// Direction of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl TransactionKind {
    /// Apply the kind's sign to a positive amount
    pub fn sign(&self, amount: Money) -> Money {
        match self {
            Self::Income => amount,
            Self::Expense | Self::Transfer => -amount,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            "transfer" => Some(Self::Transfer),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "income"),
            Self::Expense => write!(f, "expense"),
            Self::Transfer => write!(f, "transfer"),
        }
    }
}

/// A confirmed (recorded) transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,

    pub account_id: AccountId,

    #[serde(rename = "type")]
    pub kind: TransactionKind,

    /// Positive magnitude
    pub amount: Money,

    #[serde(default)]
    pub description: String,

    pub date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,

    /// Destination account for transfers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_to_account_id: Option<AccountId>,

    /// Pattern this transaction was generated from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_pattern_id: Option<PatternId>,

    /// Content hash of the CSV row this transaction was imported from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_hash: Option<String>,

    #[serde(default)]
    pub reconciled: bool,
}

impl Transaction {
    pub fn new(
        account_id: AccountId,
        kind: TransactionKind,
        amount: Money,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            account_id,
            kind,
            amount,
            description: description.into(),
            date,
            category_id: None,
            transfer_to_account_id: None,
            recurring_pattern_id: None,
            import_hash: None,
            reconciled: false,
        }
    }

    /// Create a transfer out of `from` into `to`
    pub fn transfer(
        from: AccountId,
        to: AccountId,
        amount: Money,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self::new(from, TransactionKind::Transfer, amount, description, date).with_transfer_to(to)
    }

    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_transfer_to(mut self, account_id: AccountId) -> Self {
        self.transfer_to_account_id = Some(account_id);
        self
    }

    pub fn with_pattern(mut self, pattern_id: PatternId) -> Self {
        self.recurring_pattern_id = Some(pattern_id);
        self
    }

    pub fn with_import_hash(mut self, hash: impl Into<String>) -> Self {
        self.import_hash = Some(hash.into());
        self
    }

    /// Amount with the kind's sign applied
    pub fn signed_amount(&self) -> Money {
        self.kind.sign(self.amount)
    }

    pub fn is_transfer(&self) -> bool {
        self.kind == TransactionKind::Transfer
    }

    pub fn is_uncategorized(&self) -> bool {
        self.category_id.is_none() && !self.is_transfer()
    }

    /// Validate the transaction
    pub fn validate(&self) -> Result<(), TransactionValidationError> {
        if !self.amount.is_positive() {
            return Err(TransactionValidationError::NonPositiveAmount(self.amount));
        }

        match (self.kind, self.transfer_to_account_id) {
            (TransactionKind::Transfer, None) => {
                Err(TransactionValidationError::MissingTransferDestination)
            }
            (TransactionKind::Transfer, Some(to)) if to == self.account_id => {
                Err(TransactionValidationError::SelfTransfer)
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.date.format("%Y-%m-%d"),
            self.description,
            self.signed_amount()
        )
    }
}

/// Validation errors for transactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionValidationError {
    NonPositiveAmount(Money),
    MissingTransferDestination,
    SelfTransfer,
}

impl fmt::Display for TransactionValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveAmount(amount) => {
                write!(f, "Transaction amount must be positive, got {}", amount)
            }
            Self::MissingTransferDestination => {
                write!(f, "Transfer must name a destination account")
            }
            Self::SelfTransfer => write!(f, "Cannot transfer to the same account"),
        }
    }
}

impl std::error::Error for TransactionValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn test_signed_amount() {
        let account = AccountId::new();
        let income = Transaction::new(
            account,
            TransactionKind::Income,
            Money::from_cents(5000),
            "Salary",
            date(),
        );
        let expense = Transaction::new(
            account,
            TransactionKind::Expense,
            Money::from_cents(1200),
            "Groceries",
            date(),
        );
        let transfer = Transaction::transfer(
            account,
            AccountId::new(),
            Money::from_cents(300),
            "Savings",
            date(),
        );

        assert_eq!(income.signed_amount().cents(), 5000);
        assert_eq!(expense.signed_amount().cents(), -1200);
        assert_eq!(transfer.signed_amount().cents(), -300);
    }

    #[test]
    fn test_validation() {
        let account = AccountId::new();
        let zero = Transaction::new(
            account,
            TransactionKind::Expense,
            Money::zero(),
            "Nothing",
            date(),
        );
        assert!(matches!(
            zero.validate(),
            Err(TransactionValidationError::NonPositiveAmount(_))
        ));

        let dangling = Transaction::new(
            account,
            TransactionKind::Transfer,
            Money::from_cents(100),
            "Move",
            date(),
        );
        assert_eq!(
            dangling.validate(),
            Err(TransactionValidationError::MissingTransferDestination)
        );

        let looped = dangling.clone().with_transfer_to(account);
        assert_eq!(
            looped.validate(),
            Err(TransactionValidationError::SelfTransfer)
        );
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&TransactionKind::Transfer).unwrap();
        assert_eq!(json, "\"transfer\"");
        assert_eq!(TransactionKind::parse("Income"), Some(TransactionKind::Income));
    }
}
