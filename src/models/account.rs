//! Account model
//!
//! Accounts carry an opening balance; the current balance is derived by
//! storage from the account's confirmed history.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{AccountId, UserId};
use super::money::Money;

/// Type of financial account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    #[default]
    Checking,
    Savings,
    Credit,
    Cash,
    Investment,
    Other,
}

impl AccountType {
    /// Parse account type from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "checking" => Some(Self::Checking),
            "savings" => Some(Self::Savings),
            "credit" | "credit_card" | "creditcard" => Some(Self::Credit),
            "cash" => Some(Self::Cash),
            "investment" => Some(Self::Investment),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checking => write!(f, "Checking"),
            Self::Savings => write!(f, "Savings"),
            Self::Credit => write!(f, "Credit Card"),
            Self::Cash => write!(f, "Cash"),
            Self::Investment => write!(f, "Investment"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// A financial account owned by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,

    pub user_id: UserId,

    /// Display name, used in "Transfer from {name}" descriptions
    pub name: String,

    #[serde(rename = "type", default)]
    pub account_type: AccountType,

    /// Opening balance before any recorded transaction
    pub initial_balance: Money,

    /// Currency label for display only; amounts are never converted
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Account {
    pub fn new(user_id: UserId, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            id: AccountId::new(),
            user_id,
            name: name.into(),
            account_type,
            initial_balance: Money::zero(),
            currency: default_currency(),
        }
    }

    pub fn with_initial_balance(mut self, balance: Money) -> Self {
        self.initial_balance = balance;
        self
    }

    /// Validate the account
    pub fn validate(&self) -> Result<(), AccountValidationError> {
        if self.name.trim().is_empty() {
            return Err(AccountValidationError::EmptyName);
        }

        if self.name.len() > 100 {
            return Err(AccountValidationError::NameTooLong(self.name.len()));
        }

        Ok(())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.account_type)
    }
}

/// Validation errors for accounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountValidationError {
    EmptyName,
    NameTooLong(usize),
}

impl fmt::Display for AccountValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Account name cannot be empty"),
            Self::NameTooLong(len) => {
                write!(f, "Account name too long ({} chars, max 100)", len)
            }
        }
    }
}

impl std::error::Error for AccountValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account() {
        let user = UserId::new();
        let account = Account::new(user, "Checking", AccountType::Checking)
            .with_initial_balance(Money::from_cents(100_000));
        assert_eq!(account.user_id, user);
        assert_eq!(account.initial_balance.cents(), 100_000);
        assert_eq!(account.to_string(), "Checking (Checking)");
    }

    #[test]
    fn test_validation() {
        let mut account = Account::new(UserId::new(), "  ", AccountType::Cash);
        assert_eq!(account.validate(), Err(AccountValidationError::EmptyName));

        account.name = "x".repeat(101);
        assert!(matches!(
            account.validate(),
            Err(AccountValidationError::NameTooLong(101))
        ));
    }

    #[test]
    fn test_type_parse() {
        assert_eq!(AccountType::parse("credit_card"), Some(AccountType::Credit));
        assert_eq!(AccountType::parse("Savings"), Some(AccountType::Savings));
        assert_eq!(AccountType::parse("brokerage"), None);
    }
}
