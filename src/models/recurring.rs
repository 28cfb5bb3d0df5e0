//! Recurring pattern model
//!
//! A pattern is a template for transactions that repeat on a calendar
//! schedule. Expansion into dated occurrences lives in
//! `services::recurrence`; this module only holds the data and its
//! invariants.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{AccountId, CategoryId, PatternId};
use super::money::Money;
use super::transaction::TransactionKind;

/// How often a pattern repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    Daily,
    Weekly,
    BiWeekly,
    Monthly,
    Yearly,
    /// Unknown frequencies step by `interval` days
    #[serde(other)]
    Custom,
}

impl Frequency {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "bi-weekly" | "biweekly" | "fortnightly" => Some(Self::BiWeekly),
            "monthly" => Some(Self::Monthly),
            "yearly" | "annually" => Some(Self::Yearly),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::BiWeekly => write!(f, "bi-weekly"),
            Self::Monthly => write!(f, "monthly"),
            Self::Yearly => write!(f, "yearly"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// A template for a repeating transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringPattern {
    pub id: PatternId,

    pub account_id: AccountId,

    #[serde(rename = "type")]
    pub kind: TransactionKind,

    /// Positive magnitude
    pub amount: Money,

    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_to_account_id: Option<AccountId>,

    pub frequency: Frequency,

    #[serde(default = "default_interval")]
    pub frequency_interval: u32,

    pub start_date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    /// Date of the most recently materialized occurrence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_generated_date: Option<NaiveDate>,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_interval() -> u32 {
    1
}

fn default_active() -> bool {
    true
}

impl RecurringPattern {
    pub fn new(
        account_id: AccountId,
        kind: TransactionKind,
        amount: Money,
        description: impl Into<String>,
        frequency: Frequency,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: PatternId::new(),
            account_id,
            kind,
            amount,
            description: description.into(),
            category_id: None,
            transfer_to_account_id: None,
            frequency,
            frequency_interval: default_interval(),
            start_date,
            end_date: None,
            last_generated_date: None,
            is_active: true,
        }
    }

    pub fn with_interval(mut self, interval: u32) -> Self {
        self.frequency_interval = interval;
        self
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_transfer_to(mut self, account_id: AccountId) -> Self {
        self.transfer_to_account_id = Some(account_id);
        self
    }

    pub fn with_last_generated(mut self, date: NaiveDate) -> Self {
        self.last_generated_date = Some(date);
        self
    }

    /// Effective interval; zero is treated as one
    pub fn interval(&self) -> u32 {
        self.frequency_interval.max(1)
    }

    pub fn signed_amount(&self) -> Money {
        self.kind.sign(self.amount)
    }

    /// True when `date` is past the pattern's end date
    pub fn has_ended_by(&self, date: NaiveDate) -> bool {
        self.end_date.is_some_and(|end| date > end)
    }

    pub fn validate(&self) -> Result<(), PatternValidationError> {
        if !self.amount.is_positive() {
            return Err(PatternValidationError::NonPositiveAmount(self.amount));
        }

        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(PatternValidationError::EndBeforeStart {
                    start: self.start_date,
                    end,
                });
            }
        }

        if let Some(last) = self.last_generated_date {
            if last < self.start_date {
                return Err(PatternValidationError::GeneratedBeforeStart {
                    start: self.start_date,
                    last,
                });
            }
        }

        if self.kind == TransactionKind::Transfer {
            match self.transfer_to_account_id {
                None => return Err(PatternValidationError::MissingTransferDestination),
                Some(to) if to == self.account_id => {
                    return Err(PatternValidationError::SelfTransfer)
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

impl fmt::Display for RecurringPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let every = if self.interval() == 1 {
            self.frequency.to_string()
        } else {
            format!("{} x{}", self.frequency, self.interval())
        };
        write!(f, "{} {} ({})", self.description, self.signed_amount(), every)
    }
}

/// Validation errors for recurring patterns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternValidationError {
    NonPositiveAmount(Money),
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
    GeneratedBeforeStart { start: NaiveDate, last: NaiveDate },
    MissingTransferDestination,
    SelfTransfer,
}

impl fmt::Display for PatternValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveAmount(amount) => {
                write!(f, "pattern amount must be positive, got {}", amount)
            }
            Self::EndBeforeStart { start, end } => {
                write!(f, "end date {} is before start date {}", end, start)
            }
            Self::GeneratedBeforeStart { start, last } => write!(
                f,
                "last generated date {} is before start date {}",
                last, start
            ),
            Self::MissingTransferDestination => {
                write!(f, "transfer pattern must name a destination account")
            }
            Self::SelfTransfer => write!(f, "transfer pattern cannot target its own account"),
        }
    }
}

impl std::error::Error for PatternValidationError {}
