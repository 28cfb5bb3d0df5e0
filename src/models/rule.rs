//! Category rule model
//!
//! Rules map a description or amount predicate to a category. Lower
//! priority values are evaluated first.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{CategoryId, RuleId};

/// The transaction field a rule inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleField {
    Description,
    Amount,
}

impl RuleField {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "description" | "desc" => Some(Self::Description),
            "amount" => Some(Self::Amount),
            _ => None,
        }
    }
}

impl fmt::Display for RuleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Description => write!(f, "description"),
            Self::Amount => write!(f, "amount"),
        }
    }
}

/// Comparison applied between the field and the rule value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
    Contains,
    Equals,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
}

impl RuleOperator {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "contains" => Some(Self::Contains),
            "equals" | "eq" => Some(Self::Equals),
            "starts_with" => Some(Self::StartsWith),
            "ends_with" => Some(Self::EndsWith),
            "greater_than" | "gt" => Some(Self::GreaterThan),
            "less_than" | "lt" => Some(Self::LessThan),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::GreaterThan | Self::LessThan)
    }
}

impl fmt::Display for RuleOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contains => write!(f, "contains"),
            Self::Equals => write!(f, "equals"),
            Self::StartsWith => write!(f, "starts_with"),
            Self::EndsWith => write!(f, "ends_with"),
            Self::GreaterThan => write!(f, "greater_than"),
            Self::LessThan => write!(f, "less_than"),
        }
    }
}

/// A categorization rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub id: RuleId,
    pub category_id: CategoryId,
    pub field: RuleField,
    pub operator: RuleOperator,
    pub value: String,
    #[serde(default)]
    pub priority: i32,
}

impl CategoryRule {
    pub fn new(
        category_id: CategoryId,
        field: RuleField,
        operator: RuleOperator,
        value: impl Into<String>,
        priority: i32,
    ) -> Self {
        Self {
            id: RuleId::new(),
            category_id,
            field,
            operator,
            value: value.into(),
            priority,
        }
    }

    /// True when both rules express the same predicate for the same category
    pub fn same_predicate(&self, other: &CategoryRule) -> bool {
        self.category_id == other.category_id
            && self.field == other.field
            && self.operator == other.operator
            && self.value.eq_ignore_ascii_case(&other.value)
    }
}

impl fmt::Display for CategoryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} '{}' (priority {})",
            self.field, self.operator, self.value, self.priority
        )
    }
}
