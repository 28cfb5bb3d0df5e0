//! Display formatting for terminal output
//!
//! Provides utilities for formatting ledger data, projections and import
//! previews for terminal display.

pub mod account;
pub mod category;
pub mod import;
pub mod pattern;
pub mod projection;
pub mod transaction;

use chrono::NaiveDate;

use crate::config::settings::Settings;
use crate::models::Money;

pub use account::{format_account_list, AccountBalance};
pub use category::{format_category_list, format_rule_list, format_suggestions};
pub use import::{format_analysis, format_import_preview, format_import_result};
pub use pattern::{format_occurrences, format_pattern_list};
pub use projection::{format_negative_dates, format_projection, format_rollup, format_upcoming};
pub use transaction::format_transaction_register;

/// Currency and date rendering taken from the user's settings
#[derive(Debug, Clone)]
pub struct DisplayStyle {
    pub currency_symbol: String,
    pub date_format: String,
}

impl Default for DisplayStyle {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl DisplayStyle {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            currency_symbol: settings.currency_symbol.clone(),
            date_format: settings.date_format.clone(),
        }
    }

    pub fn money(&self, amount: Money) -> String {
        amount.format_with_symbol(&self.currency_symbol)
    }

    pub fn date(&self, date: NaiveDate) -> String {
        date.format(&self.date_format).to_string()
    }
}

/// Shorten `s` to at most `max` characters, marking the cut with "..."
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_uses_settings() {
        let mut settings = Settings::default();
        settings.currency_symbol = "€".to_string();
        settings.date_format = "%d/%m/%Y".to_string();
        let style = DisplayStyle::from_settings(&settings);

        assert_eq!(style.money(Money::from_cents(-1_050)), "-€10.50");
        assert_eq!(style.date(NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()), "07/03/2025");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Short", 10), "Short");
        assert_eq!(truncate("A very long description", 10), "A very ...");
    }
}
