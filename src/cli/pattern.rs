//! Recurring pattern CLI commands

use chrono::NaiveDate;
use clap::Subcommand;

use crate::config::settings::Settings;
use crate::display::{format_occurrences, format_pattern_list, DisplayStyle};
use crate::error::{ForecastError, ForecastResult};
use crate::models::{Frequency, RecurringPattern, TransactionKind};
use crate::services::recurrence;
use crate::services::RecurrenceService;
use crate::storage::Storage;

use super::{account_names, parse_date, parse_money, resolve_account, resolve_category, resolve_pattern};

/// Recurring pattern subcommands
#[derive(Subcommand)]
pub enum PatternCommands {
    /// Create a recurring pattern
    Add {
        /// Account name or ID
        account: String,
        /// Transaction type (income, expense, transfer)
        #[arg(short = 't', long = "type", default_value = "expense")]
        kind: String,
        /// Amount as a positive number
        amount: String,
        /// Description
        description: String,
        /// daily, weekly, bi-weekly, monthly, yearly or custom
        #[arg(short, long, default_value = "monthly")]
        frequency: String,
        /// Repeat every N periods (days for custom)
        #[arg(short, long, default_value = "1")]
        interval: u32,
        /// Anchor date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        start: Option<String>,
        /// Last date an occurrence may fall on
        #[arg(short, long)]
        end: Option<String>,
        /// Category name
        #[arg(short, long)]
        category: Option<String>,
        /// Destination account for transfers
        #[arg(long)]
        to: Option<String>,
    },
    /// List recurring patterns
    List,
    /// Show the next occurrences of a pattern
    Preview {
        /// Pattern ID or description
        pattern: String,
        /// Number of occurrences
        #[arg(short, long, default_value = "5")]
        count: usize,
    },
    /// Expand a pattern over a date range
    Expand {
        /// Pattern ID or description
        pattern: String,
        /// First date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        from: Option<String>,
        /// Last date (YYYY-MM-DD)
        #[arg(long)]
        until: String,
    },
    /// Skip the next occurrence
    Skip {
        /// Pattern ID or description
        pattern: String,
    },
    /// Stop a pattern from producing occurrences
    Pause {
        /// Pattern ID or description
        pattern: String,
    },
    /// Reactivate a paused pattern
    Resume {
        /// Pattern ID or description
        pattern: String,
    },
}

/// Handle a pattern command
pub fn handle_pattern_command(
    storage: &Storage,
    settings: &Settings,
    cmd: PatternCommands,
) -> ForecastResult<()> {
    let style = DisplayStyle::from_settings(settings);

    match cmd {
        PatternCommands::Add {
            account,
            kind,
            amount,
            description,
            frequency,
            interval,
            start,
            end,
            category,
            to,
        } => {
            let account = resolve_account(storage, &account)?;
            let kind = TransactionKind::parse(&kind).ok_or_else(|| {
                ForecastError::Validation(format!(
                    "Invalid transaction type: '{}'. Valid types: income, expense, transfer",
                    kind
                ))
            })?;
            let frequency = Frequency::parse(&frequency).ok_or_else(|| {
                ForecastError::Validation(format!(
                    "Invalid frequency: '{}'. Valid frequencies: daily, weekly, bi-weekly, monthly, yearly, custom",
                    frequency
                ))
            })?;
            let start = match start {
                Some(s) => parse_date(&s)?,
                None => storage.today(),
            };

            let mut pattern = RecurringPattern::new(
                account.id,
                kind,
                parse_money(&amount)?,
                description,
                frequency,
                start,
            )
            .with_interval(interval);
            if let Some(end) = end {
                pattern = pattern.with_end_date(parse_date(&end)?);
            }
            if let Some(category) = category {
                pattern = pattern.with_category(resolve_category(storage, settings.user_id, &category)?.id);
            }
            if let Some(to) = to {
                pattern = pattern.with_transfer_to(resolve_account(storage, &to)?.id);
            }

            pattern
                .validate()
                .map_err(|e| ForecastError::Validation(e.to_string()))?;
            storage.patterns.upsert(pattern.clone())?;
            storage.patterns.save()?;

            println!("Created recurring pattern: {}", pattern);
            println!("  Next due: {}", style.date(recurrence::pending_date(&pattern)?));
            println!("  ID: {}", pattern.id);
        }

        PatternCommands::List => {
            let names = account_names(storage, settings.user_id)?;
            let patterns: Vec<_> = storage
                .patterns
                .get_all()?
                .into_iter()
                .filter(|p| names.contains_key(&p.account_id))
                .collect();
            print!("{}", format_pattern_list(&patterns, &names, &style));
        }

        PatternCommands::Preview { pattern, count } => {
            let pattern = resolve_pattern(storage, &pattern)?;
            let occurrences = RecurrenceService::new(storage).preview_pattern(pattern.id, count)?;
            print!("{}", format_occurrences(&occurrences, &style));
        }

        PatternCommands::Expand {
            pattern,
            from,
            until,
        } => {
            let pattern = resolve_pattern(storage, &pattern)?;
            let from = match from {
                Some(f) => parse_date(&f)?,
                None => storage.today(),
            };
            let occurrences =
                RecurrenceService::new(storage).expand_pattern(pattern.id, from, parse_date(&until)?)?;
            print!("{}", format_occurrences(&occurrences, &style));
        }

        PatternCommands::Skip { pattern } => {
            let pattern = resolve_pattern(storage, &pattern)?;
            let skipped = storage.patterns.update_with(pattern.id, |current| {
                let due = recurrence::pending_date(current)?;
                *current = recurrence::skip_next(current)?;
                Ok(due)
            })?;
            storage.patterns.save()?;
            println!("Skipped {} on {}", pattern.description, style.date(skipped));
        }

        PatternCommands::Pause { pattern } => {
            let pattern = resolve_pattern(storage, &pattern)?;
            storage.patterns.upsert(recurrence::pause(&pattern))?;
            storage.patterns.save()?;
            println!("Paused {}", pattern.description);
        }

        PatternCommands::Resume { pattern } => {
            let pattern = resolve_pattern(storage, &pattern)?;
            storage.patterns.upsert(recurrence::resume(&pattern))?;
            storage.patterns.save()?;
            println!("Resumed {}", pattern.description);
        }
    }

    Ok(())
}

/// Materialize every occurrence due on or before `as_of` (default today)
pub fn handle_generate_command(
    storage: &Storage,
    settings: &Settings,
    as_of: Option<NaiveDate>,
) -> ForecastResult<()> {
    let as_of = as_of.unwrap_or_else(|| storage.today());

    let generated = storage.materialize_due(as_of)?;
    storage.transactions.save()?;
    storage.patterns.save()?;

    let style = DisplayStyle::from_settings(settings);
    println!(
        "Generated {} transaction(s) due by {}",
        generated.len(),
        style.date(as_of)
    );
    for txn in &generated {
        println!(
            "  {}  {:>12}  {}",
            style.date(txn.date),
            style.money(txn.signed_amount()),
            txn.description
        );
    }
    Ok(())
}
