//! Transaction CLI commands

use clap::Subcommand;

use crate::config::settings::Settings;
use crate::display::{format_transaction_register, DisplayStyle};
use crate::error::{ForecastError, ForecastResult};
use crate::models::{Transaction, TransactionKind};
use crate::services::RuleCache;
use crate::storage::Storage;

use super::{category_names, parse_date, parse_money, resolve_account, resolve_category};

/// Transaction subcommands
#[derive(Subcommand)]
pub enum TransactionCommands {
    /// Record a confirmed transaction
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
        /// Transaction date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
        /// Category name; rules pick one when omitted
        #[arg(short, long)]
        category: Option<String>,
        /// Destination account for transfers
        #[arg(long)]
        to: Option<String>,
    },
    /// List transactions
    List {
        /// Filter by account
        #[arg(short, long)]
        account: Option<String>,
        /// Earliest date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Latest date (YYYY-MM-DD)
        #[arg(long)]
        until: Option<String>,
    },
}

/// Handle a transaction command
pub fn handle_transaction_command(
    storage: &Storage,
    settings: &Settings,
    rules: &RuleCache,
    cmd: TransactionCommands,
) -> ForecastResult<()> {
    let style = DisplayStyle::from_settings(settings);

    match cmd {
        TransactionCommands::Add {
            account,
            kind,
            amount,
            description,
            date,
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
            let amount = parse_money(&amount)?;
            let date = match date {
                Some(d) => parse_date(&d)?,
                None => storage.today(),
            };

            let mut txn = Transaction::new(account.id, kind, amount, &description, date);
            if let Some(to) = to {
                txn = txn.with_transfer_to(resolve_account(storage, &to)?.id);
            }

            match category {
                Some(name) => {
                    txn = txn.with_category(resolve_category(storage, settings.user_id, &name)?.id);
                }
                None if !txn.is_transfer() => {
                    let matcher = rules.matcher_for(&storage.categories, settings.user_id)?;
                    if let Some(matched) = matcher.match_category(&description, amount) {
                        txn = txn.with_category(matched.category_id);
                    }
                }
                None => {}
            }

            txn.validate()
                .map_err(|e| ForecastError::Validation(e.to_string()))?;
            storage.transactions.upsert(txn.clone())?;
            storage.transactions.save()?;

            println!(
                "Recorded {} of {} on {}: {}",
                txn.kind,
                style.money(txn.amount),
                style.date(txn.date),
                txn.description
            );
            if let Some(category_id) = txn.category_id {
                if let Some(category) = storage.categories.get(category_id)? {
                    println!("  Category: {}", category.name);
                }
            }
        }

        TransactionCommands::List {
            account,
            from,
            until,
        } => {
            let from = from.as_deref().map(parse_date).transpose()?;
            let until = until.as_deref().map(parse_date).transpose()?;

            let accounts = match account {
                Some(name) => vec![resolve_account(storage, &name)?],
                None => storage.accounts.get_by_user(settings.user_id)?,
            };

            let mut transactions = Vec::new();
            for account in &accounts {
                transactions.extend(storage.transactions.get_by_account_range(
                    account.id,
                    from.unwrap_or(chrono::NaiveDate::MIN),
                    until.unwrap_or(chrono::NaiveDate::MAX),
                )?);
            }

            let names = category_names(storage, settings.user_id)?;
            print!("{}", format_transaction_register(&transactions, &names, &style));
        }
    }

    Ok(())
}
