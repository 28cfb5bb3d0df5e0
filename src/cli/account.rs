//! Account CLI commands

use clap::Subcommand;

use crate::config::settings::Settings;
use crate::display::{format_account_list, AccountBalance, DisplayStyle};
use crate::error::{ForecastError, ForecastResult};
use crate::models::{Account, AccountType};
use crate::storage::{AccountSource, Storage};

use super::parse_money;

/// Account subcommands
#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Add {
        /// Account name
        name: String,
        /// Account type (checking, savings, credit, cash, investment, other)
        #[arg(short = 't', long, default_value = "checking")]
        account_type: String,
        /// Opening balance (e.g., "1000.00" or "1000")
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        balance: String,
        /// Currency label shown next to the account
        #[arg(long)]
        currency: Option<String>,
    },
    /// List accounts with their current balances
    List,
}

/// Handle an account command
pub fn handle_account_command(
    storage: &Storage,
    settings: &Settings,
    cmd: AccountCommands,
) -> ForecastResult<()> {
    match cmd {
        AccountCommands::Add {
            name,
            account_type,
            balance,
            currency,
        } => {
            let account_type = AccountType::parse(&account_type).ok_or_else(|| {
                ForecastError::Validation(format!(
                    "Invalid account type: '{}'. Valid types: checking, savings, credit, cash, investment, other",
                    account_type
                ))
            })?;

            if storage.accounts.find_by_name(&name)?.is_some() {
                return Err(ForecastError::Validation(format!(
                    "An account named '{}' already exists",
                    name
                )));
            }

            let mut account = Account::new(settings.user_id, &name, account_type)
                .with_initial_balance(parse_money(&balance)?);
            if let Some(currency) = currency {
                account.currency = currency;
            }
            storage.accounts.upsert(account.clone())?;
            storage.accounts.save()?;

            let style = DisplayStyle::from_settings(settings);
            println!("Created account: {}", account.name);
            println!("  Type: {}", account.account_type);
            println!("  Opening Balance: {}", style.money(account.initial_balance));
            println!("  ID: {}", account.id);
        }

        AccountCommands::List => {
            let mut balances = Vec::new();
            for account in storage.accounts.get_by_user(settings.user_id)? {
                let balance = storage
                    .current_balance(account.id)?
                    .ok_or_else(|| ForecastError::balance_unavailable(account.id))?;
                balances.push(AccountBalance { account, balance });
            }
            print!(
                "{}",
                format_account_list(&balances, &DisplayStyle::from_settings(settings))
            );
        }
    }

    Ok(())
}
