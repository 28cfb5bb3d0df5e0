use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use forecast_ledger::cli::{
    handle_account_command, handle_categorize_command, handle_category_command,
    handle_config_command, handle_export_command, handle_forecast_command, handle_generate_command,
    handle_import_command, handle_pattern_command, handle_rule_command, handle_transaction_command,
};
use forecast_ledger::clock::{Clock, FixedClock, SystemClock};
use forecast_ledger::config::{paths::LedgerPaths, settings::Settings};
use forecast_ledger::services::RuleCache;
use forecast_ledger::storage::Storage;

#[derive(Parser)]
#[command(
    name = "forecast",
    author = "Kaylee Beyene",
    version,
    about = "Cash-flow forecasting for personal accounts",
    long_about = "forecast projects account balances day by day from recorded \
                  transactions and recurring patterns, warns about days below zero, \
                  and imports bank CSV exports with duplicate detection and \
                  rule-based categorization."
)]
struct Cli {
    /// Use this directory for settings and data
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long, global = true, env = "FORECAST_LEDGER_TODAY")]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and settings file
    Init,

    /// Show or change settings
    #[command(subcommand)]
    Config(forecast_ledger::cli::ConfigCommands),

    /// Account management commands
    #[command(subcommand)]
    Account(forecast_ledger::cli::AccountCommands),

    /// Category management commands
    #[command(subcommand)]
    Category(forecast_ledger::cli::CategoryCommands),

    /// Categorization rule commands
    #[command(subcommand)]
    Rule(forecast_ledger::cli::RuleCommands),

    /// Transaction management commands
    #[command(subcommand, alias = "txn")]
    Transaction(forecast_ledger::cli::TransactionCommands),

    /// Recurring pattern commands
    #[command(subcommand, alias = "recurring")]
    Pattern(forecast_ledger::cli::PatternCommands),

    #[command(flatten)]
    Forecast(forecast_ledger::cli::ForecastCommands),

    /// Record recurring transactions that have come due
    Generate {
        /// Materialize occurrences due on or before this date (YYYY-MM-DD)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Import transactions from a bank CSV export
    Import(forecast_ledger::cli::ImportArgs),

    /// Category suggestions, rule learning and analysis
    #[command(subcommand)]
    Categorize(forecast_ledger::cli::CategorizeCommands),

    /// Export the ledger
    #[command(subcommand)]
    Export(forecast_ledger::cli::ExportCommands),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = match cli.data_dir {
        Some(dir) => LedgerPaths::with_base_dir(dir),
        None => LedgerPaths::new()?,
    };
    let mut settings = Settings::load_or_create(&paths)?;
    forecast_ledger::init(&settings.log_filter);

    // The settings file holds the user id, so it must exist before any data is written
    if !paths.is_initialized() {
        settings.save(&paths)?;
    }

    let clock: Arc<dyn Clock> = match cli.today {
        Some(date) => Arc::new(FixedClock::new(date)),
        None => Arc::new(SystemClock),
    };

    // Initialize storage
    let storage = Storage::open(paths.clone(), clock)?;
    let rules = RuleCache::new();

    match cli.command {
        Some(Commands::Init) => {
            storage.save_all()?;
            println!("Forecast ledger initialized at: {}", paths.base_dir().display());
            println!();
            println!("Next steps:");
            println!("  forecast account add Checking --balance 1000");
            println!("  forecast pattern add Checking 1200 Rent --frequency monthly --start 2025-01-01");
            println!("  forecast project --days 30");
        }
        Some(Commands::Config(cmd)) => {
            handle_config_command(&paths, &mut settings, cmd)?;
        }
        Some(Commands::Account(cmd)) => {
            handle_account_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Category(cmd)) => {
            handle_category_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Rule(cmd)) => {
            handle_rule_command(&storage, &settings, &rules, cmd)?;
        }
        Some(Commands::Transaction(cmd)) => {
            handle_transaction_command(&storage, &settings, &rules, cmd)?;
        }
        Some(Commands::Pattern(cmd)) => {
            handle_pattern_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Forecast(cmd)) => {
            handle_forecast_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Generate { as_of }) => {
            handle_generate_command(&storage, &settings, as_of)?;
        }
        Some(Commands::Import(args)) => {
            handle_import_command(&storage, &settings, &rules, args)?;
        }
        Some(Commands::Categorize(cmd)) => {
            handle_categorize_command(&storage, &settings, &rules, cmd)?;
        }
        Some(Commands::Export(cmd)) => {
            handle_export_command(&storage, cmd)?;
        }
        None => {
            println!("forecast - cash-flow forecasting for personal accounts");
            println!();
            println!("Run 'forecast --help' for usage information.");
        }
    }

    Ok(())
}
