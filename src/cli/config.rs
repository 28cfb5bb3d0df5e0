//! Configuration CLI commands

use clap::Subcommand;

use crate::config::paths::LedgerPaths;
use crate::config::settings::Settings;
use crate::error::ForecastResult;

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current settings
    Show,
    /// Change a setting
    Set {
        /// Setting name (e.g. projection_days, currency_symbol)
        key: String,
        /// New value
        value: String,
    },
    /// Show where data is stored
    Path,
}

/// Handle a config command
pub fn handle_config_command(
    paths: &LedgerPaths,
    settings: &mut Settings,
    cmd: ConfigCommands,
) -> ForecastResult<()> {
    match cmd {
        ConfigCommands::Show => {
            println!("Forecast Ledger Configuration");
            println!("=============================");
            println!("  currency_symbol:  {}", settings.currency_symbol);
            println!("  date_format:      {}", settings.date_format);
            println!("  projection_days:  {}", settings.projection_days);
            println!("  rollup_months:    {}", settings.rollup_months);
            println!("  upcoming_days:    {}", settings.upcoming_days);
            println!("  suggestion_limit: {}", settings.suggestion_limit);
            println!("  log_filter:       {}", settings.log_filter);
        }

        ConfigCommands::Set { key, value } => {
            settings.set(&key, &value)?;
            settings.save(paths)?;
            println!("Set {} = {}", key, value);
        }

        ConfigCommands::Path => {
            println!("Config file:    {}", paths.settings_file().display());
            println!("Data directory: {}", paths.data_dir().display());
        }
    }

    Ok(())
}
