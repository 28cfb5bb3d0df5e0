//! Projection CLI commands: project, negatives, rollup and upcoming

use std::io::Write;
use std::path::PathBuf;

use clap::{Subcommand, ValueEnum};

use crate::clock::Clock;
use crate::config::settings::Settings;
use crate::display::{
    format_negative_dates, format_projection, format_rollup, format_upcoming, DisplayStyle,
};
use crate::error::{ForecastError, ForecastResult};
use crate::export::{export_projection_csv, export_projection_json, export_rollup_csv, ProjectionExport};
use crate::models::{Account, CalendarDate};
use crate::services::ProjectionService;
use crate::storage::Storage;

use super::{account_names, output_writer, parse_date, resolve_account};

/// How projection results are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

/// Forecasting commands
#[derive(Subcommand)]
pub enum ForecastCommands {
    /// Project daily balances forward from today
    Project {
        /// Account name or ID; all accounts when omitted
        #[arg(short, long)]
        account: Option<String>,
        /// Days ahead to project
        #[arg(short, long, conflicts_with = "until")]
        days: Option<u32>,
        /// Last projected date (YYYY-MM-DD)
        #[arg(short, long)]
        until: Option<String>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// List each day's entries under the table
        #[arg(short, long)]
        entries: bool,
    },
    /// Show the days an account goes below zero
    Negatives {
        /// Account name or ID; all accounts when omitted
        #[arg(short, long)]
        account: Option<String>,
        /// Days ahead to check
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Month-by-month income, expenses and closing balances
    Rollup {
        /// Months to cover, starting with the current one
        #[arg(short, long)]
        months: Option<u32>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Confirmed and recurring activity coming up
    Upcoming {
        /// Days ahead to show
        #[arg(short, long)]
        days: Option<u32>,
    },
}

fn target_accounts(
    storage: &Storage,
    settings: &Settings,
    account: Option<&str>,
) -> ForecastResult<Vec<Account>> {
    match account {
        Some(name) => Ok(vec![resolve_account(storage, name)?]),
        None => storage.accounts.get_by_user(settings.user_id),
    }
}

/// Handle a forecasting command
pub fn handle_forecast_command(
    storage: &Storage,
    settings: &Settings,
    cmd: ForecastCommands,
) -> ForecastResult<()> {
    let clock = storage.clock();
    let service = ProjectionService::new(storage, clock.as_ref());
    let today = service.today();
    let style = DisplayStyle::from_settings(settings);

    match cmd {
        ForecastCommands::Project {
            account,
            days,
            until,
            format,
            output,
            entries,
        } => {
            let end = match until {
                Some(u) => parse_date(&u)?,
                None => today.add_days(days.unwrap_or(settings.projection_days) as i64),
            };
            let accounts = target_accounts(storage, settings, account.as_deref())?;
            let ids: Vec<_> = accounts.iter().map(|a| a.id).collect();
            let mut series = service.project_multi_account(&ids, end)?;

            let mut writer = output_writer(output.as_deref())?;
            match format {
                OutputFormat::Table => {
                    for account in &accounts {
                        let days = series.remove(&account.id).unwrap_or_default();
                        write!(writer, "{}", format_projection(&account.name, &days, &style, entries))?;
                    }
                }
                OutputFormat::Csv => {
                    let [account] = accounts.as_slice() else {
                        return Err(ForecastError::Validation(
                            "CSV export covers one account; pass --account".into(),
                        ));
                    };
                    let days = series.remove(&account.id).unwrap_or_default();
                    export_projection_csv(&days, &mut writer)?;
                }
                OutputFormat::Json => {
                    let generated_at = clock.now();
                    let exports: Vec<ProjectionExport> = accounts
                        .iter()
                        .map(|a| {
                            let days = series.remove(&a.id).unwrap_or_default();
                            ProjectionExport::new(a, days, generated_at)
                        })
                        .collect();
                    match exports.as_slice() {
                        [single] => export_projection_json(single, &mut writer, true)?,
                        _ => serde_json::to_writer_pretty(&mut writer, &exports)?,
                    }
                    writeln!(writer)?;
                }
            }
            writer.flush()?;
        }

        ForecastCommands::Negatives { account, days } => {
            let end = today.add_days(days.unwrap_or(settings.projection_days) as i64);
            for account in target_accounts(storage, settings, account.as_deref())? {
                let dates = service.find_negative_balance_dates(account.id, end)?;
                print!("{}", format_negative_dates(&account.name, &dates, &style));
            }
        }

        ForecastCommands::Rollup {
            months,
            format,
            output,
        } => {
            let months =
                service.monthly_rollup(settings.user_id, months.unwrap_or(settings.rollup_months))?;
            let mut writer = output_writer(output.as_deref())?;
            match format {
                OutputFormat::Table => write!(writer, "{}", format_rollup(&months, &style))?,
                OutputFormat::Csv => export_rollup_csv(&months, &mut writer)?,
                OutputFormat::Json => {
                    serde_json::to_writer_pretty(&mut writer, &months)?;
                    writeln!(writer)?;
                }
            }
            writer.flush()?;
        }

        ForecastCommands::Upcoming { days } => {
            let entries = service
                .upcoming_transactions(settings.user_id, days.unwrap_or(settings.upcoming_days))?;
            let names = account_names(storage, settings.user_id)?;
            print!("{}", format_upcoming(&entries, &names, &style));
        }
    }

    Ok(())
}
