//! Export CLI commands

use std::io::Write;
use std::path::PathBuf;

use clap::Subcommand;

use crate::error::ForecastResult;
use crate::export::{export_ledger_json, export_transactions_csv};
use crate::storage::Storage;

use super::output_writer;

/// Export subcommands
#[derive(Subcommand)]
pub enum ExportCommands {
    /// Full ledger snapshot as JSON
    Ledger {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// Confirmed transactions as CSV
    Transactions {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Handle an export command
pub fn handle_export_command(storage: &Storage, cmd: ExportCommands) -> ForecastResult<()> {
    match cmd {
        ExportCommands::Ledger { output, compact } => {
            let mut writer = output_writer(output.as_deref())?;
            export_ledger_json(storage, &mut writer, !compact)?;
            writeln!(writer)?;
            writer.flush()?;
        }
        ExportCommands::Transactions { output } => {
            let mut writer = output_writer(output.as_deref())?;
            export_transactions_csv(storage, &mut writer)?;
            writer.flush()?;
        }
    }

    Ok(())
}
