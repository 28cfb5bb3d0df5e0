//! CSV import CLI command

use std::path::PathBuf;

use clap::Args;

use crate::config::settings::Settings;
use crate::display::{format_import_preview, format_import_result, DisplayStyle};
use crate::error::{ForecastError, ForecastResult};
use crate::services::import::{
    detect_mapping, parse_csv, DuplicateResolution, ResolutionAction,
};
use crate::services::{ColumnMapping, ImportService, RuleCache};
use crate::storage::Storage;

use super::resolve_account;

/// Arguments for `import`
#[derive(Args)]
pub struct ImportArgs {
    /// Target account name or ID
    pub account: String,
    /// Path to the CSV file
    pub file: PathBuf,
    /// strftime format tried before the built-in date formats
    #[arg(long)]
    pub date_format: Option<String>,
    /// Field delimiter
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,
    /// The file has no header row (columns: date, description, amount)
    #[arg(long)]
    pub no_header: bool,
    /// Show what would be imported without writing anything
    #[arg(long)]
    pub dry_run: bool,
    /// Import rows flagged as possible duplicates too
    #[arg(long)]
    pub keep_duplicates: bool,
}

/// Handle the import command
pub fn handle_import_command(
    storage: &Storage,
    settings: &Settings,
    rules: &RuleCache,
    args: ImportArgs,
) -> ForecastResult<()> {
    let account = resolve_account(storage, &args.account)?;

    if !args.delimiter.is_ascii() {
        return Err(ForecastError::Validation(format!(
            "Delimiter must be a single ASCII character, got '{}'",
            args.delimiter
        )));
    }
    let delimiter = args.delimiter as u8;

    let content = std::fs::read_to_string(&args.file).map_err(|e| {
        ForecastError::Import(format!("Cannot read {}: {}", args.file.display(), e))
    })?;

    let mut mapping = if args.no_header {
        ColumnMapping::new().with_header(false).with_delimiter(delimiter)
    } else {
        detect_mapping(content.as_bytes(), delimiter)?
    };
    if let Some(format) = &args.date_format {
        mapping = mapping.with_date_format(format);
    }

    let parsed = parse_csv(content.as_bytes(), Some(mapping))?;
    let service = ImportService::new(storage, rules);
    let preview = service.preview(account.id, &parsed)?;

    let style = DisplayStyle::from_settings(settings);
    print!("{}", format_import_preview(&preview, &style));

    if args.dry_run {
        println!("Dry run: nothing was imported.");
        return Ok(());
    }

    let mut result = service.import_preview(&preview)?;

    if args.keep_duplicates {
        let resolutions: Vec<DuplicateResolution> = preview
            .duplicates()
            .map(|candidate| DuplicateResolution {
                row_number: candidate.row.row_number,
                action: ResolutionAction::Import,
                category_id: None,
            })
            .collect();
        let kept = service.resolve_duplicates(&preview, &resolutions)?;
        result.imported += kept;
        result.duplicates_skipped -= kept;
    }

    print!("{}", format_import_result(&result));
    Ok(())
}
