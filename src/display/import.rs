//! Import preview, import result and pattern analysis formatting

use crate::services::categorize::PatternAnalysis;
use crate::services::import::{ImportPreview, ImportResult, ImportStatus};

use super::{truncate, DisplayStyle};

fn status_label(status: &ImportStatus) -> String {
    match status {
        ImportStatus::New => "new".to_string(),
        ImportStatus::Duplicate(candidate) => {
            format!("duplicate ({:.0}%)", candidate.confidence * 100.0)
        }
        ImportStatus::AlreadyImported => "imported".to_string(),
    }
}

/// Format an import preview, one line per row
pub fn format_import_preview(preview: &ImportPreview, style: &DisplayStyle) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:>4}  {:<10}  {:<32}  {:>12}  {:<16}  {}\n",
        "Row", "Date", "Description", "Amount", "Status", "Category"
    ));
    output.push_str(&"-".repeat(96));
    output.push('\n');

    for entry in &preview.entries {
        let rule = entry
            .suggested
            .as_ref()
            .map(|m| m.reason.clone())
            .unwrap_or_default();
        output.push_str(&format!(
            "{:>4}  {:<10}  {:<32}  {:>12}  {:<16}  {}\n",
            entry.row.row_number,
            style.date(entry.row.date),
            truncate(&entry.row.description, 32),
            style.money(entry.row.signed_amount()),
            status_label(&entry.status),
            rule
        ));
    }

    for error in &preview.errors {
        output.push_str(&format!("{:>4}  error: {}\n", error.row_number, error.message));
    }

    output.push_str(&"-".repeat(96));
    output.push('\n');
    output.push_str(&format!(
        "{} new, {} possible duplicate(s), {} already imported, {} error(s)\n",
        preview.new_count(),
        preview.duplicate_count(),
        preview.already_imported_count(),
        preview.errors.len()
    ));

    output
}

/// One-line import summary
pub fn format_import_result(result: &ImportResult) -> String {
    format!(
        "Imported {} transaction(s); skipped {} duplicate(s) and {} already imported; {} row error(s).\n",
        result.imported, result.duplicates_skipped, result.already_imported, result.errors
    )
}

/// Format recurring descriptions among uncategorized transactions
pub fn format_analysis(analysis: &PatternAnalysis, style: &DisplayStyle) -> String {
    if analysis.uncategorized_count == 0 {
        return "No uncategorized transactions.\n".to_string();
    }

    let mut output = format!(
        "{} uncategorized transaction(s) analyzed\n",
        analysis.uncategorized_count
    );

    if analysis.groups.is_empty() {
        output.push_str("No repeated descriptions found.\n");
        return output;
    }

    output.push('\n');
    for group in &analysis.groups {
        output.push_str(&format!(
            "{:>3}x  {:<40}  {:>12}\n",
            group.count,
            truncate(&group.description, 40),
            style.money(group.total_amount)
        ));
    }

    if !analysis.suggested_rules.is_empty() {
        output.push_str("\nSuggested keywords:\n");
        for suggestion in &analysis.suggested_rules {
            output.push_str(&format!(
                "  {} {} '{}' (seen {} times)\n",
                suggestion.field, suggestion.operator, suggestion.value, suggestion.frequency
            ));
        }
    }

    output
}
