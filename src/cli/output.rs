//! CLI output: error mapping and text/json formatters per command.

use crate::catalog::{CatalogItem, ProcessingState};
use crate::error::EnrichError;
use crate::orchestrator::RunSummary;
use comfy_table::Table;
use std::path::Path;

/// Map pipeline errors to a string for CLI output.
pub fn map_error(e: &EnrichError) -> String {
    match e {
        EnrichError::TimedOut { job_id, .. } => format!(
            "{}\nThe job is still running remotely. Resume with: enricher resume --batch-id {}",
            e, job_id
        ),
        EnrichError::StatusQueryFailed { job_id, .. } => format!(
            "{}\nRetry monitoring with: enricher resume --batch-id {}",
            e, job_id
        ),
        _ => e.to_string(),
    }
}

pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut output = String::new();
    if let Some(job_id) = &summary.job_id {
        output.push_str(&format!("Batch job: {}\n", job_id));
    }
    output.push_str(&format!(
        "Requests: {}\nDecoded: {} (skipped lines: {})\nProcessed: {}\nAttempts stamped: {}\nWrite failures: {}",
        summary.submitted,
        summary.decoded,
        summary.skipped,
        summary.processed,
        summary.stamped,
        summary.failed
    ));
    output
}

pub fn format_import_summary(count: usize, path: &Path) -> String {
    format!("Imported {} item(s) from {}", count, path.display())
}

pub fn format_catalog_table(items: &[CatalogItem], format: &str) -> Result<String, EnrichError> {
    if format == "json" {
        return serde_json::to_string_pretty(items)
            .map_err(|e| EnrichError::Configuration(format!("Failed to render items: {}", e)));
    }
    if items.is_empty() {
        return Ok("No catalog items.".to_string());
    }

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["ID", "Name", "SKU", "State", "Listed", "Last Attempt"]);
    for item in items {
        let state = match item.state {
            ProcessingState::Unprocessed => "unprocessed",
            ProcessingState::Processed => "processed",
        };
        let last_attempt = item
            .last_attempt_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            item.id.to_string(),
            item.name.clone(),
            item.sku.clone(),
            state.to_string(),
            item.listed_at.format("%Y-%m-%d").to_string(),
            last_attempt,
        ]);
    }
    Ok(format!("{}\nTotal: {} item(s)", table, items.len()))
}
