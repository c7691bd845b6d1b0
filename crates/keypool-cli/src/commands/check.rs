use super::utils::{confirm, format_amount, format_status, or_dash};
use crate::executor::CommandExecutor;
use crate::output::{OutputFormat, json::print_json, table};
use anyhow::Result;
use comfy_table::Cell;
use keypool_core::history::HistoryStore;
use keypool_core::models::{Provider, QueryResult, mask_key};
use keypool_core::reconcile::{SavePreview, SaveSummary};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

pub struct CheckOptions {
    pub provider: Provider,
    /// Keys as typed: newline or comma separated.
    pub raw_keys: String,
    pub save: bool,
    pub yes: bool,
    pub copy_valid: bool,
}

pub async fn run(
    executor: Arc<dyn CommandExecutor>,
    history: &HistoryStore,
    options: CheckOptions,
    format: OutputFormat,
) -> Result<()> {
    let results = executor
        .query(options.provider.as_str(), vec![options.raw_keys])
        .await?;

    if let Err(err) = history.record(&results) {
        warn!(error = %err, "Failed to record lookup history");
    }

    let summary = if options.save {
        save(executor.as_ref(), &results, options.yes, format).await?
    } else {
        None
    };

    if format.is_json() {
        return match summary {
            Some(summary) => print_json(&json!({ "results": results, "saved": summary })),
            None => print_json(&results),
        };
    }

    if options.copy_valid {
        for result in results.iter().filter(|result| result.is_success()) {
            println!("{}", result.api_key);
        }
    } else {
        print_results(&results);
    }

    if let Some(summary) = summary {
        print_save_summary(&summary);
    }
    Ok(())
}

fn print_results(results: &[QueryResult]) {
    let mut table = table::new_table(&["#", "Key", "Status", "Balance", "Total", "Used", "Currency / Error"]);
    for (index, result) in results.iter().enumerate() {
        let last = match &result.error {
            Some(error) => error.clone(),
            None => or_dash(result.currency.as_deref()),
        };
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(mask_key(&result.api_key)),
            Cell::new(format_status(result.status)),
            Cell::new(format_amount(result.balance)),
            Cell::new(format_amount(result.total)),
            Cell::new(format_amount(result.used)),
            Cell::new(last),
        ]);
    }
    table::print_table(table);

    let valid = results.iter().filter(|result| result.is_success()).count();
    println!("{valid} of {} keys valid", results.len());
}

/// Preview the save, confirm when rows would be dropped, then apply it.
async fn save(
    executor: &dyn CommandExecutor,
    results: &[QueryResult],
    yes: bool,
    format: OutputFormat,
) -> Result<Option<SaveSummary>> {
    let preview = executor.preview_save(results).await?;
    if preview.to_insert + preview.to_update == 0 {
        if !format.is_json() {
            println!("Nothing to save.");
        }
        return Ok(None);
    }

    if !format.is_json() {
        print_preview(&preview);
    }
    let dropped = preview.skipped_low_balance + preview.duplicates;
    if dropped > 0 && !yes && !confirm(&format!("{dropped} keys will be skipped. Save the rest?"))? {
        if !format.is_json() {
            println!("Save cancelled.");
        }
        return Ok(None);
    }

    Ok(Some(executor.save_results(results).await?))
}

fn print_preview(preview: &SavePreview) {
    println!(
        "Save plan: {} new, {} updated, {} unchanged, {} low balance, {} duplicates",
        preview.to_insert,
        preview.to_update,
        preview.unchanged,
        preview.skipped_low_balance,
        preview.duplicates
    );
}

fn print_save_summary(summary: &SaveSummary) {
    println!(
        "Saved: {} inserted, {} updated, {} unchanged",
        summary.inserted, summary.updated, summary.unchanged
    );
    if summary.update_failed > 0 {
        println!("{} updates failed, see the log for details", summary.update_failed);
    }
}
