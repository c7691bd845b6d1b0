use super::utils::{format_amount, format_status, format_timestamp, or_dash};
use crate::cli::HistoryCommands;
use crate::output::{OutputFormat, json::print_json, table};
use anyhow::Result;
use comfy_table::Cell;
use keypool_core::history::HistoryStore;
use keypool_core::models::mask_key;

pub fn run(store: &HistoryStore, command: HistoryCommands, format: OutputFormat) -> Result<()> {
    match command {
        HistoryCommands::List { limit } => list(store, limit, format),
        HistoryCommands::Clear => {
            store.clear()?;
            if format.is_json() {
                print_json(&serde_json::json!({ "cleared": true }))
            } else {
                println!("History cleared.");
                Ok(())
            }
        }
    }
}

fn list(store: &HistoryStore, limit: Option<usize>, format: OutputFormat) -> Result<()> {
    let mut entries = store.load();
    if let Some(limit) = limit {
        entries.truncate(limit);
    }

    if format.is_json() {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No lookup history.");
        return Ok(());
    }

    let mut table = table::new_table(&["Time", "Provider", "Key", "Status", "Balance", "Currency / Error"]);
    for entry in &entries {
        let result = &entry.result;
        let last = match &result.error {
            Some(error) => error.clone(),
            None => or_dash(result.currency.as_deref()),
        };
        table.add_row(vec![
            Cell::new(format_timestamp(entry.timestamp)),
            Cell::new(result.provider.label()),
            Cell::new(mask_key(&result.api_key)),
            Cell::new(format_status(result.status)),
            Cell::new(format_amount(result.balance)),
            Cell::new(last),
        ]);
    }
    table::print_table(table);
    Ok(())
}
