use super::keys::print_page_footer;
use super::utils::{format_amount, format_timestamp, or_dash};
use crate::cli::AdminCommands;
use crate::executor::CommandExecutor;
use crate::output::{OutputFormat, json::print_json, table};
use anyhow::Result;
use colored::Colorize;
use comfy_table::Cell;
use keypool_core::models::{KeyRecordPatch, StoredKeyRecord};
use serde_json::json;
use std::sync::Arc;

pub async fn run(
    executor: Arc<dyn CommandExecutor>,
    command: AdminCommands,
    format: OutputFormat,
) -> Result<()> {
    match command {
        AdminCommands::List(args) => {
            let page = executor.list_admin(&args.to_query()).await?;
            if format.is_json() {
                return print_json(&page);
            }

            let mut table = table::new_table(&["ID", "Provider", "Key", "Balance", "Currency", "Description", "Added", ""]);
            for row in &page.rows {
                let record = &row.record;
                table.add_row(vec![
                    Cell::new(&record.id),
                    Cell::new(record.provider.label()),
                    Cell::new(&record.key),
                    Cell::new(format_amount(record.balance)),
                    Cell::new(or_dash(record.currency.as_deref())),
                    Cell::new(or_dash(record.description.as_deref())),
                    Cell::new(format_timestamp(record.created_at)),
                    Cell::new(if row.refreshing { "refreshing" } else { "" }),
                ]);
            }
            table::print_table(table);
            print_page_footer(&page);
            Ok(())
        }
        AdminCommands::Delete { id } => {
            executor.delete_key(&id).await?;
            if format.is_json() {
                return print_json(&json!({ "deleted": true, "id": id }));
            }
            println!("Deleted key {id}");
            Ok(())
        }
        AdminCommands::Refresh { id } => {
            let record = executor.refresh_key(&id).await?;
            if format.is_json() {
                return print_json(&record);
            }
            print_record("Refreshed", &record);
            Ok(())
        }
        AdminCommands::RefreshPage(args) => {
            let page = executor.list_admin(&args.to_query()).await?;
            let ids: Vec<String> = page.rows.into_iter().map(|row| row.record.id).collect();
            let summary = executor.refresh_keys(&ids).await?;
            if format.is_json() {
                return print_json(&summary);
            }

            let mut table = table::new_table(&["ID", "Result", "Balance", "Currency / Error"]);
            for outcome in &summary.results {
                let (status, last) = if outcome.ok {
                    ("ok".green().to_string(), or_dash(outcome.currency.as_deref()))
                } else {
                    ("failed".red().to_string(), or_dash(outcome.error.as_deref()))
                };
                table.add_row(vec![
                    Cell::new(&outcome.id),
                    Cell::new(status),
                    Cell::new(format_amount(outcome.balance)),
                    Cell::new(last),
                ]);
            }
            table::print_table(table);
            println!(
                "{} refreshed, {} failed",
                summary.succeeded, summary.failed
            );
            Ok(())
        }
        AdminCommands::Edit {
            id,
            provider,
            key,
            balance,
            currency,
            description,
        } => {
            let patch = KeyRecordPatch {
                provider,
                key,
                balance,
                currency,
                description,
            };
            let record = executor.update_key(&id, patch).await?;
            if format.is_json() {
                return print_json(&record);
            }
            print_record("Updated", &record);
            Ok(())
        }
    }
}

fn print_record(action: &str, record: &StoredKeyRecord) {
    println!(
        "{action} {} key {}: {} {}",
        record.provider.label(),
        record.id,
        format_amount(record.balance),
        or_dash(record.currency.as_deref())
    );
}
