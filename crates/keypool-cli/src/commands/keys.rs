use super::utils::{format_amount, format_timestamp, or_dash};
use crate::cli::KeysCommands;
use crate::executor::CommandExecutor;
use crate::output::{OutputFormat, json::print_json, table};
use anyhow::Result;
use comfy_table::Cell;
use keypool_core::models::{KeyPage, NewKeyRecord};
use std::sync::Arc;

pub async fn run(
    executor: Arc<dyn CommandExecutor>,
    command: KeysCommands,
    format: OutputFormat,
) -> Result<()> {
    match command {
        KeysCommands::List(args) => {
            let page = executor.list_shared(&args.to_query()).await?;
            if format.is_json() {
                return print_json(&page);
            }

            let mut table = table::new_table(&["ID", "Provider", "Key", "Balance", "Currency", "Description", "Added"]);
            for row in &page.rows {
                table.add_row(vec![
                    Cell::new(&row.id),
                    Cell::new(row.provider.label()),
                    Cell::new(&row.key_preview),
                    Cell::new(format_amount(row.balance)),
                    Cell::new(or_dash(row.currency.as_deref())),
                    Cell::new(or_dash(row.description.as_deref())),
                    Cell::new(format_timestamp(row.created_at)),
                ]);
            }
            table::print_table(table);
            print_page_footer(&page);
            Ok(())
        }
        KeysCommands::Add {
            provider,
            key,
            description,
            balance,
            currency,
        } => {
            let row = executor
                .add_key(NewKeyRecord {
                    provider,
                    key,
                    balance,
                    currency,
                    description,
                })
                .await?;
            if format.is_json() {
                return print_json(&row);
            }
            println!("Added {} key {} ({})", row.provider.label(), row.key_preview, row.id);
            Ok(())
        }
    }
}

pub fn print_page_footer<T>(page: &KeyPage<T>) {
    println!(
        "Page {} of {} ({} keys)",
        page.page,
        page.page_count.max(1),
        page.total_count
    );
}
