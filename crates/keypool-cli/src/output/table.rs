use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};

/// Empty table with the shared look and the given header.
pub fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED).set_header(header.to_vec());
    table
}

pub fn print_table(table: Table) {
    println!("{table}");
}
