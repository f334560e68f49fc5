//! Describe command - show the columns and size of a table.

use std::path::PathBuf;

use colored::Colorize;
use tablecheck::{AppConfig, Connector};

pub fn run(
    table: String,
    database: Option<PathBuf>,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let connector = super::open_database(database, config)?;
    let columns = connector.table_info(&table)?;
    let rows = connector.row_count(&table)?;
    let foreign_keys = connector.foreign_keys(&table)?;

    println!(
        "{} {} ({} rows)",
        "Table".cyan().bold(),
        table.white().bold(),
        rows
    );
    println!();
    println!("  {:24} {:12} {:9} {}", "column", "type", "nullable", "key");
    for column in &columns {
        let key = if column.primary_key > 0 { "PK" } else { "" };
        let data_type = if column.data_type.is_empty() { "-" } else { column.data_type.as_str() };
        println!(
            "  {:24} {:12} {:9} {}",
            column.name,
            data_type,
            if column.nullable { "yes" } else { "no" },
            key.yellow()
        );
    }

    if !foreign_keys.is_empty() {
        println!();
        println!("{}", "Foreign keys:".cyan().bold());
        for fk in &foreign_keys {
            println!(
                "  {} -> {}({})",
                fk.columns.join(", "),
                fk.referenced_table,
                fk.referenced_columns.join(", ")
            );
        }
    }

    Ok(())
}
