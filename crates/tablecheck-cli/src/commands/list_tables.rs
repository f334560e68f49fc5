//! List-tables command - show the tables of a database.

use std::path::PathBuf;

use colored::Colorize;
use tablecheck::{AppConfig, Connector};

pub fn run(
    database: Option<PathBuf>,
    real_count: bool,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let connector = super::open_database(database, config)?;
    let tables = connector.list_tables()?;

    if tables.is_empty() {
        println!("{}", "No tables found".yellow());
        return Ok(());
    }

    println!("{}", "Tables:".cyan().bold());
    for table in &tables {
        if real_count {
            let rows = connector.row_count(table)?;
            println!("  {:30} {:>12} rows", table, rows.to_string().white());
        } else {
            println!("  {}", table);
        }
    }
    println!();
    println!("{} tables", tables.len().to_string().white().bold());

    Ok(())
}
