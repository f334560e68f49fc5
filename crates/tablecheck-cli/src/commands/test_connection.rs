//! Test-connection command - open the database and run a trivial query.

use std::path::PathBuf;

use colored::Colorize;
use tablecheck::{AppConfig, Connector};

pub fn run(
    database: Option<PathBuf>,
    config: &AppConfig,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let connector = super::open_database(database, config)?;

    connector.test_connection()?;
    println!("{}", "Database connection successful".green().bold());

    if verbose {
        let tables = connector.list_tables()?;
        println!("Tables: {}", tables.len().to_string().white().bold());
    }

    Ok(())
}
