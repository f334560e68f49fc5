//! CLI command implementations.

pub mod analyze;
pub mod describe;
pub mod list_tables;
pub mod test_connection;

use std::path::PathBuf;

use tablecheck::{AppConfig, SqliteConnector};

/// Open the database named on the command line or in the configuration.
pub fn open_database(
    database: Option<PathBuf>,
    config: &AppConfig,
) -> Result<SqliteConnector, Box<dyn std::error::Error>> {
    let path = database
        .or_else(|| config.database.clone())
        .ok_or("no database given: use --database or set TABLECHECK_DATABASE")?;

    if !path.exists() {
        return Err(format!("Database not found: {}", path.display()).into());
    }

    Ok(SqliteConnector::open(&path)?)
}
