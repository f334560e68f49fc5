//! Error types for the tablecheck library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for tablecheck operations.
#[derive(Debug, Error)]
pub enum TableCheckError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Empty file or no data to analyze.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration error (environment, rules file).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A rule carries parameters the validator cannot work with.
    #[error("Rule '{rule}': {message}")]
    InvalidRule { rule: String, message: String },

    /// A rule names columns that are not present in the data.
    #[error("Rule '{rule}': columns {columns:?} not found in data")]
    MissingColumns { rule: String, columns: Vec<String> },

    /// A column requested for column-level validation does not exist.
    #[error("Column '{0}' not found in data")]
    UnknownColumn(String),

    /// Error raised by a database connector.
    #[error("Connector error: {0}")]
    Connector(String),

    /// Identifier rejected before being interpolated into SQL.
    #[error("Invalid SQL identifier: '{0}'")]
    InvalidIdentifier(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Regex compilation error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Error from the SQLite driver.
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl TableCheckError {
    /// Build an [`TableCheckError::InvalidRule`] for the named rule.
    pub fn invalid_rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for tablecheck operations.
pub type Result<T> = std::result::Result<T, TableCheckError>;
