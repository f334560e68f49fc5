//! Database access used to load tables and foreign-key metadata.

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::{ColumnInfo, SqliteConnector};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TableCheckError};
use crate::input::{CellValue, DataTable};

/// Foreign-key metadata query for servers exposing `INFORMATION_SCHEMA`.
pub const FOREIGN_KEY_QUERY: &str = "SELECT COLUMN_NAME, REFERENCED_TABLE_NAME, REFERENCED_COLUMN_NAME, CONSTRAINT_NAME \
     FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = :table_name AND REFERENCED_TABLE_NAME IS NOT NULL \
     ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION";

const LIST_TABLES_QUERY: &str = "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
     WHERE TABLE_SCHEMA = DATABASE() ORDER BY TABLE_NAME";

/// A declared foreign-key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,
    /// Referencing columns, in key order.
    pub columns: Vec<String>,
    pub referenced_table: String,
    /// Referenced columns, same arity as `columns`.
    pub referenced_columns: Vec<String>,
}

/// A source of tables reachable through SQL.
///
/// Only `execute` is required; the other operations are written in terms of
/// it using `INFORMATION_SCHEMA` and portable SQL, and drivers override them
/// where their dialect differs.
pub trait Connector {
    /// Run a query with named parameters (`:name` placeholders).
    fn execute(&self, query: &str, params: &[(&str, CellValue)]) -> Result<DataTable>;

    /// Check that the database answers a trivial query.
    fn test_connection(&self) -> Result<()> {
        self.execute("SELECT 1", &[]).map(|_| ())
    }

    /// Declared foreign keys of a table, one entry per constraint.
    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>> {
        let rows = self.execute(FOREIGN_KEY_QUERY, &[("table_name", CellValue::from(table))])?;
        group_foreign_keys(&rows)
    }

    /// Names of the tables in the current database.
    fn list_tables(&self) -> Result<Vec<String>> {
        let rows = self.execute(LIST_TABLES_QUERY, &[])?;
        Ok(rows
            .column_values(0)
            .filter(|v| !v.is_null())
            .map(ToString::to_string)
            .collect())
    }

    /// Exact number of rows in a table.
    fn row_count(&self, table: &str) -> Result<usize> {
        let query = format!("SELECT COUNT(*) FROM {}", checked_identifier(table)?);
        let rows = self.execute(&query, &[])?;
        match rows.get(0, 0) {
            Some(CellValue::Int(n)) => usize::try_from(*n)
                .map_err(|_| TableCheckError::Connector(format!("negative row count {}", n))),
            other => Err(TableCheckError::Connector(format!(
                "unexpected COUNT(*) result {:?}",
                other
            ))),
        }
    }

    /// Load a table, optionally limited to the first `limit` rows.
    fn fetch_table(&self, table: &str, limit: Option<usize>) -> Result<DataTable> {
        let mut query = format!("SELECT * FROM {}", checked_identifier(table)?);
        if let Some(limit) = limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }
        self.execute(&query, &[])
    }
}

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*$")
        .expect("valid identifier regex")
});

/// Accept a table or column name for interpolation into SQL text.
///
/// Names must start with a letter or underscore and contain only letters,
/// digits and underscores, optionally qualified with dots.
pub fn checked_identifier(name: &str) -> Result<&str> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(name)
    } else {
        Err(TableCheckError::InvalidIdentifier(name.to_string()))
    }
}

/// `SELECT DISTINCT` of the given columns, used to fetch reference keys.
pub fn select_distinct_query(table: &str, columns: &[String]) -> Result<String> {
    let columns = columns
        .iter()
        .map(|c| checked_identifier(c))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!(
        "SELECT DISTINCT {} FROM {}",
        columns.join(", "),
        checked_identifier(table)?
    ))
}

/// Group `(COLUMN_NAME, REFERENCED_TABLE_NAME, REFERENCED_COLUMN_NAME,
/// CONSTRAINT_NAME)` rows into one entry per constraint.
pub fn group_foreign_keys(rows: &DataTable) -> Result<Vec<ForeignKey>> {
    let index = |name: &str| {
        rows.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                TableCheckError::Connector(format!("foreign key metadata lacks column {}", name))
            })
    };
    let column = index("COLUMN_NAME")?;
    let referenced_table = index("REFERENCED_TABLE_NAME")?;
    let referenced_column = index("REFERENCED_COLUMN_NAME")?;
    let constraint = index("CONSTRAINT_NAME")?;

    let mut grouped: IndexMap<String, ForeignKey> = IndexMap::new();
    for row in &rows.rows {
        let name = row[constraint].to_string();
        let entry = grouped.entry(name.clone()).or_insert_with(|| ForeignKey {
            name,
            columns: Vec::new(),
            referenced_table: row[referenced_table].to_string(),
            referenced_columns: Vec::new(),
        });
        entry.columns.push(row[column].to_string());
        entry.referenced_columns.push(row[referenced_column].to_string());
    }

    Ok(grouped.into_values().collect())
}
