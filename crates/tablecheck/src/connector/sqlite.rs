//! SQLite connector.
//!
//! Uses a single `Mutex<Connection>` so the connector can be shared.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use indexmap::IndexMap;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Connector, ForeignKey};
use crate::error::{Result, TableCheckError};
use crate::input::{CellValue, DataTable};

const LIST_TABLES_QUERY: &str = "SELECT name FROM sqlite_master \
     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

const FOREIGN_KEY_LIST_QUERY: &str = "SELECT id, seq, \"table\", \"from\", \"to\" \
     FROM pragma_foreign_key_list(:table_name) ORDER BY id, seq";

const TABLE_INFO_QUERY: &str = "SELECT cid, name, type, \"notnull\", dflt_value, pk \
     FROM pragma_table_info(:table_name) ORDER BY cid";

/// Column description from `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type, empty when none was declared.
    pub data_type: String,
    pub nullable: bool,
    /// Position in the primary key (1-based), 0 when not part of it.
    pub primary_key: i64,
    pub default_value: Option<String>,
}

/// Connector over a SQLite database file.
pub struct SqliteConnector {
    conn: Mutex<Connection>,
}

impl SqliteConnector {
    /// Open an existing database file for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        debug!(path = %path.display(), "opened sqlite database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an empty in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    /// Run one or more statements that return no rows.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock_conn()?.execute_batch(sql)?;
        Ok(())
    }

    /// Describe the columns of a table.
    pub fn table_info(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let rows = self.execute(TABLE_INFO_QUERY, &[("table_name", CellValue::from(table))])?;
        if rows.row_count() == 0 {
            return Err(TableCheckError::Connector(format!("table '{}' not found", table)));
        }

        Ok(rows
            .rows
            .iter()
            .map(|row| ColumnInfo {
                name: row[1].to_string(),
                data_type: row[2].to_string(),
                nullable: !matches!(row[3], CellValue::Int(1)),
                primary_key: match row[5] {
                    CellValue::Int(pk) => pk,
                    _ => 0,
                },
                default_value: (!row[4].is_null()).then(|| row[4].to_string()),
            })
            .collect())
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TableCheckError::Connector("connection lock poisoned".to_string()))
    }

    fn primary_key_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut keyed: Vec<(i64, String)> = self
            .table_info(table)?
            .into_iter()
            .filter(|c| c.primary_key > 0)
            .map(|c| (c.primary_key, c.name))
            .collect();
        keyed.sort();
        Ok(keyed.into_iter().map(|(_, name)| name).collect())
    }
}

impl Connector for SqliteConnector {
    fn execute(&self, query: &str, params: &[(&str, CellValue)]) -> Result<DataTable> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(query)?;
        let headers: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = headers.len();

        let names: Vec<String> = params.iter().map(|(name, _)| format!(":{}", name)).collect();
        let bound: Vec<(&str, &dyn ToSql)> = names
            .iter()
            .zip(params)
            .map(|(name, (_, value))| (name.as_str(), value as &dyn ToSql))
            .collect();

        let mut table = DataTable::empty(headers);
        let mut rows = stmt.query(bound.as_slice())?;
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(cell_from_sql(row.get_ref(i)?));
            }
            table.push_row(cells);
        }

        debug!(rows = table.row_count(), "query executed");
        Ok(table)
    }

    fn list_tables(&self) -> Result<Vec<String>> {
        let rows = self.execute(LIST_TABLES_QUERY, &[])?;
        Ok(rows.column_values(0).map(ToString::to_string).collect())
    }

    /// Reads `PRAGMA foreign_key_list`. Constraints that reference the parent
    /// table's primary key implicitly are resolved through `PRAGMA table_info`.
    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>> {
        let rows = self.execute(FOREIGN_KEY_LIST_QUERY, &[("table_name", CellValue::from(table))])?;

        let mut grouped: IndexMap<String, (String, Vec<String>, Vec<Option<String>>)> =
            IndexMap::new();
        for row in &rows.rows {
            let id = row[0].to_string();
            let entry = grouped
                .entry(id)
                .or_insert_with(|| (row[2].to_string(), Vec::new(), Vec::new()));
            entry.1.push(row[3].to_string());
            entry.2.push((!row[4].is_null()).then(|| row[4].to_string()));
        }

        let mut keys = Vec::with_capacity(grouped.len());
        for (id, (referenced_table, columns, targets)) in grouped {
            let referenced_columns = if targets.iter().all(Option::is_some) {
                targets.into_iter().flatten().collect()
            } else {
                self.primary_key_columns(&referenced_table)?
            };
            keys.push(ForeignKey {
                name: format!("{}_fk_{}", table, id),
                columns,
                referenced_table,
                referenced_columns,
            });
        }

        Ok(keys)
    }
}

fn cell_from_sql(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(i) => CellValue::Int(i),
        ValueRef::Real(f) => CellValue::Float(f),
        ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => CellValue::Text(format!("<blob {} bytes>", bytes.len())),
    }
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
            CellValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            CellValue::Int(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            CellValue::Float(f) => ToSqlOutput::Owned(Value::Real(*f)),
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> SqliteConnector {
        let connector = SqliteConnector::open_in_memory().unwrap();
        connector
            .execute_batch(
                "PRAGMA foreign_keys = OFF;
                 CREATE TABLE clients (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
                 CREATE TABLE orders (
                     id INTEGER PRIMARY KEY,
                     client_id INTEGER REFERENCES clients(id),
                     parent_id INTEGER REFERENCES orders,
                     total REAL
                 );
                 INSERT INTO clients VALUES (1, 'Ana'), (2, 'Bruno');
                 INSERT INTO orders VALUES (10, 1, NULL, 9.5), (11, 3, 10, NULL);",
            )
            .unwrap();
        connector
    }

    #[test]
    fn test_execute_maps_types() {
        let connector = fixture();
        let table = connector
            .execute(
                "SELECT id, client_id, total FROM orders WHERE id = :id",
                &[("id", CellValue::Int(10))],
            )
            .unwrap();

        assert_eq!(table.headers, vec!["id", "client_id", "total"]);
        assert_eq!(table.rows, vec![vec![CellValue::Int(10), CellValue::Int(1), CellValue::Float(9.5)]]);
    }

    #[test]
    fn test_list_tables_and_count() {
        let connector = fixture();
        assert_eq!(connector.list_tables().unwrap(), vec!["clients", "orders"]);
        assert_eq!(connector.row_count("orders").unwrap(), 2);
        connector.test_connection().unwrap();
    }

    #[test]
    fn test_foreign_keys_resolve_implicit_primary_key() {
        let connector = fixture();
        let mut keys = connector.foreign_keys("orders").unwrap();
        keys.sort_by(|a, b| a.columns.cmp(&b.columns));

        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].columns, vec!["client_id"]);
        assert_eq!(keys[0].referenced_table, "clients");
        assert_eq!(keys[0].referenced_columns, vec!["id"]);
        assert_eq!(keys[1].columns, vec!["parent_id"]);
        assert_eq!(keys[1].referenced_table, "orders");
        assert_eq!(keys[1].referenced_columns, vec!["id"]);
        assert!(keys.iter().all(|k| k.name.starts_with("orders_fk_")));
    }

    #[test]
    fn test_table_info() {
        let connector = fixture();
        let columns = connector.table_info("clients").unwrap();

        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].primary_key, 1);
        assert_eq!(columns[1].data_type, "TEXT");
        assert!(!columns[1].nullable);
        assert!(connector.table_info("missing").is_err());
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SqliteConnector::open(dir.path().join("absent.db")).is_err());
    }
}
