//! Tabular data model and source metadata.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata about a data file that was loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without path.
    pub file: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Detected format (csv, tsv, etc.).
    pub format: String,
    /// Number of data rows (excluding header).
    pub row_count: usize,
    /// Number of columns.
    pub column_count: usize,
    /// When the file was loaded.
    pub loaded_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Create metadata for a file that has been parsed.
    pub fn new(
        path: PathBuf,
        hash: String,
        size_bytes: u64,
        format: String,
        row_count: usize,
        column_count: usize,
    ) -> Self {
        let file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            file,
            path,
            hash,
            size_bytes,
            format,
            row_count,
            column_count,
            loaded_at: Utc::now(),
        }
    }
}

/// A single cell of a [`DataTable`].
///
/// Equality and hashing treat an integral float as the matching integer and
/// NaN as null, so keys coming from differently typed sources still line up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(PartialEq, Eq, Hash)]
enum CellKey<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(&'a str),
}

impl CellValue {
    /// Whether this cell represents a missing value.
    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Whether this cell is null or an empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Text(s) => s.is_empty(),
            other => other.is_null(),
        }
    }

    /// Borrow the text content, if this is a text cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a native JSON value for reports and result details.
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Null => Value::Null,
            CellValue::Bool(b) => Value::Bool(*b),
            CellValue::Int(i) => Value::from(*i),
            CellValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            CellValue::Text(s) => Value::String(s.clone()),
        }
    }

    fn key(&self) -> CellKey<'_> {
        match self {
            CellValue::Null => CellKey::Null,
            CellValue::Bool(b) => CellKey::Bool(*b),
            CellValue::Int(i) => CellKey::Int(*i),
            CellValue::Float(f) if f.is_nan() => CellKey::Null,
            CellValue::Float(f)
                if f.fract() == 0.0 && *f >= -9.223_372_036_854_775e18 && *f < 9.223_372_036_854_775e18 =>
            {
                CellKey::Int(*f as i64)
            }
            CellValue::Float(f) => CellKey::Float(f.to_bits()),
            CellValue::Text(s) => CellKey::Text(s),
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for CellValue {}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&CellValue> for Value {
    fn from(cell: &CellValue) -> Self {
        cell.to_json()
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        CellValue::Int(i64::from(v))
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Bool(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Null)
    }
}

static NULL_CELL: CellValue = CellValue::Null;

/// Represents a fully materialized table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    /// Column headers.
    pub headers: Vec<String>,
    /// Row data (row-major order).
    pub rows: Vec<Vec<CellValue>>,
}

impl DataTable {
    /// Create a new data table. Rows are padded with nulls or truncated to
    /// the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Null);
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Create an empty table with the given headers.
    pub fn empty(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Build a table from named columns. Shorter columns are padded with nulls.
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Vec<CellValue>)>) -> Self {
        let row_count = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let mut headers = Vec::with_capacity(columns.len());
        let mut rows = vec![Vec::with_capacity(columns.len()); row_count];

        for (name, values) in columns {
            headers.push(name.into());
            let mut values = values.into_iter();
            for row in rows.iter_mut() {
                row.push(values.next().unwrap_or(CellValue::Null));
            }
        }

        Self { headers, rows }
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Get the number of rows (excluding header).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Whether the table has a column with this name.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Get all values for a column by index.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &CellValue> {
        self.rows
            .iter()
            .map(move |row| row.get(index).unwrap_or(&NULL_CELL))
    }

    /// Get a column by name.
    pub fn column_by_name(&self, name: &str) -> Option<Vec<&CellValue>> {
        let index = self.column_index(name)?;
        Some(self.column_values(index).collect())
    }

    /// Get a specific cell value.
    pub fn get(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Sub-table with only the named columns, in the given order.
    ///
    /// Returns the names that are missing when any column is not found.
    pub fn select(&self, columns: &[String]) -> std::result::Result<DataTable, Vec<String>> {
        let mut indices = Vec::with_capacity(columns.len());
        let mut missing = Vec::new();
        for name in columns {
            match self.column_index(name) {
                Some(i) => indices.push(i),
                None => missing.push(name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(Self {
            headers: columns.to_vec(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.headers.len(), CellValue::Null);
        self.rows.push(row);
    }

    /// Keep only the first `n` rows.
    pub fn head(&self, n: usize) -> DataTable {
        Self {
            headers: self.headers.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Uniform random sample of `n` rows, keeping their original order.
    ///
    /// Returns a full copy when the table already has `n` rows or fewer.
    pub fn sample(&self, n: usize, seed: Option<u64>) -> DataTable {
        if n >= self.row_count() {
            return self.clone();
        }

        let mut rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };

        // Reservoir sampling over row indices
        let mut picked: Vec<usize> = (0..n).collect();
        for i in n..self.row_count() {
            let j = rng.usize(..=i);
            if j < n {
                picked[j] = i;
            }
        }
        picked.sort_unstable();

        Self {
            headers: self.headers.clone(),
            rows: picked.into_iter().map(|i| self.rows[i].clone()).collect(),
        }
    }

    /// Rough in-memory footprint of the cell data, in bytes.
    pub fn estimated_memory_bytes(&self) -> usize {
        let cell = std::mem::size_of::<CellValue>();
        let headers: usize = self.headers.iter().map(|h| h.len()).sum();
        let cells: usize = self
            .rows
            .iter()
            .flatten()
            .map(|c| cell + c.as_str().map(str::len).unwrap_or(0))
            .sum();
        headers + cells
    }
}
