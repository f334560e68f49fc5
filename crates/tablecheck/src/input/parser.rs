//! CSV/TSV parser with delimiter detection and column typing.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use super::source::{CellValue, DataTable, SourceMetadata};
use crate::error::{Result, TableCheckError};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Delimiter to use (None = auto-detect).
    pub delimiter: Option<u8>,
    /// Whether the file has a header row.
    pub has_header: bool,
    /// Maximum rows to read (None = all).
    pub max_rows: Option<usize>,
    /// Quote character.
    pub quote: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            max_rows: None,
            quote: b'"',
        }
    }
}

/// Parses delimited data files into typed tables.
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a file and return the data table and metadata.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(DataTable, SourceMetadata)> {
        let path = path.as_ref();
        let io_err = |source| TableCheckError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path).map_err(io_err)?;
        let size_bytes = file.metadata().map_err(io_err)?.len();

        let mut contents = Vec::new();
        file.read_to_end(&mut contents).map_err(io_err)?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => detect_delimiter(&contents)?,
        };

        let table = self.parse_bytes(&contents, delimiter)?;

        let format = match delimiter {
            b'\t' => "tsv",
            b',' => "csv",
            b';' => "csv-semicolon",
            b'|' => "psv",
            _ => "delimited",
        }
        .to_string();

        debug!(
            path = %path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            format = %format,
            "parsed data file"
        );

        let metadata = SourceMetadata::new(
            path.to_path_buf(),
            hash,
            size_bytes,
            format,
            table.row_count(),
            table.column_count(),
        );

        Ok((table, metadata))
    }

    /// Parse in-memory bytes with a known delimiter.
    pub fn parse_bytes(&self, bytes: &[u8], delimiter: u8) -> Result<DataTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(self.config.has_header)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let mut raw_rows: Vec<Vec<String>> = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            if let Some(max) = self.config.max_rows {
                if row_idx >= max {
                    break;
                }
            }
            let record = result?;
            raw_rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        let headers: Vec<String> = if self.config.has_header {
            reader.headers()?.iter().map(|s| s.trim().to_string()).collect()
        } else {
            match raw_rows.first() {
                Some(first) => (0..first.len()).map(|i| format!("column_{}", i + 1)).collect(),
                None => return Err(TableCheckError::EmptyData("No data rows found".to_string())),
            }
        };

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(TableCheckError::EmptyData("No columns found".to_string()));
        }

        let width = headers.len();
        for row in raw_rows.iter_mut() {
            row.resize(width, String::new());
        }

        let kinds: Vec<ColumnKind> = (0..width)
            .map(|col| infer_column_kind(raw_rows.iter().map(|r| r[col].as_str())))
            .collect();

        let rows = raw_rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&kinds)
                    .map(|(raw, kind)| kind.convert(&raw))
                    .collect()
            })
            .collect();

        Ok(DataTable::new(headers, rows))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if a raw value represents a missing/null value.
pub fn is_null_token(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("na")
        || trimmed.eq_ignore_ascii_case("n/a")
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("none")
        || trimmed.eq_ignore_ascii_case("nil")
        || trimmed == "."
        || trimmed == "-"
}

/// Storage type chosen for a whole column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Bool,
    Text,
}

impl ColumnKind {
    fn convert(self, raw: &str) -> CellValue {
        if is_null_token(raw) {
            return CellValue::Null;
        }
        let trimmed = raw.trim();
        match self {
            ColumnKind::Int => trimmed.parse().map(CellValue::Int).unwrap_or(CellValue::Null),
            ColumnKind::Float => trimmed.parse().map(CellValue::Float).unwrap_or(CellValue::Null),
            ColumnKind::Bool => parse_bool(trimmed).map(CellValue::Bool).unwrap_or(CellValue::Null),
            ColumnKind::Text => CellValue::Text(raw.to_string()),
        }
    }
}

/// Pick the narrowest type every non-null value fits.
///
/// Values with a leading zero stay text so identifiers like `00123` survive.
fn infer_column_kind<'a>(values: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut int_ok = true;
    let mut float_ok = true;
    let mut bool_ok = true;
    let mut seen = false;

    for value in values {
        if is_null_token(value) {
            continue;
        }
        seen = true;
        let trimmed = value.trim();

        if int_ok && (has_leading_zero(trimmed) || trimmed.parse::<i64>().is_err()) {
            int_ok = false;
        }
        if float_ok && (has_leading_zero(trimmed) || trimmed.parse::<f64>().is_err()) {
            float_ok = false;
        }
        if bool_ok && parse_bool(trimmed).is_none() {
            bool_ok = false;
        }
        if !int_ok && !float_ok && !bool_ok {
            return ColumnKind::Text;
        }
    }

    if !seen {
        ColumnKind::Text
    } else if int_ok {
        ColumnKind::Int
    } else if float_ok {
        ColumnKind::Float
    } else if bool_ok {
        ColumnKind::Bool
    } else {
        ColumnKind::Text
    }
}

fn has_leading_zero(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.")
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .filter_map(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(TableCheckError::EmptyData("No lines to analyze".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        let consistent = counts.iter().all(|&c| c == first_count);
        let variance: f64 = if counts.len() > 1 {
            let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
            counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum::<f64>() / counts.len() as f64
        } else {
            0.0
        };

        // Higher count with lower variance wins; tab gets a small bonus
        let score = if consistent {
            first_count * 1000 + (if delim == b'\t' { 100 } else { 0 })
        } else if variance < 1.0 {
            first_count * 100
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_delimiter_csv() {
        let data = b"a,b,c\n1,2,3\n4,5,6";
        assert_eq!(detect_delimiter(data).unwrap(), b',');
    }

    #[test]
    fn test_detect_delimiter_tsv() {
        let data = b"a\tb\tc\n1\t2\t3\n4\t5\t6";
        assert_eq!(detect_delimiter(data).unwrap(), b'\t');
    }

    #[test]
    fn test_parse_csv_types_columns() {
        let parser = Parser::new();
        let data = b"name,age,score,active\nAlice,30,1.5,true\nBob,NA,2,false";
        let table = parser.parse_bytes(data, b',').unwrap();

        assert_eq!(table.headers, vec!["name", "age", "score", "active"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get(0, 0), Some(&CellValue::from("Alice")));
        assert_eq!(table.get(0, 1), Some(&CellValue::Int(30)));
        assert_eq!(table.get(1, 1), Some(&CellValue::Null));
        assert!(matches!(table.get(1, 2), Some(CellValue::Float(_))));
        assert_eq!(table.get(1, 3), Some(&CellValue::Bool(false)));
    }

    #[test]
    fn test_leading_zero_identifiers_stay_text() {
        let parser = Parser::new();
        let data = b"cpf\n01234567890\n12345678909";
        let table = parser.parse_bytes(data, b',').unwrap();

        assert_eq!(table.get(0, 0), Some(&CellValue::from("01234567890")));
        assert_eq!(table.get(1, 0), Some(&CellValue::from("12345678909")));
    }

    #[test]
    fn test_max_rows() {
        let parser = Parser::with_config(ParserConfig {
            max_rows: Some(1),
            ..ParserConfig::default()
        });
        let table = parser.parse_bytes(b"a\n1\n2\n3", b',').unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_is_null_token() {
        assert!(is_null_token(""));
        assert!(is_null_token("NA"));
        assert!(is_null_token("na"));
        assert!(is_null_token("N/A"));
        assert!(is_null_token("null"));
        assert!(is_null_token("NULL"));
        assert!(is_null_token("."));
        assert!(!is_null_token("value"));
        assert!(!is_null_token("0"));
    }
}
