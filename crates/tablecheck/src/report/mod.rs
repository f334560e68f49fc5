//! Report rendering and writing.

mod json;
mod summary;
mod text;

pub use json::JsonReport;
pub use summary::{validator_category, CheckCounts, ReportSummary};
pub use text::TextReport;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde_json::Value;
use tracing::info;

use crate::error::{Result, TableCheckError};
use crate::validation::ValidationResult;

/// Everything a report is rendered from.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub table_name: &'a str,
    pub results: &'a [ValidationResult],
    /// Free-form metadata (volumetry, sampling, source).
    pub metadata: &'a Value,
    pub generated_at: DateTime<Local>,
}

impl<'a> ReportInput<'a> {
    pub fn new(table_name: &'a str, results: &'a [ValidationResult], metadata: &'a Value) -> Self {
        Self {
            table_name,
            results,
            metadata,
            generated_at: Local::now(),
        }
    }
}

/// A report format.
pub trait ReportWriter {
    /// File extension, without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, input: &ReportInput<'_>) -> Result<String>;

    /// Render and write to `data_quality_report_<table>_<YYYYmmdd_HHMMSS>.<ext>`
    /// inside `dir`, creating it if needed.
    fn write(&self, dir: &Path, input: &ReportInput<'_>) -> Result<PathBuf> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| TableCheckError::Io { path, source }
        };

        fs::create_dir_all(dir).map_err(io_err(dir))?;
        let path = dir.join(report_file_name(input, self.extension()));
        fs::write(&path, self.render(input)?).map_err(io_err(&path))?;

        info!(path = %path.display(), "report written");
        Ok(path)
    }
}

/// Writer for a format name (`json` or `txt`).
pub fn writer_for(format: &str) -> Result<Box<dyn ReportWriter>> {
    match format.to_ascii_lowercase().as_str() {
        "json" => Ok(Box::new(JsonReport)),
        "txt" | "text" => Ok(Box::new(TextReport)),
        other => Err(TableCheckError::Config(format!(
            "unsupported report format '{}', expected json or txt",
            other
        ))),
    }
}

fn report_file_name(input: &ReportInput<'_>, extension: &str) -> String {
    let table: String = input
        .table_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    format!(
        "data_quality_report_{}_{}.{}",
        table,
        input.generated_at.format("%Y%m%d_%H%M%S"),
        extension
    )
}
