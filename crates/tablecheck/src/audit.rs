//! High-level entry point: load a table, sample it and run the validators.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::config::{DuplicatesConfig, RuleSet};
use crate::connector::Connector;
use crate::error::{Result, TableCheckError};
use crate::input::{DataTable, Parser, ParserConfig, SamplingInfo, SourceMetadata, VolumetryMetrics};
use crate::report::ReportSummary;
use crate::validation::{
    CompletenessValidator, DuplicatesValidator, IntegrityValidator, PatternsValidator,
    ValidationEngine, ValidationResult,
};

/// Configuration for an audit run.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Parser configuration for file input.
    pub parser: ParserConfig,
    /// Maximum rows analyzed per table.
    pub sample_size: usize,
    /// Take a uniform random sample instead of the first rows.
    pub random_sample: bool,
    /// Seed for reproducible random samples.
    pub seed: Option<u64>,
    /// Validators to run, by name (empty = all).
    pub validators: Vec<String>,
    /// Column filter of the duplicates check.
    pub duplicates: DuplicatesConfig,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            sample_size: 10_000,
            random_sample: false,
            seed: None,
            validators: Vec::new(),
            duplicates: DuplicatesConfig::default(),
        }
    }
}

/// Outcome of auditing one table.
#[derive(Debug, Clone, Serialize)]
pub struct AuditResult {
    pub table_name: String,
    /// Present when the table was loaded from a file.
    pub source: Option<SourceMetadata>,
    pub columns: Vec<String>,
    pub volumetry: VolumetryMetrics,
    pub sampling: SamplingInfo,
    pub results: Vec<ValidationResult>,
    pub summary: ReportSummary,
    pub duration_seconds: f64,
}

impl AuditResult {
    /// Failed results, most severe first.
    pub fn failures(&self) -> Vec<&ValidationResult> {
        let mut failed: Vec<&ValidationResult> = self.results.iter().filter(|r| !r.passed).collect();
        failed.sort_by(|a, b| b.severity.cmp(&a.severity));
        failed
    }

    /// Metadata block embedded in written reports.
    pub fn report_metadata(&self) -> Value {
        json!({
            "table_name": self.table_name,
            "data_volume": self.volumetry,
            "sampling_info": self.sampling,
            "table_structure": { "columns": self.columns },
            "source": self.source,
            "duration_seconds": self.duration_seconds,
        })
    }
}

/// Runs the four validators over a table from a file, a database or memory.
pub struct TableAudit {
    config: AuditConfig,
    parser: Parser,
    rules: Option<RuleSet>,
    connector: Option<Arc<dyn Connector>>,
}

impl TableAudit {
    /// Create an audit with default configuration.
    pub fn new() -> Self {
        Self::with_config(AuditConfig::default())
    }

    pub fn with_config(config: AuditConfig) -> Self {
        let parser = Parser::with_config(config.parser.clone());
        Self {
            config,
            parser,
            rules: None,
            connector: None,
        }
    }

    /// Database used to load tables and discover foreign keys.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Rules replacing the validators' defaults.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Build an engine with the four validators, rules applied.
    pub fn build_engine(&self) -> Result<ValidationEngine> {
        let mut completeness = CompletenessValidator::new();
        let mut duplicates =
            DuplicatesValidator::new().with_skip_policy(self.config.duplicates.skip_policy());
        let mut integrity = match &self.connector {
            Some(connector) => IntegrityValidator::new().with_connector(Arc::clone(connector)),
            None => IntegrityValidator::new(),
        };
        let mut patterns = PatternsValidator::new();

        if let Some(rules) = &self.rules {
            rules.apply(&mut completeness, &mut duplicates, &mut integrity, &mut patterns)?;
        }

        Ok(ValidationEngine::new()
            .with_validator(completeness)
            .with_validator(duplicates)
            .with_validator(integrity)
            .with_validator(patterns))
    }

    /// Audit a table read through the connector.
    #[instrument(skip(self))]
    pub fn audit_table(&self, table_name: &str) -> Result<AuditResult> {
        let connector = self.connector.as_ref().ok_or_else(|| {
            TableCheckError::Config("a database connector is required to audit a table".to_string())
        })?;

        let total_rows = connector.row_count(table_name)?;
        let data = if total_rows <= self.config.sample_size {
            connector.fetch_table(table_name, None)?
        } else if self.config.random_sample {
            info!(total_rows, sample = self.config.sample_size, "sampling table at random");
            connector
                .fetch_table(table_name, None)?
                .sample(self.config.sample_size, self.config.seed)
        } else {
            info!(total_rows, sample = self.config.sample_size, "analyzing first rows");
            connector.fetch_table(table_name, Some(self.config.sample_size))?
        };

        self.run(data, table_name, total_rows, None)
    }

    /// Audit a delimited file. The table is named after the file stem.
    pub fn audit_file(&self, path: impl AsRef<Path>) -> Result<AuditResult> {
        let path = path.as_ref();
        let table_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.audit_file_as(path, &table_name)
    }

    /// Audit a delimited file under the given table name.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn audit_file_as(&self, path: impl AsRef<Path>, table_name: &str) -> Result<AuditResult> {
        let (table, source) = self.parser.parse_file(path)?;
        let total_rows = table.row_count();
        let data = self.take_sample(table);
        self.run(data, table_name, total_rows, Some(source))
    }

    /// Audit a table already in memory, sampling it as configured.
    pub fn audit_data(&self, table: DataTable, table_name: &str) -> Result<AuditResult> {
        let total_rows = table.row_count();
        let data = self.take_sample(table);
        self.run(data, table_name, total_rows, None)
    }

    fn take_sample(&self, table: DataTable) -> DataTable {
        if table.row_count() <= self.config.sample_size {
            table
        } else if self.config.random_sample {
            table.sample(self.config.sample_size, self.config.seed)
        } else {
            table.head(self.config.sample_size)
        }
    }

    fn run(
        &self,
        data: DataTable,
        table_name: &str,
        total_rows: usize,
        source: Option<SourceMetadata>,
    ) -> Result<AuditResult> {
        let started = Instant::now();
        let engine = self.build_engine()?;
        let names: Vec<&str> = self.config.validators.iter().map(String::as_str).collect();
        let results = engine.validate(&data, table_name, &names);
        let summary = ReportSummary::from_results(&results);

        info!(
            table = table_name,
            checks = summary.total_checks,
            failed = summary.failed_checks,
            "audit finished"
        );

        Ok(AuditResult {
            table_name: table_name.to_string(),
            source,
            columns: data.headers.clone(),
            volumetry: VolumetryMetrics::from_table(&data),
            sampling: SamplingInfo::new(total_rows, data.row_count()),
            results,
            summary,
            duration_seconds: started.elapsed().as_secs_f64(),
        })
    }
}

impl Default for TableAudit {
    fn default() -> Self {
        Self::new()
    }
}
