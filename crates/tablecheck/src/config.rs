//! Runtime configuration: environment settings and JSON rules files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::error::{Result, TableCheckError};
use crate::input::Parser;
use crate::validation::{
    CompletenessRule, CompletenessValidator, DuplicateRule, DuplicatesValidator, IntegrityParams,
    IntegrityRule, IntegrityValidator, NamePatternPolicy, PatternRule, PatternsValidator, Rule,
    Severity,
};

/// Prefix shared by every environment key.
pub const ENV_PREFIX: &str = "TABLECHECK_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Process-level settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Where reports are written.
    pub reports_dir: PathBuf,
    /// Default SQLite database file.
    pub database: Option<PathBuf>,
    /// Rows analyzed per table.
    pub sample_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            reports_dir: PathBuf::from("reports"),
            database: None,
            sample_size: 10_000,
        }
    }
}

impl AppConfig {
    /// Load from `TABLECHECK_*` variables of the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source. Keys are the full variable names,
    /// e.g. `TABLECHECK_SAMPLE_SIZE`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(level) = get("LOG_LEVEL") {
            let level = level.to_ascii_lowercase();
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(TableCheckError::Config(format!(
                    "unknown log level '{}', expected one of {:?}",
                    level, LOG_LEVELS
                )));
            }
            config.log_level = level;
        }
        if let Some(dir) = get("REPORTS_DIR") {
            config.reports_dir = PathBuf::from(dir);
        }
        config.database = get("DATABASE").map(PathBuf::from);
        if let Some(size) = get("SAMPLE_SIZE") {
            config.sample_size = size.parse().map_err(|_| {
                TableCheckError::Config(format!("{}SAMPLE_SIZE must be a positive integer, got '{}'", ENV_PREFIX, size))
            })?;
            if config.sample_size == 0 {
                return Err(TableCheckError::Config(format!("{}SAMPLE_SIZE must be greater than 0", ENV_PREFIX)));
            }
        }

        Ok(config)
    }
}

/// Settings of the duplicates column filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicatesConfig {
    /// Replaces the built-in unique patterns when non-empty.
    pub unique_patterns: Vec<String>,
    /// Replaces the built-in duplicate-expected patterns when non-empty.
    pub duplicate_patterns: Vec<String>,
    pub force_unique_columns: Vec<String>,
    pub allow_duplicate_columns: Vec<String>,
}

impl DuplicatesConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Each key holds a comma-separated list.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let list = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|v| split_list(&v))
                .unwrap_or_default()
        };

        Self {
            unique_patterns: list("UNIQUE_PATTERNS"),
            duplicate_patterns: list("DUPLICATE_PATTERNS"),
            force_unique_columns: list("FORCE_UNIQUE_COLUMNS"),
            allow_duplicate_columns: list("ALLOW_DUPLICATE_COLUMNS"),
        }
    }

    /// Build the column filter described by this configuration.
    pub fn skip_policy(&self) -> NamePatternPolicy {
        NamePatternPolicy::new()
            .with_unique_patterns(&self.unique_patterns)
            .with_duplicate_patterns(&self.duplicate_patterns)
            .force_unique(&self.force_unique_columns)
            .allow_duplicates(&self.allow_duplicate_columns)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn default_true() -> bool {
    true
}

/// A string or a list of strings.
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

/// Integrity rule as written in a rules file.
#[derive(Debug, Clone, Deserialize)]
pub struct IntegrityRuleSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(deserialize_with = "one_or_many")]
    pub foreign_key: Vec<String>,
    pub reference_table: String,
    #[serde(deserialize_with = "one_or_many")]
    pub reference_column: Vec<String>,
    /// CSV file holding the reference table, relative to the rules file.
    #[serde(default)]
    pub reference_file: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub allow_nulls: bool,
    #[serde(default)]
    pub allow_self_reference: bool,
}

impl IntegrityRuleSpec {
    /// Resolve into a rule, loading `reference_file` if one is named.
    pub fn into_rule(self, base_dir: &Path) -> Result<IntegrityRule> {
        let mut params = IntegrityParams::new(self.foreign_key, self.reference_table, self.reference_column)
            .allow_nulls(self.allow_nulls)
            .allow_self_reference(self.allow_self_reference);

        if let Some(file) = self.reference_file {
            let path = base_dir.join(file);
            let (data, _) = Parser::new().parse_file(&path)?;
            debug!(rule = %self.name, path = %path.display(), rows = data.row_count(), "loaded reference data");
            params = params.with_reference_data(data);
        }

        Ok(Rule::new(self.name, self.description, self.severity, params).enabled(self.enabled))
    }
}

/// Rules for each validator, loaded from JSON.
///
/// ```
/// use tablecheck::config::RuleSet;
///
/// let rules = RuleSet::from_json(r#"{
///     "completeness": [
///         {"name": "strict", "severity": "ERROR", "threshold": 1.0}
///     ],
///     "patterns": [
///         {"name": "doc", "severity": "ERROR", "pattern_type": "cpf"}
///     ]
/// }"#).unwrap();
///
/// assert_eq!(rules.completeness[0].params.threshold, 1.0);
/// assert!(rules.duplicates.is_empty());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    #[serde(default)]
    pub completeness: Vec<CompletenessRule>,
    #[serde(default)]
    pub duplicates: Vec<DuplicateRule>,
    #[serde(default)]
    pub integrity: Vec<IntegrityRuleSpec>,
    #[serde(default)]
    pub patterns: Vec<PatternRule>,
    /// Directory that `reference_file` paths are relative to.
    #[serde(skip)]
    base_dir: PathBuf,
}

impl RuleSet {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| TableCheckError::Config(format!("invalid rules file: {}", e)))
    }

    /// Read a rules file. Relative `reference_file` paths resolve against
    /// the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TableCheckError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut rules = Self::from_json(&text)?;
        rules.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        info!(path = %path.display(), count = rules.len(), "loaded rules file");
        Ok(rules)
    }

    /// Total number of rules across validators.
    pub fn len(&self) -> usize {
        self.completeness.len() + self.duplicates.len() + self.integrity.len() + self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Install the configured rules. A validator with rules in this set has
    /// its current rules replaced; the others are left untouched.
    pub fn apply(
        &self,
        completeness: &mut CompletenessValidator,
        duplicates: &mut DuplicatesValidator,
        integrity: &mut IntegrityValidator,
        patterns: &mut PatternsValidator,
    ) -> Result<()> {
        if !self.completeness.is_empty() {
            completeness.clear_rules();
            self.completeness.iter().cloned().for_each(|r| completeness.add_rule(r));
        }
        if !self.duplicates.is_empty() {
            duplicates.clear_rules();
            self.duplicates.iter().cloned().for_each(|r| duplicates.add_rule(r));
        }
        if !self.integrity.is_empty() {
            integrity.clear_rules();
            for spec in &self.integrity {
                integrity.add_rule(spec.clone().into_rule(&self.base_dir)?);
            }
        }
        if !self.patterns.is_empty() {
            patterns.clear_rules();
            self.patterns.iter().cloned().for_each(|r| patterns.add_rule(r));
        }
        Ok(())
    }
}
