//! Duplicate value checks over single columns and composite keys.

use std::cmp::Reverse;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, TableCheckError};
use crate::input::{CellValue, DataTable};

use super::result::{details, ValidationResult};
use super::rule::{Rule, Severity};
use super::skip_policy::{ColumnSkipPolicy, NamePatternPolicy};
use super::validator::Validator;

const MAX_SAMPLE_VALUES: usize = 10;
const MAX_SAMPLE_COMBINATIONS: usize = 5;

fn default_ignore_nulls() -> bool {
    true
}

/// Parameters of a duplicates rule.
///
/// With `columns` set the rule checks that column combination as a composite
/// key; otherwise every column is checked on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateParams {
    /// Number of duplicates tolerated before the rule fails.
    #[serde(default)]
    pub max_duplicates: i64,
    /// Drop nulls before counting; otherwise nulls are equal to each other.
    #[serde(default = "default_ignore_nulls")]
    pub ignore_nulls: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
}

impl Default for DuplicateParams {
    fn default() -> Self {
        Self {
            max_duplicates: 0,
            ignore_nulls: true,
            columns: None,
        }
    }
}

impl DuplicateParams {
    /// Composite-key parameters with no duplicates allowed.
    pub fn composite<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: Some(columns.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }
}

pub type DuplicateRule = Rule<DuplicateParams>;

/// Checks uniqueness of column values and composite keys.
pub struct DuplicatesValidator {
    rules: Vec<DuplicateRule>,
    skip_policy: Box<dyn ColumnSkipPolicy>,
}

impl DuplicatesValidator {
    /// Create a validator with the default no-duplicates rule and the
    /// built-in column name patterns.
    pub fn new() -> Self {
        Self {
            rules: vec![Rule::new(
                "default_uniqueness",
                "Default uniqueness check - no duplicate values allowed",
                Severity::Error,
                DuplicateParams::default(),
            )],
            skip_policy: Box::new(NamePatternPolicy::default()),
        }
    }

    /// Replace the policy that decides which columns are skipped in
    /// single-column mode.
    pub fn with_skip_policy(mut self, policy: impl ColumnSkipPolicy + 'static) -> Self {
        self.skip_policy = Box::new(policy);
        self
    }

    pub fn add_rule(&mut self, rule: DuplicateRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[DuplicateRule] {
        &self.rules
    }

    pub fn clear_rules(&mut self) {
        self.rules.clear();
    }

    /// Validate the table with the given rules instead of the registered ones.
    ///
    /// Results are grouped by rule, then by column.
    pub fn validate_table_with(
        &self,
        table: &DataTable,
        table_name: &str,
        rules: &[DuplicateRule],
    ) -> Result<Vec<ValidationResult>> {
        let checked: Vec<&str> = table
            .headers
            .iter()
            .filter(|name| {
                let skip = self.skip_policy.should_skip(name);
                if skip {
                    debug!(column = %name, "skipping column for duplicate check");
                }
                !skip
            })
            .map(String::as_str)
            .collect();

        let mut results = Vec::new();
        for rule in rules.iter().filter(|r| r.enabled) {
            let max_duplicates = check_max_duplicates(rule)?;
            match &rule.params.columns {
                Some(columns) => {
                    results.push(self.check_composite(table, table_name, rule, columns, max_duplicates)?)
                }
                None => {
                    for column_name in &checked {
                        results.push(self.check_column(table, table_name, column_name, rule, max_duplicates)?);
                    }
                }
            }
        }

        Ok(results)
    }

    /// Validate one column with the given rules. Composite-key rules are
    /// ignored and the skip policy is not consulted.
    pub fn validate_column_with(
        &self,
        table: &DataTable,
        table_name: &str,
        column_name: &str,
        rules: &[DuplicateRule],
    ) -> Result<Vec<ValidationResult>> {
        let mut results = Vec::new();
        for rule in rules.iter().filter(|r| r.enabled && r.params.columns.is_none()) {
            let max_duplicates = check_max_duplicates(rule)?;
            results.push(self.check_column(table, table_name, column_name, rule, max_duplicates)?);
        }
        Ok(results)
    }

    fn check_column(
        &self,
        table: &DataTable,
        table_name: &str,
        column_name: &str,
        rule: &DuplicateRule,
        max_duplicates: usize,
    ) -> Result<ValidationResult> {
        let index = table
            .column_index(column_name)
            .ok_or_else(|| TableCheckError::UnknownColumn(column_name.to_string()))?;
        let ignore_nulls = rule.params.ignore_nulls;

        let total_rows = table.row_count();
        let mut non_null_rows = 0;
        let mut counted = 0;
        let mut counts: IndexMap<&CellValue, usize> = IndexMap::new();
        for value in table.column_values(index) {
            let is_null = value.is_null();
            if !is_null {
                non_null_rows += 1;
            }
            if is_null && ignore_nulls {
                continue;
            }
            counted += 1;
            *counts.entry(value).or_default() += 1;
        }

        let unique_count = counts.len();
        let duplicate_count = counted - unique_count;
        let passed = duplicate_count <= max_duplicates;

        let message = if passed && duplicate_count == 0 {
            format!("Column '{}' has no duplicate values", column_name)
        } else {
            format!(
                "Column '{}' has {} duplicate values ({} {} allowed)",
                column_name,
                duplicate_count,
                if passed { "<=" } else { ">" },
                max_duplicates
            )
        };

        // Most frequent first; ties keep first-seen order
        let mut repeated: Vec<(&CellValue, usize)> =
            counts.into_iter().filter(|(_, count)| *count > 1).collect();
        repeated.sort_by_key(|(_, count)| Reverse(*count));
        let duplicate_values: Vec<Value> = repeated
            .iter()
            .take(MAX_SAMPLE_VALUES)
            .map(|(value, _)| value.to_json())
            .collect();

        Ok(
            ValidationResult::for_rule(rule, table_name, Some(column_name), passed, message)
                .with_details(details! {
                    "unique_count" => unique_count,
                    "duplicate_count" => duplicate_count,
                    "total_rows" => total_rows,
                    "non_null_rows" => non_null_rows,
                    "duplicate_values" => duplicate_values,
                    "max_duplicates" => max_duplicates,
                    "ignore_nulls" => ignore_nulls,
                })
                .with_rows(duplicate_count, total_rows),
        )
    }

    fn check_composite(
        &self,
        table: &DataTable,
        table_name: &str,
        rule: &DuplicateRule,
        columns: &[String],
        max_duplicates: usize,
    ) -> Result<ValidationResult> {
        if columns.is_empty() {
            return Err(TableCheckError::invalid_rule(
                &rule.name,
                "composite key needs at least one column",
            ));
        }
        let key_table = table.select(columns).map_err(|missing| TableCheckError::MissingColumns {
            rule: rule.name.clone(),
            columns: missing,
        })?;
        let ignore_nulls = rule.params.ignore_nulls;

        let mut counts: IndexMap<&[CellValue], usize> = IndexMap::new();
        let mut total_combinations = 0;
        for row in &key_table.rows {
            if ignore_nulls && row.iter().any(CellValue::is_null) {
                continue;
            }
            total_combinations += 1;
            *counts.entry(row.as_slice()).or_default() += 1;
        }

        let unique_combinations = counts.len();
        let duplicate_combinations = total_combinations - unique_combinations;
        let passed = duplicate_combinations <= max_duplicates;

        let columns_str = columns.join(", ");
        let message = if passed && duplicate_combinations == 0 {
            format!("Composite key ({}) has no duplicate combinations", columns_str)
        } else {
            format!(
                "Composite key ({}) has {} duplicate combinations ({} {} allowed)",
                columns_str,
                duplicate_combinations,
                if passed { "<=" } else { ">" },
                max_duplicates
            )
        };

        let sample_duplicates: Vec<Value> = counts
            .iter()
            .filter(|(_, count)| **count > 1)
            .take(MAX_SAMPLE_COMBINATIONS)
            .map(|(key, _)| Value::Array(key.iter().map(CellValue::to_json).collect()))
            .collect();

        debug!(
            rule = %rule.name,
            columns = %columns_str,
            duplicate_combinations,
            "composite key checked"
        );

        Ok(ValidationResult::for_rule(rule, table_name, None, passed, message)
            .with_details(details! {
                "composite_key_columns" => columns,
                "unique_combinations" => unique_combinations,
                "duplicate_combinations" => duplicate_combinations,
                "total_combinations" => total_combinations,
                "sample_duplicates" => sample_duplicates,
                "max_duplicates" => max_duplicates,
                "ignore_nulls" => ignore_nulls,
            })
            .with_rows(duplicate_combinations, table.row_count()))
    }
}

fn check_max_duplicates(rule: &DuplicateRule) -> Result<usize> {
    usize::try_from(rule.params.max_duplicates).map_err(|_| {
        TableCheckError::invalid_rule(
            &rule.name,
            format!("max_duplicates must be >= 0, got {}", rule.params.max_duplicates),
        )
    })
}

impl Default for DuplicatesValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for DuplicatesValidator {
    fn name(&self) -> &str {
        "duplicates"
    }

    fn description(&self) -> &str {
        "Validates data uniqueness by checking for duplicate values"
    }

    fn validate_table(&self, table: &DataTable, table_name: &str) -> Result<Vec<ValidationResult>> {
        self.validate_table_with(table, table_name, &self.rules)
    }

    fn validate_column(
        &self,
        table: &DataTable,
        table_name: &str,
        column_name: &str,
    ) -> Result<Vec<ValidationResult>> {
        self.validate_column_with(table, table_name, column_name, &self.rules)
    }
}
