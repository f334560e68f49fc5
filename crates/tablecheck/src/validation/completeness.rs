//! Null/missing value checks.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TableCheckError};
use crate::input::DataTable;

use super::result::{details, ValidationResult};
use super::rule::{Rule, Severity};
use super::validator::Validator;

fn default_threshold() -> f64 {
    1.0
}

/// Parameters of a completeness rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletenessParams {
    /// Minimum ratio of non-null values, in `[0.0, 1.0]`.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for CompletenessParams {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

pub type CompletenessRule = Rule<CompletenessParams>;

/// Checks the ratio of non-null values per column.
pub struct CompletenessValidator {
    rules: Vec<CompletenessRule>,
}

impl CompletenessValidator {
    /// Create a validator with the default 95% rule.
    pub fn new() -> Self {
        Self {
            rules: vec![Rule::new(
                "default_completeness",
                "Default completeness check requiring 95% non-null values",
                Severity::Warning,
                CompletenessParams { threshold: 0.95 },
            )],
        }
    }

    pub fn add_rule(&mut self, rule: CompletenessRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[CompletenessRule] {
        &self.rules
    }

    pub fn clear_rules(&mut self) {
        self.rules.clear();
    }

    /// Validate every column with the given rules instead of the registered ones.
    pub fn validate_table_with(
        &self,
        table: &DataTable,
        table_name: &str,
        rules: &[CompletenessRule],
    ) -> Result<Vec<ValidationResult>> {
        let mut results = Vec::new();
        for column_name in &table.headers {
            results.extend(self.validate_column_with(table, table_name, column_name, rules)?);
        }
        Ok(results)
    }

    /// Validate one column with the given rules.
    pub fn validate_column_with(
        &self,
        table: &DataTable,
        table_name: &str,
        column_name: &str,
        rules: &[CompletenessRule],
    ) -> Result<Vec<ValidationResult>> {
        let index = table
            .column_index(column_name)
            .ok_or_else(|| TableCheckError::UnknownColumn(column_name.to_string()))?;

        let total_rows = table.row_count();
        let null_count = table.column_values(index).filter(|v| v.is_null()).count();
        let non_null_count = total_rows - null_count;
        let ratio = if total_rows > 0 {
            non_null_count as f64 / total_rows as f64
        } else {
            1.0
        };
        let null_percentage = if total_rows > 0 {
            null_count as f64 / total_rows as f64 * 100.0
        } else {
            0.0
        };

        let mut results = Vec::new();
        for rule in rules.iter().filter(|r| r.enabled) {
            let threshold = rule.params.threshold;
            if !(0.0..=1.0).contains(&threshold) {
                return Err(TableCheckError::invalid_rule(
                    &rule.name,
                    format!("threshold must be between 0.0 and 1.0, got {}", threshold),
                ));
            }

            let passed = ratio >= threshold;
            let message = format!(
                "Column '{}' has {:.1}% completeness ({} {:.1}% required)",
                column_name,
                ratio * 100.0,
                if passed { ">=" } else { "<" },
                threshold * 100.0
            );

            debug!(rule = %rule.name, column = column_name, ratio, passed, "completeness checked");

            results.push(
                ValidationResult::for_rule(rule, table_name, Some(column_name), passed, message)
                    .with_details(details! {
                        "null_count" => null_count,
                        "non_null_count" => non_null_count,
                        "completeness_ratio" => ratio,
                        "threshold" => threshold,
                        "null_percentage" => null_percentage,
                    })
                    .with_rows(null_count, total_rows),
            );
        }

        Ok(results)
    }
}

impl Default for CompletenessValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for CompletenessValidator {
    fn name(&self) -> &str {
        "completeness"
    }

    fn description(&self) -> &str {
        "Validates data completeness by checking for null/missing values"
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::CellValue;

    fn ages() -> DataTable {
        DataTable::from_columns(vec![(
            "age",
            vec![1.into(), 2.into(), 3.into(), CellValue::Null, 5.into()],
        )])
    }

    #[test]
    fn test_default_rule_flags_missing_values() {
        let validator = CompletenessValidator::new();
        let results = validator.validate_table(&ages(), "people").unwrap();

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert!(!result.passed);
        assert_eq!(result.severity, Severity::Warning);
        assert_eq!(result.affected_rows, 1);
        assert_eq!(result.total_rows, 5);
        assert_eq!(result.pass_rate(), 80.0);
        assert_eq!(result.details["null_count"], 1);
        assert_eq!(result.details["completeness_ratio"], 0.8);
    }

    #[test]
    fn test_one_result_per_column_and_rule() {
        let mut validator = CompletenessValidator::new();
        validator.add_rule(Rule::new(
            "lenient",
            "",
            Severity::Info,
            CompletenessParams { threshold: 0.5 },
        ));
        let table = DataTable::from_columns(vec![
            ("a", vec![1.into(), CellValue::Null]),
            ("b", vec![1.into(), 2.into()]),
        ]);

        let results = validator.validate_table(&table, "t").unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(results[1].rule_name, "lenient");
        assert!(results[1].passed);
        assert!(results[2].passed && results[3].passed);
    }

    #[test]
    fn test_threshold_out_of_range_is_rejected() {
        let mut validator = CompletenessValidator::new();
        validator.clear_rules();
        validator.add_rule(Rule::new("bad", "", Severity::Info, CompletenessParams { threshold: 1.5 }));

        let err = validator.validate_table(&ages(), "t").unwrap_err();
        assert!(matches!(err, TableCheckError::InvalidRule { .. }));
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let mut validator = CompletenessValidator::new();
        validator.clear_rules();
        validator.add_rule(
            Rule::new("off", "", Severity::Info, CompletenessParams { threshold: 2.0 }).enabled(false),
        );

        assert!(validator.validate_table(&ages(), "t").unwrap().is_empty());
    }

    #[test]
    fn test_empty_table_is_complete() {
        let table = DataTable::empty(vec!["a".to_string()]);
        let results = CompletenessValidator::new().validate_table(&table, "t").unwrap();

        assert!(results[0].passed);
        assert_eq!(results[0].pass_rate(), 100.0);
        assert_eq!(results[0].details["completeness_ratio"], 1.0);
    }

    #[test]
    fn test_unknown_column() {
        let err = CompletenessValidator::new()
            .validate_column(&ages(), "t", "missing")
            .unwrap_err();
        assert!(matches!(err, TableCheckError::UnknownColumn(_)));
    }
}
