//! Format checks for identifiers, emails, phone numbers and postal codes.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TableCheckError};
use crate::input::{CellValue, DataTable};

use super::checksum::{is_valid_cnpj, is_valid_cpf};
use super::result::{details, ValidationResult};
use super::rule::{Rule, Severity};
use super::validator::Validator;

const MAX_SAMPLE_VALUES: usize = 10;

/// A built-in format.
struct BuiltinPattern {
    key: &'static str,
    regex: &'static str,
    description: &'static str,
    checksum: Option<fn(&str) -> bool>,
}

const CNPJ: BuiltinPattern = BuiltinPattern {
    key: "cnpj",
    regex: r"^\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}$",
    description: "Brazilian CNPJ format",
    checksum: Some(is_valid_cnpj),
};

const CPF: BuiltinPattern = BuiltinPattern {
    key: "cpf",
    regex: r"^\d{3}\.?\d{3}\.?\d{3}-?\d{2}$",
    description: "Brazilian CPF format",
    checksum: Some(is_valid_cpf),
};

const EMAIL: BuiltinPattern = BuiltinPattern {
    key: "email",
    regex: r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$",
    description: "Email format",
    checksum: None,
};

const PHONE_BR: BuiltinPattern = BuiltinPattern {
    key: "phone_br",
    regex: r"^(\(\d{2}\)\s?)?\d{4,5}-?\d{4}$",
    description: "Brazilian phone format",
    checksum: None,
};

const CEP: BuiltinPattern = BuiltinPattern {
    key: "cep",
    regex: r"^\d{5}-?\d{3}$",
    description: "Brazilian CEP format",
    checksum: None,
};

static CNPJ_RE: Lazy<Regex> = Lazy::new(|| Regex::new(CNPJ.regex).expect("valid CNPJ regex"));
static CPF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(CPF.regex).expect("valid CPF regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(EMAIL.regex).expect("valid email regex"));
static PHONE_BR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(PHONE_BR.regex).expect("valid phone regex"));
static CEP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(CEP.regex).expect("valid CEP regex"));

/// Which format a patterns rule checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern_type", rename_all = "snake_case")]
pub enum PatternType {
    /// Pick a built-in format from the column name.
    AutoDetect,
    Cnpj,
    Cpf,
    Email,
    PhoneBr,
    Cep,
    /// Caller-supplied regex, matched against the whole value.
    Regex {
        regex_pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl PatternType {
    /// Infer a built-in format from a column name.
    pub fn detect(column_name: &str) -> Option<PatternType> {
        let name = column_name.to_lowercase();
        if name.contains("cnpj") {
            Some(PatternType::Cnpj)
        } else if name.contains("cpf") {
            Some(PatternType::Cpf)
        } else if name.contains("email") || name.contains("mail") {
            Some(PatternType::Email)
        } else if name.contains("phone") || name.contains("telefone") || name.contains("fone") {
            Some(PatternType::PhoneBr)
        } else if name.contains("cep") {
            Some(PatternType::Cep)
        } else {
            None
        }
    }
}

fn default_allow_nulls() -> bool {
    true
}

/// Parameters of a patterns rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternParams {
    #[serde(flatten)]
    pub pattern_type: PatternType,
    /// Treat null and empty values as valid.
    #[serde(default = "default_allow_nulls")]
    pub allow_nulls: bool,
}

impl PatternParams {
    pub fn new(pattern_type: PatternType) -> Self {
        Self {
            pattern_type,
            allow_nulls: true,
        }
    }

    /// Parameters for a custom full-match regex.
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::new(PatternType::Regex {
            regex_pattern: pattern.into(),
            description: None,
        })
    }
}

impl Default for PatternParams {
    fn default() -> Self {
        Self::new(PatternType::AutoDetect)
    }
}

pub type PatternRule = Rule<PatternParams>;

/// A format resolved for one rule application.
struct Matcher<'a> {
    key: &'static str,
    description: Cow<'a, str>,
    regex_text: Cow<'a, str>,
    regex: Cow<'a, Regex>,
    checksum: Option<fn(&str) -> bool>,
}

impl Matcher<'_> {
    fn builtin(pattern: &BuiltinPattern, regex: &'static Regex) -> Self {
        Self {
            key: pattern.key,
            description: Cow::Borrowed(pattern.description),
            regex_text: Cow::Borrowed(pattern.regex),
            regex: Cow::Borrowed(regex),
            checksum: pattern.checksum,
        }
    }

    /// Checksum formats ignore the layout; everything else is a full regex match.
    fn is_match(&self, value: &str) -> bool {
        match self.checksum {
            Some(check) => check(value),
            None => self.regex.is_match(value),
        }
    }
}

/// Checks values against built-in or custom formats.
pub struct PatternsValidator {
    rules: Vec<PatternRule>,
}

impl PatternsValidator {
    /// Create a validator with the default auto-detecting rule.
    pub fn new() -> Self {
        Self {
            rules: vec![Rule::new(
                "default_pattern_check",
                "Default pattern validation",
                Severity::Info,
                PatternParams::default(),
            )],
        }
    }

    pub fn add_rule(&mut self, rule: PatternRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[PatternRule] {
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
        rules: &[PatternRule],
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
        rules: &[PatternRule],
    ) -> Result<Vec<ValidationResult>> {
        let index = table
            .column_index(column_name)
            .ok_or_else(|| TableCheckError::UnknownColumn(column_name.to_string()))?;

        let mut results = Vec::new();
        for rule in rules.iter().filter(|r| r.enabled) {
            results.push(self.check_column(table, index, table_name, column_name, rule)?);
        }
        Ok(results)
    }

    fn check_column(
        &self,
        table: &DataTable,
        index: usize,
        table_name: &str,
        column_name: &str,
        rule: &PatternRule,
    ) -> Result<ValidationResult> {
        let total_rows = table.row_count();

        let pattern_type = match &rule.params.pattern_type {
            PatternType::AutoDetect => match PatternType::detect(column_name) {
                Some(detected) => Cow::Owned(detected),
                None => {
                    return Ok(ValidationResult::for_rule(
                        rule,
                        table_name,
                        Some(column_name),
                        true,
                        format!("No specific pattern detected for column '{}'", column_name),
                    )
                    .with_details(details! {
                        "pattern_type" => "none",
                        "auto_detected" => true,
                        "column_name" => column_name,
                    })
                    .with_rows(0, total_rows));
                }
            },
            explicit => Cow::Borrowed(explicit),
        };

        let matcher = matcher_for(&pattern_type, &rule.name)?;
        let allow_nulls = rule.params.allow_nulls;

        let mut valid_count = 0;
        let mut invalid_count = 0;
        let mut null_count = 0;
        let mut invalid_values = Vec::new();

        for value in table.column_values(index) {
            if value.is_blank() {
                null_count += 1;
                if allow_nulls {
                    valid_count += 1;
                }
                continue;
            }

            let text = cell_text(value);
            let text = text.trim();
            if matcher.is_match(text) {
                valid_count += 1;
            } else {
                invalid_count += 1;
                if invalid_values.len() < MAX_SAMPLE_VALUES {
                    invalid_values.push(text.to_string());
                }
            }
        }

        let null_violations = if allow_nulls { 0 } else { null_count };
        let passed = invalid_count == 0;

        let message = if invalid_count > 0 {
            let mut issues = vec![format!("{} invalid format", invalid_count)];
            if null_violations > 0 {
                issues.push(format!("{} null values", null_violations));
            }
            format!("Pattern validation failed: {}", issues.join(", "))
        } else if null_count > 0 && allow_nulls {
            format!(
                "All {} non-null values match {} pattern ({} nulls allowed)",
                valid_count - null_count,
                matcher.key,
                null_count
            )
        } else if null_violations > 0 {
            format!(
                "All {} non-null values match {} pattern ({} null values not allowed)",
                valid_count, matcher.key, null_violations
            )
        } else {
            format!("All {} values match {} pattern", valid_count, matcher.key)
        };

        let validity_ratio = if total_rows > 0 {
            valid_count as f64 / total_rows as f64
        } else {
            1.0
        };

        debug!(rule = %rule.name, column = column_name, pattern = matcher.key, invalid_count, "pattern checked");

        Ok(
            ValidationResult::for_rule(rule, table_name, Some(column_name), passed, message)
                .with_details(details! {
                    "pattern_type" => matcher.key,
                    "pattern_description" => &*matcher.description,
                    "regex_pattern" => &*matcher.regex_text,
                    "valid_count" => valid_count,
                    "invalid_count" => invalid_count,
                    "null_count" => null_count,
                    "null_violations" => null_violations,
                    "allow_nulls" => allow_nulls,
                    "invalid_values" => invalid_values,
                    "validity_ratio" => validity_ratio,
                })
                .with_rows(invalid_count, total_rows),
        )
    }
}

/// Resolve a concrete pattern type. Custom regexes are anchored so they must
/// match the whole value.
fn matcher_for<'a>(pattern_type: &'a PatternType, rule_name: &str) -> Result<Matcher<'a>> {
    let matcher = match pattern_type {
        PatternType::Cnpj => Matcher::builtin(&CNPJ, &CNPJ_RE),
        PatternType::Cpf => Matcher::builtin(&CPF, &CPF_RE),
        PatternType::Email => Matcher::builtin(&EMAIL, &EMAIL_RE),
        PatternType::PhoneBr => Matcher::builtin(&PHONE_BR, &PHONE_BR_RE),
        PatternType::Cep => Matcher::builtin(&CEP, &CEP_RE),
        PatternType::Regex {
            regex_pattern,
            description,
        } => {
            if regex_pattern.is_empty() {
                return Err(TableCheckError::invalid_rule(
                    rule_name,
                    "regex_pattern is required for custom regex validation",
                ));
            }
            let regex = Regex::new(&format!("^(?:{})$", regex_pattern)).map_err(|e| {
                TableCheckError::invalid_rule(rule_name, format!("invalid regex_pattern: {}", e))
            })?;
            Matcher {
                key: "regex",
                description: Cow::Borrowed(description.as_deref().unwrap_or("Custom regex pattern")),
                regex_text: Cow::Borrowed(regex_pattern.as_str()),
                regex: Cow::Owned(regex),
                checksum: None,
            }
        }
        PatternType::AutoDetect => {
            return Err(TableCheckError::invalid_rule(
                rule_name,
                "auto_detect must be resolved to a concrete pattern",
            ));
        }
    };
    Ok(matcher)
}

fn cell_text(value: &CellValue) -> Cow<'_, str> {
    match value {
        CellValue::Text(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}

impl Default for PatternsValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for PatternsValidator {
    fn name(&self) -> &str {
        "patterns"
    }

    fn description(&self) -> &str {
        "Validates data format patterns (CNPJ, CPF, email, phone, etc.)"
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
    use serde_json::json;

    fn single(name: &str, values: Vec<CellValue>) -> DataTable {
        DataTable::from_columns(vec![(name, values)])
    }

    fn with_rule(params: PatternParams) -> PatternsValidator {
        let mut validator = PatternsValidator::new();
        validator.clear_rules();
        validator.add_rule(Rule::new("p", "", Severity::Warning, params));
        validator
    }

    #[test]
    fn test_auto_detect_cpf_with_checksum() {
        let table = single(
            "cpf_cliente",
            vec!["123.456.789-09".into(), "111.111.111-11".into(), CellValue::Null],
        );

        let results = PatternsValidator::new().validate_table(&table, "t").unwrap();
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert!(!result.passed);
        assert_eq!(result.severity, Severity::Info);
        assert_eq!(result.affected_rows, 1);
        assert_eq!(result.details["pattern_type"], "cpf");
        assert_eq!(result.details["invalid_values"], json!(["111.111.111-11"]));
        assert_eq!(result.details["null_count"], 1);
        assert_eq!(result.details["valid_count"], 2);
    }

    #[test]
    fn test_no_pattern_detected() {
        let table = single("amount", vec![1.into()]);
        let results = PatternsValidator::new().validate_table(&table, "t").unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].passed);
        assert_eq!(results[0].details["pattern_type"], "none");
        assert_eq!(results[0].details["auto_detected"], true);
    }

    #[test]
    fn test_checksum_formats_ignore_layout() {
        let table = single(
            "doc",
            vec![
                "11-444-777-0001-61".into(),
                "11.444.777/0001-61".into(),
                "11444777000162".into(),
            ],
        );
        let validator = with_rule(PatternParams::new(PatternType::Cnpj));

        let result = &validator.validate_table(&table, "t").unwrap()[0];
        assert_eq!(result.details["valid_count"], 2);
        assert_eq!(result.details["invalid_values"], json!(["11444777000162"]));

        let table = single("doc", vec!["123 456 789 09".into(), "123.456.789-09".into()]);
        let validator = with_rule(PatternParams::new(PatternType::Cpf));

        let result = &validator.validate_table(&table, "t").unwrap()[0];
        assert!(result.passed);
        assert_eq!(result.details["invalid_count"], 0);
    }

    #[test]
    fn test_nulls_are_never_invalid() {
        let table = single("email", vec!["a@b.com".into(), "".into(), CellValue::Null]);
        let validator = with_rule(PatternParams {
            pattern_type: PatternType::Email,
            allow_nulls: false,
        });

        let result = &validator.validate_table(&table, "t").unwrap()[0];
        assert!(result.passed);
        assert_eq!(result.affected_rows, 0);
        assert_eq!(result.details["invalid_count"], 0);
        assert_eq!(result.details["null_count"], 2);
        assert_eq!(result.details["null_violations"], 2);
        assert_eq!(result.details["valid_count"], 1);
    }

    #[test]
    fn test_custom_regex_is_full_match() {
        let table = single("code", vec!["AB12".into(), "xAB12".into(), "AB123".into()]);
        let validator = with_rule(PatternParams::regex("[A-Z]{2}\\d{2}"));

        let result = &validator.validate_table(&table, "t").unwrap()[0];
        assert_eq!(result.details["invalid_count"], 2);
        assert_eq!(result.details["pattern_type"], "regex");
        assert_eq!(result.details["pattern_description"], "Custom regex pattern");
    }

    #[test]
    fn test_invalid_custom_regex_is_rule_error() {
        let table = single("code", vec!["a".into()]);
        let validator = with_rule(PatternParams::regex("("));

        let err = validator.validate_table(&table, "t").unwrap_err();
        assert!(matches!(err, TableCheckError::InvalidRule { .. }));
    }

    #[test]
    fn test_numeric_cells_are_stringified() {
        let table = single("cep", vec![CellValue::Int(1310100), "01310-100".into()]);
        let result = &PatternsValidator::new().validate_table(&table, "t").unwrap()[0];

        // 1310100 lost its leading zero and has only 7 digits
        assert_eq!(result.details["invalid_values"], json!(["1310100"]));
    }

    #[test]
    fn test_detect() {
        assert_eq!(PatternType::detect("CNPJ"), Some(PatternType::Cnpj));
        assert_eq!(PatternType::detect("e_mail"), Some(PatternType::Email));
        assert_eq!(PatternType::detect("telefone_fixo"), Some(PatternType::PhoneBr));
        assert_eq!(PatternType::detect("cep_entrega"), Some(PatternType::Cep));
        assert_eq!(PatternType::detect("id"), None);
    }

    #[test]
    fn test_params_from_json() {
        let params: PatternParams =
            serde_json::from_str(r#"{"pattern_type": "phone_br", "allow_nulls": false}"#).unwrap();
        assert_eq!(params.pattern_type, PatternType::PhoneBr);
        assert!(!params.allow_nulls);

        let params: PatternParams =
            serde_json::from_str(r#"{"pattern_type": "regex", "regex_pattern": "\\d+"}"#).unwrap();
        assert!(params.allow_nulls);
        assert!(matches!(params.pattern_type, PatternType::Regex { .. }));
    }
}
