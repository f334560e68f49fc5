//! Outcome of applying one rule to a table or column.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use super::rule::{Rule, Severity};

/// Check-specific diagnostic data, in insertion order.
pub type Details = IndexMap<String, Value>;

/// Result of one rule applied to one table or column.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValidationResult {
    pub rule_name: String,
    pub table_name: String,
    /// `None` for table-wide and composite-key checks.
    pub column_name: Option<String>,
    /// Copied from the rule that produced this result.
    pub severity: Severity,
    pub passed: bool,
    pub message: String,
    pub details: Details,
    pub timestamp: DateTime<Utc>,
    pub affected_rows: usize,
    pub total_rows: usize,
}

impl ValidationResult {
    /// Create a result for the given rule. Severity and rule name come from
    /// the rule itself.
    pub fn for_rule<P>(
        rule: &Rule<P>,
        table_name: &str,
        column_name: Option<&str>,
        passed: bool,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_name: rule.name.clone(),
            table_name: table_name.to_string(),
            column_name: column_name.map(str::to_string),
            severity: rule.severity,
            passed,
            message: message.into(),
            details: Details::new(),
            timestamp: Utc::now(),
            affected_rows: 0,
            total_rows: 0,
        }
    }

    /// Set the details map.
    pub fn with_details(mut self, details: Details) -> Self {
        self.details = details;
        self
    }

    /// Set affected and total row counts.
    pub fn with_rows(mut self, affected_rows: usize, total_rows: usize) -> Self {
        self.affected_rows = affected_rows;
        self.total_rows = total_rows;
        self
    }

    /// Percentage of rows not affected; 100.0 when there are no rows.
    pub fn pass_rate(&self) -> f64 {
        if self.total_rows == 0 {
            return 100.0;
        }
        (self.total_rows as f64 - self.affected_rows as f64) / self.total_rows as f64 * 100.0
    }

    /// Plain JSON form used by report writers.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Serialize)]
struct ResultRecord<'a> {
    rule_name: &'a str,
    table_name: &'a str,
    column_name: Option<&'a str>,
    severity: Severity,
    passed: bool,
    message: &'a str,
    details: &'a Details,
    timestamp: &'a DateTime<Utc>,
    affected_rows: usize,
    total_rows: usize,
    pass_rate: f64,
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ResultRecord {
            rule_name: &self.rule_name,
            table_name: &self.table_name,
            column_name: self.column_name.as_deref(),
            severity: self.severity,
            passed: self.passed,
            message: &self.message,
            details: &self.details,
            timestamp: &self.timestamp,
            affected_rows: self.affected_rows,
            total_rows: self.total_rows,
            pass_rate: self.pass_rate(),
        }
        .serialize(serializer)
    }
}

/// Build a [`Details`] map from `key => value` pairs.
macro_rules! details {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut map = $crate::validation::Details::new();
        $(map.insert($key.to_string(), ::serde_json::json!($value));)*
        map
    }};
}

pub(crate) use details;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule() -> Rule<()> {
        Rule::new("r", "test rule", Severity::Warning, ())
    }

    #[test]
    fn test_pass_rate() {
        let result = ValidationResult::for_rule(&rule(), "t", Some("c"), false, "m").with_rows(1, 5);
        assert_eq!(result.pass_rate(), 80.0);

        let empty = ValidationResult::for_rule(&rule(), "t", None, true, "m");
        assert_eq!(empty.pass_rate(), 100.0);
    }

    #[test]
    fn test_severity_copied_from_rule() {
        let result = ValidationResult::for_rule(&rule(), "t", None, true, "m");
        assert_eq!(result.severity, Severity::Warning);
        assert_eq!(result.rule_name, "r");
    }

    #[test]
    fn test_serialization_includes_pass_rate() {
        let result = ValidationResult::for_rule(&rule(), "orders", Some("id"), false, "bad")
            .with_rows(2, 4)
            .with_details(details! { "null_count" => 2, "ratio" => 0.5 });

        let value = result.to_json();
        assert_eq!(value["severity"], json!("WARNING"));
        assert_eq!(value["pass_rate"], json!(50.0));
        assert_eq!(value["details"]["null_count"], json!(2));
        assert_eq!(value["column_name"], json!("id"));

        let keys: Vec<&str> = value["details"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert!(keys.contains(&"ratio"));
    }

    #[test]
    fn test_deserialize_ignores_pass_rate() {
        let result = ValidationResult::for_rule(&rule(), "t", None, true, "ok").with_rows(0, 3);
        let text = serde_json::to_string(&result).unwrap();
        let back: ValidationResult = serde_json::from_str(&text).unwrap();
        assert_eq!(back, result);
    }
}
