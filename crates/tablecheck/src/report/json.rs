//! JSON report.

use serde_json::{json, Value};

use super::{ReportInput, ReportSummary, ReportWriter};
use crate::error::Result;

/// Writes `{"report": {generated_at, table_name, metadata, summary, results}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReport;

impl JsonReport {
    pub fn to_value(&self, input: &ReportInput<'_>) -> Value {
        json!({
            "report": {
                "generated_at": input.generated_at.to_rfc3339(),
                "table_name": input.table_name,
                "metadata": input.metadata,
                "summary": ReportSummary::from_results(input.results),
                "results": input.results,
            }
        })
    }
}

impl ReportWriter for JsonReport {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, input: &ReportInput<'_>) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value(input))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{Rule, Severity, ValidationResult};

    #[test]
    fn test_report_structure() {
        let rule = Rule::new("default_completeness", "", Severity::Warning, ());
        let results = vec![
            ValidationResult::for_rule(&rule, "orders", Some("a"), true, "ok").with_rows(0, 4),
            ValidationResult::for_rule(&rule, "orders", Some("b"), false, "bad").with_rows(1, 4),
        ];
        let metadata = json!({"data_volume": {"row_count": 4}});
        let input = ReportInput::new("orders", &results, &metadata);

        let value = JsonReport.to_value(&input);
        let report = &value["report"];
        assert_eq!(report["table_name"], "orders");
        assert_eq!(report["metadata"]["data_volume"]["row_count"], 4);
        assert_eq!(report["summary"]["total_checks"], 2);
        assert_eq!(report["summary"]["failed_checks"], 1);
        assert_eq!(report["results"][1]["pass_rate"], 75.0);
        assert!(report["generated_at"].is_string());
    }

    #[test]
    fn test_write_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/reports");
        let metadata = json!({});
        let input = ReportInput::new("orders", &[], &metadata);

        let path = JsonReport.write(&out, &input).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["report"]["summary"]["success_rate"], 100.0);
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("data_quality_report_orders_"));
    }
}
