//! Aggregate statistics over a list of results.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::validation::{Severity, ValidationResult};

/// Pass/fail counts for one group of results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckCounts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl CheckCounts {
    fn record(&mut self, passed: bool) {
        self.total += 1;
        if passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Summary block of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_checks: usize,
    pub passed_checks: usize,
    pub failed_checks: usize,
    /// Percentage of passed checks; 100.0 with no checks.
    pub success_rate: f64,
    /// Keyed by severity label, most severe first, only severities present.
    pub severity_breakdown: IndexMap<String, CheckCounts>,
    /// Keyed by validator category, in order of first appearance.
    pub validator_breakdown: IndexMap<String, CheckCounts>,
    /// Failed checks per severity label, every severity listed.
    pub issues_by_severity: IndexMap<String, usize>,
}

impl ReportSummary {
    pub fn from_results(results: &[ValidationResult]) -> Self {
        let total_checks = results.len();
        let passed_checks = results.iter().filter(|r| r.passed).count();
        let failed_checks = total_checks - passed_checks;
        let success_rate = if total_checks == 0 {
            100.0
        } else {
            passed_checks as f64 / total_checks as f64 * 100.0
        };

        let mut severity_breakdown = IndexMap::new();
        let mut issues_by_severity = IndexMap::new();
        for severity in Severity::ALL.iter().rev() {
            let mut counts = CheckCounts::default();
            for result in results.iter().filter(|r| r.severity == *severity) {
                counts.record(result.passed);
            }
            if counts.total > 0 {
                severity_breakdown.insert(severity.to_string(), counts);
            }
            issues_by_severity.insert(severity.to_string(), counts.failed);
        }

        let mut validator_breakdown: IndexMap<String, CheckCounts> = IndexMap::new();
        for result in results {
            validator_breakdown
                .entry(validator_category(&result.rule_name).to_string())
                .or_default()
                .record(result.passed);
        }

        Self {
            total_checks,
            passed_checks,
            failed_checks,
            success_rate,
            severity_breakdown,
            validator_breakdown,
            issues_by_severity,
        }
    }

    /// Failed checks at or above the given severity.
    pub fn failures_at_or_above(&self, severity: Severity) -> usize {
        Severity::ALL
            .iter()
            .filter(|s| **s >= severity)
            .filter_map(|s| self.issues_by_severity.get(s.as_str()))
            .sum()
    }
}

/// Validator family a rule belongs to, judged from its name.
pub fn validator_category(rule_name: &str) -> &'static str {
    let name = rule_name.to_lowercase();
    let has = |fragments: &[&str]| fragments.iter().any(|f| name.contains(f));

    if has(&["completeness"]) {
        "completeness"
    } else if has(&["uniqueness", "duplicate"]) {
        "duplicates"
    } else if has(&["integrity", "referential", "fk_"]) {
        "integrity"
    } else if has(&["pattern", "cnpj", "cpf", "email"]) {
        "patterns"
    } else {
        "unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Rule;

    fn result(name: &str, severity: Severity, passed: bool) -> ValidationResult {
        ValidationResult::for_rule(&Rule::new(name, "", severity, ()), "t", None, passed, "")
    }

    #[test]
    fn test_empty_summary() {
        let summary = ReportSummary::from_results(&[]);
        assert_eq!(summary.total_checks, 0);
        assert_eq!(summary.success_rate, 100.0);
        assert!(summary.severity_breakdown.is_empty());
        assert_eq!(summary.issues_by_severity.len(), 4);
    }

    #[test]
    fn test_breakdowns() {
        let results = vec![
            result("default_completeness", Severity::Warning, true),
            result("default_completeness", Severity::Warning, false),
            result("default_uniqueness", Severity::Error, false),
            result("auto_fk_orders_fk_0", Severity::Error, true),
            result("default_pattern_check", Severity::Info, true),
            result("something_else", Severity::Critical, false),
        ];
        let summary = ReportSummary::from_results(&results);

        assert_eq!(summary.passed_checks, 3);
        assert_eq!(summary.failed_checks, 3);
        assert_eq!(summary.success_rate, 50.0);

        let severities: Vec<&str> = summary.severity_breakdown.keys().map(String::as_str).collect();
        assert_eq!(severities, ["CRITICAL", "ERROR", "WARNING", "INFO"]);
        assert_eq!(summary.severity_breakdown["ERROR"], CheckCounts { total: 2, passed: 1, failed: 1 });

        assert_eq!(summary.validator_breakdown["completeness"].total, 2);
        assert_eq!(summary.validator_breakdown["duplicates"].failed, 1);
        assert_eq!(summary.validator_breakdown["integrity"].passed, 1);
        assert_eq!(summary.validator_breakdown["patterns"].total, 1);
        assert_eq!(summary.validator_breakdown["unknown"].failed, 1);

        assert_eq!(summary.failures_at_or_above(Severity::Error), 2);
        assert_eq!(summary.failures_at_or_above(Severity::Info), 3);
    }

    #[test]
    fn test_validator_category() {
        assert_eq!(validator_category("Completeness_Strict"), "completeness");
        assert_eq!(validator_category("no_duplicates"), "duplicates");
        assert_eq!(validator_category("fk_client"), "integrity");
        assert_eq!(validator_category("valid_cpf"), "patterns");
        assert_eq!(validator_category("unsupported_operation"), "unknown");
    }
}
