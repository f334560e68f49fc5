//! Plain-text report.

use std::fmt::Write;

use super::{ReportInput, ReportSummary, ReportWriter};
use crate::error::Result;

const RULE: &str = "============================================================";

#[derive(Debug, Clone, Copy, Default)]
pub struct TextReport;

impl ReportWriter for TextReport {
    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, input: &ReportInput<'_>) -> Result<String> {
        let summary = ReportSummary::from_results(input.results);
        let mut out = String::new();

        // Writing to a String cannot fail.
        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, "DATA QUALITY REPORT");
        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, "Table:     {}", input.table_name);
        let _ = writeln!(out, "Generated: {}", input.generated_at.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out);
        let _ = writeln!(out, "Total checks:  {}", summary.total_checks);
        let _ = writeln!(out, "Passed:        {}", summary.passed_checks);
        let _ = writeln!(out, "Failed:        {}", summary.failed_checks);
        let _ = writeln!(out, "Success rate:  {:.1}%", summary.success_rate);
        let _ = writeln!(out);

        let _ = writeln!(out, "Issues by severity:");
        for (severity, count) in &summary.issues_by_severity {
            let _ = writeln!(out, "  {:<9} {}", severity, count);
        }

        let failed: Vec<_> = input.results.iter().filter(|r| !r.passed).collect();
        let _ = writeln!(out);
        if failed.is_empty() {
            let _ = writeln!(out, "All checks passed.");
        } else {
            let _ = writeln!(out, "Failed checks:");
            for result in failed {
                let target = match &result.column_name {
                    Some(column) => format!("{}.{}", result.table_name, column),
                    None => result.table_name.clone(),
                };
                let _ = writeln!(
                    out,
                    "  [{}] {} on {}: {} ({}/{} rows)",
                    result.severity,
                    result.rule_name,
                    target,
                    result.message,
                    result.affected_rows,
                    result.total_rows
                );
            }
        }

        Ok(out)
    }
}
