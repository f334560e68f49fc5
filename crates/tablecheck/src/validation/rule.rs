//! Rule configuration and severity levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TableCheckError;

/// Severity level of a rule, in increasing order of impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Informational only, may not require action.
    #[serde(alias = "info")]
    Info,
    /// Potential issue that should be reviewed.
    #[serde(alias = "warning")]
    Warning,
    /// Definite issue that should be addressed.
    #[serde(alias = "error")]
    Error,
    /// Blocks downstream use of the data.
    #[serde(alias = "critical")]
    Critical,
}

impl Severity {
    /// All severities, lowest first.
    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    /// Upper-case label used in results and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = TableCheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            other => Err(TableCheckError::Config(format!(
                "unknown severity '{}'",
                other
            ))),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Declarative configuration for one check.
///
/// `P` is the parameter type of the validator that owns the rule, so a
/// completeness rule can never carry duplicate-check parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule<P> {
    /// Identifier, unique within its validator.
    pub name: String,
    /// Human-readable purpose.
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    /// Disabled rules are skipped entirely.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(flatten)]
    pub params: P,
}

impl<P> Rule<P> {
    /// Create an enabled rule.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        params: P,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            severity,
            enabled: true,
            params,
        }
    }

    /// Set the enabled flag.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
        assert_eq!(Severity::ALL.iter().max(), Some(&Severity::Critical));
    }

    #[test]
    fn test_severity_serde() {
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"CRITICAL\"");
        let parsed: Severity = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(parsed, Severity::Warning);
        let parsed: Severity = serde_json::from_str("\"ERROR\"").unwrap();
        assert_eq!(parsed, Severity::Error);
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("Info".parse::<Severity>().unwrap(), Severity::Info);
        assert_eq!("CRITICAL".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn test_rule_defaults_enabled() {
        #[derive(Debug, Deserialize)]
        struct Params {
            threshold: f64,
        }

        let rule: Rule<Params> =
            serde_json::from_str(r#"{"name": "r", "severity": "INFO", "threshold": 0.5}"#).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.description, "");
        assert_eq!(rule.params.threshold, 0.5);
    }
}
