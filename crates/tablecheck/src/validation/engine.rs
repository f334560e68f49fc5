//! Registry of validators and the fan-out driver that runs them.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use chrono::Utc;
use indexmap::IndexMap;
use tracing::{debug, info, instrument, warn};

use crate::input::DataTable;

use super::result::{Details, ValidationResult};
use super::rule::Severity;
use super::validator::Validator;

/// Runs registered validators and isolates their failures.
///
/// A validator that returns an error or panics produces a single CRITICAL
/// result named `<validator>_error`; the remaining validators still run.
pub struct ValidationEngine {
    validators: IndexMap<String, Box<dyn Validator>>,
}

impl ValidationEngine {
    /// Create an engine with no validators.
    pub fn new() -> Self {
        Self {
            validators: IndexMap::new(),
        }
    }

    /// Register a validator under its name.
    ///
    /// Registering a second validator with the same name replaces the first
    /// one but keeps its original position in the run order.
    pub fn register_validator(&mut self, validator: Box<dyn Validator>) {
        let name = validator.name().to_string();
        if self.validators.insert(name.clone(), validator).is_some() {
            debug!(validator = %name, "replaced registered validator");
        }
    }

    /// Builder-style registration.
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.register_validator(Box::new(validator));
        self
    }

    /// Look up a validator by name.
    pub fn get_validator(&self, name: &str) -> Option<&dyn Validator> {
        self.validators.get(name).map(|v| v.as_ref())
    }

    /// Names of registered validators in registration order.
    pub fn validator_names(&self) -> Vec<&str> {
        self.validators.keys().map(String::as_str).collect()
    }

    /// Run validators against a table.
    ///
    /// With an empty `names` slice every registered validator runs in
    /// registration order. Otherwise only the named validators run, in the
    /// order given; unknown names are skipped.
    #[instrument(skip(self, table, names), fields(rows = table.row_count()))]
    pub fn validate(
        &self,
        table: &DataTable,
        table_name: &str,
        names: &[&str],
    ) -> Vec<ValidationResult> {
        let selected: Vec<&dyn Validator> = if names.is_empty() {
            self.validators.values().map(|v| v.as_ref()).collect()
        } else {
            names
                .iter()
                .filter_map(|name| {
                    let found = self.get_validator(name);
                    if found.is_none() {
                        debug!(validator = %name, "skipping unknown validator");
                    }
                    found
                })
                .collect()
        };

        info!(validators = selected.len(), "running validation");

        let mut results = Vec::new();
        for validator in selected {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                validator.validate_table(table, table_name)
            }));

            let error = match outcome {
                Ok(Ok(found)) => {
                    debug!(validator = validator.name(), results = found.len(), "validator finished");
                    results.extend(found);
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(payload) => panic_message(payload.as_ref()),
            };

            warn!(validator = validator.name(), error = %error, "validator failed");
            results.push(failure_result(validator.name(), table_name, &error));
        }

        results
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn failure_result(validator: &str, table_name: &str, error: &str) -> ValidationResult {
    let mut details = Details::new();
    details.insert("error".to_string(), error.into());

    ValidationResult {
        rule_name: format!("{}_error", validator),
        table_name: table_name.to_string(),
        column_name: None,
        severity: Severity::Critical,
        passed: false,
        message: format!("Validator {} failed: {}", validator, error),
        details,
        timestamp: Utc::now(),
        affected_rows: 0,
        total_rows: 0,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "validator panicked".to_string()
    }
}
