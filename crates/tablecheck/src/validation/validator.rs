//! The validator capability shared by all checks.

use crate::error::Result;
use crate::input::DataTable;

use super::result::ValidationResult;

/// A category of data-quality check that owns its rules.
///
/// Validators hold configuration only; every call is a pure function of the
/// table passed in. Callers must not change a validator's rules while a
/// validation call is running.
pub trait Validator {
    /// Registry key, unique within an engine.
    fn name(&self) -> &str;

    /// Human-readable purpose.
    fn description(&self) -> &str;

    /// Apply every enabled rule to the whole table.
    fn validate_table(&self, table: &DataTable, table_name: &str) -> Result<Vec<ValidationResult>>;

    /// Apply every enabled rule to a single column.
    fn validate_column(
        &self,
        table: &DataTable,
        table_name: &str,
        column_name: &str,
    ) -> Result<Vec<ValidationResult>>;
}
