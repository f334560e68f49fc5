//! Referential integrity checks for single and composite foreign keys.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::connector::{select_distinct_query, Connector};
use crate::error::{Result, TableCheckError};
use crate::input::{CellValue, DataTable};

use super::result::{details, ValidationResult};
use super::rule::{Rule, Severity};
use super::validator::Validator;

const MAX_SAMPLE_VALUES: usize = 10;

/// Where the referenced key values come from.
#[derive(Clone)]
pub enum ReferenceSource {
    /// Literal reference table.
    Data(DataTable),
    /// Fetched with `SELECT DISTINCT` when the rule runs.
    Connector(Arc<dyn Connector>),
}

impl fmt::Debug for ReferenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceSource::Data(table) => f
                .debug_struct("Data")
                .field("columns", &table.headers)
                .field("rows", &table.row_count())
                .finish(),
            ReferenceSource::Connector(_) => f.write_str("Connector"),
        }
    }
}

/// Parameters of a foreign-key rule.
#[derive(Debug, Clone)]
pub struct IntegrityParams {
    /// Referencing columns in the validated table.
    pub foreign_key: Vec<String>,
    pub reference_table: String,
    /// Referenced columns, same arity as `foreign_key`.
    pub reference_column: Vec<String>,
    /// Falls back to the validator's connector when `None`.
    pub reference: Option<ReferenceSource>,
    /// Null foreign keys count as valid.
    pub allow_nulls: bool,
    /// When the reference table is the validated table, accept its own key
    /// values (hierarchies such as `parent_id`).
    pub allow_self_reference: bool,
}

impl IntegrityParams {
    pub fn new<S, T>(
        foreign_key: impl IntoIterator<Item = S>,
        reference_table: impl Into<String>,
        reference_column: impl IntoIterator<Item = T>,
    ) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            foreign_key: foreign_key.into_iter().map(Into::into).collect(),
            reference_table: reference_table.into(),
            reference_column: reference_column.into_iter().map(Into::into).collect(),
            reference: None,
            allow_nulls: true,
            allow_self_reference: false,
        }
    }

    pub fn with_reference_data(mut self, data: DataTable) -> Self {
        self.reference = Some(ReferenceSource::Data(data));
        self
    }

    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.reference = Some(ReferenceSource::Connector(connector));
        self
    }

    pub fn allow_nulls(mut self, allow: bool) -> Self {
        self.allow_nulls = allow;
        self
    }

    pub fn allow_self_reference(mut self, allow: bool) -> Self {
        self.allow_self_reference = allow;
        self
    }
}

pub type IntegrityRule = Rule<IntegrityParams>;

/// Checks that foreign-key values exist in the referenced key set.
///
/// Each rule is isolated: a rule with bad parameters or an unreachable
/// reference produces a failed result instead of aborting the other rules.
pub struct IntegrityValidator {
    rules: Vec<IntegrityRule>,
    connector: Option<Arc<dyn Connector>>,
}

impl IntegrityValidator {
    /// Create a validator with no rules and no connector.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            connector: None,
        }
    }

    /// Use a connector for auto-discovery and as the default reference source.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn add_rule(&mut self, rule: IntegrityRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[IntegrityRule] {
        &self.rules
    }

    pub fn clear_rules(&mut self) {
        self.rules.clear();
    }

    /// Validate with the given rules. With no rules and a connector, rules
    /// are synthesized from the table's declared foreign keys.
    pub fn validate_table_with(
        &self,
        table: &DataTable,
        table_name: &str,
        rules: &[IntegrityRule],
    ) -> Vec<ValidationResult> {
        let rules: Cow<'_, [IntegrityRule]> = match &self.connector {
            Some(connector) if rules.is_empty() => {
                Cow::Owned(auto_discover(connector, table_name))
            }
            _ => Cow::Borrowed(rules),
        };

        rules
            .iter()
            .filter(|r| r.enabled)
            .map(|rule| {
                self.check_foreign_key(table, table_name, rule)
                    .unwrap_or_else(|e| {
                        warn!(rule = %rule.name, error = %e, "integrity rule failed");
                        let error = e.to_string();
                        ValidationResult::for_rule(
                            rule,
                            table_name,
                            None,
                            false,
                            format!("Validation failed: {}", error),
                        )
                        .with_details(details! { "error" => error })
                        .with_rows(0, table.row_count())
                    })
            })
            .collect()
    }

    fn reference_data<'a>(&self, rule: &'a IntegrityRule) -> Result<Cow<'a, DataTable>> {
        let connector = match &rule.params.reference {
            Some(ReferenceSource::Data(data)) => return Ok(Cow::Borrowed(data)),
            Some(ReferenceSource::Connector(connector)) => connector,
            None => self.connector.as_ref().ok_or_else(|| {
                TableCheckError::invalid_rule(
                    &rule.name,
                    "either reference data or a connector must be provided",
                )
            })?,
        };

        let query = select_distinct_query(&rule.params.reference_table, &rule.params.reference_column)?;
        debug!(rule = %rule.name, query = %query, "fetching reference keys");
        Ok(Cow::Owned(connector.execute(&query, &[])?))
    }

    fn check_foreign_key(
        &self,
        table: &DataTable,
        table_name: &str,
        rule: &IntegrityRule,
    ) -> Result<ValidationResult> {
        let params = &rule.params;
        if params.foreign_key.is_empty() {
            return Err(TableCheckError::invalid_rule(&rule.name, "foreign_key parameter is required"));
        }
        if params.reference_table.is_empty() {
            return Err(TableCheckError::invalid_rule(&rule.name, "reference_table parameter is required"));
        }
        if params.reference_column.is_empty() {
            return Err(TableCheckError::invalid_rule(&rule.name, "reference_column parameter is required"));
        }
        if params.foreign_key.len() != params.reference_column.len() {
            return Err(TableCheckError::invalid_rule(
                &rule.name,
                "foreign_key and reference_column must have same length",
            ));
        }

        let fk_table = table.select(&params.foreign_key).map_err(|missing| {
            TableCheckError::MissingColumns {
                rule: rule.name.clone(),
                columns: missing,
            }
        })?;

        let reference = self.reference_data(rule)?;
        let ref_table = reference.select(&params.reference_column).map_err(|missing| {
            TableCheckError::invalid_rule(
                &rule.name,
                format!("reference columns {:?} not found in reference data", missing),
            )
        })?;

        let self_keys = if params.allow_self_reference && params.reference_table == table_name {
            let keys = table.select(&params.reference_column).map_err(|missing| {
                TableCheckError::MissingColumns {
                    rule: rule.name.clone(),
                    columns: missing,
                }
            })?;
            Some(keys)
        } else {
            None
        };

        let known: HashSet<&[CellValue]> = ref_table
            .rows
            .iter()
            .chain(self_keys.iter().flat_map(|keys| keys.rows.iter()))
            .map(Vec::as_slice)
            .collect();

        let total_references = fk_table.row_count();
        let mut null_count = 0;
        let mut orphaned = 0;
        let mut orphaned_values: Vec<Value> = Vec::new();

        for key in &fk_table.rows {
            if key.iter().any(CellValue::is_null) {
                null_count += 1;
            } else if !known.contains(key.as_slice()) {
                orphaned += 1;
                if orphaned_values.len() < MAX_SAMPLE_VALUES {
                    orphaned_values.push(key_to_json(key));
                }
            }
        }

        let null_violations = if params.allow_nulls { 0 } else { null_count };
        let invalid_references = orphaned + null_violations;
        let valid_references = total_references - invalid_references;
        let passed = invalid_references == 0;

        let message = if passed && null_count > 0 && params.allow_nulls {
            format!(
                "All {} non-null foreign key references are valid ({} nulls allowed)",
                total_references - null_count,
                null_count
            )
        } else if passed {
            format!("All {} foreign key references are valid", total_references)
        } else {
            let mut issues = Vec::new();
            if orphaned > 0 {
                issues.push(format!("{} orphaned records", orphaned));
            }
            if null_violations > 0 {
                issues.push(format!("{} null values", null_violations));
            }
            format!("Foreign key validation failed: {}", issues.join(", "))
        };

        let integrity_ratio = if total_references > 0 {
            valid_references as f64 / total_references as f64
        } else {
            1.0
        };

        debug!(rule = %rule.name, orphaned, null_violations, "foreign key checked");

        Ok(ValidationResult::for_rule(rule, table_name, None, passed, message)
            .with_details(details! {
                "foreign_key_columns" => params.foreign_key,
                "reference_table" => params.reference_table,
                "reference_columns" => params.reference_column,
                "total_references" => total_references,
                "valid_references" => valid_references,
                "invalid_references" => invalid_references,
                "orphaned_records" => orphaned,
                "null_violations" => null_violations,
                "null_count" => null_count,
                "allow_nulls" => params.allow_nulls,
                "orphaned_values" => orphaned_values,
                "integrity_ratio" => integrity_ratio,
            })
            .with_rows(invalid_references, total_references))
    }
}

/// Build rules from the table's declared foreign keys. Discovery errors
/// yield no rules.
fn auto_discover(connector: &Arc<dyn Connector>, table_name: &str) -> Vec<IntegrityRule> {
    let keys = match connector.foreign_keys(table_name) {
        Ok(keys) => keys,
        Err(e) => {
            warn!(table = table_name, error = %e, "foreign key discovery failed");
            return Vec::new();
        }
    };

    keys.into_iter()
        .map(|fk| {
            info!(
                table = table_name,
                constraint = %fk.name,
                referenced_table = %fk.referenced_table,
                "discovered foreign key"
            );
            let description = format!(
                "Auto-discovered foreign key: {} -> {}.{}",
                fk.columns.join(", "),
                fk.referenced_table,
                fk.referenced_columns.join(", ")
            );
            Rule::new(
                format!("auto_fk_{}", fk.name),
                description,
                Severity::Error,
                IntegrityParams::new(fk.columns, fk.referenced_table, fk.referenced_columns)
                    .with_connector(Arc::clone(connector)),
            )
        })
        .collect()
}

/// Scalar for single-column keys, array for composite keys.
fn key_to_json(key: &[CellValue]) -> Value {
    match key {
        [single] => single.to_json(),
        many => Value::Array(many.iter().map(CellValue::to_json).collect()),
    }
}

impl Default for IntegrityValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for IntegrityValidator {
    fn name(&self) -> &str {
        "integrity"
    }

    fn description(&self) -> &str {
        "Validates referential integrity by checking foreign key relationships"
    }

    fn validate_table(&self, table: &DataTable, table_name: &str) -> Result<Vec<ValidationResult>> {
        Ok(self.validate_table_with(table, table_name, &self.rules))
    }

    /// Always a single failed result: foreign keys need the whole table.
    fn validate_column(
        &self,
        table: &DataTable,
        table_name: &str,
        column_name: &str,
    ) -> Result<Vec<ValidationResult>> {
        let rule = Rule::new(
            "unsupported_operation",
            "Column-level referential integrity validation not supported",
            Severity::Error,
            (),
        );

        Ok(vec![ValidationResult::for_rule(
            &rule,
            table_name,
            Some(column_name),
            false,
            "Column-level validation not supported for referential integrity. Use table-level validation instead.",
        )
        .with_details(details! {
            "operation" => "column_validation",
            "supported" => false,
            "reason" => "Referential integrity requires table-level context",
        })
        .with_rows(0, table.row_count())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::ForeignKey;
    use serde_json::json;
    use std::cell::RefCell;

    fn rule(params: IntegrityParams) -> IntegrityRule {
        Rule::new("fk", "", Severity::Error, params)
    }

    fn validator_with(params: IntegrityParams) -> IntegrityValidator {
        let mut validator = IntegrityValidator::new();
        validator.add_rule(rule(params));
        validator
    }

    fn clients() -> DataTable {
        DataTable::from_columns(vec![("uid", vec!["client_1".into(), "client_2".into()])])
    }

    #[test]
    fn test_orphaned_reference() {
        let orders = DataTable::from_columns(vec![(
            "cliente_uid",
            vec!["client_1".into(), "client_2".into(), "client_3".into()],
        )]);
        let validator = validator_with(
            IntegrityParams::new(["cliente_uid"], "clients", ["uid"]).with_reference_data(clients()),
        );

        let results = validator.validate_table(&orders, "orders").unwrap();
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert!(!result.passed);
        assert_eq!(result.affected_rows, 1);
        assert_eq!(result.column_name, None);
        assert_eq!(result.details["orphaned_values"], json!(["client_3"]));
        assert_eq!(result.details["valid_references"], 2);
    }

    #[test]
    fn test_null_handling() {
        let orders = DataTable::from_columns(vec![(
            "cliente_uid",
            vec!["client_1".into(), CellValue::Null],
        )]);
        let params = IntegrityParams::new(["cliente_uid"], "clients", ["uid"]).with_reference_data(clients());

        let allowed = validator_with(params.clone()).validate_table(&orders, "orders").unwrap();
        assert!(allowed[0].passed);
        assert_eq!(allowed[0].details["null_count"], 1);
        assert_eq!(allowed[0].details["valid_references"], 2);

        let strict = validator_with(params.allow_nulls(false))
            .validate_table(&orders, "orders")
            .unwrap();
        assert!(!strict[0].passed);
        assert_eq!(strict[0].affected_rows, 1);
        assert_eq!(strict[0].details["null_violations"], 1);
        assert_eq!(strict[0].details["orphaned_values"], json!([]));
    }

    #[test]
    fn test_composite_key() {
        let lines = DataTable::from_columns(vec![
            ("order_id", vec![1.into(), 1.into(), 2.into()]),
            ("product", vec!["a".into(), "b".into(), "a".into()]),
        ]);
        let catalog = DataTable::from_columns(vec![
            ("oid", vec![1.into(), 1.into(), 2.into()]),
            ("sku", vec!["a".into(), "b".into(), "b".into()]),
        ]);
        let validator = validator_with(
            IntegrityParams::new(["order_id", "product"], "catalog", ["oid", "sku"])
                .with_reference_data(catalog),
        );

        let result = &validator.validate_table(&lines, "lines").unwrap()[0];
        assert_eq!(result.affected_rows, 1);
        assert_eq!(result.details["orphaned_values"], json!([[2, "a"]]));
    }

    #[test]
    fn test_self_reference() {
        let employees = DataTable::from_columns(vec![
            ("id", vec![1.into(), 2.into(), 3.into()]),
            ("manager_id", vec![CellValue::Null, 1.into(), 2.into()]),
        ]);
        let empty_reference = DataTable::empty(vec!["id".to_string()]);
        let params = IntegrityParams::new(["manager_id"], "employees", ["id"])
            .with_reference_data(empty_reference);

        let without = validator_with(params.clone()).validate_table(&employees, "employees").unwrap();
        assert_eq!(without[0].affected_rows, 2);

        let with = validator_with(params.allow_self_reference(true))
            .validate_table(&employees, "employees")
            .unwrap();
        assert!(with[0].passed);
    }

    #[test]
    fn test_rule_errors_become_failed_results() {
        let orders = DataTable::from_columns(vec![("a", vec![1.into()])]);
        let mut validator = IntegrityValidator::new();
        validator.add_rule(rule(
            IntegrityParams::new(["missing"], "clients", ["uid"]).with_reference_data(clients()),
        ));
        validator.add_rule(rule(IntegrityParams::new(["a"], "clients", ["uid", "x"])));
        validator.add_rule(rule(IntegrityParams::new(["a"], "clients", ["uid"])));

        let results = validator.validate_table(&orders, "orders").unwrap();
        assert_eq!(results.len(), 3);
        for result in &results {
            assert!(!result.passed);
            assert_eq!(result.total_rows, 1);
            assert!(result.message.starts_with("Validation failed: "));
            assert!(result.details.contains_key("error"));
        }
    }

    #[test]
    fn test_validate_column_is_unsupported() {
        let table = DataTable::from_columns(vec![("a", vec![1.into(), 2.into()])]);
        let results = IntegrityValidator::new().validate_column(&table, "t", "a").unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rule_name, "unsupported_operation");
        assert_eq!(results[0].severity, Severity::Error);
        assert!(!results[0].passed);
        assert_eq!(results[0].details["supported"], false);
        assert_eq!(results[0].total_rows, 2);
    }

    /// Answers metadata queries with fixed keys and reference queries with
    /// the clients table.
    struct FakeDb {
        discovery_fails: bool,
        queries: RefCell<Vec<String>>,
    }

    impl Connector for FakeDb {
        fn execute(&self, query: &str, _params: &[(&str, CellValue)]) -> Result<DataTable> {
            self.queries.borrow_mut().push(query.to_string());
            Ok(clients())
        }

        fn foreign_keys(&self, _table: &str) -> Result<Vec<ForeignKey>> {
            if self.discovery_fails {
                return Err(TableCheckError::Connector("metadata unavailable".to_string()));
            }
            Ok(vec![ForeignKey {
                name: "fk_orders_client".to_string(),
                columns: vec!["cliente_uid".to_string()],
                referenced_table: "clients".to_string(),
                referenced_columns: vec!["uid".to_string()],
            }])
        }
    }

    #[test]
    fn test_auto_discovery() {
        let db = Arc::new(FakeDb {
            discovery_fails: false,
            queries: RefCell::new(Vec::new()),
        });
        let validator = IntegrityValidator::new().with_connector(db.clone());
        let orders = DataTable::from_columns(vec![(
            "cliente_uid",
            vec!["client_1".into(), "client_9".into()],
        )]);

        let results = validator.validate_table(&orders, "orders").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rule_name, "auto_fk_fk_orders_client");
        assert_eq!(results[0].severity, Severity::Error);
        assert_eq!(results[0].affected_rows, 1);
        assert_eq!(db.queries.borrow().as_slice(), ["SELECT DISTINCT uid FROM clients"]);
    }

    #[test]
    fn test_auto_discovery_failure_yields_nothing() {
        let db = Arc::new(FakeDb {
            discovery_fails: true,
            queries: RefCell::new(Vec::new()),
        });
        let validator = IntegrityValidator::new().with_connector(db);
        let orders = DataTable::from_columns(vec![("cliente_uid", vec!["client_1".into()])]);

        assert!(validator.validate_table(&orders, "orders").unwrap().is_empty());
    }

    #[test]
    fn test_no_rules_without_connector() {
        let orders = DataTable::from_columns(vec![("a", vec![1.into()])]);
        assert!(IntegrityValidator::new().validate_table(&orders, "orders").unwrap().is_empty());
    }
}
