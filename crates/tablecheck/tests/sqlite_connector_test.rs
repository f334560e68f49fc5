//! SQLite connector tests: loading, sampling and foreign-key discovery.

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use tablecheck::connector::{Connector, SqliteConnector};
use tablecheck::validation::{IntegrityParams, IntegrityValidator, Rule, Validator};
use tablecheck::{AuditConfig, Severity, TableAudit};

/// Create a shop database on disk and return its directory and path.
///
/// Order 3 references a missing client, so enforcement is off while seeding.
fn shop_db() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("shop.db");
    rusqlite::Connection::open(&path)
        .expect("Failed to create database")
        .execute_batch(
            "PRAGMA foreign_keys = OFF;
             CREATE TABLE clients (uid TEXT PRIMARY KEY, name TEXT, cpf TEXT);
             CREATE TABLE orders (
                 id INTEGER PRIMARY KEY,
                 cliente_uid TEXT REFERENCES clients(uid),
                 total REAL
             );
             INSERT INTO clients VALUES
                 ('client_1', 'Ana', '529.982.247-25'),
                 ('client_2', 'Bruno', '111.111.111-11');
             INSERT INTO orders VALUES
                 (1, 'client_1', 10.0),
                 (2, 'client_2', 12.5),
                 (3, 'client_3', NULL),
                 (4, NULL, 3.0);",
        )
        .expect("Failed to seed database");
    (dir, path)
}

#[test]
fn test_audit_discovers_foreign_keys() {
    let (_dir, path) = shop_db();
    let connector = Arc::new(SqliteConnector::open(&path).unwrap());

    let result = TableAudit::new()
        .with_connector(connector)
        .audit_table("orders")
        .unwrap();

    let fk = result
        .results
        .iter()
        .find(|r| r.rule_name.starts_with("auto_fk_"))
        .expect("auto-discovered rule");
    assert_eq!(fk.severity, Severity::Error);
    assert!(!fk.passed);
    assert_eq!(fk.affected_rows, 1);
    assert_eq!(fk.details["orphaned_values"], json!(["client_3"]));
    assert_eq!(fk.details["null_count"], 1);
    assert_eq!(result.sampling.total_table_rows, 4);
}

#[test]
fn test_explicit_rule_fetches_reference_through_connector() {
    let (_dir, path) = shop_db();
    let connector = Arc::new(SqliteConnector::open(&path).unwrap());
    let orders = connector.fetch_table("orders", None).unwrap();

    let mut validator = IntegrityValidator::new().with_connector(connector);
    validator.add_rule(
        Rule::new(
            "fk_orders_clients",
            "",
            Severity::Critical,
            IntegrityParams::new(["cliente_uid"], "clients", ["uid"]).allow_nulls(false),
        ),
    );

    let results = validator.validate_table(&orders, "orders").unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].affected_rows, 2);
    assert_eq!(results[0].details["null_violations"], 1);
    assert_eq!(results[0].details["orphaned_records"], 1);
    assert_eq!(
        results[0].message,
        "Foreign key validation failed: 1 orphaned records, 1 null values"
    );
}

#[test]
fn test_sampled_table_audit() {
    let (_dir, path) = shop_db();
    let connector = Arc::new(SqliteConnector::open(&path).unwrap());
    let config = AuditConfig {
        sample_size: 2,
        validators: vec!["completeness".to_string()],
        ..AuditConfig::default()
    };

    let result = TableAudit::with_config(config)
        .with_connector(connector)
        .audit_table("orders")
        .unwrap();

    assert!(result.sampling.is_sampled);
    assert_eq!(result.sampling.analyzed_rows, 2);
    assert_eq!(result.volumetry.row_count, 2);
    assert_eq!(result.columns, vec!["id", "cliente_uid", "total"]);
}

#[test]
fn test_cpf_checksum_on_database_column() {
    let (_dir, path) = shop_db();
    let connector = Arc::new(SqliteConnector::open(&path).unwrap());
    let config = AuditConfig {
        validators: vec!["patterns".to_string()],
        ..AuditConfig::default()
    };

    let result = TableAudit::with_config(config)
        .with_connector(connector)
        .audit_table("clients")
        .unwrap();

    let cpf = result
        .results
        .iter()
        .find(|r| r.column_name.as_deref() == Some("cpf"))
        .unwrap();
    assert!(!cpf.passed);
    assert_eq!(cpf.details["invalid_values"], json!(["111.111.111-11"]));
}

#[test]
fn test_unknown_table_is_an_error() {
    let (_dir, path) = shop_db();
    let connector = Arc::new(SqliteConnector::open(&path).unwrap());

    assert!(TableAudit::new().with_connector(connector).audit_table("missing").is_err());
}
