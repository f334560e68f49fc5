//! Tablecheck: rule-based data quality validation for database tables.
//!
//! A table is loaded from a database or a delimited file, optionally
//! sampled, and handed to a [`ValidationEngine`] that runs four validators:
//!
//! - **completeness**: share of non-null values per column
//! - **duplicates**: repeated values per column or per composite key
//! - **integrity**: foreign-key values missing from the referenced table
//! - **patterns**: CNPJ, CPF, e-mail, phone, CEP or custom regex formats
//!
//! Every check produces a [`ValidationResult`]; a failing validator never
//! stops the others.
//!
//! # Example
//!
//! ```no_run
//! use tablecheck::TableAudit;
//!
//! let audit = TableAudit::new();
//! let result = audit.audit_file("orders.csv").unwrap();
//!
//! println!("Checks: {}", result.summary.total_checks);
//! for failure in result.failures() {
//!     println!("[{}] {}", failure.severity, failure.message);
//! }
//! ```

pub mod config;
pub mod connector;
pub mod error;
pub mod input;
pub mod report;
pub mod validation;

mod audit;

pub use crate::audit::{AuditConfig, AuditResult, TableAudit};
pub use config::{AppConfig, DuplicatesConfig, RuleSet};
pub use connector::{Connector, ForeignKey};
#[cfg(feature = "sqlite")]
pub use connector::SqliteConnector;
pub use error::{Result, TableCheckError};
pub use input::{CellValue, DataTable, SourceMetadata};
pub use report::{JsonReport, ReportSummary, ReportWriter, TextReport};
pub use validation::{Rule, Severity, ValidationEngine, ValidationResult, Validator};
