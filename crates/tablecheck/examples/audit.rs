//! Example: audit a delimited file with tablecheck.
//!
//! Usage:
//!   cargo run --example audit -- <file_path> [rules.json]

use std::env;
use std::path::Path;

use tablecheck::{RuleSet, TableAudit};

fn main() -> tablecheck::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: cargo run --example audit -- <file_path> [rules.json]");
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);
    if !path.exists() {
        eprintln!("Error: File not found: {}", path.display());
        std::process::exit(1);
    }

    let mut audit = TableAudit::new();
    if let Some(rules) = args.get(2) {
        audit = audit.with_rules(RuleSet::from_file(rules)?);
    }

    let result = audit.audit_file(path)?;

    let separator = "=".repeat(80);
    println!("{}", separator);
    println!("Data quality audit: {}", result.table_name);
    println!("{}", separator);
    println!(
        "Rows: {}  Columns: {}  Checks: {}  Success rate: {:.1}%",
        result.volumetry.row_count,
        result.volumetry.column_count,
        result.summary.total_checks,
        result.summary.success_rate
    );
    println!();

    for failure in result.failures() {
        let column = failure.column_name.as_deref().unwrap_or("-");
        println!(
            "[{:<8}] {:<28} {:<20} {}",
            failure.severity, failure.rule_name, column, failure.message
        );
    }

    Ok(())
}
