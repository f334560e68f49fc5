//! Fuzz target for the full validator run.
//!
//! Arbitrary cell values are laid out under column names that trigger the
//! pattern auto-detection and the duplicates heuristic, then every validator
//! runs over them. No validator may error or panic on data.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tablecheck::{CellValue, DataTable, TableAudit};

#[derive(Debug, Arbitrary)]
enum FuzzCell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<FuzzCell> for CellValue {
    fn from(cell: FuzzCell) -> Self {
        match cell {
            FuzzCell::Null => CellValue::Null,
            FuzzCell::Bool(b) => CellValue::Bool(b),
            FuzzCell::Int(i) => CellValue::Int(i),
            FuzzCell::Float(f) => CellValue::Float(f),
            FuzzCell::Text(s) => CellValue::Text(s),
        }
    }
}

const COLUMNS: [&str; 6] = ["id", "cpf", "cnpj", "email", "telefone", "cep"];

fuzz_target!(|rows: Vec<[FuzzCell; 6]>| {
    if rows.len() > 1_000 {
        return;
    }

    let headers = COLUMNS.iter().map(|c| c.to_string()).collect();
    let rows = rows
        .into_iter()
        .map(|row| row.into_iter().map(CellValue::from).collect())
        .collect();
    let table = DataTable::new(headers, rows);

    let result = TableAudit::new()
        .audit_data(table, "fuzz")
        .expect("auditing in-memory data never fails");
    assert!(result.results.iter().all(|r| !r.rule_name.ends_with("_error")));
});
