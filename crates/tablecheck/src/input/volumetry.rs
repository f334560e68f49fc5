//! Data volume and sampling metrics.

use serde::{Deserialize, Serialize};

use super::source::DataTable;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Delimited text typically takes this multiple of its in-memory size on disk.
const DISK_SIZE_FACTOR: f64 = 2.5;

/// Size of a loaded table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumetryMetrics {
    pub row_count: usize,
    pub column_count: usize,
    /// Rows multiplied by columns.
    pub data_points: usize,
    pub memory_usage_bytes: usize,
    pub memory_usage_gb: f64,
    pub estimated_disk_gb: f64,
}

impl VolumetryMetrics {
    /// Measure a table.
    pub fn from_table(table: &DataTable) -> Self {
        let memory_usage_bytes = table.estimated_memory_bytes();
        let memory_usage_gb = memory_usage_bytes as f64 / BYTES_PER_GB;

        Self {
            row_count: table.row_count(),
            column_count: table.column_count(),
            data_points: table.row_count() * table.column_count(),
            memory_usage_bytes,
            memory_usage_gb,
            estimated_disk_gb: memory_usage_gb * DISK_SIZE_FACTOR,
        }
    }
}

/// How much of a table was actually analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingInfo {
    pub total_table_rows: usize,
    pub analyzed_rows: usize,
    pub is_sampled: bool,
    /// Fraction of rows analyzed; 1.0 for an empty table.
    pub sampling_ratio: f64,
}

impl SamplingInfo {
    pub fn new(total_table_rows: usize, analyzed_rows: usize) -> Self {
        let sampling_ratio = if total_table_rows > 0 {
            analyzed_rows as f64 / total_table_rows as f64
        } else {
            1.0
        };

        Self {
            total_table_rows,
            analyzed_rows,
            is_sampled: total_table_rows > analyzed_rows,
            sampling_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::CellValue;

    #[test]
    fn test_volumetry_counts() {
        let table = DataTable::from_columns(vec![
            ("a", vec![CellValue::Int(1), CellValue::Int(2)]),
            ("b", vec![CellValue::from("x"), CellValue::Null]),
            ("c", vec![CellValue::Null, CellValue::Null]),
        ]);

        let metrics = VolumetryMetrics::from_table(&table);
        assert_eq!(metrics.row_count, 2);
        assert_eq!(metrics.column_count, 3);
        assert_eq!(metrics.data_points, 6);
        assert!(metrics.memory_usage_bytes > 0);
        assert!(metrics.estimated_disk_gb > metrics.memory_usage_gb);
    }

    #[test]
    fn test_sampling_info() {
        let info = SamplingInfo::new(1000, 100);
        assert!(info.is_sampled);
        assert!((info.sampling_ratio - 0.1).abs() < 1e-12);

        let full = SamplingInfo::new(50, 50);
        assert!(!full.is_sampled);
        assert_eq!(full.sampling_ratio, 1.0);

        let empty = SamplingInfo::new(0, 0);
        assert!(!empty.is_sampled);
        assert_eq!(empty.sampling_ratio, 1.0);
    }
}
