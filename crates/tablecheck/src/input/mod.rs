//! Input parsing and dataset handling.

mod parser;
mod source;
mod volumetry;

pub use parser::{is_null_token, Parser, ParserConfig};
pub use source::{CellValue, DataTable, SourceMetadata};
pub use volumetry::{SamplingInfo, VolumetryMetrics};
