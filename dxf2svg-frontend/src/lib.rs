pub mod convert;
pub mod errors;
pub mod report;

pub use convert::{ConversionRequest, ConversionSummary, convert, convert_with};
pub use dxf2svg_engine::DiagnosticReport;
pub use errors::ConvertError;
pub use report::{ReportFormat, format_report};
