use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use dxf2svg_frontend::ReportFormat;

#[derive(Debug, Parser)]
#[command(name = "dxf2svg")]
#[command(about = "Convert one layout of a DXF drawing into a standalone SVG document")]
pub struct Cli {
    /// Input DXF file
    pub input: PathBuf,

    /// Output SVG file (parent directories are created)
    pub output: PathBuf,

    /// Layout to render; empty or "model" selects model space
    #[arg(long)]
    pub layout: Option<String>,

    /// Canvas background color (#rrggbb)
    #[arg(long)]
    pub background: Option<String>,

    /// Stroke color for entities without a color of their own (#rrggbb)
    #[arg(long = "line-color")]
    pub line_color: Option<String>,

    /// Configuration file (defaults to $DXF2SVG_CONFIG or ./config/dxf2svg.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Format of the diagnostic report printed when rendering fails
    #[arg(long = "report-format", value_enum, default_value_t = ReportFormatArg::Text)]
    pub report_format: ReportFormatArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormatArg {
    Text,
    Json,
}

impl From<ReportFormatArg> for ReportFormat {
    fn from(value: ReportFormatArg) -> Self {
        match value {
            ReportFormatArg::Text => ReportFormat::Text,
            ReportFormatArg::Json => ReportFormat::Json,
        }
    }
}
