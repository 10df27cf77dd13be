use std::path::PathBuf;

use dxf2svg_core::color::ColorParseError;
use dxf2svg_engine::DiagnosticReport;
use dxf2svg_engine::errors::EngineError;
use dxf2svg_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("参数 {option} 的颜色无效：{source}")]
    InvalidColor {
        option: &'static str,
        #[source]
        source: ColorParseError,
    },
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// 渲染失败；诊断报告随原始错误一起返回。
    #[error("{source}")]
    Render {
        #[source]
        source: EngineError,
        report: Box<DiagnosticReport>,
    },
    #[error("无法创建输出目录 {path:?}：{source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    pub fn report(&self) -> Option<&DiagnosticReport> {
        match self {
            ConvertError::Render { report, .. } => Some(report),
            _ => None,
        }
    }
}
