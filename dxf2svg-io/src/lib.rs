mod auditor;
mod parser;
mod reader;
pub mod svg;

use std::fs;
use std::path::{Path, PathBuf};

use dxf2svg_core::document::Document;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub use auditor::Auditor;
pub use svg::{DrawingWriter, SvgWriter};

use parser::{DxfError, DxfParser, ParseMode};

const BINARY_DXF_SENTINEL: &[u8] = b"AutoCAD Binary DXF";

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
    #[error("无法修复 DXF 文档 {path:?}：修复后仍有 {errors} 个错误（首个：{first_error}）")]
    DocumentUnrecoverable {
        path: PathBuf,
        errors: usize,
        first_error: String,
    },
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;
}

/// DXF 文档来源：先严格解析，结构损坏时退回修复解析。
pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }

    /// 两阶段加载。修复解析后仍有错误时整体失败，部分修复的文档不会返回给调用方。
    pub fn load_bytes(&self, bytes: &[u8], origin: &Path) -> Result<Document, IoError> {
        if bytes.starts_with(BINARY_DXF_SENTINEL) {
            return Err(IoError::UnsupportedFeature(format!(
                "二进制 DXF（{}）",
                origin.display()
            )));
        }

        let strict_error = match self.read_strict(bytes) {
            Ok((document, auditor)) => {
                for fix in auditor.fixes() {
                    warn!(path = %origin.display(), fix = %fix, "严格解析时已自动修正");
                }
                return Ok(document);
            }
            Err(err) => err,
        };

        warn!(
            path = %origin.display(),
            error = %strict_error,
            "DXF 结构校验失败，尝试修复读取"
        );
        let (document, auditor) = self.read_recovering(bytes)?;
        for fix in auditor.fixes() {
            debug!(path = %origin.display(), fix = %fix, "修复读取已修正");
        }
        if auditor.has_errors() {
            for message in auditor.errors() {
                error!(path = %origin.display(), error = %message, "修复读取后仍存在错误");
            }
            return Err(IoError::DocumentUnrecoverable {
                path: origin.to_path_buf(),
                errors: auditor.error_count(),
                first_error: auditor.errors().first().cloned().unwrap_or_default(),
            });
        }
        info!(
            path = %origin.display(),
            fixes = auditor.fixes().len(),
            "DXF 修复读取成功"
        );
        Ok(document)
    }

    /// 严格解析：任何结构偏差或字段错误都会失败。
    pub fn read_strict(&self, bytes: &[u8]) -> Result<(Document, Auditor), IoError> {
        let source = std::str::from_utf8(bytes)
            .map_err(|err| IoError::InvalidDocument(format!("文件不是有效的 UTF-8：{err}")))?;
        DxfParser::new(source, ParseMode::Strict)
            .parse()
            .map_err(IoError::from)
    }

    /// 修复解析：尽力修正结构问题，无法修正的实体记入审计错误。
    pub fn read_recovering(&self, bytes: &[u8]) -> Result<(Document, Auditor), IoError> {
        let source = String::from_utf8_lossy(bytes);
        let mut result = DxfParser::new(&source, ParseMode::Recover)
            .parse()
            .map_err(IoError::from)?;
        if let std::borrow::Cow::Owned(_) = source {
            result.1.fix("文件包含非 UTF-8 字节，已按替换字符解码");
        }
        Ok(result)
    }
}

impl Default for DxfFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let data = fs::read(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_bytes(&data, path)
    }
}

impl From<DxfError> for IoError {
    fn from(err: DxfError) -> Self {
        match err {
            DxfError::Structure { message } | DxfError::Invalid { message } => {
                IoError::InvalidDocument(message)
            }
        }
    }
}
