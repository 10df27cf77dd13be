use std::fs;
use std::path::{Path, PathBuf};

use dxf2svg_config::AppConfig;
use dxf2svg_core::color::Rgb;
use dxf2svg_core::document::Document;
use dxf2svg_core::render::Page;
use dxf2svg_engine::census::{LayoutCensus, census};
use dxf2svg_engine::context::RenderContext;
use dxf2svg_engine::layout::resolve_layout;
use dxf2svg_engine::page::PageSizer;
use dxf2svg_engine::{FailedRender, render_with_diagnostics};
use dxf2svg_io::{DocumentLoader, DrawingWriter, DxfFacade, SvgWriter};
use tracing::{debug, info, warn};

use crate::errors::ConvertError;

/// 一次转换所需的全部参数。颜色保持原始字符串，在加载文档前校验。
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub layout: String,
    pub background: String,
    pub line_color: String,
    pub page: PageSizer,
}

impl ConversionRequest {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self::from_config(input, output, &AppConfig::default())
    }

    pub fn from_config(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        config: &AppConfig,
    ) -> Self {
        Self {
            input: resolve_path(input.into()),
            output: resolve_path(output.into()),
            layout: config.render.layout.clone(),
            background: config.render.background.clone(),
            line_color: config.render.line_color.clone(),
            page: PageSizer {
                fallback_width: config.page.fallback_width,
                fallback_height: config.page.fallback_height,
                min_dimension: config.page.min_dimension,
            },
        }
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }

    pub fn with_line_color(mut self, line_color: impl Into<String>) -> Self {
        self.line_color = line_color.into();
        self
    }
}

/// 转换成功后的概要信息。
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    pub output: PathBuf,
    pub layout: String,
    pub paths: usize,
    pub page: Page,
    pub census: LayoutCensus,
}

/// 使用 DXF 读取器与 SVG 写出器执行转换。
pub fn convert(request: &ConversionRequest) -> Result<ConversionSummary, ConvertError> {
    convert_with(&DxfFacade::new(), &SvgWriter::new(), request)
}

/// 执行转换；任何失败都会删除输出路径上的文件。
pub fn convert_with(
    loader: &dyn DocumentLoader,
    writer: &dyn DrawingWriter,
    request: &ConversionRequest,
) -> Result<ConversionSummary, ConvertError> {
    let result = run(loader, writer, request);
    if let Err(err) = &result {
        warn!(output = %request.output.display(), error = %err, "转换失败，清理输出文件");
        remove_output(&request.output);
    }
    result
}

fn run(
    loader: &dyn DocumentLoader,
    writer: &dyn DrawingWriter,
    request: &ConversionRequest,
) -> Result<ConversionSummary, ConvertError> {
    let background = parse_color(&request.background, "background")?;
    let fallback = parse_color(&request.line_color, "line-color")?;
    ensure_parent_dir(&request.output)?;

    info!(
        input = %request.input.display(),
        output = %request.output.display(),
        layout = %request.layout,
        "开始转换"
    );
    let document = loader.load(&request.input)?;
    log_layers(&document);

    let layout = resolve_layout(&document, &request.layout)?;
    let census = census(layout);
    census.log(layout.name());

    let context = RenderContext::new(&document, background, fallback);
    let output = render_with_diagnostics(&context, layout).map_err(|failed| {
        let FailedRender { error, report } = *failed;
        ConvertError::Render {
            source: error,
            report: Box::new(report),
        }
    })?;

    let page = request.page.page_for(&output.extents);
    writer.write(&output.canvas, &page, &request.output)?;
    info!(
        output = %request.output.display(),
        paths = output.canvas.len(),
        width = page.width,
        height = page.height,
        "转换完成"
    );

    Ok(ConversionSummary {
        output: request.output.clone(),
        layout: layout.name().to_string(),
        paths: output.canvas.len(),
        page,
        census,
    })
}

fn parse_color(raw: &str, option: &'static str) -> Result<Rgb, ConvertError> {
    Rgb::from_hex(raw).map_err(|source| ConvertError::InvalidColor { option, source })
}

fn ensure_parent_dir(output: &Path) -> Result<(), ConvertError> {
    let Some(parent) = output.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(parent).map_err(|source| ConvertError::OutputDir {
        path: parent.to_path_buf(),
        source,
    })
}

fn remove_output(output: &Path) {
    match fs::remove_file(output) {
        Ok(()) => debug!(output = %output.display(), "已删除输出文件"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(output = %output.display(), error = %err, "删除输出文件失败"),
    }
}

fn log_layers(document: &Document) {
    for layer in document.layers() {
        let color = layer
            .color
            .map(|color| color.to_string())
            .unwrap_or_else(|| "未设置".to_string());
        info!(
            layer = %layer.name,
            color = %color,
            visible = layer.is_visible,
            frozen = layer.is_frozen,
            locked = layer.is_locked,
            "图层"
        );
    }
}

/// 解析为绝对路径；无法获取当前目录时保持原样。
fn resolve_path(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_takes_defaults_from_config() {
        let mut config = AppConfig::default();
        config.render.layout = "Sheet A".to_string();
        config.page.fallback_width = 297.0;

        let request = ConversionRequest::from_config("in.dxf", "out/in.svg", &config)
            .with_line_color("#000000");
        assert!(request.input.is_absolute());
        assert!(request.output.ends_with("out/in.svg"));
        assert_eq!(request.layout, "Sheet A");
        assert_eq!(request.background, "#0b1220");
        assert_eq!(request.line_color, "#000000");
        assert_eq!(request.page.fallback_width, 297.0);
        assert_eq!(request.page.fallback_height, 1080.0);
    }
}
