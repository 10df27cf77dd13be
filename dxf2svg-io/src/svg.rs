use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use dxf2svg_core::color::Rgb;
use dxf2svg_core::render::{Canvas, Page, PathSegment, RenderedPath, TextRun};

use crate::IoError;

const DEFAULT_PRECISION: usize = 3;
const LINE_SPACING: f64 = 1.25;

/// 把渲染结果写入目标文件。
pub trait DrawingWriter {
    fn write(&self, canvas: &Canvas, page: &Page, path: &Path) -> Result<(), IoError>;
}

/// SVG 序列化器。输出只依赖输入数据，同样的画布总是得到同样的字节。
#[derive(Debug, Clone, Copy)]
pub struct SvgWriter {
    precision: usize,
}

impl SvgWriter {
    pub fn new() -> Self {
        Self::with_precision(DEFAULT_PRECISION)
    }

    /// 坐标保留的小数位数，末尾的 0 会被去掉。
    pub fn with_precision(precision: usize) -> Self {
        Self { precision }
    }

    pub fn render(&self, canvas: &Canvas, page: &Page) -> String {
        let origin = page.origin();
        // Y 轴翻转后，视图顶部对应绘图坐标的最大 Y。
        let view_x = self.num(origin.x());
        let view_y = self.num(-(origin.y() + page.height));
        let width = self.num(page.width);
        let height = self.num(page.height);

        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n");
        let _ = writeln!(
            out,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}mm\" height=\"{height}mm\" viewBox=\"{view_x} {view_y} {width} {height}\">"
        );
        let _ = writeln!(
            out,
            "  <rect x=\"{view_x}\" y=\"{view_y}\" width=\"{width}\" height=\"{height}\" fill=\"{}\"/>",
            canvas.background()
        );
        out.push_str(
            "  <g transform=\"scale(1 -1)\" fill=\"none\" stroke-linecap=\"round\" stroke-linejoin=\"round\">\n",
        );
        for path in canvas.paths() {
            self.write_path(&mut out, path);
        }
        out.push_str("  </g>\n</svg>\n");
        out
    }

    fn write_path(&self, out: &mut String, path: &RenderedPath) {
        let layer = escape_xml(&path.layer);
        if !path.segments.is_empty() {
            let _ = writeln!(
                out,
                "    <path d=\"{}\" stroke=\"{}\" stroke-width=\"1\" vector-effect=\"non-scaling-stroke\" data-layer=\"{layer}\" data-kind=\"{}\"/>",
                self.path_data(&path.segments),
                path.stroke,
                path.kind
            );
        }
        for text in &path.texts {
            self.write_text(out, text, path.stroke, &layer);
        }
    }

    fn write_text(&self, out: &mut String, text: &TextRun, fill: Rgb, layer: &str) {
        let lines: Vec<&str> = text.content.lines().collect();
        if lines.iter().all(|line| line.trim().is_empty()) {
            return;
        }
        let _ = write!(
            out,
            "    <text transform=\"translate({} {}) rotate({}) scale(1 -1)\" font-size=\"{}\" fill=\"{fill}\" stroke=\"none\" font-family=\"sans-serif\" data-layer=\"{layer}\">",
            self.num(text.anchor.x()),
            self.num(text.anchor.y()),
            self.num(text.rotation.to_degrees()),
            self.num(text.height)
        );
        if lines.len() == 1 {
            out.push_str(&escape_xml(lines[0]));
        } else {
            for (index, line) in lines.iter().enumerate() {
                let dy = if index == 0 {
                    0.0
                } else {
                    text.height * LINE_SPACING
                };
                let _ = write!(
                    out,
                    "<tspan x=\"0\" dy=\"{}\">{}</tspan>",
                    self.num(dy),
                    escape_xml(line)
                );
            }
        }
        out.push_str("</text>\n");
    }

    fn path_data(&self, segments: &[PathSegment]) -> String {
        let mut d = String::new();
        for segment in segments {
            if !d.is_empty() {
                d.push(' ');
            }
            match segment {
                PathSegment::MoveTo(point) => {
                    let _ = write!(d, "M {} {}", self.num(point.x()), self.num(point.y()));
                }
                PathSegment::LineTo(point) => {
                    let _ = write!(d, "L {} {}", self.num(point.x()), self.num(point.y()));
                }
                PathSegment::CubicTo { ctrl1, ctrl2, to } => {
                    let _ = write!(
                        d,
                        "C {} {} {} {} {} {}",
                        self.num(ctrl1.x()),
                        self.num(ctrl1.y()),
                        self.num(ctrl2.x()),
                        self.num(ctrl2.y()),
                        self.num(to.x()),
                        self.num(to.y())
                    );
                }
                PathSegment::Close => d.push('Z'),
            }
        }
        d
    }

    fn num(&self, value: f64) -> String {
        format_number(value, self.precision)
    }
}

impl Default for SvgWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingWriter for SvgWriter {
    /// 先写入同目录下的临时文件再原子替换，失败时目标路径不会留下半截文件。
    fn write(&self, canvas: &Canvas, page: &Page, path: &Path) -> Result<(), IoError> {
        let document = self.render(canvas, page);
        let write_error = |source: std::io::Error| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        };
        let parent = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut file = tempfile::NamedTempFile::new_in(parent).map_err(write_error)?;
        file.write_all(document.as_bytes()).map_err(write_error)?;
        file.flush().map_err(write_error)?;
        file.persist(path).map_err(|err| write_error(err.error))?;
        Ok(())
    }
}

/// 定点格式化并去掉末尾的 0，避免输出 `-0`。
fn format_number(value: f64, precision: usize) -> String {
    let mut text = format!("{value:.precision$}");
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            ch if ch.is_control() && ch != '\t' => {}
            ch => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxf2svg_core::document::{EntityId, EntityKind};
    use dxf2svg_core::geometry::Point2;

    fn sample_canvas() -> Canvas {
        let mut canvas = Canvas::new(Rgb::new(0x0b, 0x12, 0x20));
        canvas.push(RenderedPath {
            entity: EntityId::new(0),
            kind: EntityKind::Line,
            layer: "A&B".to_string(),
            stroke: Rgb::new(0xf8, 0xfa, 0xfc),
            segments: vec![
                PathSegment::MoveTo(Point2::new(0.0, 0.0)),
                PathSegment::LineTo(Point2::new(10.0, 5.25)),
            ],
            texts: Vec::new(),
        });
        canvas.push(RenderedPath {
            entity: EntityId::new(1),
            kind: EntityKind::Text,
            layer: "TXT".to_string(),
            stroke: Rgb::new(255, 0, 0),
            segments: Vec::new(),
            texts: vec![TextRun {
                anchor: Point2::new(1.0, 2.0),
                content: "a<b\nsecond".to_string(),
                height: 2.5,
                rotation: std::f64::consts::FRAC_PI_2,
            }],
        });
        canvas
    }

    #[test]
    fn numbers_are_trimmed() {
        assert_eq!(format_number(1.5, 3), "1.5");
        assert_eq!(format_number(2.0, 3), "2");
        assert_eq!(format_number(-0.0001, 3), "0");
        assert_eq!(format_number(1.23456, 3), "1.235");
        assert_eq!(format_number(-12.0, 3), "-12");
    }

    #[test]
    fn precision_controls_coordinate_digits() {
        let page = Page::new(10.0, 6.0, Point2::new(5.0, 3.0));
        let svg = SvgWriter::with_precision(0).render(&sample_canvas(), &page);
        assert!(svg.contains("d=\"M 0 0 L 10 5\""));
    }

    #[test]
    fn svg_flips_y_and_centres_view_box() {
        let page = Page::new(10.0, 6.0, Point2::new(5.0, 3.0));
        let svg = SvgWriter::new().render(&sample_canvas(), &page);

        assert!(svg.contains("width=\"10mm\" height=\"6mm\" viewBox=\"0 -6 10 6\""));
        assert!(svg.contains("<rect x=\"0\" y=\"-6\" width=\"10\" height=\"6\" fill=\"#0b1220\"/>"));
        assert!(svg.contains("<g transform=\"scale(1 -1)\""));
        assert!(svg.contains("d=\"M 0 0 L 10 5.25\" stroke=\"#f8fafc\""));
        assert!(svg.contains("data-layer=\"A&amp;B\""));
        assert!(svg.contains("vector-effect=\"non-scaling-stroke\""));
    }

    #[test]
    fn text_runs_are_counter_flipped_and_escaped() {
        let page = Page::new(10.0, 6.0, Point2::new(5.0, 3.0));
        let svg = SvgWriter::new().render(&sample_canvas(), &page);

        assert!(svg.contains("transform=\"translate(1 2) rotate(90) scale(1 -1)\""));
        assert!(svg.contains("<tspan x=\"0\" dy=\"0\">a&lt;b</tspan>"));
        assert!(svg.contains("<tspan x=\"0\" dy=\"3.125\">second</tspan>"));
        assert!(!svg.contains("<path d=\"\""));
    }

    #[test]
    fn write_replaces_target_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("out.svg");
        std::fs::write(&target, "stale").expect("seed file");
        let page = Page::new(10.0, 6.0, Point2::new(5.0, 3.0));
        SvgWriter::new()
            .write(&sample_canvas(), &page, &target)
            .expect("write svg");
        let written = std::fs::read_to_string(&target).expect("read back");
        assert!(written.starts_with("<?xml"));
        assert!(written.ends_with("</svg>\n"));
    }
}
