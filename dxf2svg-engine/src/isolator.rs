use std::collections::BTreeMap;
use std::fmt;

use dxf2svg_core::document::{Entity, EntityId, EntityKind, Layout};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::census::{LayoutCensus, census};
use crate::context::RenderContext;
use crate::errors::EngineError;
use crate::pipeline::{RenderOutput, RenderPipeline};
use crate::projector::GeometryProjector;

/// 单个图层的诊断结论。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LayerVerdict {
    Ok { checked: usize },
    /// 图层内第一个投影失败的实体；之后的实体不再检查。
    Failed {
        entity: EntityId,
        kind: EntityKind,
        error: String,
    },
    /// 图层冻结或关闭，渲染时不会绘制。
    Hidden { entities: usize },
}

impl LayerVerdict {
    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, LayerVerdict::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticReport {
    pub layout: String,
    pub layers: BTreeMap<String, LayerVerdict>,
    pub census: LayoutCensus,
}

impl DiagnosticReport {
    pub fn failed_layers(&self) -> impl Iterator<Item = &str> {
        self.layers
            .iter()
            .filter(|(_, verdict)| verdict.is_failed())
            .map(|(name, _)| name.as_str())
    }

    #[inline]
    pub fn is_clean(&self) -> bool {
        self.failed_layers().next().is_none()
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "布局 \"{}\" 的图层诊断：", self.layout)?;
        for (layer, verdict) in &self.layers {
            match verdict {
                LayerVerdict::Ok { checked } => {
                    writeln!(f, "  [正常] {layer}（{checked} 个实体）")?;
                }
                LayerVerdict::Failed {
                    entity,
                    kind,
                    error,
                } => {
                    writeln!(f, "  [失败] {layer}：实体 {entity}（{kind}）{error}")?;
                }
                LayerVerdict::Hidden { entities } => {
                    writeln!(f, "  [跳过] {layer}（图层冻结或关闭，{entities} 个实体）")?;
                }
            }
        }
        write!(f, "{}", self.census)
    }
}

/// 整体渲染失败后按图层重放，定位出错的图层。
#[derive(Debug, Clone, Copy)]
pub struct FaultIsolator<'a> {
    context: &'a RenderContext<'a>,
}

impl<'a> FaultIsolator<'a> {
    pub fn new(context: &'a RenderContext<'a>) -> Self {
        Self { context }
    }

    pub fn isolate(&self, layout: &Layout) -> DiagnosticReport {
        let mut groups: BTreeMap<&str, Vec<(EntityId, &Entity)>> = BTreeMap::new();
        for (id, entity) in layout.entities() {
            groups
                .entry(entity.layer_name())
                .or_default()
                .push((*id, entity));
        }

        let mut layers = BTreeMap::new();
        for (name, entities) in groups {
            let verdict = self.check_layer(name, &entities);
            match &verdict {
                LayerVerdict::Ok { checked } => {
                    info!(layer = name, checked, "图层诊断通过");
                }
                LayerVerdict::Failed {
                    entity,
                    kind,
                    error,
                } => {
                    error!(layer = name, entity = %entity, kind = %kind, error = %error, "图层诊断失败");
                }
                LayerVerdict::Hidden { entities } => {
                    info!(layer = name, entities, "图层未绘制，跳过诊断");
                }
            }
            layers.insert(name.to_string(), verdict);
        }

        DiagnosticReport {
            layout: layout.name().to_string(),
            layers,
            census: census(layout),
        }
    }

    fn check_layer(&self, name: &str, entities: &[(EntityId, &Entity)]) -> LayerVerdict {
        let hidden = self
            .context
            .document
            .layer(name)
            .is_some_and(|layer| !layer.is_rendered());
        if hidden {
            return LayerVerdict::Hidden {
                entities: entities.len(),
            };
        }

        // 每个图层使用独立的投影器，不共享主渲染的任何状态。
        let projector = GeometryProjector::new(self.context.document);
        for (id, entity) in entities {
            if let Err(err) = projector.project(entity) {
                return LayerVerdict::Failed {
                    entity: *id,
                    kind: entity.kind(),
                    error: err.to_string(),
                };
            }
        }
        LayerVerdict::Ok {
            checked: entities.len(),
        }
    }
}

/// 渲染失败时附带的诊断报告。原始错误保持不变。
#[derive(Debug, Error)]
#[error("{error}")]
pub struct FailedRender {
    pub error: EngineError,
    pub report: DiagnosticReport,
}

/// 渲染布局；失败时先做图层诊断，再连同原始错误一起返回。
pub fn render_with_diagnostics(
    context: &RenderContext<'_>,
    layout: &Layout,
) -> Result<RenderOutput, Box<FailedRender>> {
    match RenderPipeline::new(context).render(layout) {
        Ok(output) => Ok(output),
        Err(error) => {
            warn!(layout = layout.name(), error = %error, "渲染失败，开始按图层诊断");
            let report = FaultIsolator::new(context).isolate(layout);
            Err(Box::new(FailedRender { error, report }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxf2svg_core::color::Rgb;
    use dxf2svg_core::document::{Document, Layer};
    use dxf2svg_core::geometry::Point2;

    #[test]
    fn hidden_layers_are_not_replayed() {
        let mut document = Document::new();
        let mut off = Layer::new("OFF");
        off.is_visible = false;
        document.add_layer(off);
        document.add_circle(Point2::new(0.0, 0.0), -1.0, "OFF");
        document.add_line(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), "0");

        let context = RenderContext::new(&document, Rgb::BLACK, Rgb::WHITE);
        let report = FaultIsolator::new(&context).isolate(document.modelspace());
        assert_eq!(report.layers["OFF"], LayerVerdict::Hidden { entities: 1 });
        assert_eq!(report.layers["0"], LayerVerdict::Ok { checked: 1 });
        assert!(report.is_clean());
    }

    #[test]
    fn only_the_first_failure_per_layer_is_reported() {
        let mut document = Document::new();
        let first = document.add_circle(Point2::new(0.0, 0.0), -1.0, "B");
        document.add_circle(Point2::new(0.0, 0.0), -2.0, "B");

        let context = RenderContext::new(&document, Rgb::BLACK, Rgb::WHITE);
        let report = FaultIsolator::new(&context).isolate(document.modelspace());
        match &report.layers["B"] {
            LayerVerdict::Failed { entity, error, .. } => {
                assert_eq!(*entity, first);
                assert!(error.contains("-1"), "{error}");
            }
            other => panic!("期望失败结论，实际 {other:?}"),
        }
        assert_eq!(report.failed_layers().collect::<Vec<_>>(), vec!["B"]);
        assert!(report.to_string().contains("[失败] B"));
    }
}
