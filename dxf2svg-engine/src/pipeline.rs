use dxf2svg_core::document::Layout;
use dxf2svg_core::render::{Canvas, Extents, RenderedPath};
use tracing::{debug, info};

use crate::context::RenderContext;
use crate::errors::EngineError;
use crate::projector::extents_of;

/// 整个布局的渲染结果。
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub canvas: Canvas,
    pub extents: Extents,
}

/// 按顺序投影布局中的每个实体。任一实体失败即放弃整个画布。
#[derive(Debug, Clone, Copy)]
pub struct RenderPipeline<'a> {
    context: &'a RenderContext<'a>,
}

impl<'a> RenderPipeline<'a> {
    pub fn new(context: &'a RenderContext<'a>) -> Self {
        Self { context }
    }

    pub fn render(&self, layout: &Layout) -> Result<RenderOutput, EngineError> {
        let document = self.context.document;
        let style = self.context.style();
        let projector = self.context.projector();
        let mut canvas = Canvas::new(self.context.background);
        let mut hidden = 0usize;

        info!(
            layout = layout.name(),
            entities = layout.len(),
            background = %self.context.background,
            fallback = %self.context.fallback,
            "开始渲染布局"
        );

        for (id, entity) in layout.entities() {
            let layer = document.layer(entity.layer_name());
            if layer.is_some_and(|layer| !layer.is_rendered()) {
                hidden += 1;
                continue;
            }

            let projection =
                projector
                    .project(entity)
                    .map_err(|source| EngineError::RenderFailure {
                        entity: *id,
                        kind: entity.kind(),
                        layer: entity.layer_name().to_string(),
                        source,
                    })?;
            if projection.is_empty() {
                debug!(entity = %id, kind = %entity.kind(), "实体没有可绘制的内容");
                continue;
            }

            // 块参照的每个子实体单独成路径，共用块参照的实体编号。
            for part in projection.parts {
                canvas.push(RenderedPath {
                    entity: *id,
                    kind: part.kind,
                    stroke: style.stroke_for(part.style.color),
                    layer: part.style.layer,
                    segments: part.segments,
                    texts: part.texts,
                });
            }
        }

        let extents = extents_of(document, layout);
        info!(
            layout = layout.name(),
            paths = canvas.len(),
            hidden,
            valid_extents = extents.is_valid(),
            "布局渲染完成"
        );
        if let (Some(min), Some(max)) = (extents.min(), extents.max()) {
            debug!(
                min_x = min.x(),
                min_y = min.y(),
                max_x = max.x(),
                max_y = max.y(),
                "布局范围"
            );
        }

        Ok(RenderOutput { canvas, extents })
    }
}
