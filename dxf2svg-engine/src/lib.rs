pub mod isolator;
pub mod pipeline;
pub mod projector;

pub use isolator::{
    DiagnosticReport, FailedRender, FaultIsolator, LayerVerdict, render_with_diagnostics,
};
pub use pipeline::{RenderOutput, RenderPipeline};
pub use projector::{GeometryProjector, ProjectedPart, Projection, extents_of};

pub mod errors {
    use dxf2svg_core::document::{EntityId, EntityKind};
    use thiserror::Error;

    /// 单个实体无法转换为路径的原因。
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum ProjectionError {
        #[error("{what} 含非有限坐标")]
        NonFinite { what: &'static str },
        #[error("半径为负：{radius}")]
        NegativeRadius { radius: f64 },
        #[error("椭圆主轴长度为 0")]
        DegenerateAxis,
        #[error("椭圆短长轴比 {ratio} 不在 (0, 1] 范围内")]
        InvalidRatio { ratio: f64 },
        #[error("多段线只有 {count} 个顶点，至少需要 2 个")]
        TooFewVertices { count: usize },
        #[error("样条曲线无效：{reason}")]
        InvalidSpline { reason: String },
        #[error("块 \"{name}\" 未定义")]
        MissingBlock { name: String },
        #[error("块 \"{name}\" 引用了自身")]
        BlockCycle { name: String },
        #[error("块 \"{name}\" 嵌套超过 {limit} 层")]
        BlockNestingTooDeep { name: String, limit: usize },
    }

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("找不到布局 \"{requested}\"")]
        LayoutNotFound { requested: String },
        #[error("渲染实体 {entity}（{kind}，图层 \"{layer}\"）失败：{source}")]
        RenderFailure {
            entity: EntityId,
            kind: EntityKind,
            layer: String,
            #[source]
            source: ProjectionError,
        },
    }
}

pub mod context {
    use dxf2svg_core::color::Rgb;
    use dxf2svg_core::document::Document;

    use crate::projector::GeometryProjector;
    use crate::style::StyleResolver;

    /// 一次转换的上下文，按引用传给各个组件，不跨转换复用。
    #[derive(Debug, Clone, Copy)]
    pub struct RenderContext<'a> {
        pub document: &'a Document,
        pub background: Rgb,
        pub fallback: Rgb,
    }

    impl<'a> RenderContext<'a> {
        pub fn new(document: &'a Document, background: Rgb, fallback: Rgb) -> Self {
            Self {
                document,
                background,
                fallback,
            }
        }

        #[inline]
        pub fn style(&self) -> StyleResolver {
            StyleResolver::new(self.background, self.fallback)
        }

        #[inline]
        pub fn projector(&self) -> GeometryProjector<'a> {
            GeometryProjector::new(self.document)
        }
    }
}

pub mod layout {
    use dxf2svg_core::document::{Document, Layout};
    use tracing::debug;

    use crate::errors::EngineError;

    const MODEL_SPACE_ALIASES: [&str; 4] = ["", "model", "modelspace", "model space"];

    /// 按名称选择布局：去掉首尾空白后不区分大小写比较，模型空间的别名总能命中。
    pub fn resolve_layout<'d>(
        document: &'d Document,
        requested: &str,
    ) -> Result<&'d Layout, EngineError> {
        let normalized = requested.trim().to_lowercase();
        if MODEL_SPACE_ALIASES.contains(&normalized.as_str()) {
            debug!(requested, "使用模型空间布局");
            return Ok(document.modelspace());
        }

        document
            .layouts()
            .find(|layout| layout.name().to_lowercase() == normalized)
            .inspect(|layout| debug!(requested, layout = layout.name(), "已匹配布局"))
            .ok_or_else(|| EngineError::LayoutNotFound {
                requested: requested.to_string(),
            })
    }

}

pub mod style {
    use dxf2svg_core::color::{Color, Rgb};
    use dxf2svg_core::document::{Document, Entity, Layer};

    /// 块内实体放在图层 "0" 上时归属块参照的图层。
    const INHERITING_LAYER: &str = "0";

    /// 把实体或图层上声明的颜色解析为最终描边色。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StyleResolver {
        background: Rgb,
        fallback: Rgb,
    }

    impl StyleResolver {
        pub fn new(background: Rgb, fallback: Rgb) -> Self {
            Self {
                background,
                fallback,
            }
        }

        /// 画布填充色，只用于背景，不参与描边色解析。
        #[inline]
        pub fn background(&self) -> Rgb {
            self.background
        }

        #[inline]
        pub fn fallback(&self) -> Rgb {
            self.fallback
        }

        /// ACI 7 是前景色，随画布明暗取回退色。
        pub fn stroke_for(&self, color: Option<Color>) -> Rgb {
            match color {
                Some(color) if color.is_foreground() => self.fallback,
                Some(color) => color.to_rgb().unwrap_or(self.fallback),
                None => self.fallback,
            }
        }
    }

    /// 实体的有效图层与声明颜色。块参照把自己的 `EntityStyle` 传给子实体。
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct EntityStyle {
        pub layer: String,
        pub color: Option<Color>,
    }

    impl EntityStyle {
        /// `parent` 为外层块参照的样式；顶层实体传 None。
        pub fn resolve(document: &Document, entity: &Entity, parent: Option<&EntityStyle>) -> Self {
            let layer = effective_layer(entity, parent);
            Self {
                color: declared_color(entity, document.layer(layer), parent),
                layer: layer.to_string(),
            }
        }
    }

    pub fn effective_layer<'e>(entity: &'e Entity, parent: Option<&'e EntityStyle>) -> &'e str {
        match parent {
            Some(parent) if entity.layer_name() == INHERITING_LAYER => &parent.layer,
            _ => entity.layer_name(),
        }
    }

    /// 覆盖色优先；随块取块参照的颜色；随层取有效图层的颜色。顶层的随块视作随层。
    pub fn declared_color(
        entity: &Entity,
        layer: Option<&Layer>,
        parent: Option<&EntityStyle>,
    ) -> Option<Color> {
        let layer_color = || layer.and_then(|layer| layer.color);
        match (entity.color(), parent) {
            (Some(Color::ByBlock), Some(parent)) => parent.color,
            (Some(Color::ByBlock), None) | (None, _) => layer_color(),
            (Some(color), _) => Some(color),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use dxf2svg_core::document::Line;
        use dxf2svg_core::geometry::Point2;

        const DARK: Rgb = Rgb::new(0x0b, 0x12, 0x20);
        const LIGHT: Rgb = Rgb::new(0xf8, 0xfa, 0xfc);

        fn line_on(layer: &str, color: Option<Color>) -> Entity {
            Entity::Line(Line {
                start: Point2::new(0.0, 0.0),
                end: Point2::new(1.0, 0.0),
                layer: layer.to_string(),
                color,
            })
        }

        fn line(color: Option<Color>) -> Entity {
            line_on("A", color)
        }

        fn stroke(resolver: &StyleResolver, entity: &Entity, layer: Option<&Layer>) -> Rgb {
            resolver.stroke_for(declared_color(entity, layer, None))
        }

        #[test]
        fn uncoloured_entity_on_uncoloured_layer_uses_fallback() {
            let layer = Layer::new("A");
            for background in [DARK, LIGHT, Rgb::BLACK] {
                let resolver = StyleResolver::new(background, LIGHT);
                assert_eq!(stroke(&resolver, &line(None), Some(&layer)), LIGHT);
                assert_eq!(stroke(&resolver, &line(None), None), LIGHT);
            }
        }

        #[test]
        fn entity_override_beats_layer_color() {
            let resolver = StyleResolver::new(DARK, LIGHT);
            let layer = Layer::new("A").with_color(Color::Aci(1));
            let entity = line(Some(Color::Rgb(Rgb::new(1, 2, 3))));
            assert_eq!(stroke(&resolver, &entity, Some(&layer)), Rgb::new(1, 2, 3));
            assert_eq!(stroke(&resolver, &line(None), Some(&layer)), Rgb::new(255, 0, 0));
        }

        #[test]
        fn layer_color_equal_to_background_is_kept() {
            let resolver = StyleResolver::new(Rgb::new(255, 0, 0), LIGHT);
            let layer = Layer::new("A").with_color(Color::Aci(1));
            assert_eq!(stroke(&resolver, &line(None), Some(&layer)), Rgb::new(255, 0, 0));
        }

        #[test]
        fn foreground_and_by_block_fall_through() {
            let resolver = StyleResolver::new(DARK, LIGHT);
            let layer = Layer::new("A").with_color(Color::Aci(3));
            assert_eq!(stroke(&resolver, &line(Some(Color::Aci(7))), Some(&layer)), LIGHT);
            assert_eq!(
                stroke(&resolver, &line(Some(Color::ByBlock)), Some(&layer)),
                Rgb::new(0, 255, 0)
            );
        }

        #[test]
        fn block_children_inherit_by_block_and_layer_zero() {
            let mut document = Document::new();
            document.add_layer(Layer::new("PIPES").with_color(Color::Aci(4)));
            document.add_layer(Layer::new("TAGS").with_color(Color::Aci(6)));
            let insert = EntityStyle {
                layer: "PIPES".to_string(),
                color: Some(Color::Aci(2)),
            };

            let by_block = EntityStyle::resolve(
                &document,
                &line_on("TAGS", Some(Color::ByBlock)),
                Some(&insert),
            );
            assert_eq!(by_block.color, Some(Color::Aci(2)));
            assert_eq!(by_block.layer, "TAGS");

            let explicit =
                EntityStyle::resolve(&document, &line_on("0", Some(Color::Aci(1))), Some(&insert));
            assert_eq!(explicit.color, Some(Color::Aci(1)));
            assert_eq!(explicit.layer, "PIPES");

            let on_own_layer = EntityStyle::resolve(&document, &line_on("TAGS", None), Some(&insert));
            assert_eq!(on_own_layer.color, Some(Color::Aci(6)));

            let on_layer_zero = EntityStyle::resolve(&document, &line_on("0", None), Some(&insert));
            assert_eq!(on_layer_zero.layer, "PIPES");
            assert_eq!(on_layer_zero.color, Some(Color::Aci(4)));
        }
    }
}

pub mod page {
    use dxf2svg_core::geometry::Point2;
    use dxf2svg_core::render::{Extents, Page};
    use tracing::debug;

    pub const FALLBACK_WIDTH: f64 = 1920.0;
    pub const FALLBACK_HEIGHT: f64 = 1080.0;
    pub const MIN_DIMENSION: f64 = 1.0;

    /// 由布局范围推导输出页面尺寸（毫米），退化的轴各自使用固定回退值。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct PageSizer {
        pub fallback_width: f64,
        pub fallback_height: f64,
        pub min_dimension: f64,
    }

    impl Default for PageSizer {
        fn default() -> Self {
            Self {
                fallback_width: FALLBACK_WIDTH,
                fallback_height: FALLBACK_HEIGHT,
                min_dimension: MIN_DIMENSION,
            }
        }
    }

    impl PageSizer {
        pub fn size_for(&self, extents: &Extents) -> (f64, f64) {
            let Some(bounds) = extents.bounds() else {
                return (self.fallback_width, self.fallback_height);
            };
            let pick = |span: f64, fallback: f64| {
                let span = span.abs();
                if span.is_finite() && span > self.min_dimension {
                    span
                } else {
                    fallback
                }
            };
            (
                pick(bounds.width(), self.fallback_width),
                pick(bounds.height(), self.fallback_height),
            )
        }

        /// 页面以范围中心为视图中心；没有有效范围时视图从原点开始。
        pub fn page_for(&self, extents: &Extents) -> Page {
            let (width, height) = self.size_for(extents);
            let center = extents
                .bounds()
                .map(|bounds| bounds.center())
                .unwrap_or_else(|| Point2::new(width / 2.0, height / 2.0));
            debug!(
                width,
                height,
                center_x = center.x(),
                center_y = center.y(),
                valid_extents = extents.is_valid(),
                "已确定页面尺寸"
            );
            Page::new(width, height, center)
        }
    }

}

pub mod census {
    use std::collections::BTreeMap;
    use std::fmt;

    use dxf2svg_core::document::Layout;
    use serde::Serialize;
    use tracing::info;

    /// 布局内实体的分布统计，键按字典序排列以保证输出稳定。
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
    pub struct LayoutCensus {
        pub total: usize,
        pub per_layer: BTreeMap<String, usize>,
        pub per_kind: BTreeMap<String, usize>,
        pub per_layer_kind: BTreeMap<String, BTreeMap<String, usize>>,
    }

    impl LayoutCensus {
        pub fn log(&self, layout: &str) {
            info!(layout, total = self.total, "布局实体统计");
            for (layer, kinds) in &self.per_layer_kind {
                for (kind, count) in kinds {
                    info!(layout, layer = %layer, kind = %kind, count, "图层实体数");
                }
            }
        }
    }

    pub fn census(layout: &Layout) -> LayoutCensus {
        let mut census = LayoutCensus::default();
        for (_, entity) in layout.entities() {
            let layer = entity.layer_name().to_string();
            let kind = entity.kind().dxf_name().to_string();
            census.total += 1;
            *census.per_layer.entry(layer.clone()).or_default() += 1;
            *census.per_kind.entry(kind.clone()).or_default() += 1;
            *census
                .per_layer_kind
                .entry(layer)
                .or_default()
                .entry(kind)
                .or_default() += 1;
        }
        census
    }

    impl fmt::Display for LayoutCensus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "实体总数：{}", self.total)?;
            for (layer, kinds) in &self.per_layer_kind {
                let detail = kinds
                    .iter()
                    .map(|(kind, count)| format!("{kind} {count}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(
                    f,
                    "  {layer}: {}（{detail}）",
                    self.per_layer.get(layer).copied().unwrap_or_default()
                )?;
            }
            Ok(())
        }
    }

}
