use std::f64::consts::{FRAC_PI_2, TAU};

use dxf2svg_core::document::{
    Arc, BlockDefinition, BlockReference, Circle, Dimension, Document, Ellipse, Entity,
    EntityKind, Hatch, HatchBoundary, HatchEdge, Layout, Polyline, PolylineVertex, Solid, Spline,
    ThreeDFace, canonical_interval,
};
use dxf2svg_core::geometry::{Bounds2D, Point2, Vector2};
use dxf2svg_core::render::{Extents, PathSegment, TextRun};
use glam::{DAffine2, DVec2, DVec3};
use tracing::{debug, trace};

use crate::errors::ProjectionError;
use crate::style::{EntityStyle, effective_layer};

/// INSERT 嵌套的最大深度。
pub const MAX_BLOCK_DEPTH: usize = 16;
const SPLINE_SAMPLES_PER_SPAN: usize = 16;
const BULGE_EPSILON: f64 = 1e-9;

/// 单个实体投影后的几何。块参照与标注按子实体拆分，每个子实体各自着色。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub parts: Vec<ProjectedPart>,
}

impl Projection {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(ProjectedPart::is_empty)
    }
}

/// 一个叶子实体的路径与文字，附带它的有效图层与声明颜色。
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedPart {
    pub kind: EntityKind,
    pub style: EntityStyle,
    pub segments: Vec<PathSegment>,
    pub texts: Vec<TextRun>,
}

impl ProjectedPart {
    fn new(kind: EntityKind, style: EntityStyle) -> Self {
        Self {
            kind,
            style,
            segments: Vec::new(),
            texts: Vec::new(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.texts.is_empty()
    }
}

/// 把实体的原生几何转换为输出坐标中的路径指令。只读访问文档，用于展开块参照。
#[derive(Debug, Clone, Copy)]
pub struct GeometryProjector<'a> {
    document: &'a Document,
}

impl<'a> GeometryProjector<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn project(&self, entity: &Entity) -> Result<Projection, ProjectionError> {
        let mut projection = Projection::default();
        let mut stack = Vec::new();
        self.project_into(entity, DAffine2::IDENTITY, None, &mut stack, &mut projection)?;
        Ok(projection)
    }

    fn project_into(
        &self,
        entity: &Entity,
        transform: DAffine2,
        parent: Option<&EntityStyle>,
        stack: &mut Vec<String>,
        out: &mut Projection,
    ) -> Result<(), ProjectionError> {
        let style = EntityStyle::resolve(self.document, entity, parent);
        match entity {
            Entity::BlockReference(reference) => {
                self.project_insert(reference, transform, &style, stack, out)
            }
            Entity::Dimension(dimension) => {
                self.project_dimension(dimension, transform, &style, stack, out)
            }
            other => {
                let mut part = ProjectedPart::new(other.kind(), style);
                project_leaf(other, &mut PathBuilder::new(transform, &mut part))?;
                if !part.is_empty() {
                    out.parts.push(part);
                }
                Ok(())
            }
        }
    }

    fn project_insert(
        &self,
        reference: &BlockReference,
        parent: DAffine2,
        style: &EntityStyle,
        stack: &mut Vec<String>,
        out: &mut Projection,
    ) -> Result<(), ProjectionError> {
        let block = self.lookup_block(&reference.name, stack)?;
        let transform = parent * insert_transform(reference, block.base_point)?;
        self.expand_block(block, transform, style, stack, out)
    }

    /// 标注的几何块已在世界坐标中，原样展开，不减基点。
    fn project_dimension(
        &self,
        dimension: &Dimension,
        transform: DAffine2,
        style: &EntityStyle,
        stack: &mut Vec<String>,
        out: &mut Projection,
    ) -> Result<(), ProjectionError> {
        if self.document.block(&dimension.block).is_none() {
            debug!(block = %dimension.block, "标注缺少几何块，跳过");
            return Ok(());
        }
        let block = self.lookup_block(&dimension.block, stack)?;
        self.expand_block(block, transform, style, stack, out)
    }

    fn lookup_block(
        &self,
        name: &str,
        stack: &[String],
    ) -> Result<&'a BlockDefinition, ProjectionError> {
        let block = self
            .document
            .block(name)
            .ok_or_else(|| ProjectionError::MissingBlock {
                name: name.to_string(),
            })?;
        if stack.iter().any(|entry| entry == name) {
            return Err(ProjectionError::BlockCycle {
                name: name.to_string(),
            });
        }
        if stack.len() >= MAX_BLOCK_DEPTH {
            return Err(ProjectionError::BlockNestingTooDeep {
                name: name.to_string(),
                limit: MAX_BLOCK_DEPTH,
            });
        }
        Ok(block)
    }

    fn expand_block(
        &self,
        block: &BlockDefinition,
        transform: DAffine2,
        style: &EntityStyle,
        stack: &mut Vec<String>,
        out: &mut Projection,
    ) -> Result<(), ProjectionError> {
        trace!(
            block = %block.name,
            depth = stack.len() + 1,
            entities = block.entities.len(),
            "展开块"
        );
        stack.push(block.name.clone());
        for child in &block.entities {
            let hidden = self
                .document
                .layer(effective_layer(child, Some(style)))
                .is_some_and(|layer| !layer.is_rendered());
            if hidden {
                continue;
            }
            self.project_into(child, transform, Some(style), stack, out)?;
        }
        stack.pop();
        Ok(())
    }
}

fn project_leaf(entity: &Entity, path: &mut PathBuilder<'_>) -> Result<(), ProjectionError> {
    match entity {
        Entity::Line(line) => {
            let start = finite(line.start, "LINE 起点")?;
            let end = finite(line.end, "LINE 终点")?;
            path.move_to(start);
            path.line_to(end);
        }
        Entity::Point(point) => {
            // 零长度路径配合圆头线帽显示为一个点。
            let position = finite(point.position, "POINT")?;
            path.move_to(position);
            path.line_to(position);
        }
        Entity::Circle(circle) => project_circle(circle, path)?,
        Entity::Arc(arc) => project_arc(arc, path)?,
        Entity::Ellipse(ellipse) => project_ellipse(ellipse, path)?,
        Entity::Polyline(polyline) => project_polyline(polyline, path)?,
        Entity::Spline(spline) => project_spline(spline, path)?,
        Entity::Text(text) => {
            let anchor = finite(text.insert, "TEXT 插入点")?;
            let height = finite_scalar(text.height, "TEXT 字高")?;
            let rotation = finite_scalar(text.rotation, "TEXT 旋转角")?;
            path.text(anchor, &text.content, height, rotation);
        }
        Entity::MText(mtext) => {
            let anchor = finite(mtext.insert, "MTEXT 插入点")?;
            let height = finite_scalar(mtext.height, "MTEXT 字高")?;
            if !mtext.direction.is_finite() {
                return Err(ProjectionError::NonFinite {
                    what: "MTEXT 方向",
                });
            }
            path.text(anchor, &mtext.content, height, mtext.rotation());
        }
        Entity::Solid(solid) => project_solid(solid, path)?,
        Entity::Face3D(face) => project_face(face, path)?,
        Entity::Hatch(hatch) => project_hatch(hatch, path)?,
        // 由 GeometryProjector 展开。
        Entity::BlockReference(_) | Entity::Dimension(_) => {}
    }
    Ok(())
}

/// T(插入点)·R(旋转)·S(比例)·T(−基点)。
fn insert_transform(reference: &BlockReference, base: Point2) -> Result<DAffine2, ProjectionError> {
    let insert = finite(reference.insert, "INSERT 插入点")?;
    let base = finite(base, "块基点")?;
    if !reference.scale.is_finite() {
        return Err(ProjectionError::NonFinite {
            what: "INSERT 比例",
        });
    }
    let rotation = finite_scalar(reference.rotation, "INSERT 旋转角")?;
    Ok(DAffine2::from_translation(insert)
        * DAffine2::from_angle(rotation)
        * DAffine2::from_scale(reference.scale.as_vec2())
        * DAffine2::from_translation(-base))
}

/// 计算布局范围。块参照与标注按块内容变换后的范围计入；没有可计算范围的实体被跳过。
pub fn extents_of(document: &Document, layout: &Layout) -> Extents {
    let mut total = Bounds2D::empty();
    let mut stack = Vec::new();
    for (_, entity) in layout.entities() {
        if let Some(bounds) = entity_extent(document, entity, DAffine2::IDENTITY, &mut stack) {
            total.include_bounds(&bounds);
        }
    }
    Extents::from_bounds(total)
}

fn entity_extent(
    document: &Document,
    entity: &Entity,
    transform: DAffine2,
    stack: &mut Vec<String>,
) -> Option<Bounds2D> {
    let expanded = match entity {
        Entity::BlockReference(reference) => document.block(&reference.name).and_then(|block| {
            let local = insert_transform(reference, block.base_point).ok()?;
            block_extent(document, block, transform * local, stack)
        }),
        Entity::Dimension(dimension) => document
            .block(&dimension.block)
            .and_then(|block| block_extent(document, block, transform, stack)),
        _ => None,
    };
    let bounds = match expanded {
        Some(bounds) => bounds,
        None => transform_bounds(entity.bounds()?, transform),
    };
    bounds.is_finite().then_some(bounds)
}

fn block_extent(
    document: &Document,
    block: &BlockDefinition,
    transform: DAffine2,
    stack: &mut Vec<String>,
) -> Option<Bounds2D> {
    if stack.len() >= MAX_BLOCK_DEPTH || stack.iter().any(|name| name == &block.name) {
        return None;
    }
    stack.push(block.name.clone());
    let mut bounds = Bounds2D::empty();
    for child in &block.entities {
        if let Some(child_bounds) = entity_extent(document, child, transform, stack) {
            bounds.include_bounds(&child_bounds);
        }
    }
    stack.pop();
    (!bounds.is_empty()).then_some(bounds)
}

fn transform_bounds(bounds: Bounds2D, transform: DAffine2) -> Bounds2D {
    if transform == DAffine2::IDENTITY {
        return bounds;
    }
    let (min, max) = (bounds.min().as_vec2(), bounds.max().as_vec2());
    let mut result = Bounds2D::empty();
    for corner in [
        min,
        DVec2::new(max.x, min.y),
        max,
        DVec2::new(min.x, max.y),
    ] {
        result.include_point(Point2::from_vec(transform.transform_point2(corner)));
    }
    result
}

/// 在给定变换下收集路径指令。
struct PathBuilder<'o> {
    transform: DAffine2,
    out: &'o mut ProjectedPart,
}

impl<'o> PathBuilder<'o> {
    fn new(transform: DAffine2, out: &'o mut ProjectedPart) -> Self {
        Self { transform, out }
    }

    fn map(&self, point: DVec2) -> Point2 {
        Point2::from_vec(self.transform.transform_point2(point))
    }

    fn move_to(&mut self, point: DVec2) {
        let point = self.map(point);
        self.out.segments.push(PathSegment::MoveTo(point));
    }

    fn line_to(&mut self, point: DVec2) {
        let point = self.map(point);
        self.out.segments.push(PathSegment::LineTo(point));
    }

    /// 子路径已开始时连线，否则移动。
    fn connect(&mut self, point: DVec2, started: &mut bool) {
        if *started {
            self.line_to(point);
        } else {
            self.move_to(point);
            *started = true;
        }
    }

    fn cubic_to(&mut self, ctrl1: DVec2, ctrl2: DVec2, to: DVec2) {
        let segment = PathSegment::CubicTo {
            ctrl1: self.map(ctrl1),
            ctrl2: self.map(ctrl2),
            to: self.map(to),
        };
        self.out.segments.push(segment);
    }

    fn close(&mut self) {
        self.out.segments.push(PathSegment::Close);
    }

    fn text(&mut self, anchor: DVec2, content: &str, height: f64, rotation: f64) {
        if content.trim().is_empty() {
            return;
        }
        let linear = self.transform.matrix2;
        let scale = linear.determinant().abs().sqrt();
        let turn = linear.x_axis.y.atan2(linear.x_axis.x);
        let run = TextRun {
            anchor: self.map(anchor),
            content: content.to_string(),
            height: height.abs() * scale,
            rotation: rotation + turn,
        };
        self.out.texts.push(run);
    }
}

/// 椭圆弧 `center + major·cos t + minor·sin t`，按不超过 90° 一段拟合为三次贝塞尔。
struct EllipticArc {
    center: DVec2,
    major: DVec2,
    minor: DVec2,
}

impl EllipticArc {
    fn circular(center: DVec2, radius: f64) -> Self {
        Self {
            center,
            major: DVec2::new(radius, 0.0),
            minor: DVec2::new(0.0, radius),
        }
    }

    fn elliptic(center: DVec2, major: DVec2, ratio: f64) -> Self {
        Self {
            center,
            major,
            minor: major.perp() * ratio,
        }
    }

    fn point(&self, t: f64) -> DVec2 {
        self.center + self.major * t.cos() + self.minor * t.sin()
    }

    fn tangent(&self, t: f64) -> DVec2 {
        self.minor * t.cos() - self.major * t.sin()
    }

    /// 只输出曲线段，起点由调用方负责。`sweep` 不超过一整圈。
    fn append(&self, path: &mut PathBuilder<'_>, start: f64, sweep: f64) {
        let sweep = sweep.clamp(-TAU, TAU);
        let count = ((sweep.abs() / FRAC_PI_2).ceil() as usize).max(1);
        let step = sweep / count as f64;
        let k = 4.0 / 3.0 * (step / 4.0).tan();
        for index in 0..count {
            let t0 = start + step * index as f64;
            let t1 = t0 + step;
            let from = self.point(t0);
            let to = self.point(t1);
            path.cubic_to(from + self.tangent(t0) * k, to - self.tangent(t1) * k, to);
        }
    }
}

/// 起止角转为 (起点, 有符号扫角)。顺时针时从 `start` 向负方向走到 `end`。
fn directed_sweep(start: f64, end: f64, counter_clockwise: bool) -> (f64, f64) {
    if counter_clockwise {
        let (from, to) = canonical_interval(start, end);
        (from, to - from)
    } else {
        let (from, to) = canonical_interval(end, start);
        (to, from - to)
    }
}

fn project_circle(circle: &Circle, path: &mut PathBuilder<'_>) -> Result<(), ProjectionError> {
    let center = finite(circle.center, "CIRCLE 圆心")?;
    let radius = checked_radius(circle.radius, "CIRCLE 半径")?;
    if radius == 0.0 {
        return Ok(());
    }
    let arc = EllipticArc::circular(center, radius);
    path.move_to(arc.point(0.0));
    arc.append(path, 0.0, TAU);
    path.close();
    Ok(())
}

fn project_arc(arc: &Arc, path: &mut PathBuilder<'_>) -> Result<(), ProjectionError> {
    let center = finite(arc.center, "ARC 圆心")?;
    let radius = checked_radius(arc.radius, "ARC 半径")?;
    let start = finite_scalar(arc.start_angle, "ARC 起始角")?;
    let end = finite_scalar(arc.end_angle, "ARC 终止角")?;
    if radius == 0.0 {
        return Ok(());
    }
    let (start, end) = canonical_interval(start, end);
    let curve = EllipticArc::circular(center, radius);
    path.move_to(curve.point(start));
    curve.append(path, start, end - start);
    Ok(())
}

fn checked_ellipse(
    center: Point2,
    major_axis: Vector2,
    ratio: f64,
    what: &'static str,
) -> Result<EllipticArc, ProjectionError> {
    let center = finite(center, what)?;
    let major = finite_vector(major_axis, what)?;
    let ratio = finite_scalar(ratio, what)?;
    if major.length() <= f64::EPSILON {
        return Err(ProjectionError::DegenerateAxis);
    }
    if ratio <= 0.0 || ratio > 1.0 {
        return Err(ProjectionError::InvalidRatio { ratio });
    }
    Ok(EllipticArc::elliptic(center, major, ratio))
}

fn project_ellipse(ellipse: &Ellipse, path: &mut PathBuilder<'_>) -> Result<(), ProjectionError> {
    let curve = checked_ellipse(ellipse.center, ellipse.major_axis, ellipse.ratio, "ELLIPSE")?;
    let start = finite_scalar(ellipse.start_parameter, "ELLIPSE 起始参数")?;
    let end = finite_scalar(ellipse.end_parameter, "ELLIPSE 终止参数")?;

    let (start, sweep) = directed_sweep(start, end, true);
    path.move_to(curve.point(start));
    curve.append(path, start, sweep);
    if (sweep - TAU).abs() < 1e-9 {
        path.close();
    }
    Ok(())
}

fn project_polyline(polyline: &Polyline, path: &mut PathBuilder<'_>) -> Result<(), ProjectionError> {
    let count = polyline.vertices.len();
    if count < 2 {
        return Err(ProjectionError::TooFewVertices { count });
    }
    check_vertices(&polyline.vertices)?;

    path.move_to(polyline.vertices[0].position.as_vec2());
    for (start, end, bulge) in polyline.segments() {
        append_bulge_segment(path, start.as_vec2(), end.as_vec2(), bulge);
    }
    if polyline.is_closed {
        path.close();
    }
    Ok(())
}

fn check_vertices(vertices: &[PolylineVertex]) -> Result<(), ProjectionError> {
    for vertex in vertices {
        finite(vertex.position, "多段线顶点")?;
        finite_scalar(vertex.bulge, "多段线凸度")?;
    }
    Ok(())
}

/// bulge = tan(θ/4)，正值逆时针。凸度为 0 或弦长为 0 时退化为直线。
fn append_bulge_segment(path: &mut PathBuilder<'_>, start: DVec2, end: DVec2, bulge: f64) {
    let chord = end - start;
    let chord_len = chord.length();
    if bulge.abs() <= BULGE_EPSILON || chord_len <= f64::EPSILON {
        path.line_to(end);
        return;
    }
    let theta = 4.0 * bulge.atan();
    let radius = chord_len / (2.0 * (theta / 2.0).sin());
    let midpoint = (start + end) * 0.5;
    let center = midpoint + chord.perp() / chord_len * radius * (theta / 2.0).cos();
    let offset = start - center;
    let curve = EllipticArc::circular(center, radius.abs());
    curve.append(path, offset.y.atan2(offset.x), theta);
}

fn project_spline(spline: &Spline, path: &mut PathBuilder<'_>) -> Result<(), ProjectionError> {
    let points = spline_points(spline)?;
    let mut started = false;
    for point in points {
        path.connect(point, &mut started);
    }
    if spline.is_closed {
        path.close();
    }
    Ok(())
}

/// 样条的折线采样。只有拟合点时按拟合点连线近似。
fn spline_points(spline: &Spline) -> Result<Vec<DVec2>, ProjectionError> {
    let invalid = |reason: String| ProjectionError::InvalidSpline { reason };
    if spline.degree < 1 {
        return Err(invalid(format!("阶数 {} 小于 1", spline.degree)));
    }
    let degree = spline.degree as usize;

    if spline.control_points.is_empty() {
        if spline.fit_points.len() < 2 {
            return Err(invalid(format!(
                "没有控制点且拟合点只有 {} 个",
                spline.fit_points.len()
            )));
        }
        return spline
            .fit_points
            .iter()
            .map(|point| finite(*point, "SPLINE 拟合点"))
            .collect();
    }

    let count = spline.control_points.len();
    if count < degree + 1 {
        return Err(invalid(format!(
            "{count} 个控制点不足以构成 {degree} 阶样条"
        )));
    }
    let weights = if spline.weights.is_empty() {
        vec![1.0; count]
    } else if spline.weights.len() == count {
        spline.weights.clone()
    } else {
        return Err(invalid(format!(
            "权重数量 {} 与控制点数量 {count} 不一致",
            spline.weights.len()
        )));
    };
    if weights.iter().any(|weight| !weight.is_finite() || *weight <= 0.0) {
        return Err(invalid("权重必须为正数".to_string()));
    }

    let knots = if spline.knot_values.is_empty() {
        clamped_uniform_knots(count, degree)
    } else {
        spline.knot_values.clone()
    };
    if knots.len() != count + degree + 1 {
        return Err(invalid(format!(
            "节点数量 {} 应为 {}",
            knots.len(),
            count + degree + 1
        )));
    }
    if knots.iter().any(|knot| !knot.is_finite()) || knots.windows(2).any(|w| w[1] < w[0]) {
        return Err(invalid("节点向量必须为非递减的有限值".to_string()));
    }
    if knots[count] <= knots[degree] {
        return Err(invalid("节点向量的定义域为空".to_string()));
    }

    let mut homogeneous = Vec::with_capacity(count);
    for (point, weight) in spline.control_points.iter().zip(&weights) {
        let point = finite(*point, "SPLINE 控制点")?;
        homogeneous.push(DVec3::new(point.x * weight, point.y * weight, *weight));
    }

    let samples = if degree == 1 { 1 } else { SPLINE_SAMPLES_PER_SPAN };
    let mut points = Vec::new();
    for span in degree..count {
        let (u0, u1) = (knots[span], knots[span + 1]);
        if u1 <= u0 {
            continue;
        }
        // 相邻区间共享端点，只有第一个区间输出起点。
        let first_step = usize::from(!points.is_empty());
        for step in first_step..samples {
            let u = u0 + (u1 - u0) * step as f64 / samples as f64;
            points.push(de_boor(span, u, degree, &knots, &homogeneous));
        }
        points.push(de_boor(span, u1, degree, &knots, &homogeneous));
    }
    Ok(points)
}

fn clamped_uniform_knots(count: usize, degree: usize) -> Vec<f64> {
    let interior = count - degree - 1;
    let mut knots = vec![0.0; degree + 1];
    knots.extend((1..=interior).map(|index| index as f64 / (interior + 1) as f64));
    knots.extend(std::iter::repeat_n(1.0, degree + 1));
    knots
}

/// 在节点区间 `[knots[span], knots[span + 1]]` 内用 de Boor 算法求有理样条上的点。
fn de_boor(span: usize, u: f64, degree: usize, knots: &[f64], control: &[DVec3]) -> DVec2 {
    let mut points: Vec<DVec3> = (0..=degree).map(|j| control[j + span - degree]).collect();
    for r in 1..=degree {
        for j in (r..=degree).rev() {
            let i = j + span - degree;
            let denominator = knots[i + degree + 1 - r] - knots[i];
            let alpha = if denominator.abs() <= f64::EPSILON {
                0.0
            } else {
                (u - knots[i]) / denominator
            };
            points[j] = points[j - 1] * (1.0 - alpha) + points[j] * alpha;
        }
    }
    let point = points[degree];
    DVec2::new(point.x / point.z, point.y / point.z)
}

fn project_solid(solid: &Solid, path: &mut PathBuilder<'_>) -> Result<(), ProjectionError> {
    let mut corners = [DVec2::ZERO; 4];
    for (slot, vertex) in corners.iter_mut().zip(&solid.vertices) {
        *slot = finite(*vertex, "SOLID 顶点")?;
    }
    // 第 3、4 点交换后才是轮廓顺序。
    path.move_to(corners[0]);
    path.line_to(corners[1]);
    path.line_to(corners[3]);
    path.line_to(corners[2]);
    path.close();
    Ok(())
}

fn project_face(face: &ThreeDFace, path: &mut PathBuilder<'_>) -> Result<(), ProjectionError> {
    let mut corners = [DVec2::ZERO; 4];
    for (slot, vertex) in corners.iter_mut().zip(&face.vertices) {
        *slot = finite(vertex.to_point2(), "3DFACE 顶点")?;
    }
    path.move_to(corners[0]);
    for edge in 0..4 {
        let next = corners[(edge + 1) % 4];
        if face.invisible_edges[edge] {
            path.move_to(next);
        } else {
            path.line_to(next);
        }
    }
    Ok(())
}

/// 每条边界输出一条闭合子路径。
fn project_hatch(hatch: &Hatch, path: &mut PathBuilder<'_>) -> Result<(), ProjectionError> {
    for boundary in &hatch.boundaries {
        match boundary {
            HatchBoundary::Polyline(vertices) => {
                let count = vertices.len();
                if count < 2 {
                    return Err(ProjectionError::TooFewVertices { count });
                }
                check_vertices(vertices)?;
                path.move_to(vertices[0].position.as_vec2());
                for (index, vertex) in vertices.iter().enumerate() {
                    let next = &vertices[(index + 1) % count];
                    append_bulge_segment(
                        path,
                        vertex.position.as_vec2(),
                        next.position.as_vec2(),
                        vertex.bulge,
                    );
                }
                path.close();
            }
            HatchBoundary::Edges(edges) => {
                let mut started = false;
                for edge in edges {
                    append_hatch_edge(edge, path, &mut started)?;
                }
                if started {
                    path.close();
                }
            }
        }
    }
    Ok(())
}

fn append_hatch_edge(
    edge: &HatchEdge,
    path: &mut PathBuilder<'_>,
    started: &mut bool,
) -> Result<(), ProjectionError> {
    match edge {
        HatchEdge::Line { start, end } => {
            let start = finite(*start, "HATCH 直线边")?;
            let end = finite(*end, "HATCH 直线边")?;
            path.connect(start, started);
            path.line_to(end);
        }
        HatchEdge::Arc {
            center,
            radius,
            start_angle,
            end_angle,
            counter_clockwise,
        } => {
            let center = finite(*center, "HATCH 圆弧边")?;
            let radius = checked_radius(*radius, "HATCH 圆弧边半径")?;
            let start = finite_scalar(*start_angle, "HATCH 圆弧边起始角")?;
            let end = finite_scalar(*end_angle, "HATCH 圆弧边终止角")?;
            let (start, end) = HatchEdge::oriented(start, end, *counter_clockwise);
            let (start, sweep) = directed_sweep(start, end, *counter_clockwise);
            let curve = EllipticArc::circular(center, radius);
            path.connect(curve.point(start), started);
            if radius > 0.0 {
                curve.append(path, start, sweep);
            }
        }
        HatchEdge::Ellipse {
            center,
            major_axis,
            ratio,
            start_parameter,
            end_parameter,
            counter_clockwise,
        } => {
            let curve = checked_ellipse(*center, *major_axis, *ratio, "HATCH 椭圆边")?;
            let start = finite_scalar(*start_parameter, "HATCH 椭圆边起始参数")?;
            let end = finite_scalar(*end_parameter, "HATCH 椭圆边终止参数")?;
            let (start, end) = HatchEdge::oriented(start, end, *counter_clockwise);
            let (start, sweep) = directed_sweep(start, end, *counter_clockwise);
            path.connect(curve.point(start), started);
            curve.append(path, start, sweep);
        }
        HatchEdge::Spline {
            degree,
            control_points,
            knot_values,
            weights,
        } => {
            let spline = Spline {
                degree: *degree,
                is_closed: false,
                is_rational: !weights.is_empty(),
                control_points: control_points.clone(),
                fit_points: Vec::new(),
                knot_values: knot_values.clone(),
                weights: weights.clone(),
                layer: String::new(),
                color: None,
            };
            for point in spline_points(&spline)? {
                path.connect(point, started);
            }
        }
    }
    Ok(())
}

fn finite(point: Point2, what: &'static str) -> Result<DVec2, ProjectionError> {
    if point.is_finite() {
        Ok(point.as_vec2())
    } else {
        Err(ProjectionError::NonFinite { what })
    }
}

fn finite_vector(vector: Vector2, what: &'static str) -> Result<DVec2, ProjectionError> {
    if vector.is_finite() {
        Ok(vector.as_vec2())
    } else {
        Err(ProjectionError::NonFinite { what })
    }
}

fn finite_scalar(value: f64, what: &'static str) -> Result<f64, ProjectionError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ProjectionError::NonFinite { what })
    }
}

fn checked_radius(radius: f64, what: &'static str) -> Result<f64, ProjectionError> {
    let radius = finite_scalar(radius, what)?;
    if radius < 0.0 {
        return Err(ProjectionError::NegativeRadius { radius });
    }
    Ok(radius)
}
