pub mod geometry {
    use glam::{DVec2, DVec3};
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，坐标单位沿用图纸单位。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        /// 两个分量均为有限数值。
        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 三维点，仅 3DFACE 使用；投影时丢弃 Z。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn to_point2(self) -> Point2 {
            Point2::new(self.0.x, self.0.y)
        }
    }

    /// 轴对齐边界框，用于估算布局范围。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.max.y() - self.min.y()
        }

        /// 非空且四个分量均为有限值。
        #[inline]
        pub fn is_finite(&self) -> bool {
            !self.is_empty() && self.min.is_finite() && self.max.is_finite()
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
            Point2::from_vec(center)
        }
    }
}

pub mod color {
    use std::fmt;
    use std::str::FromStr;

    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    #[error("无法解析颜色 \"{input}\"（期望 #rrggbb 或 #rgb）")]
    pub struct ColorParseError {
        pub input: String,
    }

    /// 8 位 RGB 颜色，输出为小写 `#rrggbb`。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Rgb {
        pub r: u8,
        pub g: u8,
        pub b: u8,
    }

    impl Rgb {
        pub const WHITE: Rgb = Rgb::new(255, 255, 255);
        pub const BLACK: Rgb = Rgb::new(0, 0, 0);

        #[inline]
        pub const fn new(r: u8, g: u8, b: u8) -> Self {
            Self { r, g, b }
        }

        /// DXF 组码 420 的 24 位真彩色（0x00RRGGBB）。
        #[inline]
        pub fn from_true_color(value: u32) -> Self {
            Self::new(
                ((value >> 16) & 0xff) as u8,
                ((value >> 8) & 0xff) as u8,
                (value & 0xff) as u8,
            )
        }

        pub fn from_hex(raw: &str) -> Result<Self, ColorParseError> {
            let err = || ColorParseError {
                input: raw.to_string(),
            };
            let digits = raw.trim().strip_prefix('#').unwrap_or(raw.trim());
            if !digits.is_ascii() {
                return Err(err());
            }
            match digits.len() {
                6 => {
                    let channel = |range: std::ops::Range<usize>| {
                        u8::from_str_radix(&digits[range], 16).map_err(|_| err())
                    };
                    Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
                }
                3 => {
                    let mut channels = [0u8; 3];
                    for (slot, ch) in channels.iter_mut().zip(digits.chars()) {
                        let nibble = ch.to_digit(16).ok_or_else(err)? as u8;
                        *slot = nibble * 17;
                    }
                    Ok(Self::new(channels[0], channels[1], channels[2]))
                }
                _ => Err(err()),
            }
        }

        pub fn to_hex(self) -> String {
            self.to_string()
        }

    }

    impl fmt::Display for Rgb {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        }
    }

    impl FromStr for Rgb {
        type Err = ColorParseError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            Self::from_hex(s)
        }
    }

    /// 图层或实体上声明的颜色。"随层"以 `Option::None` 表示，不在此枚举内。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Color {
        /// 组码 62 = 0，块内实体继承 INSERT 的颜色。
        ByBlock,
        /// AutoCAD 颜色索引 1..=255。
        Aci(u8),
        /// 组码 420 真彩色。
        Rgb(Rgb),
    }

    impl Color {
        /// ACI 7 在浅色背景上显示为黑、深色背景上显示为白，统一视作前景色。
        pub const FOREGROUND_INDEX: u8 = 7;

        /// 解析实体上的组码 62：0 为随块，256 为随层（返回 None）。
        pub fn from_entity_index(index: i16) -> Option<Self> {
            match index {
                0 => Some(Color::ByBlock),
                1..=255 => Some(Color::Aci(index as u8)),
                _ => None,
            }
        }

        /// 解析图层表上的组码 62；负值表示图层关闭，颜色取绝对值。
        pub fn from_layer_index(index: i16) -> Option<Self> {
            match index.unsigned_abs() {
                value @ 1..=255 => Some(Color::Aci(value as u8)),
                _ => None,
            }
        }

        #[inline]
        pub fn is_foreground(self) -> bool {
            matches!(self, Color::Aci(Self::FOREGROUND_INDEX))
        }

        /// 转换为 RGB；随块颜色没有固定值，返回 None。
        pub fn to_rgb(self) -> Option<Rgb> {
            match self {
                Color::ByBlock => None,
                Color::Aci(index) => Some(aci_to_rgb(index)),
                Color::Rgb(rgb) => Some(rgb),
            }
        }
    }

    impl fmt::Display for Color {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Color::ByBlock => f.write_str("BYBLOCK"),
                Color::Aci(index) => write!(f, "ACI {index}"),
                Color::Rgb(rgb) => write!(f, "{rgb}"),
            }
        }
    }

    const BASIC_COLORS: [Rgb; 9] = [
        Rgb::new(255, 0, 0),
        Rgb::new(255, 255, 0),
        Rgb::new(0, 255, 0),
        Rgb::new(0, 255, 255),
        Rgb::new(0, 0, 255),
        Rgb::new(255, 0, 255),
        Rgb::new(255, 255, 255),
        Rgb::new(128, 128, 128),
        Rgb::new(192, 192, 192),
    ];

    const GRAY_COLORS: [Rgb; 6] = [
        Rgb::new(51, 51, 51),
        Rgb::new(80, 80, 80),
        Rgb::new(105, 105, 105),
        Rgb::new(130, 130, 130),
        Rgb::new(190, 190, 190),
        Rgb::new(255, 255, 255),
    ];

    const SHADE_VALUES: [f64; 5] = [1.0, 0.8, 0.6, 0.5, 0.3];

    /// ACI 调色板：1-9 基本色，10-249 为 24 个色相 × 5 级明度 × 饱和/半饱和，250-255 灰阶。
    pub fn aci_to_rgb(index: u8) -> Rgb {
        match index {
            1..=9 => BASIC_COLORS[usize::from(index - 1)],
            10..=249 => {
                let offset = index - 10;
                let hue = f64::from(offset / 10) * 15.0;
                let shade = usize::from(offset % 10);
                let saturation = if shade % 2 == 0 { 1.0 } else { 0.5 };
                hsv_to_rgb(hue, saturation, SHADE_VALUES[shade / 2])
            }
            250..=255 => GRAY_COLORS[usize::from(index - 250)],
            _ => Rgb::BLACK,
        }
    }

    fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> Rgb {
        let chroma = value * saturation;
        let sector = (hue / 60.0) % 6.0;
        let x = chroma * (1.0 - ((sector % 2.0) - 1.0).abs());
        let (r, g, b) = match sector as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let m = value - chroma;
        let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgb::new(channel(r), channel(g), channel(b))
    }

}

pub mod document {
    use std::collections::HashMap;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};
    use std::fmt;

    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    use crate::color::Color;
    use crate::geometry::{Bounds2D, Point2, Point3, Vector2};

    /// 模型空间布局在文档中的固定名称。
    pub const MODEL_SPACE_NAME: &str = "Model";

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    impl fmt::Display for EntityId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "#{}", self.0)
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
        pub color: Option<Color>,
        /// 图层开关（组码 62 为负时关闭）。
        pub is_visible: bool,
        pub is_frozen: bool,
        pub is_locked: bool,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                color: None,
                is_visible: true,
                is_frozen: false,
                is_locked: false,
            }
        }

        pub fn with_color(mut self, color: Color) -> Self {
            self.color = Some(color);
            self
        }

        /// 冻结或关闭的图层不参与绘制。
        #[inline]
        pub fn is_rendered(&self) -> bool {
            self.is_visible && !self.is_frozen
        }
    }

    /// 实体类型，名称与 DXF 的实体类型名一致，便于诊断输出。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub enum EntityKind {
        Line,
        Point,
        Circle,
        Arc,
        Ellipse,
        LwPolyline,
        Polyline,
        Spline,
        Text,
        MText,
        Insert,
        Solid,
        Face3D,
        Dimension,
        Hatch,
    }

    impl EntityKind {
        pub fn dxf_name(self) -> &'static str {
            match self {
                EntityKind::Line => "LINE",
                EntityKind::Point => "POINT",
                EntityKind::Circle => "CIRCLE",
                EntityKind::Arc => "ARC",
                EntityKind::Ellipse => "ELLIPSE",
                EntityKind::LwPolyline => "LWPOLYLINE",
                EntityKind::Polyline => "POLYLINE",
                EntityKind::Spline => "SPLINE",
                EntityKind::Text => "TEXT",
                EntityKind::MText => "MTEXT",
                EntityKind::Insert => "INSERT",
                EntityKind::Solid => "SOLID",
                EntityKind::Face3D => "3DFACE",
                EntityKind::Dimension => "DIMENSION",
                EntityKind::Hatch => "HATCH",
            }
        }
    }

    impl fmt::Display for EntityKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.dxf_name())
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        Point(PointEntity),
        Circle(Circle),
        Arc(Arc),
        Ellipse(Ellipse),
        Polyline(Polyline),
        Spline(Spline),
        Text(Text),
        MText(MText),
        BlockReference(BlockReference),
        Solid(Solid),
        Face3D(ThreeDFace),
        Dimension(Dimension),
        Hatch(Hatch),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Line(line) => &line.layer,
                Entity::Point(point) => &point.layer,
                Entity::Circle(circle) => &circle.layer,
                Entity::Arc(arc) => &arc.layer,
                Entity::Ellipse(ellipse) => &ellipse.layer,
                Entity::Polyline(polyline) => &polyline.layer,
                Entity::Spline(spline) => &spline.layer,
                Entity::Text(text) => &text.layer,
                Entity::MText(mtext) => &mtext.layer,
                Entity::BlockReference(reference) => &reference.layer,
                Entity::Solid(solid) => &solid.layer,
                Entity::Face3D(face) => &face.layer,
                Entity::Dimension(dimension) => &dimension.layer,
                Entity::Hatch(hatch) => &hatch.layer,
            }
        }

        /// 实体自身的颜色覆盖；None 表示随层。
        #[inline]
        pub fn color(&self) -> Option<Color> {
            match self {
                Entity::Line(line) => line.color,
                Entity::Point(point) => point.color,
                Entity::Circle(circle) => circle.color,
                Entity::Arc(arc) => arc.color,
                Entity::Ellipse(ellipse) => ellipse.color,
                Entity::Polyline(polyline) => polyline.color,
                Entity::Spline(spline) => spline.color,
                Entity::Text(text) => text.color,
                Entity::MText(mtext) => mtext.color,
                Entity::BlockReference(reference) => reference.color,
                Entity::Solid(solid) => solid.color,
                Entity::Face3D(face) => face.color,
                Entity::Dimension(dimension) => dimension.color,
                Entity::Hatch(hatch) => hatch.color,
            }
        }

        pub fn kind(&self) -> EntityKind {
            match self {
                Entity::Line(_) => EntityKind::Line,
                Entity::Point(_) => EntityKind::Point,
                Entity::Circle(_) => EntityKind::Circle,
                Entity::Arc(_) => EntityKind::Arc,
                Entity::Ellipse(_) => EntityKind::Ellipse,
                Entity::Polyline(polyline) if polyline.is_lightweight => EntityKind::LwPolyline,
                Entity::Polyline(_) => EntityKind::Polyline,
                Entity::Spline(_) => EntityKind::Spline,
                Entity::Text(_) => EntityKind::Text,
                Entity::MText(_) => EntityKind::MText,
                Entity::BlockReference(_) => EntityKind::Insert,
                Entity::Solid(_) => EntityKind::Solid,
                Entity::Face3D(_) => EntityKind::Face3D,
                Entity::Dimension(_) => EntityKind::Dimension,
                Entity::Hatch(_) => EntityKind::Hatch,
            }
        }

        /// 计算实体自身的 2D 轴对齐范围。文本与块参照退化为插入点，
        /// 块内容的范围由引擎结合块定义计算；标注没有自身几何。含非有限坐标时返回 None。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            match self {
                Entity::Line(line) => {
                    bounds.include_point(line.start);
                    bounds.include_point(line.end);
                }
                Entity::Point(point) => {
                    bounds.include_point(point.position);
                }
                Entity::Circle(circle) => {
                    let radius = circle.radius.abs();
                    let center = circle.center;
                    bounds.include_point(Point2::new(center.x() - radius, center.y() - radius));
                    bounds.include_point(Point2::new(center.x() + radius, center.y() + radius));
                }
                Entity::Arc(arc) => {
                    arc_bounds(arc.center, arc.radius, arc.start_angle, arc.end_angle, &mut bounds);
                }
                Entity::Ellipse(ellipse) => {
                    ellipse_bounds(
                        ellipse.center,
                        ellipse.major_axis,
                        ellipse.ratio,
                        ellipse.start_parameter,
                        ellipse.end_parameter,
                        &mut bounds,
                    );
                }
                Entity::Polyline(polyline) => {
                    for vertex in &polyline.vertices {
                        bounds.include_point(vertex.position);
                    }
                    for (start, end, bulge) in polyline.segments() {
                        polyline_segment_bounds(start, end, bulge, &mut bounds);
                    }
                }
                Entity::Spline(spline) => {
                    for point in spline.control_points.iter().chain(&spline.fit_points) {
                        bounds.include_point(*point);
                    }
                }
                Entity::Text(text) => {
                    bounds.include_point(text.insert);
                }
                Entity::MText(mtext) => {
                    bounds.include_point(mtext.insert);
                }
                Entity::BlockReference(reference) => {
                    bounds.include_point(reference.insert);
                }
                Entity::Solid(solid) => {
                    for vertex in &solid.vertices {
                        bounds.include_point(*vertex);
                    }
                }
                Entity::Face3D(face) => {
                    for vertex in &face.vertices {
                        bounds.include_point(vertex.to_point2());
                    }
                }
                Entity::Dimension(_) => return None,
                Entity::Hatch(hatch) => {
                    for boundary in &hatch.boundaries {
                        hatch_boundary_bounds(boundary, &mut bounds);
                    }
                }
            }
            if bounds.is_finite() { Some(bounds) } else { None }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        pub layer: String,
        pub color: Option<Color>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PointEntity {
        pub position: Point2,
        pub layer: String,
        pub color: Option<Color>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub layer: String,
        pub color: Option<Color>,
    }

    /// 圆弧实体，角度以弧度形式储存，逆时针为正。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
        pub layer: String,
        pub color: Option<Color>,
    }

    /// 椭圆实体，记录主轴向量与参数范围（弧度）。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Ellipse {
        pub center: Point2,
        pub major_axis: Vector2,
        pub ratio: f64,
        pub start_parameter: f64,
        pub end_parameter: f64,
        pub layer: String,
        pub color: Option<Color>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PolylineVertex {
        pub position: Point2,
        pub bulge: f64,
    }

    impl PolylineVertex {
        #[inline]
        pub fn new(position: Point2) -> Self {
            Self {
                position,
                bulge: 0.0,
            }
        }

        #[inline]
        pub fn with_bulge(position: Point2, bulge: f64) -> Self {
            Self { position, bulge }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<PolylineVertex>,
        pub is_closed: bool,
        /// 来源为 LWPOLYLINE（否则为旧式 POLYLINE/VERTEX 序列）。
        pub is_lightweight: bool,
        pub layer: String,
        pub color: Option<Color>,
    }

    impl Polyline {
        /// 按顺序返回 (起点, 终点, bulge) 段；闭合时追加末点到首点的段。
        pub fn segments(&self) -> impl Iterator<Item = (Point2, Point2, f64)> + '_ {
            let count = self.vertices.len();
            let segment_count = match count {
                0 | 1 => 0,
                _ if self.is_closed => count,
                _ => count - 1,
            };
            (0..segment_count).map(move |index| {
                let start = &self.vertices[index];
                let end = &self.vertices[(index + 1) % count];
                (start.position, end.position, start.bulge)
            })
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Spline {
        pub degree: i32,
        pub is_closed: bool,
        pub is_rational: bool,
        pub control_points: Vec<Point2>,
        pub fit_points: Vec<Point2>,
        pub knot_values: Vec<f64>,
        pub weights: Vec<f64>,
        pub layer: String,
        pub color: Option<Color>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Text {
        pub insert: Point2,
        pub content: String,
        pub height: f64,
        pub rotation: f64,
        pub layer: String,
        pub color: Option<Color>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MText {
        pub insert: Point2,
        pub content: String,
        pub height: f64,
        pub direction: Vector2,
        pub attachment_point: i16,
        pub layer: String,
        pub color: Option<Color>,
    }

    impl MText {
        /// 由 X 方向向量推导的旋转角（弧度）。
        pub fn rotation(&self) -> f64 {
            let dir = self.direction.as_vec2();
            if dir.length_squared() <= f64::EPSILON {
                0.0
            } else {
                dir.y.atan2(dir.x)
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BlockReference {
        pub name: String,
        pub insert: Point2,
        pub scale: Vector2,
        pub rotation: f64,
        pub layer: String,
        pub color: Option<Color>,
    }

    /// SOLID 的四个角点，DXF 中第 3、4 点顺序与轮廓顺序相反。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Solid {
        pub vertices: [Point2; 4],
        pub layer: String,
        pub color: Option<Color>,
    }

    /// 3D 面（3DFACE），投影时只取 XY。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ThreeDFace {
        pub vertices: [Point3; 4],
        /// DXF 组码 70 对应的隐藏边标记：依次表示边 1-4。
        pub invisible_edges: [bool; 4],
        pub layer: String,
        pub color: Option<Color>,
    }

    /// 标注。可见几何（尺寸线、箭头、文字）由组码 2 指向的匿名块承载，块内坐标即世界坐标。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Dimension {
        pub block: String,
        pub layer: String,
        pub color: Option<Color>,
    }

    /// 填充只保留边界轮廓，图案与实心填充不绘制。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Hatch {
        pub boundaries: Vec<HatchBoundary>,
        pub layer: String,
        pub color: Option<Color>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum HatchBoundary {
        /// 多段线边界，总是闭合。
        Polyline(Vec<PolylineVertex>),
        /// 首尾相接的边序列。
        Edges(Vec<HatchEdge>),
    }

    /// 填充边界的一条边。角度与参数均为弧度；顺时针边的角度按 DXF 约定取反存储。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum HatchEdge {
        Line {
            start: Point2,
            end: Point2,
        },
        Arc {
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            counter_clockwise: bool,
        },
        Ellipse {
            center: Point2,
            major_axis: Vector2,
            ratio: f64,
            start_parameter: f64,
            end_parameter: f64,
            counter_clockwise: bool,
        },
        Spline {
            degree: i32,
            control_points: Vec<Point2>,
            knot_values: Vec<f64>,
            weights: Vec<f64>,
        },
    }

    impl HatchEdge {
        /// 顺时针边的实际角度区间：存储值取反。
        pub fn oriented(start: f64, end: f64, counter_clockwise: bool) -> (f64, f64) {
            if counter_clockwise {
                (start, end)
            } else {
                (-start, -end)
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BlockDefinition {
        pub name: String,
        pub base_point: Point2,
        pub entities: Vec<Entity>,
    }

    /// 布局在文档中的位置索引；模型空间恒为 0。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct LayoutId(usize);

    impl LayoutId {
        pub const MODEL: LayoutId = LayoutId(0);

        #[inline]
        pub fn index(self) -> usize {
            self.0
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Layout {
        name: String,
        is_model_space: bool,
        entities: Vec<(EntityId, Entity)>,
    }

    impl Layout {
        fn new(name: impl Into<String>, is_model_space: bool) -> Self {
            Self {
                name: name.into(),
                is_model_space,
                entities: Vec::new(),
            }
        }

        #[inline]
        pub fn name(&self) -> &str {
            &self.name
        }

        #[inline]
        pub fn is_model_space(&self) -> bool {
            self.is_model_space
        }

        /// 可重复遍历的实体序列，顺序与文件中一致。
        #[inline]
        pub fn entities(&self) -> impl Iterator<Item = &(EntityId, Entity)> {
            self.entities.iter()
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.entities.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entities.is_empty()
        }

        pub fn entity(&self, id: EntityId) -> Option<&Entity> {
            self.entities
                .iter()
                .find_map(|(entity_id, entity)| (*entity_id == id).then_some(entity))
        }
    }

    /// 一次转换所用的只读文档：图层表、布局与块定义。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Document {
        layers: Vec<Layer>,
        layer_index: HashMap<String, usize>,
        layouts: Vec<Layout>,
        blocks: HashMap<String, BlockDefinition>,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        block_handles: HashMap<String, String>,
        next_entity_id: u64,
    }

    impl Default for Document {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Document {
        pub fn new() -> Self {
            let mut doc = Self {
                layers: Vec::new(),
                layer_index: HashMap::new(),
                layouts: vec![Layout::new(MODEL_SPACE_NAME, true)],
                blocks: HashMap::new(),
                block_handles: HashMap::new(),
                next_entity_id: 0,
            };
            doc.add_layer(Layer::new("0"));
            doc
        }

        /// 登记图层。名称已存在时保持原定义并返回 false（图层名区分大小写且唯一）。
        pub fn add_layer(&mut self, layer: Layer) -> bool {
            if self.layer_index.contains_key(&layer.name) {
                return false;
            }
            self.layer_index
                .insert(layer.name.clone(), self.layers.len());
            self.layers.push(layer);
            true
        }

        /// 覆盖已有图层的属性；不存在时新增。用于图层表晚于默认图层 "0" 出现的情况。
        pub fn upsert_layer(&mut self, layer: Layer) {
            match self.layer_index.get(&layer.name) {
                Some(&index) => self.layers[index] = layer,
                None => {
                    self.add_layer(layer);
                }
            }
        }

        #[inline]
        pub fn layer(&self, name: &str) -> Option<&Layer> {
            self.layer_index.get(name).map(|&index| &self.layers[index])
        }

        #[inline]
        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.iter()
        }

        /// 新增图纸空间布局并返回其标识。
        pub fn add_paper_layout(&mut self, name: impl Into<String>) -> LayoutId {
            self.layouts.push(Layout::new(name, false));
            LayoutId(self.layouts.len() - 1)
        }

        #[inline]
        pub fn modelspace(&self) -> &Layout {
            &self.layouts[LayoutId::MODEL.0]
        }

        #[inline]
        pub fn layouts(&self) -> impl Iterator<Item = &Layout> {
            self.layouts.iter()
        }

        #[inline]
        pub fn layout(&self, id: LayoutId) -> Option<&Layout> {
            self.layouts.get(id.0)
        }

        /// 添加到模型空间。
        pub fn add_entity(&mut self, entity: Entity) -> EntityId {
            let id = self.next_id();
            self.layouts[LayoutId::MODEL.0].entities.push((id, entity));
            id
        }

        /// 添加到指定布局；布局不存在时返回 None。
        pub fn add_entity_to(&mut self, layout: LayoutId, entity: Entity) -> Option<EntityId> {
            if layout.0 >= self.layouts.len() {
                return None;
            }
            let id = self.next_id();
            self.layouts[layout.0].entities.push((id, entity));
            Some(id)
        }

        pub fn add_line(
            &mut self,
            start: Point2,
            end: Point2,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::Line(Line {
                start,
                end,
                layer: layer.into(),
                color: None,
            }))
        }

        pub fn add_circle(
            &mut self,
            center: Point2,
            radius: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::Circle(Circle {
                center,
                radius,
                layer: layer.into(),
                color: None,
            }))
        }

        pub fn add_arc(
            &mut self,
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::Arc(Arc {
                center,
                radius,
                start_angle,
                end_angle,
                layer: layer.into(),
                color: None,
            }))
        }

        pub fn add_polyline<I>(
            &mut self,
            points: I,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = Point2>,
        {
            self.add_entity(Entity::Polyline(Polyline {
                vertices: points.into_iter().map(PolylineVertex::new).collect(),
                is_closed,
                is_lightweight: true,
                layer: layer.into(),
                color: None,
            }))
        }

        pub fn add_text(
            &mut self,
            insert: Point2,
            content: impl Into<String>,
            height: f64,
            rotation: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::Text(Text {
                insert,
                content: content.into(),
                height,
                rotation,
                layer: layer.into(),
                color: None,
            }))
        }

        pub fn add_block_definition(&mut self, definition: BlockDefinition) {
            self.blocks.insert(definition.name.clone(), definition);
        }

        /// 记录块记录句柄到块名的映射，供 LAYOUT 对象反查图纸空间块。
        pub fn register_block_handle(&mut self, handle: impl Into<String>, name: impl Into<String>) {
            self.block_handles.insert(handle.into(), name.into());
        }

        #[inline]
        pub fn block(&self, name: &str) -> Option<&BlockDefinition> {
            self.blocks.get(name)
        }

        #[inline]
        pub fn block_name_by_handle(&self, handle: &str) -> Option<&str> {
            self.block_handles.get(handle).map(|name| name.as_str())
        }

        #[inline]
        pub fn blocks(&self) -> impl Iterator<Item = &BlockDefinition> {
            self.blocks.values()
        }

        /// 从块定义中移出实体（用于把 `*Paper_Space` 块内容转为布局实体）。
        pub fn take_block_entities(&mut self, name: &str) -> Vec<Entity> {
            self.blocks
                .get_mut(name)
                .map(|block| std::mem::take(&mut block.entities))
                .unwrap_or_default()
        }

        #[inline]
        fn next_id(&mut self) -> EntityId {
            let id = self.next_entity_id;
            self.next_entity_id += 1;
            EntityId(id)
        }
    }

    const ELLIPSE_BOUND_SAMPLES: usize = 64;

    fn normalize_angle(angle: f64) -> f64 {
        let mut result = angle % TAU;
        if result < 0.0 {
            result += TAU;
        }
        result
    }

    /// 把任意起止角规整为 `start <= end <= start + TAU`，起止重合视作整圆。
    pub fn canonical_interval(start: f64, end: f64) -> (f64, f64) {
        let start = normalize_angle(start);
        let mut end = normalize_angle(end);
        if (end - start).abs() < 1e-9 {
            end = start + TAU;
        } else if end < start {
            end += TAU;
        }
        (start, end)
    }

    fn arc_point(center: Point2, radius: f64, angle: f64) -> Point2 {
        center.translate(Vector2::new(radius * angle.cos(), radius * angle.sin()))
    }

    fn arc_bounds(center: Point2, radius: f64, start: f64, end: f64, bounds: &mut Bounds2D) {
        let radius = radius.abs();
        if radius <= f64::EPSILON {
            bounds.include_point(center);
            return;
        }

        let (start, end) = canonical_interval(start, end);
        bounds.include_point(arc_point(center, radius, start));
        bounds.include_point(arc_point(center, radius, end));

        const QUADRANTS: [f64; 4] = [0.0, FRAC_PI_2, PI, FRAC_PI_2 * 3.0];
        for base in QUADRANTS {
            let mut candidate = base;
            while candidate < start {
                candidate += TAU;
            }
            if candidate <= end {
                bounds.include_point(arc_point(center, radius, candidate));
            }
        }
    }

    /// 按参数等分采样。参数先规整到 `[0, TAU)`，采样数因此有上限。
    fn ellipse_bounds(
        center: Point2,
        major_axis: Vector2,
        ratio: f64,
        start: f64,
        end: f64,
        bounds: &mut Bounds2D,
    ) {
        let major_vec = major_axis.as_vec2();
        let major_length = major_vec.length();

        if major_length <= f64::EPSILON || !major_length.is_finite() {
            bounds.include_point(center);
            return;
        }
        if !start.is_finite() || !end.is_finite() || !ratio.is_finite() {
            bounds.include_point(center);
            return;
        }
        let minor_length = major_length * ratio.abs();
        let major_dir = major_vec / major_length;
        let minor_vec = DVec2::new(-major_dir.y, major_dir.x) * minor_length;

        let (start, end) = canonical_interval(start, end);
        let span = end - start;
        let step_count = ((span / (TAU / ELLIPSE_BOUND_SAMPLES as f64)).ceil() as usize)
            .clamp(16, ELLIPSE_BOUND_SAMPLES);
        for i in 0..=step_count {
            let t = start + span * (i as f64 / step_count as f64);
            let offset = major_vec * t.cos() + minor_vec * t.sin();
            bounds.include_point(center.translate(Vector2::from(offset)));
        }
    }

    fn hatch_boundary_bounds(boundary: &HatchBoundary, bounds: &mut Bounds2D) {
        match boundary {
            HatchBoundary::Polyline(vertices) => {
                let count = vertices.len();
                for (index, vertex) in vertices.iter().enumerate() {
                    bounds.include_point(vertex.position);
                    if count > 1 {
                        let next = &vertices[(index + 1) % count];
                        polyline_segment_bounds(vertex.position, next.position, vertex.bulge, bounds);
                    }
                }
            }
            HatchBoundary::Edges(edges) => {
                for edge in edges {
                    hatch_edge_bounds(edge, bounds);
                }
            }
        }
    }

    fn hatch_edge_bounds(edge: &HatchEdge, bounds: &mut Bounds2D) {
        match edge {
            HatchEdge::Line { start, end } => {
                bounds.include_point(*start);
                bounds.include_point(*end);
            }
            HatchEdge::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                counter_clockwise,
            } => {
                let (start, end) = HatchEdge::oriented(*start_angle, *end_angle, *counter_clockwise);
                // 顺时针从 start 到 end 覆盖的区间等于逆时针从 end 到 start。
                let (from, to) = if *counter_clockwise { (start, end) } else { (end, start) };
                arc_bounds(*center, *radius, from, to, bounds);
            }
            HatchEdge::Ellipse {
                center,
                major_axis,
                ratio,
                start_parameter,
                end_parameter,
                counter_clockwise,
            } => {
                let (start, end) =
                    HatchEdge::oriented(*start_parameter, *end_parameter, *counter_clockwise);
                let (from, to) = if *counter_clockwise { (start, end) } else { (end, start) };
                ellipse_bounds(*center, *major_axis, *ratio, from, to, bounds);
            }
            HatchEdge::Spline { control_points, .. } => {
                for point in control_points {
                    bounds.include_point(*point);
                }
            }
        }
    }

    fn polyline_segment_bounds(start: Point2, end: Point2, bulge: f64, bounds: &mut Bounds2D) {
        if bulge.abs() <= 1e-9 || !bulge.is_finite() {
            return;
        }

        let start_vec = start.as_vec2();
        let end_vec = end.as_vec2();
        let chord = end_vec - start_vec;
        let chord_len = chord.length();
        if chord_len <= f64::EPSILON {
            return;
        }

        let theta = 4.0 * bulge.atan();
        let sin_half = (theta / 2.0).sin();
        if sin_half.abs() <= 1e-9 {
            return;
        }

        let radius = chord_len / (2.0 * sin_half);
        let midpoint = (start_vec + end_vec) * 0.5;
        let perp_dir = DVec2::new(-chord.y, chord.x) / chord_len;
        // 圆心到弦中点的有符号距离。
        let offset = radius * (theta / 2.0).cos();
        let center_vec = midpoint + perp_dir * offset;

        let start_dir = start_vec - center_vec;
        let start_angle = start_dir.y.atan2(start_dir.x);
        let (from, to) = if theta >= 0.0 {
            (start_angle, start_angle + theta)
        } else {
            (start_angle + theta, start_angle)
        };
        arc_bounds(
            Point2::from_vec(center_vec),
            radius.abs(),
            from,
            to,
            bounds,
        );
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::geometry::Point2;
        use std::f64::consts::FRAC_PI_2;

        #[test]
        fn document_stores_entities_in_model_space() {
            let mut doc = Document::new();
            let id = doc.add_line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), "0");
            let circle_id = doc.add_circle(Point2::new(5.0, 5.0), 2.0, "ANNOT");
            let arc_id = doc.add_arc(Point2::new(5.0, 0.0), 3.5, 0.0, FRAC_PI_2, "GEOM");
            let text_id = doc.add_text(Point2::new(1.0, 1.0), "Hello", 2.5, 0.0, "ANNOT");

            assert_eq!(id.get(), 0);
            assert_eq!(circle_id.get(), 1);
            assert_eq!(arc_id.get(), 2);
            assert_eq!(text_id.get(), 3);
            assert_eq!(doc.modelspace().len(), 4);
            assert!(doc.modelspace().is_model_space());
            assert_eq!(doc.modelspace().name(), MODEL_SPACE_NAME);

            match doc.modelspace().entity(arc_id) {
                Some(Entity::Arc(arc)) => {
                    assert_eq!(arc.layer, "GEOM");
                    assert!((arc.radius - 3.5).abs() < f64::EPSILON);
                }
                other => panic!("unexpected entity lookup result: {other:?}"),
            }
        }

        #[test]
        fn entities_may_reference_unknown_layers() {
            let mut doc = Document::new();
            doc.add_line(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), "GHOST");
            assert!(doc.layer("GHOST").is_none());
            assert_eq!(doc.layers().count(), 1);
        }

        #[test]
        fn layer_names_stay_unique() {
            let mut doc = Document::new();
            assert!(doc.add_layer(Layer::new("WALLS").with_color(Color::Aci(1))));
            assert!(!doc.add_layer(Layer::new("WALLS").with_color(Color::Aci(2))));
            assert_eq!(doc.layer("WALLS").and_then(|l| l.color), Some(Color::Aci(1)));
            assert!(doc.add_layer(Layer::new("walls")));

            doc.upsert_layer(Layer::new("0").with_color(Color::Aci(3)));
            assert_eq!(doc.layer("0").and_then(|l| l.color), Some(Color::Aci(3)));
            assert_eq!(doc.layers().count(), 3);
        }

        #[test]
        fn paper_layouts_hold_their_own_entities() {
            let mut doc = Document::new();
            let sheet = doc.add_paper_layout("Sheet A");
            let id = doc
                .add_entity_to(
                    sheet,
                    Entity::Line(Line {
                        start: Point2::new(0.0, 0.0),
                        end: Point2::new(1.0, 0.0),
                        layer: "0".to_string(),
                        color: None,
                    }),
                )
                .expect("layout exists");
            let layout = doc.layout(sheet).expect("layout lookup");
            assert!(!layout.is_model_space());
            assert!(layout.entity(id).is_some());
            assert!(doc.modelspace().is_empty());
            assert_eq!(doc.layouts().count(), 2);
        }

        #[test]
        fn bounds_skip_non_finite_geometry() {
            let line = Entity::Line(Line {
                start: Point2::new(0.0, 0.0),
                end: Point2::new(f64::NAN, 1.0),
                layer: "0".to_string(),
                color: None,
            });
            assert!(line.bounds().is_none());
        }

        #[test]
        fn arc_bounds_include_crossed_quadrants() {
            let arc = Entity::Arc(Arc {
                center: Point2::new(0.0, 0.0),
                radius: 2.0,
                start_angle: 0.0,
                end_angle: PI,
                layer: "0".to_string(),
                color: None,
            });
            let bounds = arc.bounds().expect("arc bounds");
            assert!((bounds.min().x() + 2.0).abs() < 1e-9);
            assert!((bounds.max().x() - 2.0).abs() < 1e-9);
            assert!(bounds.min().y().abs() < 1e-9);
            assert!((bounds.max().y() - 2.0).abs() < 1e-9);
        }

        #[test]
        fn bulged_polyline_bounds_cover_the_arc() {
            let polyline = Entity::Polyline(Polyline {
                vertices: vec![
                    PolylineVertex::with_bulge(Point2::new(0.0, 0.0), 1.0),
                    PolylineVertex::new(Point2::new(10.0, 0.0)),
                ],
                is_closed: false,
                is_lightweight: true,
                layer: "0".to_string(),
                color: None,
            });
            let bounds = polyline.bounds().expect("polyline bounds");
            // bulge = 1 为半圆；正 bulge 逆时针，弧在弦的右侧（y < 0）。
            assert!((bounds.min().y() + 5.0).abs() < 1e-9);
            assert!(bounds.max().y().abs() < 1e-9);
        }

        #[test]
        fn polyline_kind_tracks_source_record() {
            let mut polyline = Polyline {
                vertices: vec![],
                is_closed: false,
                is_lightweight: true,
                layer: "0".to_string(),
                color: None,
            };
            assert_eq!(Entity::Polyline(polyline.clone()).kind(), EntityKind::LwPolyline);
            polyline.is_lightweight = false;
            assert_eq!(Entity::Polyline(polyline).kind().dxf_name(), "POLYLINE");
        }

        #[test]
        fn huge_ellipse_parameters_are_normalised_before_sampling() {
            for (start, end) in [(0.0, -1e300), (0.0, 1e300), (-1e300, 1e300)] {
                let ellipse = Entity::Ellipse(Ellipse {
                    center: Point2::new(0.0, 0.0),
                    major_axis: Vector2::new(4.0, 0.0),
                    ratio: 0.5,
                    start_parameter: start,
                    end_parameter: end,
                    layer: "0".to_string(),
                    color: None,
                });
                let bounds = ellipse.bounds().expect("ellipse bounds");
                assert!(bounds.max().x() <= 4.0 + 1e-9);
                assert!(bounds.min().y() >= -2.0 - 1e-9);
            }
        }

        #[test]
        fn added_polylines_are_lightweight_and_bounded() {
            let mut doc = Document::new();
            let id = doc.add_polyline(
                [Point2::new(0.0, 0.0), Point2::new(3.0, 0.0), Point2::new(3.0, 2.0)],
                true,
                "WALLS",
            );
            let entity = doc.modelspace().entity(id).expect("polyline stored");
            assert_eq!(entity.kind(), EntityKind::LwPolyline);
            let bounds = entity.bounds().expect("bounds");
            assert_eq!(bounds.max(), Point2::new(3.0, 2.0));
            match entity {
                Entity::Polyline(polyline) => assert_eq!(polyline.segments().count(), 3),
                other => panic!("unexpected entity: {other:?}"),
            }
        }

        #[test]
        fn hatch_bounds_cover_edges_and_dimensions_have_none() {
            let hatch = Entity::Hatch(Hatch {
                boundaries: vec![HatchBoundary::Edges(vec![
                    HatchEdge::Line {
                        start: Point2::new(-1.0, 0.0),
                        end: Point2::new(1.0, 0.0),
                    },
                    // 顺时针边存储 0 -> 180，实际从 0° 转到 -180°，经过下半圆。
                    HatchEdge::Arc {
                        center: Point2::new(0.0, 0.0),
                        radius: 1.0,
                        start_angle: 0.0,
                        end_angle: PI,
                        counter_clockwise: false,
                    },
                ])],
                layer: "0".to_string(),
                color: None,
            });
            let bounds = hatch.bounds().expect("hatch bounds");
            assert!((bounds.min().y() + 1.0).abs() < 1e-9, "{bounds:?}");
            assert!(bounds.max().y().abs() < 1e-9, "{bounds:?}");

            let dimension = Entity::Dimension(Dimension {
                block: "*D1".to_string(),
                layer: "DIM".to_string(),
                color: None,
            });
            assert!(dimension.bounds().is_none());
            assert_eq!(dimension.kind().dxf_name(), "DIMENSION");
        }
    }
}

pub mod render {
    use crate::color::Rgb;
    use crate::document::{EntityId, EntityKind};
    use crate::geometry::{Bounds2D, Point2};

    /// 输出坐标空间中的路径指令。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum PathSegment {
        MoveTo(Point2),
        LineTo(Point2),
        CubicTo {
            ctrl1: Point2,
            ctrl2: Point2,
            to: Point2,
        },
        Close,
    }

    /// 文字实体的排版信息，不做字形轮廓化。
    #[derive(Debug, Clone, PartialEq)]
    pub struct TextRun {
        pub anchor: Point2,
        pub content: String,
        pub height: f64,
        pub rotation: f64,
    }

    /// 单个实体的投影结果。
    #[derive(Debug, Clone, PartialEq)]
    pub struct RenderedPath {
        pub entity: EntityId,
        pub kind: EntityKind,
        pub layer: String,
        pub stroke: Rgb,
        pub segments: Vec<PathSegment>,
        /// 文字实体或块内文字的排版信息。
        pub texts: Vec<TextRun>,
    }

    impl RenderedPath {
        #[inline]
        pub fn is_empty(&self) -> bool {
            self.segments.is_empty() && self.texts.is_empty()
        }
    }

    /// 一次渲染的画布：背景色与按实体顺序排列的路径。
    #[derive(Debug, Clone, PartialEq)]
    pub struct Canvas {
        background: Rgb,
        paths: Vec<RenderedPath>,
    }

    impl Canvas {
        pub fn new(background: Rgb) -> Self {
            Self {
                background,
                paths: Vec::new(),
            }
        }

        #[inline]
        pub fn background(&self) -> Rgb {
            self.background
        }

        #[inline]
        pub fn push(&mut self, path: RenderedPath) {
            self.paths.push(path);
        }

        #[inline]
        pub fn paths(&self) -> &[RenderedPath] {
            &self.paths
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.paths.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.paths.is_empty()
        }
    }

    /// 布局范围；没有任何可计算范围的实体时无效。
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Extents {
        bounds: Option<Bounds2D>,
    }

    impl Extents {
        #[inline]
        pub fn invalid() -> Self {
            Self { bounds: None }
        }

        pub fn from_bounds(bounds: Bounds2D) -> Self {
            if bounds.is_finite() {
                Self {
                    bounds: Some(bounds),
                }
            } else {
                Self::invalid()
            }
        }

        #[inline]
        pub fn is_valid(&self) -> bool {
            self.bounds.is_some()
        }

        #[inline]
        pub fn bounds(&self) -> Option<Bounds2D> {
            self.bounds
        }

        #[inline]
        pub fn min(&self) -> Option<Point2> {
            self.bounds.map(|b| b.min())
        }

        #[inline]
        pub fn max(&self) -> Option<Point2> {
            self.bounds.map(|b| b.max())
        }
    }

    /// 输出页面：宽高以毫米计，中心为绘图坐标中的视图中心。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Page {
        pub width: f64,
        pub height: f64,
        pub center: Point2,
    }

    impl Page {
        pub fn new(width: f64, height: f64, center: Point2) -> Self {
            Self {
                width,
                height,
                center,
            }
        }

        /// 视图左下角（绘图坐标）。
        #[inline]
        pub fn origin(&self) -> Point2 {
            Point2::new(
                self.center.x() - self.width / 2.0,
                self.center.y() - self.height / 2.0,
            )
        }
    }

}
