use std::collections::{BTreeMap, HashSet};
use std::f64::consts::TAU;

use dxf2svg_core::color::{Color, Rgb};
use dxf2svg_core::document::{
    Arc, BlockDefinition, BlockReference, Circle, Dimension, Document, Ellipse, Entity, Hatch,
    HatchBoundary, HatchEdge, Layer, LayoutId, Line, MODEL_SPACE_NAME, MText, PointEntity,
    Polyline, PolylineVertex, Solid, Spline, Text, ThreeDFace,
};
use dxf2svg_core::geometry::{Point2, Point3, Vector2};
use tracing::{debug, warn};

use crate::auditor::Auditor;
use crate::reader::DxfReader;

const ACTIVE_PAPER_SPACE_BLOCK: &str = "*Paper_Space";
const SYNTHESIZED_LAYOUT_NAME: &str = "Layout1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParseMode {
    Strict,
    Recover,
}

#[derive(Debug)]
pub(crate) enum DxfError {
    /// 组码流本身损坏：严格模式下直接失败，修复模式下记为修正。
    Structure { message: String },
    /// 单个记录的字段无法解析。
    Invalid { message: String },
}

impl DxfError {
    pub(crate) fn structure(message: impl Into<String>) -> Self {
        Self::Structure {
            message: message.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

struct ParsedEntity {
    entity: Entity,
    paper_space: bool,
}

#[derive(Debug)]
struct LayoutRecord {
    name: String,
    tab_order: i32,
    block_record: Option<String>,
}

/// 所有实体共有的组码：图层、颜色与图纸空间标记。
#[derive(Debug, Default)]
struct CommonProps {
    layer: Option<String>,
    color_index: Option<i16>,
    true_color: Option<u32>,
    paper_space: bool,
}

impl CommonProps {
    fn accept(&mut self, code: i32, value: &str, kind: &str) -> Result<bool, DxfError> {
        match code {
            8 => self.layer = Some(value.trim().to_string()),
            62 => {
                self.color_index = Some(parse_i16(value, &format!("{kind} 颜色（组码 62）"))?);
            }
            420 => {
                self.true_color = Some(parse_u32(value, &format!("{kind} 真彩色（组码 420）"))?);
            }
            67 => {
                self.paper_space = parse_i16(value, &format!("{kind} 空间标记（组码 67）"))? == 1;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn layer(&self) -> String {
        self.layer.clone().unwrap_or_else(|| "0".to_string())
    }

    fn color(&self) -> Option<Color> {
        match self.true_color {
            Some(value) => Some(Color::Rgb(Rgb::from_true_color(value))),
            None => self.color_index.and_then(Color::from_entity_index),
        }
    }

    fn finish(self, entity: Entity) -> ParsedEntity {
        ParsedEntity {
            entity,
            paper_space: self.paper_space,
        }
    }
}

pub(crate) struct DxfParser<'a> {
    reader: DxfReader<'a>,
    mode: ParseMode,
    auditor: Auditor,
    seen_layers: HashSet<String>,
    paper_entities: Vec<Entity>,
    layout_records: Vec<LayoutRecord>,
    skipped_kinds: BTreeMap<String, usize>,
}

impl<'a> DxfParser<'a> {
    pub(crate) fn new(source: &'a str, mode: ParseMode) -> Self {
        Self {
            reader: DxfReader::new(source, mode),
            mode,
            auditor: Auditor::new(),
            seen_layers: HashSet::new(),
            paper_entities: Vec::new(),
            layout_records: Vec::new(),
            skipped_kinds: BTreeMap::new(),
        }
    }

    pub(crate) fn parse(mut self) -> Result<(Document, Auditor), DxfError> {
        let mut document = Document::new();
        let mut saw_section = false;
        let mut reached_eof = false;

        while let Some((code, value)) = self.reader.next_pair()? {
            if code != 0 {
                self.structural(format!("意外的组码 {code}（期望 0 表示 SECTION/EOF）"))?;
                continue;
            }
            match value.as_str() {
                "SECTION" => {
                    saw_section = true;
                    let name = match self.reader.next_pair()? {
                        Some((2, name)) => name.trim().to_string(),
                        Some(pair) => {
                            self.structural(format!(
                                "SECTION 名称使用了组码 {}（期望 2）",
                                pair.0
                            ))?;
                            self.reader.put_back(pair);
                            continue;
                        }
                        None => {
                            self.structural("SECTION 缺少名称（组码 2）")?;
                            break;
                        }
                    };
                    match name.as_str() {
                        "TABLES" => self.parse_tables(&mut document)?,
                        "BLOCKS" => self.parse_blocks(&mut document)?,
                        "ENTITIES" => self.parse_entities(&mut document)?,
                        "OBJECTS" => self.parse_objects()?,
                        _ => self.skip_section(&name)?,
                    }
                }
                "EOF" => {
                    reached_eof = true;
                    break;
                }
                unexpected => {
                    self.structural(format!("意外的标记 {unexpected}，期望 SECTION 或 EOF"))?;
                    self.skip_entity_body()?;
                }
            }
        }

        if !saw_section {
            let message = "未找到任何 DXF 段（SECTION）";
            match self.mode {
                ParseMode::Strict => return Err(DxfError::structure(message)),
                ParseMode::Recover => self.auditor.error(message),
            }
        }
        if !reached_eof {
            self.structural("文件缺少 EOF 结束标记")?;
        }

        self.assemble_layouts(&mut document);
        for repair in self.reader.take_repairs() {
            self.auditor.fix(repair);
        }
        for (kind, count) in &self.skipped_kinds {
            debug!(kind = %kind, count, "跳过不支持的实体类型");
        }
        Ok((document, self.auditor))
    }

    /// 结构偏差：严格模式失败，修复模式记录修正后继续。
    fn structural(&mut self, message: impl Into<String>) -> Result<(), DxfError> {
        match self.mode {
            ParseMode::Strict => Err(DxfError::structure(message)),
            ParseMode::Recover => {
                self.auditor.fix(message);
                Ok(())
            }
        }
    }

    /// 修复模式下把字段错误记入审计并丢弃当前记录。
    fn recoverable<T>(&mut self, result: Result<T, DxfError>) -> Result<Option<T>, DxfError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(DxfError::Invalid { message }) if self.mode == ParseMode::Recover => {
                self.auditor.error(message);
                self.skip_entity_body()?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// 读取段内下一条记录的类型名；段结束时返回 None。
    fn next_record(&mut self, section: &str) -> Result<Option<String>, DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.as_str() {
                    "ENDSEC" => return Ok(None),
                    "SECTION" | "EOF" => {
                        self.structural(format!("{section} 段缺少 ENDSEC，已自动闭合"))?;
                        self.reader.put_back((0, value));
                        return Ok(None);
                    }
                    _ => return Ok(Some(value)),
                },
                Some((code, _)) => {
                    self.structural(format!("{section} 段遇到组码 {code}（期望 0 表示记录起始）"))?;
                }
                None => {
                    self.structural(format!("{section} 段提前结束"))?;
                    return Ok(None);
                }
            }
        }
    }

    /// 读取当前记录的下一个非 0 组码；遇到下一条记录时回退并返回 None。
    fn next_body_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        match self.reader.next_pair()? {
            Some((0, value)) => {
                self.reader.put_back((0, value));
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn skip_section(&mut self, name: &str) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value == "ENDSEC" => break,
                Some((0, value)) if value == "SECTION" || value == "EOF" => {
                    self.structural(format!("{name} 段缺少 ENDSEC，已自动闭合"))?;
                    self.reader.put_back((0, value));
                    break;
                }
                Some(_) => continue,
                None => {
                    self.structural(format!("{name} 段未找到 ENDSEC 终止标记"))?;
                    break;
                }
            }
        }
        Ok(())
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        while self.next_body_pair()?.is_some() {}
        Ok(())
    }

    fn parse_tables(&mut self, document: &mut Document) -> Result<(), DxfError> {
        while let Some(kind) = self.next_record("TABLES")? {
            match kind.as_str() {
                "LAYER" => {
                    let parsed = self.parse_layer();
                    let Some(layer) = self.recoverable(parsed)? else {
                        continue;
                    };
                    if !self.seen_layers.insert(layer.name.clone()) {
                        self.structural(format!("图层 {} 重复定义，保留首个定义", layer.name))?;
                        continue;
                    }
                    document.upsert_layer(layer);
                }
                "BLOCK_RECORD" => {
                    let parsed = self.parse_block_record();
                    if let Some((handle, name)) = self.recoverable(parsed)?.flatten() {
                        document.register_block_handle(handle, name);
                    }
                }
                _ => self.skip_entity_body()?,
            }
        }
        Ok(())
    }

    fn parse_layer(&mut self) -> Result<Layer, DxfError> {
        let mut name = None;
        let mut color_index: Option<i16> = None;
        let mut true_color = None;
        let mut flags: i16 = 0;
        while let Some((code, value)) = self.next_body_pair()? {
            match code {
                2 => name = Some(value.trim().to_string()),
                62 => color_index = Some(parse_i16(&value, "LAYER 颜色（组码 62）")?),
                420 => true_color = Some(parse_u32(&value, "LAYER 真彩色（组码 420）")?),
                70 => flags = parse_i16(&value, "LAYER 标志（组码 70）")?,
                _ => {}
            }
        }

        let name = name.ok_or_else(|| DxfError::invalid("LAYER 缺少名称（组码 2）"))?;
        let mut layer = Layer::new(name);
        layer.color = match true_color {
            Some(value) => Some(Color::Rgb(Rgb::from_true_color(value))),
            None => color_index.and_then(Color::from_layer_index),
        };
        layer.is_visible = color_index.is_none_or(|index| index >= 0);
        layer.is_frozen = flags & 0x01 != 0;
        layer.is_locked = flags & 0x04 != 0;
        Ok(layer)
    }

    fn parse_block_record(&mut self) -> Result<Option<(String, String)>, DxfError> {
        let mut handle = None;
        let mut name = None;
        while let Some((code, value)) = self.next_body_pair()? {
            match code {
                5 => handle = Some(value.trim().to_string()),
                2 => name = Some(value.trim().to_string()),
                _ => {}
            }
        }
        Ok(handle.zip(name))
    }

    fn parse_blocks(&mut self, document: &mut Document) -> Result<(), DxfError> {
        while let Some(kind) = self.next_record("BLOCKS")? {
            match kind.as_str() {
                "BLOCK" => {
                    let parsed = self.parse_block_definition();
                    if let Some(definition) = self.recoverable(parsed)? {
                        document.add_block_definition(definition);
                    }
                }
                _ => self.skip_entity_body()?,
            }
        }
        Ok(())
    }

    fn parse_block_definition(&mut self) -> Result<BlockDefinition, DxfError> {
        let mut name: Option<String> = None;
        let mut base_x = 0.0;
        let mut base_y = 0.0;
        while let Some((code, value)) = self.next_body_pair()? {
            match code {
                2 => name = Some(value.trim().to_string()),
                10 => base_x = parse_f64(&value, "BLOCK 基点 X")?,
                20 => base_y = parse_f64(&value, "BLOCK 基点 Y")?,
                _ => {}
            }
        }

        let mut entities = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.as_str() {
                    "ENDBLK" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    "ENDSEC" | "SECTION" | "EOF" => {
                        self.structural("BLOCK 定义未找到 ENDBLK 终止标记")?;
                        self.reader.put_back((0, value));
                        break;
                    }
                    kind => {
                        if let Some(parsed) = self.read_entity(kind)? {
                            entities.push(parsed.entity);
                        }
                    }
                },
                Some(_) => continue,
                None => {
                    self.structural("BLOCK 定义未找到 ENDBLK 终止标记")?;
                    break;
                }
            }
        }

        let name = name.ok_or_else(|| DxfError::invalid("BLOCK 缺少名称（组码 2）"))?;
        Ok(BlockDefinition {
            name,
            base_point: Point2::new(base_x, base_y),
            entities,
        })
    }

    fn parse_entities(&mut self, document: &mut Document) -> Result<(), DxfError> {
        while let Some(kind) = self.next_record("ENTITIES")? {
            if let Some(parsed) = self.read_entity(&kind)? {
                if parsed.paper_space {
                    self.paper_entities.push(parsed.entity);
                } else {
                    document.add_entity(parsed.entity);
                }
            }
        }
        Ok(())
    }

    fn parse_objects(&mut self) -> Result<(), DxfError> {
        while let Some(kind) = self.next_record("OBJECTS")? {
            match kind.as_str() {
                "LAYOUT" => {
                    let parsed = self.parse_layout_record();
                    if let Some(record) = self.recoverable(parsed)? {
                        self.layout_records.push(record);
                    }
                }
                _ => self.skip_entity_body()?,
            }
        }
        Ok(())
    }

    fn parse_layout_record(&mut self) -> Result<LayoutRecord, DxfError> {
        let mut in_layout_subclass = false;
        let mut name = None;
        let mut tab_order = 0;
        let mut block_record = None;
        while let Some((code, value)) = self.next_body_pair()? {
            match code {
                100 => in_layout_subclass = value.trim() == "AcDbLayout",
                1 if in_layout_subclass => name = Some(value.trim().to_string()),
                71 if in_layout_subclass => {
                    tab_order = parse_i32(&value, "LAYOUT 标签顺序（组码 71）")?;
                }
                330 if in_layout_subclass => block_record = Some(value.trim().to_string()),
                _ => {}
            }
        }
        let name = name.ok_or_else(|| DxfError::invalid("LAYOUT 缺少名称（组码 1）"))?;
        Ok(LayoutRecord {
            name,
            tab_order,
            block_record,
        })
    }

    /// 把 LAYOUT 对象与图纸空间块组装为命名布局。
    fn assemble_layouts(&mut self, document: &mut Document) {
        let mut records = std::mem::take(&mut self.layout_records);
        records.sort_by_key(|record| record.tab_order);
        let mut paper_entities = std::mem::take(&mut self.paper_entities);
        let mut active_placed = false;

        for record in records {
            if record.name.eq_ignore_ascii_case(MODEL_SPACE_NAME) {
                continue;
            }
            let block_name = record
                .block_record
                .as_deref()
                .and_then(|handle| document.block_name_by_handle(handle))
                .map(str::to_string);
            let layout = document.add_paper_layout(record.name.clone());
            let Some(block_name) = block_name else {
                debug!(layout = %record.name, "LAYOUT 未关联图纸空间块，保留为空布局");
                continue;
            };

            let mut entities = Vec::new();
            if block_name.eq_ignore_ascii_case(ACTIVE_PAPER_SPACE_BLOCK) {
                entities.append(&mut paper_entities);
                active_placed = true;
            }
            entities.extend(document.take_block_entities(&block_name));
            place_entities(document, layout, entities);
        }

        if active_placed {
            return;
        }
        let mut entities = paper_entities;
        entities.extend(document.take_block_entities(ACTIVE_PAPER_SPACE_BLOCK));
        if entities.is_empty() {
            return;
        }
        debug!(count = entities.len(), "缺少 LAYOUT 对象，合成默认图纸布局");
        let layout = document.add_paper_layout(SYNTHESIZED_LAYOUT_NAME);
        place_entities(document, layout, entities);
    }

    fn read_entity(&mut self, kind: &str) -> Result<Option<ParsedEntity>, DxfError> {
        let result = match kind {
            "LINE" => self.parse_line().map(Some),
            "POINT" => self.parse_point().map(Some),
            "CIRCLE" => self.parse_circle().map(Some),
            "ARC" => self.parse_arc().map(Some),
            "ELLIPSE" => self.parse_ellipse().map(Some),
            "LWPOLYLINE" => self.parse_lwpolyline().map(Some),
            "POLYLINE" => self.parse_polyline(),
            "SPLINE" => self.parse_spline().map(Some),
            "TEXT" => self.parse_text().map(Some),
            "MTEXT" => self.parse_mtext().map(Some),
            "INSERT" => self.parse_insert().map(Some),
            "SOLID" => self.parse_solid().map(Some),
            "3DFACE" => self.parse_3dface().map(Some),
            "DIMENSION" => self.parse_dimension().map(Some),
            "HATCH" => self.parse_hatch().map(Some),
            other => {
                *self.skipped_kinds.entry(other.to_string()).or_default() += 1;
                self.skip_entity_body()?;
                return Ok(None);
            }
        };
        Ok(self.recoverable(result)?.flatten())
    }

    fn parse_line(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonProps::default();
        let (mut start_x, mut start_y, mut end_x, mut end_y) = (None, None, None, None);
        while let Some((code, value)) = self.next_body_pair()? {
            if common.accept(code, &value, "LINE")? {
                continue;
            }
            match code {
                10 => assign_coord(&mut start_x, &value, "LINE 起点 X（组码 10）")?,
                20 => assign_coord(&mut start_y, &value, "LINE 起点 Y（组码 20）")?,
                11 => assign_coord(&mut end_x, &value, "LINE 终点 X（组码 11）")?,
                21 => assign_coord(&mut end_y, &value, "LINE 终点 Y（组码 21）")?,
                _ => {}
            }
        }

        let sx = start_x.ok_or_else(|| DxfError::invalid("LINE 缺少起点 X（组码 10）"))?;
        let sy = start_y.ok_or_else(|| DxfError::invalid("LINE 缺少起点 Y（组码 20）"))?;
        let ex = end_x.ok_or_else(|| DxfError::invalid("LINE 缺少终点 X（组码 11）"))?;
        let ey = end_y.ok_or_else(|| DxfError::invalid("LINE 缺少终点 Y（组码 21）"))?;
        let line = Line {
            start: Point2::new(sx, sy),
            end: Point2::new(ex, ey),
            layer: common.layer(),
            color: common.color(),
        };
        Ok(common.finish(Entity::Line(line)))
    }

    fn parse_point(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonProps::default();
        let (mut x, mut y) = (None, None);
        while let Some((code, value)) = self.next_body_pair()? {
            if common.accept(code, &value, "POINT")? {
                continue;
            }
            match code {
                10 => assign_coord(&mut x, &value, "POINT 位置 X（组码 10）")?,
                20 => assign_coord(&mut y, &value, "POINT 位置 Y（组码 20）")?,
                _ => {}
            }
        }

        let x = x.ok_or_else(|| DxfError::invalid("POINT 缺少位置 X（组码 10）"))?;
        let y = y.ok_or_else(|| DxfError::invalid("POINT 缺少位置 Y（组码 20）"))?;
        let point = PointEntity {
            position: Point2::new(x, y),
            layer: common.layer(),
            color: common.color(),
        };
        Ok(common.finish(Entity::Point(point)))
    }

    fn parse_circle(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonProps::default();
        let (mut center_x, mut center_y, mut radius) = (None, None, None);
        while let Some((code, value)) = self.next_body_pair()? {
            if common.accept(code, &value, "CIRCLE")? {
                continue;
            }
            match code {
                10 => assign_coord(&mut center_x, &value, "CIRCLE 圆心 X（组码 10）")?,
                20 => assign_coord(&mut center_y, &value, "CIRCLE 圆心 Y（组码 20）")?,
                40 => assign_coord(&mut radius, &value, "CIRCLE 半径（组码 40）")?,
                _ => {}
            }
        }

        let cx = center_x.ok_or_else(|| DxfError::invalid("CIRCLE 缺少圆心 X（组码 10）"))?;
        let cy = center_y.ok_or_else(|| DxfError::invalid("CIRCLE 缺少圆心 Y（组码 20）"))?;
        let radius = radius.ok_or_else(|| DxfError::invalid("CIRCLE 缺少半径（组码 40）"))?;
        let circle = Circle {
            center: Point2::new(cx, cy),
            radius,
            layer: common.layer(),
            color: common.color(),
        };
        Ok(common.finish(Entity::Circle(circle)))
    }

    fn parse_arc(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonProps::default();
        let (mut center_x, mut center_y, mut radius) = (None, None, None);
        let (mut start_deg, mut end_deg) = (None, None);
        while let Some((code, value)) = self.next_body_pair()? {
            if common.accept(code, &value, "ARC")? {
                continue;
            }
            match code {
                10 => assign_coord(&mut center_x, &value, "ARC 圆心 X（组码 10）")?,
                20 => assign_coord(&mut center_y, &value, "ARC 圆心 Y（组码 20）")?,
                40 => assign_coord(&mut radius, &value, "ARC 半径（组码 40）")?,
                50 => assign_coord(&mut start_deg, &value, "ARC 起始角（组码 50）")?,
                51 => assign_coord(&mut end_deg, &value, "ARC 终止角（组码 51）")?,
                _ => {}
            }
        }

        let cx = center_x.ok_or_else(|| DxfError::invalid("ARC 缺少圆心 X（组码 10）"))?;
        let cy = center_y.ok_or_else(|| DxfError::invalid("ARC 缺少圆心 Y（组码 20）"))?;
        let radius = radius.ok_or_else(|| DxfError::invalid("ARC 缺少半径（组码 40）"))?;
        let start = start_deg.ok_or_else(|| DxfError::invalid("ARC 缺少起始角（组码 50）"))?;
        let end = end_deg.ok_or_else(|| DxfError::invalid("ARC 缺少终止角（组码 51）"))?;
        let arc = Arc {
            center: Point2::new(cx, cy),
            radius,
            start_angle: start.to_radians(),
            end_angle: end.to_radians(),
            layer: common.layer(),
            color: common.color(),
        };
        Ok(common.finish(Entity::Arc(arc)))
    }

    fn parse_ellipse(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonProps::default();
        let (mut center_x, mut center_y, mut major_x, mut major_y) = (None, None, None, None);
        let (mut ratio, mut start_param, mut end_param) = (None, None, None);
        while let Some((code, value)) = self.next_body_pair()? {
            if common.accept(code, &value, "ELLIPSE")? {
                continue;
            }
            match code {
                10 => assign_coord(&mut center_x, &value, "ELLIPSE 中心 X（组码 10）")?,
                20 => assign_coord(&mut center_y, &value, "ELLIPSE 中心 Y（组码 20）")?,
                11 => assign_coord(&mut major_x, &value, "ELLIPSE 主轴 X（组码 11）")?,
                21 => assign_coord(&mut major_y, &value, "ELLIPSE 主轴 Y（组码 21）")?,
                40 => assign_coord(&mut ratio, &value, "ELLIPSE 轴比（组码 40）")?,
                41 => assign_coord(&mut start_param, &value, "ELLIPSE 起始参数（组码 41）")?,
                42 => assign_coord(&mut end_param, &value, "ELLIPSE 终止参数（组码 42）")?,
                _ => {}
            }
        }

        let cx = center_x.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少中心 X（组码 10）"))?;
        let cy = center_y.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少中心 Y（组码 20）"))?;
        let mx = major_x.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少主轴 X（组码 11）"))?;
        let my = major_y.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少主轴 Y（组码 21）"))?;
        let ratio = ratio.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少轴比（组码 40）"))?;
        let ellipse = Ellipse {
            center: Point2::new(cx, cy),
            major_axis: Vector2::new(mx, my),
            ratio,
            start_parameter: start_param.unwrap_or(0.0),
            end_parameter: end_param.unwrap_or(TAU),
            layer: common.layer(),
            color: common.color(),
        };
        Ok(common.finish(Entity::Ellipse(ellipse)))
    }

    fn parse_lwpolyline(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonProps::default();
        let mut is_closed = false;
        let mut vertices: Vec<PolylineVertex> = Vec::new();
        let mut pending_x: Option<f64> = None;
        while let Some((code, value)) = self.next_body_pair()? {
            if common.accept(code, &value, "LWPOLYLINE")? {
                continue;
            }
            match code {
                70 => {
                    let flags = parse_i32(&value, "LWPOLYLINE 标志（组码 70）")?;
                    is_closed = flags & 0x01 != 0;
                }
                10 => {
                    let x = parse_f64(&value, "LWPOLYLINE 顶点 X（组码 10）")?;
                    if pending_x.replace(x).is_some() {
                        return Err(DxfError::invalid("LWPOLYLINE 顶点缺少对应的 Y（组码 20）"));
                    }
                }
                20 => {
                    let y = parse_f64(&value, "LWPOLYLINE 顶点 Y（组码 20）")?;
                    let x = pending_x.take().ok_or_else(|| {
                        DxfError::invalid("LWPOLYLINE 顶点 Y（组码 20）缺少对应的 X")
                    })?;
                    vertices.push(PolylineVertex::new(Point2::new(x, y)));
                }
                42 => {
                    let bulge = parse_f64(&value, "LWPOLYLINE 顶点 bulge（组码 42）")?;
                    let vertex = vertices.last_mut().ok_or_else(|| {
                        DxfError::invalid("LWPOLYLINE 在定义首个顶点前遇到 bulge（组码 42）")
                    })?;
                    vertex.bulge = bulge;
                }
                _ => {}
            }
        }

        if let Some(x) = pending_x {
            return Err(DxfError::invalid(format!(
                "LWPOLYLINE 顶点 X={x} 缺少对应的 Y（组码 20）"
            )));
        }
        let polyline = Polyline {
            vertices,
            is_closed,
            is_lightweight: true,
            layer: common.layer(),
            color: common.color(),
        };
        Ok(common.finish(Entity::Polyline(polyline)))
    }

    /// 旧式 POLYLINE：头记录后跟 VERTEX 序列，以 SEQEND 结束。网格类型不绘制。
    fn parse_polyline(&mut self) -> Result<Option<ParsedEntity>, DxfError> {
        let mut common = CommonProps::default();
        let mut flags: i16 = 0;
        while let Some((code, value)) = self.next_body_pair()? {
            if common.accept(code, &value, "POLYLINE")? {
                continue;
            }
            if code == 70 {
                flags = parse_i16(&value, "POLYLINE 标志（组码 70）")?;
            }
        }

        let mut vertices = Vec::new();
        let mut terminated = false;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.as_str() {
                    "VERTEX" => {
                        if let Some(vertex) = self.parse_vertex()? {
                            vertices.push(vertex);
                        }
                    }
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        terminated = true;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some(_) => continue,
                None => break,
            }
        }
        if !terminated {
            self.structural("POLYLINE 缺少 SEQEND 终止记录")?;
        }

        if flags & (0x10 | 0x40) != 0 {
            *self
                .skipped_kinds
                .entry("POLYLINE(mesh)".to_string())
                .or_default() += 1;
            return Ok(None);
        }
        let polyline = Polyline {
            vertices,
            is_closed: flags & 0x01 != 0,
            is_lightweight: false,
            layer: common.layer(),
            color: common.color(),
        };
        Ok(Some(common.finish(Entity::Polyline(polyline))))
    }

    fn parse_vertex(&mut self) -> Result<Option<PolylineVertex>, DxfError> {
        let (mut x, mut y) = (None, None);
        let mut bulge = 0.0;
        let mut flags: i16 = 0;
        while let Some((code, value)) = self.next_body_pair()? {
            match code {
                10 => assign_coord(&mut x, &value, "VERTEX 位置 X（组码 10）")?,
                20 => assign_coord(&mut y, &value, "VERTEX 位置 Y（组码 20）")?,
                42 => bulge = parse_f64(&value, "VERTEX bulge（组码 42）")?,
                70 => flags = parse_i16(&value, "VERTEX 标志（组码 70）")?,
                _ => {}
            }
        }
        // 0x10 为样条框架控制点，0x80 为多面网格的面记录，均不属于轮廓。
        if flags & (0x10 | 0x80) != 0 {
            return Ok(None);
        }
        let x = x.ok_or_else(|| DxfError::invalid("VERTEX 缺少位置 X（组码 10）"))?;
        let y = y.ok_or_else(|| DxfError::invalid("VERTEX 缺少位置 Y（组码 20）"))?;
        Ok(Some(PolylineVertex::with_bulge(Point2::new(x, y), bulge)))
    }

    fn parse_spline(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonProps::default();
        let mut flags: i16 = 0;
        let mut degree: Option<i16> = None;
        let mut knot_values: Vec<f64> = Vec::new();
        let mut weights: Vec<f64> = Vec::new();
        let mut control_points: Vec<Point2> = Vec::new();
        let mut fit_points: Vec<Point2> = Vec::new();
        let mut pending_control_x: Option<f64> = None;
        let mut pending_fit_x: Option<f64> = None;

        while let Some((code, value)) = self.next_body_pair()? {
            if common.accept(code, &value, "SPLINE")? {
                continue;
            }
            match code {
                70 => flags = parse_i16(&value, "SPLINE 类型标志（组码 70）")?,
                71 => degree = Some(parse_i16(&value, "SPLINE 阶数（组码 71）")?),
                40 => knot_values.push(parse_f64(&value, "SPLINE 节点值（组码 40）")?),
                41 => weights.push(parse_f64(&value, "SPLINE 权重（组码 41）")?),
                10 => {
                    if pending_control_x
                        .replace(parse_f64(&value, "SPLINE 控制点 X（组码 10）")?)
                        .is_some()
                    {
                        return Err(DxfError::invalid(
                            "SPLINE 控制点 X（组码 10）在未提供 Y 之前重复出现",
                        ));
                    }
                }
                20 => {
                    let y = parse_f64(&value, "SPLINE 控制点 Y（组码 20）")?;
                    let x = pending_control_x.take().ok_or_else(|| {
                        DxfError::invalid("SPLINE 控制点 Y（组码 20）缺少对应的 X")
                    })?;
                    control_points.push(Point2::new(x, y));
                }
                11 => {
                    if pending_fit_x
                        .replace(parse_f64(&value, "SPLINE 拟合点 X（组码 11）")?)
                        .is_some()
                    {
                        return Err(DxfError::invalid(
                            "SPLINE 拟合点 X（组码 11）在未提供 Y 之前重复出现",
                        ));
                    }
                }
                21 => {
                    let y = parse_f64(&value, "SPLINE 拟合点 Y（组码 21）")?;
                    let x = pending_fit_x.take().ok_or_else(|| {
                        DxfError::invalid("SPLINE 拟合点 Y（组码 21）缺少对应的 X")
                    })?;
                    fit_points.push(Point2::new(x, y));
                }
                _ => {}
            }
        }

        if let Some(x) = pending_control_x {
            return Err(DxfError::invalid(format!(
                "SPLINE 控制点 X={x} 缺少对应的 Y（组码 20）"
            )));
        }
        if let Some(x) = pending_fit_x {
            return Err(DxfError::invalid(format!(
                "SPLINE 拟合点 X={x} 缺少对应的 Y（组码 21）"
            )));
        }
        let degree = degree.ok_or_else(|| DxfError::invalid("SPLINE 缺少阶数（组码 71）"))?;
        let spline = Spline {
            degree: i32::from(degree),
            is_closed: flags & 0x01 != 0,
            is_rational: flags & 0x04 != 0,
            control_points,
            fit_points,
            knot_values,
            weights,
            layer: common.layer(),
            color: common.color(),
        };
        Ok(common.finish(Entity::Spline(spline)))
    }

    fn parse_text(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonProps::default();
        let (mut insert_x, mut insert_y, mut align_x, mut align_y) = (None, None, None, None);
        let mut height = None;
        let mut rotation_deg = 0.0;
        let mut content: Option<String> = None;
        let (mut halign, mut valign): (i16, i16) = (0, 0);
        while let Some((code, value)) = self.next_body_pair()? {
            if common.accept(code, &value, "TEXT")? {
                continue;
            }
            match code {
                10 => assign_coord(&mut insert_x, &value, "TEXT 插入点 X（组码 10）")?,
                20 => assign_coord(&mut insert_y, &value, "TEXT 插入点 Y（组码 20）")?,
                11 => assign_coord(&mut align_x, &value, "TEXT 对齐点 X（组码 11）")?,
                21 => assign_coord(&mut align_y, &value, "TEXT 对齐点 Y（组码 21）")?,
                40 => assign_coord(&mut height, &value, "TEXT 高度（组码 40）")?,
                50 => rotation_deg = parse_f64(&value, "TEXT 旋转角（组码 50）")?,
                72 => halign = parse_i16(&value, "TEXT 水平对齐（组码 72）")?,
                73 => valign = parse_i16(&value, "TEXT 垂直对齐（组码 73）")?,
                1 => content = Some(value),
                _ => {}
            }
        }

        let ix = insert_x.ok_or_else(|| DxfError::invalid("TEXT 缺少插入点 X（组码 10）"))?;
        let iy = insert_y.ok_or_else(|| DxfError::invalid("TEXT 缺少插入点 Y（组码 20）"))?;
        let height = height.ok_or_else(|| DxfError::invalid("TEXT 缺少文字高度（组码 40）"))?;
        let content = content.ok_or_else(|| DxfError::invalid("TEXT 缺少文本内容（组码 1）"))?;
        // 非默认对齐时，文字定位以对齐点为准。
        let insert = match (align_x, align_y) {
            (Some(x), Some(y)) if halign != 0 || valign != 0 => Point2::new(x, y),
            _ => Point2::new(ix, iy),
        };
        let text = Text {
            insert,
            content: decode_special_codes(&content),
            height,
            rotation: rotation_deg.to_radians(),
            layer: common.layer(),
            color: common.color(),
        };
        Ok(common.finish(Entity::Text(text)))
    }

    fn parse_mtext(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonProps::default();
        let (mut insert_x, mut insert_y, mut height) = (None, None, None);
        let (mut direction_x, mut direction_y) = (None, None);
        let mut rotation_deg: Option<f64> = None;
        let mut attachment_point: i16 = 1;
        let mut fragments: Vec<String> = Vec::new();
        while let Some((code, value)) = self.next_body_pair()? {
            if common.accept(code, &value, "MTEXT")? {
                continue;
            }
            match code {
                10 => assign_coord(&mut insert_x, &value, "MTEXT 插入点 X（组码 10）")?,
                20 => assign_coord(&mut insert_y, &value, "MTEXT 插入点 Y（组码 20）")?,
                40 => assign_coord(&mut height, &value, "MTEXT 高度（组码 40）")?,
                11 => direction_x = Some(parse_f64(&value, "MTEXT 方向向量 X（组码 11）")?),
                21 => direction_y = Some(parse_f64(&value, "MTEXT 方向向量 Y（组码 21）")?),
                50 => rotation_deg = Some(parse_f64(&value, "MTEXT 旋转角（组码 50）")?),
                71 => attachment_point = parse_i16(&value, "MTEXT 附着点（组码 71）")?,
                1 | 3 => fragments.push(value),
                _ => {}
            }
        }

        let ix = insert_x.ok_or_else(|| DxfError::invalid("MTEXT 缺少插入点 X（组码 10）"))?;
        let iy = insert_y.ok_or_else(|| DxfError::invalid("MTEXT 缺少插入点 Y（组码 20）"))?;
        let height = height.ok_or_else(|| DxfError::invalid("MTEXT 缺少文本高度（组码 40）"))?;
        if fragments.is_empty() {
            return Err(DxfError::invalid("MTEXT 缺少内容（组码 1/3）"));
        }
        let direction = match (direction_x, direction_y) {
            (Some(x), Some(y)) if x.abs() > f64::EPSILON || y.abs() > f64::EPSILON => {
                Vector2::new(x, y)
            }
            _ => {
                let rad = rotation_deg.unwrap_or(0.0).to_radians();
                Vector2::new(rad.cos(), rad.sin())
            }
        };
        let mtext = MText {
            insert: Point2::new(ix, iy),
            content: decode_mtext_content(&fragments.concat()),
            height,
            direction,
            attachment_point,
            layer: common.layer(),
            color: common.color(),
        };
        Ok(common.finish(Entity::MText(mtext)))
    }

    fn parse_insert(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonProps::default();
        let mut name = None;
        let (mut insert_x, mut insert_y) = (None, None);
        let (mut scale_x, mut scale_y): (Option<f64>, Option<f64>) = (None, None);
        let mut rotation_deg = 0.0;
        while let Some((code, value)) = self.next_body_pair()? {
            if common.accept(code, &value, "INSERT")? {
                continue;
            }
            match code {
                2 => {
                    if name.is_some() {
                        return Err(DxfError::invalid("INSERT 遇到重复的块名（组码 2）"));
                    }
                    name = Some(value.trim().to_string());
                }
                10 => assign_coord(&mut insert_x, &value, "INSERT 插入点 X（组码 10）")?,
                20 => assign_coord(&mut insert_y, &value, "INSERT 插入点 Y（组码 20）")?,
                41 => scale_x = Some(parse_f64(&value, "INSERT 缩放 X（组码 41）")?),
                42 => scale_y = Some(parse_f64(&value, "INSERT 缩放 Y（组码 42）")?),
                50 => rotation_deg = parse_f64(&value, "INSERT 旋转角（组码 50）")?,
                _ => {}
            }
        }

        // 属性（ATTRIB）只作为标注数据，不参与绘制。
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.as_str() {
                    "ATTRIB" => self.skip_entity_body()?,
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some(_) => continue,
                None => break,
            }
        }

        let name = name.ok_or_else(|| DxfError::invalid("INSERT 缺少块名（组码 2）"))?;
        let ix = insert_x.ok_or_else(|| DxfError::invalid("INSERT 缺少插入点 X（组码 10）"))?;
        let iy = insert_y.ok_or_else(|| DxfError::invalid("INSERT 缺少插入点 Y（组码 20）"))?;
        let sx = scale_x.unwrap_or(1.0);
        let sy = scale_y.unwrap_or(sx);
        let reference = BlockReference {
            name,
            insert: Point2::new(ix, iy),
            scale: Vector2::new(sx, sy),
            rotation: rotation_deg.to_radians(),
            layer: common.layer(),
            color: common.color(),
        };
        Ok(common.finish(Entity::BlockReference(reference)))
    }

    fn parse_solid(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonProps::default();
        let mut vx = [None; 4];
        let mut vy = [None; 4];
        while let Some((code, value)) = self.next_body_pair()? {
            if common.accept(code, &value, "SOLID")? {
                continue;
            }
            match code {
                10..=13 => {
                    let index = (code - 10) as usize;
                    assign_coord(&mut vx[index], &value, &format!("SOLID 顶点 {} X", index + 1))?;
                }
                20..=23 => {
                    let index = (code - 20) as usize;
                    assign_coord(&mut vy[index], &value, &format!("SOLID 顶点 {} Y", index + 1))?;
                }
                _ => {}
            }
        }

        let mut vertices = [Point2::new(0.0, 0.0); 4];
        for index in 0..3 {
            let x = vx[index].ok_or_else(|| {
                DxfError::invalid(format!("SOLID 缺少第 {} 个顶点 X", index + 1))
            })?;
            let y = vy[index].ok_or_else(|| {
                DxfError::invalid(format!("SOLID 缺少第 {} 个顶点 Y", index + 1))
            })?;
            vertices[index] = Point2::new(x, y);
        }
        // 三角形 SOLID 省略第 4 点，此时与第 3 点重合。
        vertices[3] = match (vx[3], vy[3]) {
            (Some(x), Some(y)) => Point2::new(x, y),
            _ => vertices[2],
        };
        let solid = Solid {
            vertices,
            layer: common.layer(),
            color: common.color(),
        };
        Ok(common.finish(Entity::Solid(solid)))
    }

    fn parse_3dface(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonProps::default();
        let mut vx = [None; 4];
        let mut vy = [None; 4];
        let mut vz = [None; 4];
        let mut invisible_edges: Option<i16> = None;
        while let Some((code, value)) = self.next_body_pair()? {
            if common.accept(code, &value, "3DFACE")? {
                continue;
            }
            match code {
                10 => assign_coord(&mut vx[0], &value, "3DFACE 顶点 1 X（组码 10）")?,
                20 => assign_coord(&mut vy[0], &value, "3DFACE 顶点 1 Y（组码 20）")?,
                30 => assign_coord(&mut vz[0], &value, "3DFACE 顶点 1 Z（组码 30）")?,
                11 => assign_coord(&mut vx[1], &value, "3DFACE 顶点 2 X（组码 11）")?,
                21 => assign_coord(&mut vy[1], &value, "3DFACE 顶点 2 Y（组码 21）")?,
                31 => assign_coord(&mut vz[1], &value, "3DFACE 顶点 2 Z（组码 31）")?,
                12 => assign_coord(&mut vx[2], &value, "3DFACE 顶点 3 X（组码 12）")?,
                22 => assign_coord(&mut vy[2], &value, "3DFACE 顶点 3 Y（组码 22）")?,
                32 => assign_coord(&mut vz[2], &value, "3DFACE 顶点 3 Z（组码 32）")?,
                13 => assign_coord(&mut vx[3], &value, "3DFACE 顶点 4 X（组码 13）")?,
                23 => assign_coord(&mut vy[3], &value, "3DFACE 顶点 4 Y（组码 23）")?,
                33 => assign_coord(&mut vz[3], &value, "3DFACE 顶点 4 Z（组码 33）")?,
                70 => {
                    if invisible_edges.is_some() {
                        return Err(DxfError::invalid("3DFACE 遇到重复的隐藏边标记（组码 70）"));
                    }
                    invisible_edges = Some(parse_i16(&value, "3DFACE 隐藏边标记（组码 70）")?);
                }
                _ => {}
            }
        }

        let v1 = build_face_vertex(1, vx[0], vy[0], vz[0])?
            .ok_or_else(|| DxfError::invalid("3DFACE 缺少第 1 个顶点"))?;
        let v2 = build_face_vertex(2, vx[1], vy[1], vz[1])?
            .ok_or_else(|| DxfError::invalid("3DFACE 缺少第 2 个顶点"))?;
        let v3 = build_face_vertex(3, vx[2], vy[2], vz[2])?
            .ok_or_else(|| DxfError::invalid("3DFACE 缺少第 3 个顶点"))?;
        let v4 = build_face_vertex(4, vx[3], vy[3], vz[3])?.unwrap_or(v3);

        let flags = invisible_edges.unwrap_or(0);
        let face = ThreeDFace {
            vertices: [v1, v2, v3, v4],
            invisible_edges: [flags & 1 != 0, flags & 2 != 0, flags & 4 != 0, flags & 8 != 0],
            layer: common.layer(),
            color: common.color(),
        };
        Ok(common.finish(Entity::Face3D(face)))
    }

    /// 标注只保留几何块名，绘制时展开该块。
    fn parse_dimension(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonProps::default();
        let mut block = None;
        while let Some((code, value)) = self.next_body_pair()? {
            if common.accept(code, &value, "DIMENSION")? {
                continue;
            }
            if code == 2 {
                block = Some(value.trim().to_string());
            }
        }
        let block =
            block.ok_or_else(|| DxfError::invalid("DIMENSION 缺少几何块名（组码 2）"))?;
        let dimension = Dimension {
            block,
            layer: common.layer(),
            color: common.color(),
        };
        Ok(common.finish(Entity::Dimension(dimension)))
    }

    /// 边界数据的含义依赖前面的类型标志，先收集全部组码再按顺序解释。
    fn parse_hatch(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonProps::default();
        let mut pairs = Vec::new();
        while let Some((code, value)) = self.next_body_pair()? {
            if common.accept(code, &value, "HATCH")? {
                continue;
            }
            pairs.push((code, value));
        }
        let hatch = Hatch {
            boundaries: HatchCursor::new(&pairs).boundaries()?,
            layer: common.layer(),
            color: common.color(),
        };
        Ok(common.finish(Entity::Hatch(hatch)))
    }
}

fn place_entities(document: &mut Document, layout: LayoutId, entities: Vec<Entity>) {
    for entity in entities {
        let kind = entity.kind();
        if document.add_entity_to(layout, entity).is_none() {
            warn!(layout = ?layout, %kind, "布局不存在，丢弃图纸空间实体");
        }
    }
}

const HATCH_POLYLINE_BOUNDARY: i32 = 0x02;

/// 按顺序读取 HATCH 组码。
struct HatchCursor<'p> {
    pairs: &'p [(i32, String)],
    position: usize,
}

impl<'p> HatchCursor<'p> {
    fn new(pairs: &'p [(i32, String)]) -> Self {
        Self { pairs, position: 0 }
    }

    fn peek_code(&self) -> Option<i32> {
        self.pairs.get(self.position).map(|(code, _)| *code)
    }

    fn take(&mut self, code: i32, what: &str) -> Result<&'p str, DxfError> {
        match self.pairs.get(self.position) {
            Some((found, value)) if *found == code => {
                self.position += 1;
                Ok(value.as_str())
            }
            Some((found, _)) => Err(DxfError::invalid(format!(
                "HATCH {what}应为组码 {code}，实际为 {found}"
            ))),
            None => Err(DxfError::invalid(format!(
                "HATCH {what}（组码 {code}）缺失"
            ))),
        }
    }

    fn take_f64(&mut self, code: i32, what: &str) -> Result<f64, DxfError> {
        let value = self.take(code, what)?;
        parse_f64(value, &format!("HATCH {what}（组码 {code}）"))
    }

    fn take_i32(&mut self, code: i32, what: &str) -> Result<i32, DxfError> {
        let value = self.take(code, what)?;
        parse_i32(value, &format!("HATCH {what}（组码 {code}）"))
    }

    fn take_count(&mut self, code: i32, what: &str) -> Result<usize, DxfError> {
        let count = self.take_i32(code, what)?;
        usize::try_from(count)
            .map_err(|_| DxfError::invalid(format!("HATCH {what}（组码 {code}）为负数：{count}")))
    }

    fn take_point(&mut self, x_code: i32, what: &str) -> Result<Point2, DxfError> {
        let x = self.take_f64(x_code, what)?;
        let y = self.take_f64(x_code + 10, what)?;
        Ok(Point2::new(x, y))
    }

    /// 图案、种子点等其余数据不影响轮廓。
    fn boundaries(mut self) -> Result<Vec<HatchBoundary>, DxfError> {
        while self.peek_code().is_some_and(|code| code != 91) {
            self.position += 1;
        }
        if self.peek_code().is_none() {
            return Ok(Vec::new());
        }
        let count = self.take_count(91, "边界数量")?;
        let mut boundaries = Vec::with_capacity(count.min(self.pairs.len()));
        for _ in 0..count {
            let flags = self.take_i32(92, "边界类型")?;
            let boundary = if flags & HATCH_POLYLINE_BOUNDARY != 0 {
                HatchBoundary::Polyline(self.polyline_boundary()?)
            } else {
                let edges = self.take_count(93, "边数量")?;
                let mut parsed = Vec::with_capacity(edges.min(self.pairs.len()));
                for _ in 0..edges {
                    parsed.push(self.edge()?);
                }
                HatchBoundary::Edges(parsed)
            };
            boundaries.push(boundary);
            self.skip_source_objects()?;
        }
        Ok(boundaries)
    }

    fn polyline_boundary(&mut self) -> Result<Vec<PolylineVertex>, DxfError> {
        let has_bulge = self.take_i32(72, "多段线边界凸度标志")? != 0;
        self.take_i32(73, "多段线边界闭合标志")?;
        let count = self.take_count(93, "多段线边界顶点数量")?;
        let mut vertices = Vec::with_capacity(count.min(self.pairs.len()));
        for _ in 0..count {
            let position = self.take_point(10, "多段线边界顶点")?;
            let bulge = if has_bulge && self.peek_code() == Some(42) {
                self.take_f64(42, "多段线边界凸度")?
            } else {
                0.0
            };
            vertices.push(PolylineVertex::with_bulge(position, bulge));
        }
        Ok(vertices)
    }

    fn edge(&mut self) -> Result<HatchEdge, DxfError> {
        let edge = match self.take_i32(72, "边类型")? {
            1 => HatchEdge::Line {
                start: self.take_point(10, "直线边起点")?,
                end: self.take_point(11, "直线边终点")?,
            },
            2 => HatchEdge::Arc {
                center: self.take_point(10, "圆弧边圆心")?,
                radius: self.take_f64(40, "圆弧边半径")?,
                start_angle: self.take_f64(50, "圆弧边起始角")?.to_radians(),
                end_angle: self.take_f64(51, "圆弧边终止角")?.to_radians(),
                counter_clockwise: self.take_i32(73, "圆弧边方向")? != 0,
            },
            3 => {
                let center = self.take_point(10, "椭圆边中心")?;
                let major = self.take_point(11, "椭圆边主轴")?;
                HatchEdge::Ellipse {
                    center,
                    major_axis: Vector2::new(major.x(), major.y()),
                    ratio: self.take_f64(40, "椭圆边轴比")?,
                    start_parameter: self.take_f64(50, "椭圆边起始参数")?.to_radians(),
                    end_parameter: self.take_f64(51, "椭圆边终止参数")?.to_radians(),
                    counter_clockwise: self.take_i32(73, "椭圆边方向")? != 0,
                }
            }
            4 => self.spline_edge()?,
            other => {
                return Err(DxfError::invalid(format!("HATCH 未知的边类型 {other}")));
            }
        };
        Ok(edge)
    }

    fn spline_edge(&mut self) -> Result<HatchEdge, DxfError> {
        let degree = self.take_i32(94, "样条边阶数")?;
        let rational = self.take_i32(73, "样条边有理标志")? != 0;
        self.take_i32(74, "样条边周期标志")?;
        let knot_count = self.take_count(95, "样条边节点数量")?;
        let control_count = self.take_count(96, "样条边控制点数量")?;
        let mut knot_values = Vec::with_capacity(knot_count.min(self.pairs.len()));
        for _ in 0..knot_count {
            knot_values.push(self.take_f64(40, "样条边节点值")?);
        }
        let mut control_points = Vec::with_capacity(control_count.min(self.pairs.len()));
        let mut weights = Vec::new();
        for _ in 0..control_count {
            control_points.push(self.take_point(10, "样条边控制点")?);
            if rational {
                weights.push(self.take_f64(42, "样条边权重")?);
            }
        }
        // 拟合点与端点切向只用于重建样条，轮廓按控制点绘制。
        if self.peek_code() == Some(97) {
            self.take_i32(97, "样条边拟合点数量")?;
        }
        while let Some(code @ (11 | 12 | 13)) = self.peek_code() {
            self.take_point(code, "样条边拟合数据")?;
        }
        Ok(HatchEdge::Spline {
            degree,
            control_points,
            knot_values,
            weights,
        })
    }

    fn skip_source_objects(&mut self) -> Result<(), DxfError> {
        if self.peek_code() == Some(97) {
            self.take_i32(97, "源边界对象数量")?;
        }
        while self.peek_code() == Some(330) {
            self.position += 1;
        }
        Ok(())
    }
}

fn assign_coord(slot: &mut Option<f64>, raw: &str, context: &str) -> Result<(), DxfError> {
    if slot.is_some() {
        return Err(DxfError::invalid(format!("{context} 出现重复值")));
    }
    *slot = Some(parse_f64(raw, context)?);
    Ok(())
}

fn build_face_vertex(
    index: usize,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
) -> Result<Option<Point3>, DxfError> {
    match (x, y, z) {
        (None, None, None) => Ok(None),
        (Some(x), Some(y), z) => Ok(Some(Point3::new(x, y, z.unwrap_or(0.0)))),
        _ => Err(DxfError::invalid(format!(
            "3DFACE 顶点 {index} 缺少完整的 XY 坐标"
        ))),
    }
}

fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i16(raw: &str, context: &str) -> Result<i16, DxfError> {
    let value = parse_i32(raw, context)?;
    i16::try_from(value)
        .map_err(|_| DxfError::invalid(format!("{context} 超出 i16 范围（值：{value}）")))
}

fn parse_u32(raw: &str, context: &str) -> Result<u32, DxfError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

/// TEXT 的 `%%` 控制码：度数、正负号、直径符号；上下划线开关直接去除。
fn decode_special_codes(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(index) = rest.find("%%") {
        result.push_str(&rest[..index]);
        let tail = &rest[index + 2..];
        let mut chars = tail.chars();
        match chars.next() {
            Some(code) => match code.to_ascii_lowercase() {
                'd' => result.push('°'),
                'p' => result.push('±'),
                'c' => result.push('⌀'),
                '%' => result.push('%'),
                'u' | 'o' | 'k' => {}
                _ => {
                    result.push_str("%%");
                    result.push(code);
                }
            },
            None => result.push_str("%%"),
        }
        rest = chars.as_str();
    }
    result.push_str(rest);
    result
}

/// 去除 MTEXT 内联格式，只保留可见文字；`\P` 转为换行，堆叠分数 `\Sa^b;` 写作 `a/b`。
fn decode_mtext_content(raw: &str) -> String {
    let mut result = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '{' | '}' => {}
            '\\' => match chars.next() {
                Some('P') | Some('p') | Some('X') => result.push('\n'),
                Some('~') => result.push(' '),
                Some(escaped @ ('\\' | '{' | '}')) => result.push(escaped),
                Some('S') => {
                    for next in chars.by_ref() {
                        match next {
                            ';' => break,
                            '^' | '#' => result.push('/'),
                            other => result.push(other),
                        }
                    }
                }
                Some('L' | 'l' | 'O' | 'o' | 'K' | 'k') => {}
                // \f \H \C \A \W \Q \T 等带参数格式码，参数以分号结束。
                Some(_) => {
                    for next in chars.by_ref() {
                        if next == ';' {
                            break;
                        }
                    }
                }
                None => result.push('\\'),
            },
            other => result.push(other),
        }
    }
    result
}
