use std::f64::consts::{FRAC_PI_2, PI};
use std::path::{Path, PathBuf};

use dxf2svg_core::color::{Color, Rgb};
use dxf2svg_core::document::{Document, Entity, EntityKind, HatchBoundary, HatchEdge};
use dxf2svg_io::{DocumentLoader, DxfFacade, IoError};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

fn load(name: &str) -> Document {
    DxfFacade::new()
        .load(&fixture(name))
        .unwrap_or_else(|err| panic!("读取 {name} 失败：{err}"))
}

fn kinds(document: &Document) -> Vec<EntityKind> {
    document
        .modelspace()
        .entities()
        .map(|(_, entity)| entity.kind())
        .collect()
}

#[test]
fn well_formed_file_loads_strictly() {
    let bytes = std::fs::read(fixture("basic_entities.dxf")).expect("读取夹具");
    let (document, auditor) = DxfFacade::new().read_strict(&bytes).expect("严格解析");
    assert!(auditor.fixes().is_empty());
    assert!(!auditor.has_errors());
    assert_eq!(
        kinds(&document),
        vec![
            EntityKind::Line,
            EntityKind::Circle,
            EntityKind::Arc,
            EntityKind::LwPolyline,
            EntityKind::Text,
            EntityKind::MText,
            EntityKind::Insert,
            EntityKind::Polyline,
        ]
    );
}

#[test]
fn layer_table_carries_color_and_flags() {
    let document = load("basic_entities.dxf");

    let walls = document.layer("WALLS").expect("WALLS 图层");
    assert_eq!(walls.color, Some(Color::Aci(1)));
    assert!(walls.is_rendered());

    let hidden = document.layer("HIDDEN").expect("HIDDEN 图层");
    assert!(hidden.is_frozen);
    assert!(!hidden.is_visible);
    assert_eq!(hidden.color, Some(Color::Aci(3)));

    let tinted = document.layer("TINTED").expect("TINTED 图层");
    assert!(tinted.is_locked);
    assert_eq!(tinted.color, Some(Color::Rgb(Rgb::new(0x33, 0x66, 0x99))));

    assert_eq!(document.layer("0").and_then(|l| l.color), Some(Color::Aci(7)));
    assert_eq!(document.layers().count(), 4);
}

#[test]
fn entity_fields_are_decoded() {
    let document = load("basic_entities.dxf");
    let entities: Vec<&Entity> = document.modelspace().entities().map(|(_, e)| e).collect();

    match entities[1] {
        Entity::Circle(circle) => {
            assert_eq!(circle.color, Some(Color::Aci(3)));
            assert!((circle.radius - 10.0).abs() < 1e-9);
        }
        other => panic!("期望 CIRCLE，实际 {other:?}"),
    }
    match entities[3] {
        Entity::Polyline(polyline) => {
            assert_eq!(polyline.vertices.len(), 2);
            assert!((polyline.vertices[0].bulge - 1.0).abs() < 1e-9);
            assert_eq!(polyline.layer, "HIDDEN");
        }
        other => panic!("期望 LWPOLYLINE，实际 {other:?}"),
    }
    match entities[4] {
        Entity::Text(text) => assert_eq!(text.content, "Room ⌀20"),
        other => panic!("期望 TEXT，实际 {other:?}"),
    }
    match entities[5] {
        Entity::MText(mtext) => assert_eq!(mtext.content, "Line1\nLine2"),
        other => panic!("期望 MTEXT，实际 {other:?}"),
    }
    match entities[6] {
        Entity::BlockReference(reference) => {
            assert_eq!(reference.name, "DOOR");
            assert!((reference.rotation - FRAC_PI_2).abs() < 1e-9);
            assert!((reference.scale.x() - 2.0).abs() < 1e-9);
        }
        other => panic!("期望 INSERT，实际 {other:?}"),
    }
    match entities[7] {
        Entity::Polyline(polyline) => {
            assert!(polyline.is_closed);
            assert!(!polyline.is_lightweight);
            assert_eq!(polyline.vertices.len(), 3);
        }
        other => panic!("期望 POLYLINE，实际 {other:?}"),
    }

    let door = document.block("DOOR").expect("DOOR 块");
    assert_eq!(door.entities.len(), 2);
    assert_eq!(door.entities[0].color(), Some(Color::ByBlock));
}

#[test]
fn paper_layouts_follow_tab_order() {
    let document = load("paper_layouts.dxf");
    let names: Vec<&str> = document.layouts().map(|layout| layout.name()).collect();
    assert_eq!(names, vec!["Model", "Sheet A", "Plot B"]);

    let layouts: Vec<_> = document.layouts().collect();
    assert_eq!(layouts[0].len(), 1);
    assert_eq!(layouts[1].len(), 1, "活动图纸空间应包含 67=1 的实体");
    assert_eq!(layouts[2].len(), 2, "Plot B 应包含 *Paper_Space0 块中的实体");
    assert!(layouts[2].entities().all(|(_, e)| e.layer_name() == "FRAME"));
}

#[test]
fn truncated_file_is_repaired() {
    let bytes = std::fs::read(fixture("truncated_entities.dxf")).expect("读取夹具");
    let facade = DxfFacade::new();
    assert!(matches!(
        facade.read_strict(&bytes),
        Err(IoError::InvalidDocument(_))
    ));

    let (_, auditor) = facade.read_recovering(&bytes).expect("修复解析");
    assert!(!auditor.has_errors());
    assert_eq!(auditor.fixes().len(), 3, "{:?}", auditor.fixes());

    let document = load("truncated_entities.dxf");
    assert_eq!(kinds(&document), vec![EntityKind::Line, EntityKind::Circle]);
}

#[test]
fn unrepairable_entity_fails_the_load() {
    let path = fixture("corrupt_entity.dxf");
    match DxfFacade::new().load(&path) {
        Err(IoError::DocumentUnrecoverable {
            path: reported,
            errors,
            first_error,
        }) => {
            assert_eq!(reported, path);
            assert_eq!(errors, 1);
            assert!(first_error.contains("CIRCLE"), "{first_error}");
        }
        other => panic!("期望 DocumentUnrecoverable，实际 {other:?}"),
    }
}

#[test]
fn duplicate_layers_keep_first_definition_after_repair() {
    let source = "0\nSECTION\n2\nTABLES\n0\nLAYER\n2\nA\n62\n1\n0\nLAYER\n2\nA\n62\n2\n0\nENDSEC\n0\nEOF\n";
    let document = DxfFacade::new()
        .load_bytes(source.as_bytes(), Path::new("dup.dxf"))
        .expect("重复图层可修复");
    assert_eq!(document.layer("A").and_then(|l| l.color), Some(Color::Aci(1)));
}

#[test]
fn paper_space_entities_without_layout_objects_get_default_layout() {
    let source = "0\nSECTION\n2\nENTITIES\n0\nLINE\n8\n0\n67\n1\n10\n0\n20\n0\n11\n1\n21\n1\n0\nENDSEC\n0\nEOF\n";
    let document = DxfFacade::new()
        .load_bytes(source.as_bytes(), Path::new("paper.dxf"))
        .expect("加载");
    assert!(document.modelspace().is_empty());
    let names: Vec<&str> = document.layouts().map(|layout| layout.name()).collect();
    assert_eq!(names, vec!["Model", "Layout1"]);
}

#[test]
fn invalid_utf8_is_decoded_lossily() {
    let mut bytes = b"0\nSECTION\n2\nENTITIES\n0\nTEXT\n8\n0\n10\n0\n20\n0\n40\n1\n1\n".to_vec();
    bytes.extend_from_slice(&[0xff, b'x', b'\n']);
    bytes.extend_from_slice(b"0\nENDSEC\n0\nEOF\n");
    let document = DxfFacade::new()
        .load_bytes(&bytes, Path::new("latin1.dxf"))
        .expect("有损解码后可用");
    match document.modelspace().entities().next() {
        Some((_, Entity::Text(text))) => assert_eq!(text.content, "\u{fffd}x"),
        other => panic!("期望 TEXT，实际 {other:?}"),
    }
}

#[test]
fn binary_dxf_is_rejected() {
    let err = DxfFacade::new()
        .load_bytes(b"AutoCAD Binary DXF\r\n\x1a\x00", Path::new("bin.dxf"))
        .expect_err("二进制 DXF 不受支持");
    assert!(matches!(err, IoError::UnsupportedFeature(_)));
}

#[test]
fn empty_input_is_unrecoverable() {
    let err = DxfFacade::new()
        .load_bytes(b"", Path::new("empty.dxf"))
        .expect_err("空文件");
    assert!(matches!(err, IoError::DocumentUnrecoverable { .. }));
}

#[test]
fn missing_file_reports_read_error() {
    let err = DxfFacade::new()
        .load(Path::new("definitely/not/here.dxf"))
        .expect_err("文件不存在");
    assert!(matches!(err, IoError::ReadError { .. }));
}

#[test]
fn dimensions_keep_their_geometry_block() {
    let bytes = std::fs::read(fixture("dimension.dxf")).expect("读取夹具");
    let (document, auditor) = DxfFacade::new().read_strict(&bytes).expect("严格解析");
    assert!(!auditor.has_errors());
    assert_eq!(kinds(&document), vec![EntityKind::Dimension, EntityKind::Dimension]);

    let entities: Vec<&Entity> = document.modelspace().entities().map(|(_, e)| e).collect();
    match entities[0] {
        Entity::Dimension(dimension) => {
            assert_eq!(dimension.block, "*D1");
            assert_eq!(dimension.layer, "DIMS");
            assert_eq!(dimension.color, None);
        }
        other => panic!("期望 DIMENSION，实际 {other:?}"),
    }
    match entities[1] {
        Entity::Dimension(dimension) => {
            assert_eq!(dimension.block, "*D7");
            assert_eq!(dimension.color, Some(Color::Aci(1)));
        }
        other => panic!("期望 DIMENSION，实际 {other:?}"),
    }

    let block = document.block("*D1").expect("*D1 块");
    assert_eq!(block.entities.len(), 2);
    assert!(document.block("*D7").is_none());
}

#[test]
fn hatch_boundaries_are_decoded() {
    let document = load("hatch.dxf");
    let entities: Vec<&Entity> = document.modelspace().entities().map(|(_, e)| e).collect();
    assert_eq!(entities.len(), 1);
    let Entity::Hatch(hatch) = entities[0] else {
        panic!("期望 HATCH，实际 {:?}", entities[0]);
    };
    assert_eq!(hatch.layer, "FILL");
    assert_eq!(hatch.color, Some(Color::Aci(5)));
    assert_eq!(hatch.boundaries.len(), 2);

    match &hatch.boundaries[0] {
        HatchBoundary::Polyline(vertices) => {
            assert_eq!(vertices.len(), 4);
            assert!((vertices[1].bulge - 1.0).abs() < 1e-9);
            assert_eq!(vertices[2].bulge, 0.0);
        }
        other => panic!("期望多段线边界，实际 {other:?}"),
    }
    match &hatch.boundaries[1] {
        HatchBoundary::Edges(edges) => {
            assert_eq!(edges.len(), 3);
            match &edges[1] {
                HatchEdge::Arc {
                    radius,
                    end_angle,
                    counter_clockwise,
                    ..
                } => {
                    assert!((radius - 2.0).abs() < 1e-9);
                    assert!((end_angle - PI).abs() < 1e-9);
                    assert!(*counter_clockwise);
                }
                other => panic!("期望圆弧边，实际 {other:?}"),
            }
        }
        other => panic!("期望边界边序列，实际 {other:?}"),
    }

    let bounds = entities[0].bounds().expect("填充范围");
    assert!((bounds.max().y() - 10.0).abs() < 1e-9);
    assert!((bounds.max().x() - 15.0).abs() < 1e-9);
}

#[test]
fn hatch_with_unknown_edge_type_is_an_entity_error() {
    let source = "0\nSECTION\n2\nENTITIES\n\
0\nHATCH\n8\nFILL\n2\nSOLID\n70\n1\n71\n0\n91\n1\n92\n1\n93\n1\n72\n9\n10\n0\n20\n0\n97\n0\n\
0\nLINE\n8\nA\n10\n0\n20\n0\n11\n1\n21\n0\n\
0\nENDSEC\n0\nEOF\n";
    let facade = DxfFacade::new();
    assert!(matches!(
        facade.read_strict(source.as_bytes()),
        Err(IoError::InvalidDocument(_))
    ));

    let (document, auditor) = facade.read_recovering(source.as_bytes()).expect("修复解析");
    assert!(auditor.has_errors());
    assert_eq!(kinds(&document), vec![EntityKind::Line]);
}

