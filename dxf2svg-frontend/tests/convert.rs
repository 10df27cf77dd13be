use std::fs;
use std::path::{Path, PathBuf};

use dxf2svg_engine::LayerVerdict;
use dxf2svg_engine::errors::EngineError;
use dxf2svg_frontend::{ConversionRequest, ConvertError, convert};
use dxf2svg_io::IoError;

const HEADER: &str = "0\nSECTION\n2\nTABLES\n0\nTABLE\n2\nLAYER\n70\n2\n\
0\nLAYER\n2\nA\n70\n0\n62\n5\n\
0\nLAYER\n2\nB\n70\n0\n62\n1\n\
0\nENDTAB\n0\nENDSEC\n";

fn drawing(entities: &str) -> String {
    format!("{HEADER}0\nSECTION\n2\nENTITIES\n{entities}0\nENDSEC\n0\nEOF\n")
}

fn line(layer: &str, from: (f64, f64), to: (f64, f64)) -> String {
    format!(
        "0\nLINE\n8\n{layer}\n10\n{}\n20\n{}\n11\n{}\n21\n{}\n",
        from.0, from.1, to.0, to.1
    )
}

fn circle(layer: &str, radius: f64) -> String {
    format!("0\nCIRCLE\n8\n{layer}\n10\n0\n20\n0\n40\n{radius}\n")
}

fn write_input(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write input");
    path
}

#[test]
fn healthy_drawing_is_written_to_a_new_directory() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write_input(
        dir.path(),
        "plan.dxf",
        &drawing(&(line("A", (0.0, 0.0), (200.0, 0.0)) + &line("B", (0.0, 0.0), (0.0, 100.0)))),
    );
    let output = dir.path().join("nested/out/plan.svg");

    let summary = convert(&ConversionRequest::new(&input, &output)).expect("conversion");
    assert_eq!(summary.layout, "Model");
    assert_eq!(summary.paths, 2);
    assert_eq!((summary.page.width, summary.page.height), (200.0, 100.0));
    assert_eq!(summary.census.per_layer["A"], 1);

    let svg = fs::read_to_string(&output).expect("svg written");
    assert!(svg.contains("width=\"200mm\" height=\"100mm\""));
    assert!(svg.contains("stroke=\"#0000ff\""));
    assert!(svg.contains("stroke=\"#ff0000\""));
    assert!(svg.contains("fill=\"#0b1220\""));
}

#[test]
fn repeated_conversions_are_byte_identical() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write_input(
        dir.path(),
        "plan.dxf",
        &drawing(&(line("A", (0.0, 0.0), (3.0, 4.0)) + &circle("B", 2.5))),
    );
    let first = dir.path().join("first.svg");
    let second = dir.path().join("second.svg");
    convert(&ConversionRequest::new(&input, &first)).expect("first");
    convert(&ConversionRequest::new(&input, &second)).expect("second");
    assert_eq!(
        fs::read(&first).expect("first bytes"),
        fs::read(&second).expect("second bytes")
    );
}

#[test]
fn render_failure_carries_a_report_and_removes_stale_output() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write_input(
        dir.path(),
        "broken.dxf",
        &drawing(&(line("A", (0.0, 0.0), (1.0, 0.0)) + &circle("B", -3.0) + &line("B", (0.0, 0.0), (0.0, 1.0)))),
    );
    let output = dir.path().join("broken.svg");
    fs::write(&output, "stale").expect("seed stale output");

    let err = convert(&ConversionRequest::new(&input, &output)).expect_err("must fail");
    assert!(matches!(
        err,
        ConvertError::Render {
            source: EngineError::RenderFailure { .. },
            ..
        }
    ));
    let report = err.report().expect("report attached");
    assert_eq!(report.layers["A"], LayerVerdict::Ok { checked: 1 });
    assert!(report.layers["B"].is_failed());
    assert_eq!(report.census.per_layer["B"], 2);
    assert!(!output.exists());
}

#[test]
fn unknown_layout_fails_without_output() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write_input(dir.path(), "plan.dxf", &drawing(&line("A", (0.0, 0.0), (1.0, 1.0))));
    let output = dir.path().join("plan.svg");

    let err = convert(&ConversionRequest::new(&input, &output).with_layout("NoSuchLayout"))
        .expect_err("layout missing");
    match err {
        ConvertError::Engine(EngineError::LayoutNotFound { requested }) => {
            assert_eq!(requested, "NoSuchLayout");
        }
        other => panic!("期望 LayoutNotFound，实际 {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn invalid_colors_are_rejected_before_loading() {
    let dir = tempfile::tempdir().expect("temp dir");
    let request = ConversionRequest::new(dir.path().join("missing.dxf"), dir.path().join("x.svg"))
        .with_background("#12345g");
    match convert(&request) {
        Err(ConvertError::InvalidColor { option, .. }) => assert_eq!(option, "background"),
        other => panic!("期望 InvalidColor，实际 {other:?}"),
    }
}

#[test]
fn unrecoverable_document_is_reported_with_its_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write_input(
        dir.path(),
        "corrupt.dxf",
        "0\nSECTION\n2\nENTITIES\n0\nCIRCLE\n8\n0\n10\nxx\n20\n0\n40\n1\n0\nENDSEC\n0\nEOF\n",
    );
    let output = dir.path().join("corrupt.svg");
    match convert(&ConversionRequest::new(&input, &output)) {
        Err(ConvertError::Io(IoError::DocumentUnrecoverable { path, errors, .. })) => {
            assert_eq!(path, input);
            assert_eq!(errors, 1);
        }
        other => panic!("期望 DocumentUnrecoverable，实际 {other:?}"),
    }
    assert!(!output.exists());
}
