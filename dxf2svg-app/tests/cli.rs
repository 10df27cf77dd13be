use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const HEALTHY: &str = "0\nSECTION\n2\nENTITIES\n\
0\nLINE\n8\nA\n10\n0\n20\n0\n11\n40\n21\n30\n\
0\nENDSEC\n0\nEOF\n";

const BROKEN: &str = "0\nSECTION\n2\nENTITIES\n\
0\nLINE\n8\nA\n10\n0\n20\n0\n11\n40\n21\n30\n\
0\nCIRCLE\n8\nB\n10\n0\n20\n0\n40\n-1\n\
0\nENDSEC\n0\nEOF\n";

fn dxf2svg(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dxf2svg").expect("binary built");
    cmd.current_dir(workdir)
        .env_remove("DXF2SVG_CONFIG")
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn converts_and_exits_zero() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("plan.dxf"), HEALTHY).expect("input");

    dxf2svg(dir.path())
        .args(["plan.dxf", "out/plan.svg", "--background", "#ffffff"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let svg = fs::read_to_string(dir.path().join("out/plan.svg")).expect("svg");
    assert!(svg.contains("width=\"40mm\" height=\"30mm\""));
    assert!(svg.contains("fill=\"#ffffff\""));
}

#[test]
fn render_failure_prints_text_report_and_leaves_no_output() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("broken.dxf"), BROKEN).expect("input");
    fs::write(dir.path().join("broken.svg"), "stale").expect("stale output");

    dxf2svg(dir.path())
        .args(["broken.dxf", "broken.svg"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("DXF conversion failed:"))
        .stderr(predicate::str::contains("[正常] A"))
        .stderr(predicate::str::contains("[失败] B"));
    assert!(!dir.path().join("broken.svg").exists());
}

#[test]
fn json_report_format_is_honoured() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("broken.dxf"), BROKEN).expect("input");

    dxf2svg(dir.path())
        .args(["broken.dxf", "broken.svg", "--report-format", "json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("\"status\": \"failed\""));
}

#[test]
fn unknown_layout_and_bad_colors_fail() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("plan.dxf"), HEALTHY).expect("input");

    dxf2svg(dir.path())
        .args(["plan.dxf", "plan.svg", "--layout", "NoSuchLayout"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("NoSuchLayout"));

    dxf2svg(dir.path())
        .args(["plan.dxf", "plan.svg", "--line-color", "white"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("DXF conversion failed:"));
    assert!(!dir.path().join("plan.svg").exists());
}

#[test]
fn configuration_file_supplies_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("plan.dxf"), HEALTHY).expect("input");
    fs::create_dir(dir.path().join("config")).expect("config dir");
    fs::write(
        dir.path().join("config/dxf2svg.toml"),
        "[render]\nline_color = \"#123456\"\n",
    )
    .expect("config");

    dxf2svg(dir.path())
        .args(["plan.dxf", "plan.svg"])
        .assert()
        .success();
    let svg = fs::read_to_string(dir.path().join("plan.svg")).expect("svg");
    assert!(svg.contains("stroke=\"#123456\""));
}

#[test]
fn missing_arguments_exit_non_zero() {
    let dir = tempfile::tempdir().expect("temp dir");
    dxf2svg(dir.path()).arg("only-input.dxf").assert().failure();
}
