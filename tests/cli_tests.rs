//! End-to-end tests for the butterfly-batch binary

use std::io::Write;
use std::process::{Command, Output, Stdio};

use tempfile::NamedTempFile;

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_butterfly-batch"))
}

fn input_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

fn run_with_stdin(args: &[&str], stdin: &str) -> Output {
    let mut child = binary()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn butterfly-batch");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait for butterfly-batch")
}

fn parse_points(output: &Output) -> Vec<[f64; 2]> {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is a JSON line")
}

#[test]
fn test_simplify_file() {
    let file = input_file("[[0.0, 0.0], [0.0, 1.0], [0.0, 2.0]]");
    let output = binary()
        .args(["simplify", file.path().to_str().unwrap(), "--epsilon", "0.1"])
        .output()
        .unwrap();
    assert_eq!(parse_points(&output), vec![[0.0, 0.0], [0.0, 2.0]]);
}

#[test]
fn test_simplify_stdin() {
    let output = run_with_stdin(
        &["simplify", "-", "--epsilon", "0.5"],
        "[[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]]",
    );
    assert_eq!(parse_points(&output).len(), 3);
}

#[test]
fn test_offset_sides() {
    let line = "[[0.0, 0.0], [0.01, 0.0]]";
    let left = parse_points(&run_with_stdin(
        &["offset", "-", "--distance", "10", "--side", "left"],
        line,
    ));
    let right = parse_points(&run_with_stdin(&["offset", "-", "--distance", "10"], line));

    assert_eq!(left.len(), 2);
    assert!(left[0][1] > 0.0);
    assert!(right[0][1] < 0.0);
}

#[test]
fn test_profile_flattened() {
    let file = input_file(
        r#"{ "id": "car", "key": "highway",
             "penalties": [ { "values": ["motorway", "trunk"], "weight": 1 } ],
             "default": 10, "accessTags": ["motorcar"] }"#,
    );
    let output = binary()
        .args(["profile", file.path().to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let profile: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(profile["penalties"]["trunk"], 1);
    assert_eq!(profile["default"], 10);
    assert_eq!(profile["accessTags"], serde_json::json!(["access", "motorcar"]));
}

#[test]
fn test_invalid_input_fails() {
    let output = run_with_stdin(&["simplify", "-", "--epsilon", "0.1"], "not json");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("[lon, lat]"));

    let output = binary()
        .args(["simplify", "/nonexistent/line.json", "--epsilon", "0.1"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
