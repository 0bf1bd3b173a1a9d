mod common;
use common::*;

const BOX: &str = "template <class T> struct Box { T v; T w; };\nBox<int> b;\n";

#[test]
fn query_instances_prints_count() {
    let run = run_binary(BOX, &["--query-instances"]);
    assert_eq!(run.code, 0, "stderr: {}", run.stderr);
    assert_eq!(run.stdout.trim(), "Available transformation instances: 2");
}

#[test]
fn rewrite_goes_to_stdout() {
    let run = run_binary(BOX, &["--counter", "2"]);
    assert_eq!(run.code, 0, "stderr: {}", run.stderr);
    assert_eq!(run.stdout, "template <class T> struct Box { T v; int w; };\nBox<int> b;\n");
}

#[test]
fn rewrite_to_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.cc");
    let run = run_binary(BOX, &["--counter", "1", "-o", out.to_str().unwrap()]);
    assert_eq!(run.code, 0, "stderr: {}", run.stderr);
    assert!(run.stdout.is_empty());
    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("template <class T> struct Box { int v; T w; };"));
}

#[test]
fn out_of_range_exits_with_one() {
    let run = run_binary(BOX, &["--counter", "3"]);
    assert_eq!(run.code, 1);
    assert!(run.stdout.is_empty());
    assert!(run.stderr.contains("instance 3 requested but only 2 available"), "stderr: {}", run.stderr);
}

#[test]
fn zero_counter_is_a_configuration_error() {
    let run = run_binary(BOX, &["--counter", "0"]);
    assert_eq!(run.code, 2);
    assert!(run.stderr.contains("counter must be at least 1"));
}

#[test]
fn syntax_errors_exit_with_two() {
    let run = run_binary("template <class T> struct Box { T v;", &["--query-instances"]);
    assert_eq!(run.code, 2);
    assert!(run.stderr.contains("syntax error"), "stderr: {}", run.stderr);
}

#[test]
fn missing_file_exits_with_two() {
    let dir = tempfile::tempdir().unwrap();
    let run = run_binary_on(&dir.path().join("absent.cc"), &["--query-instances"]);
    assert_eq!(run.code, 2);
    assert!(run.stderr.contains("could not read"));
}

#[test]
fn post_edit_failure_exits_with_three() {
    let src = "template <class T> struct Box { typename T::type v; };\nBox<int> *p;\n";
    let run = run_binary(src, &["--counter", "1"]);
    assert_eq!(run.code, 3);
    assert!(run.stdout.is_empty());
    assert!(run.stderr.contains("cannot be used prior to '::'"), "stderr: {}", run.stderr);
}

#[test]
fn unknown_transformation_is_rejected() {
    let run = run_binary(BOX, &["--transformation", "rename-fun"]);
    assert_eq!(run.code, 2);
    assert!(run.stderr.contains("unknown transformation 'rename-fun'"));
}

#[test]
fn list_transformations_needs_no_file() {
    let output = cxxreduce().arg("--list-transformations").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("substitute-class-template-param: "));
}

#[test]
fn config_file_supplies_defaults_and_flags_win() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("input.cc");
    let cfg = dir.path().join("reduce.toml");
    std::fs::write(&src, BOX).unwrap();
    std::fs::write(&cfg, "[pass]\ncounter = 2\n").unwrap();

    let from_file = run_binary_on(&src, &["--config", cfg.to_str().unwrap()]);
    assert_eq!(from_file.code, 0, "stderr: {}", from_file.stderr);
    assert!(from_file.stdout.contains("{ T v; int w; }"));

    let overridden = run_binary_on(&src, &["--config", cfg.to_str().unwrap(), "--counter", "1"]);
    assert!(overridden.stdout.contains("{ int v; T w; }"));
}

#[test]
fn json_report_for_rewrite() {
    let run = run_binary(BOX, &["--counter", "1", "--format", "json"]);
    assert_eq!(run.code, 0, "stderr: {}", run.stderr);
    let report: serde_json::Value = serde_json::from_str(run.stdout.trim()).unwrap();
    assert_eq!(report["status"], "ok");
    assert_eq!(report["result"]["outcome"], "rewritten");
    assert_eq!(report["result"]["replacement"], "int");
    assert_eq!(report["location"]["line"], 1);
    assert_eq!(report["location"]["column"], 33);
    assert!(report["output"].as_str().unwrap().contains("{ int v; T w; }"));
}

#[test]
fn json_report_for_errors() {
    let run = run_binary(BOX, &["--counter", "9", "--format", "json"]);
    assert_eq!(run.code, 1);
    let report: serde_json::Value = serde_json::from_str(run.stdout.trim()).unwrap();
    assert_eq!(report["status"], "error");
    assert_eq!(report["kind"], "out_of_range");
}

#[test]
fn verbose_logging_goes_to_stderr() {
    let run = run_binary(BOX, &["--query-instances", "-v"]);
    assert_eq!(run.code, 0);
    assert_eq!(run.stdout.trim(), "Available transformation instances: 2");
    assert!(run.stderr.contains("candidate table built"), "stderr: {}", run.stderr);
}
