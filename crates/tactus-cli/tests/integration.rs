//! Integration tests for tactus-cli.
//!
//! Runs the `tactus` binary built by cargo and checks its output.

use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

/// Helper to get the path to the `tactus` binary built by cargo.
fn tactus_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tactus"))
}

fn run(args: &[&str]) -> Output {
    tactus_bin()
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run tactus")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ---------------------------------------------------------------------------
// `tactus order`
// ---------------------------------------------------------------------------

#[test]
fn cli_order_linear_chain() {
    let output = run(&["order", "osc>filter, filter>out"]);
    assert!(output.status.success());

    let text = stdout(&output);
    let osc = text.find("1. osc").expect("osc first");
    let filter = text.find("2. filter <- osc").expect("filter second");
    let out = text.find("3. out <- filter").expect("out third");
    assert!(osc < filter && filter < out);
    assert!(text.contains("Skipped back-edges: 0"));
}

#[test]
fn cli_order_cycle_is_skipped() {
    let output = run(&["order", "--json", "a>b>a"]);
    assert!(output.status.success());

    let report = json(&output);
    assert_eq!(report["skipped_back_edges"], 1);
    let names: Vec<&str> = report["order"]
        .as_array()
        .unwrap()
        .iter()
        .map(|node| node["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["a", "b"]);
}

#[test]
fn cli_order_reject_cycles() {
    let output = run(&["order", "--reject-cycles", "a>b, b>c, c>a"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Rejected (closes a cycle): c>a"), "got: {text}");
    assert!(text.contains("Skipped back-edges: 0"));
}

#[test]
fn cli_order_disabled_node() {
    let output = run(&["order", "--disable", "fx", "in>fx>out"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("fx [DISABLED]"));
}

#[test]
fn cli_order_rejects_bad_edge_list() {
    let output = run(&["order", "a>"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid chain"));
}

// ---------------------------------------------------------------------------
// `tactus simulate`
// ---------------------------------------------------------------------------

#[test]
fn cli_simulate_json_report() {
    let output = run(&[
        "simulate",
        "--preset",
        "default",
        "-n",
        "200",
        "--mutate-ms",
        "1",
        "--json",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report = json(&output);
    assert_eq!(report["callbacks"], 200);
    assert_eq!(report["clock"]["buffer_size"], 512);
    assert_eq!(report["clock"]["sample_position"], 200 * 512);
    assert_eq!(report["safety"]["total_checks"], 200);
    assert_eq!(report["graph"]["skipped_back_edges"], 0);
    assert!(report["graph"]["nodes"].as_u64().unwrap() >= 6);
}

#[test]
fn cli_simulate_drift_triggers_corrections() {
    let output = run(&[
        "simulate",
        "--preset",
        "default",
        "-n",
        "400",
        "--jitter-us",
        "0",
        "--drift-ppm",
        "500",
        "--mutate-ms",
        "0",
        "--json",
    ]);
    assert!(output.status.success());

    let report = json(&output);
    assert!(report["clock"]["correction_count"].as_u64().unwrap() > 0);
}

#[test]
fn cli_simulate_feedback_cycle() {
    let output = run(&[
        "simulate",
        "--preset",
        "low-latency",
        "-n",
        "50",
        "--cycle",
        "--mutate-ms",
        "0",
        "--json",
    ]);
    assert!(output.status.success());

    let report = json(&output);
    assert_eq!(report["graph"]["skipped_back_edges"], 1);
    assert_eq!(report["graph"]["connections"], 6);
    assert_eq!(report["clock"]["buffer_size"], 64);
}

#[test]
fn cli_simulate_text_report() {
    let output = run(&["simulate", "--preset", "default", "-n", "20", "--bpm", "90"]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("Simulated 20 callbacks"), "got: {text}");
    assert!(text.contains("90.0 BPM"), "got: {text}");
    assert!(text.contains("Safety:"));
}

// ---------------------------------------------------------------------------
// `tactus config`
// ---------------------------------------------------------------------------

#[test]
fn cli_config_init_show_validate() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    let path_str = path.to_str().unwrap();

    let output = run(&["config", "init", "--path", path_str, "--preset", "high-precision"]);
    assert!(output.status.success());
    assert!(path.exists());

    let again = run(&["config", "init", "--path", path_str]);
    assert!(!again.status.success(), "init must not overwrite without --force");

    let show = run(&["config", "show", "--config", path_str]);
    assert!(show.status.success());
    let text = stdout(&show);
    assert!(text.contains("[audio]"));
    assert!(text.contains("buffer_size = 1024"), "got: {text}");

    let validate = run(&["config", "validate", "--config", path_str]);
    assert!(validate.status.success());
    assert!(stdout(&validate).contains("Configuration is valid."));
}

#[test]
fn cli_config_validate_lists_issues() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[audio]\nbuffer_size = 4\n\n[clock]\nbpm = 500.0\n").unwrap();

    let output = run(&["config", "validate", "--config", path.to_str().unwrap()]);
    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("2 issue(s)"), "got: {text}");
    assert!(text.contains("audio.buffer_size"));
    assert!(text.contains("clock.bpm"));
}

#[test]
fn cli_simulate_uses_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "[audio]\nsample_rate = 44100.0\nbuffer_size = 441\n").unwrap();

    let output = run(&[
        "simulate",
        "--config",
        path.to_str().unwrap(),
        "-n",
        "10",
        "--mutate-ms",
        "0",
        "--json",
    ]);
    assert!(output.status.success());
    let report = json(&output);
    assert_eq!(report["clock"]["sample_rate"], 44100.0);
    assert_eq!(report["clock"]["sample_position"], 4410);
    let budget = report["performance"]["budget_us"].as_f64().unwrap();
    assert!((budget - 10000.0).abs() < 1e-6, "budget {budget}");
}
