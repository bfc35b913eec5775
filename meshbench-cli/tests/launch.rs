//! End-to-end tests that launch real process groups.
//!
//! Each test runs a tool binary the way a user would; the binary
//! re-executes itself once per rank and wires the pipe mesh between
//! the children.

use std::process::{Command, Output};

fn run_tool(bin: &str, args: &[&str]) -> Output {
    Command::new(bin).args(args).output().expect("tool launches")
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn stats_run_reports_on_root() {
    let output = run_tool(
        env!("CARGO_BIN_EXE_mesh-stats"),
        &["8", "--np", "4", "--seed", "7"],
    );
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Minimum:"));
    assert!(stdout.contains("Maximum:"));
    assert!(stdout.contains("Average:"));
}

#[test]
fn stats_json_summary_is_consistent() {
    let output = run_tool(
        env!("CARGO_BIN_EXE_mesh-stats"),
        &["12", "--np", "3", "--seed", "21", "--verify", "--json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));

    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("JSON summary on stdout");
    assert_eq!(summary["count"], 12);
    let min = summary["min"].as_f64().unwrap();
    let max = summary["max"].as_f64().unwrap();
    let avg = summary["avg"].as_f64().unwrap();
    assert!(min <= avg && avg <= max);
    assert!((0.0..100.0).contains(&min));
    assert!((0.0..100.0).contains(&max));
}

#[test]
fn stats_seed_makes_runs_reproducible() {
    let args = ["16", "--np", "2", "--seed", "5", "--json"];
    let first = run_tool(env!("CARGO_BIN_EXE_mesh-stats"), &args);
    let second = run_tool(env!("CARGO_BIN_EXE_mesh-stats"), &args);
    assert!(first.status.success(), "stderr: {}", stderr_of(&first));
    assert!(second.status.success(), "stderr: {}", stderr_of(&second));
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn stats_zero_elements_yields_zero_average() {
    let output = run_tool(
        env!("CARGO_BIN_EXE_mesh-stats"),
        &["0", "--np", "2", "--json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));

    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("JSON summary on stdout");
    assert_eq!(summary["count"], 0);
    assert_eq!(summary["avg"], 0.0);
}

#[test]
fn stats_uneven_split_fails_the_whole_group() {
    let output = run_tool(env!("CARGO_BIN_EXE_mesh-stats"), &["7", "--np", "2"]);
    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Average:"), "no results on a failed run");
    assert!(stderr_of(&output).contains("cannot be split evenly"));
}

#[test]
fn stats_rejects_missing_count() {
    let output = run_tool(env!("CARGO_BIN_EXE_mesh-stats"), &[]);
    assert!(!output.status.success());
}

#[test]
fn latency_reports_on_initiator() {
    let output = run_tool(
        env!("CARGO_BIN_EXE_mesh-latency"),
        &["200", "--np", "2", "--json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("JSON report on stdout");
    assert_eq!(report["iterations"], 200);
    assert_eq!(report["message_size"], 1);
    let rtt = report["avg_rtt_us"].as_f64().unwrap();
    let one_way = report["one_way_us"].as_f64().unwrap();
    assert!(rtt > 0.0);
    assert!((one_way - rtt / 2.0).abs() < 1e-12);
}

#[test]
fn latency_message_size_positional() {
    let output = run_tool(
        env!("CARGO_BIN_EXE_mesh-latency"),
        &["50", "4096", "--np", "2", "--json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("JSON report on stdout");
    assert_eq!(report["message_size"], 4096);
}

#[test]
fn latency_requires_two_ranks() {
    let output = run_tool(env!("CARGO_BIN_EXE_mesh-latency"), &["10", "--np", "3"]);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("requires exactly 2 ranks"));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("round-trip"), "no metrics on a failed run");
}

#[test]
fn latency_rejects_zero_iterations() {
    let output = run_tool(env!("CARGO_BIN_EXE_mesh-latency"), &["0", "--np", "2"]);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("iteration count must be positive"));
}

#[test]
fn latency_rejects_zero_message_size() {
    let output = run_tool(env!("CARGO_BIN_EXE_mesh-latency"), &["10", "0", "--np", "2"]);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("message size must be positive"));
}
