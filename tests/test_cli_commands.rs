//! Black-box tests of the `degenscore` binary.

mod common;

use common::{fixture_path, run_cli};

const FAST: &[&str] = &[
    "--step-interval",
    "1ms",
    "--score-step-interval",
    "1ms",
    "--completion-delay",
    "0s",
];

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn run_args<'a>(extra: &[&'a str]) -> Vec<&'a str> {
    let mut args = vec!["run"];
    args.extend_from_slice(FAST);
    args.extend_from_slice(extra);
    args
}

// ============================================================================
// version
// ============================================================================

#[test]
fn version_human() {
    let output = run_cli(&["version"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.starts_with("degenscore "), "unexpected output: {out}");
    assert!(out.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn version_json() {
    let output = run_cli(&["version", "--format", "json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["name"], "degenscore");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

// ============================================================================
// validate
// ============================================================================

#[test]
fn validate_accepts_fixture() {
    let path = fixture_path("fast_flow.yaml");
    let output = run_cli(&["validate", path.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains(": valid"));
}

#[test]
fn validate_json_lists_stages() {
    let path = fixture_path("custom_targets.yaml");
    let output = run_cli(&["validate", path.to_str().unwrap(), "--format", "json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["valid"], true);
    assert_eq!(
        json["stages"],
        serde_json::json!(["twitter", "telegram", "wallet"])
    );
    assert_eq!(json["warnings"].as_array().map(Vec::len), Some(1));
}

#[test]
fn validate_rejects_invalid_fixture() {
    let path = fixture_path("invalid_flow.yaml");
    let output = run_cli(&["validate", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    let err = stderr(&output);
    assert!(err.contains(": invalid"));
    assert!(err.contains("stages[0].target_score"));
    assert!(err.contains("Stage 'twitter' is configured more than once"));
}

#[test]
fn validate_json_reports_errors() {
    let path = fixture_path("invalid_flow.yaml");
    let output = run_cli(&["validate", path.to_str().unwrap(), "--format", "json"]);
    assert_eq!(output.status.code(), Some(2));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["valid"], false);
    assert_eq!(json["errors"].as_array().map(Vec::len), Some(4));
}

#[test]
fn validate_malformed_yaml() {
    let path = fixture_path("malformed.yaml");
    let output = run_cli(&["validate", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("parse error"));
}

#[test]
fn validate_missing_file() {
    let output = run_cli(&["validate", "/nonexistent/flow.yaml"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("file not found"));
}

// ============================================================================
// run + scorecard
// ============================================================================

#[test]
fn run_prints_json_scorecard() {
    let output = run_cli(&run_args(&["--quiet", "--format", "json"]));
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let card: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(card["total"], 810);
    assert_eq!(card["percentile"], 81);
    assert_eq!(card["rank"], 6);
    assert_eq!(card["badge"], "Degen Master");
    assert_eq!(card["scores"]["wallet"], 6750);
}

#[test]
fn run_prints_human_scorecard() {
    let output = run_cli(&run_args(&[]));
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Degen Score: 810 / 1000  [Degen Master]"));
    assert!(out.contains("Rank #6"));
    let err = stderr(&output);
    assert!(err.contains("Wallet score: 6750"), "stderr: {err}");
}

#[test]
fn run_writes_events_file() {
    let dir = tempfile::tempdir().unwrap();
    let events = dir.path().join("events.jsonl");
    let output = run_cli(&run_args(&["--quiet", "--events", events.to_str().unwrap()]));
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let content = std::fs::read_to_string(&events).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.first().map(|e| e["type"].clone()), Some("FlowStarted".into()));
    assert_eq!(lines.last().map(|e| e["type"].clone()), Some("FlowFinished".into()));
    assert_eq!(lines.last().map(|e| e["total"].clone()), Some(810.into()));

    for (i, event) in lines.iter().enumerate() {
        assert_eq!(event["sequence"], i as u64);
    }
    let connected = lines
        .iter()
        .filter(|e| e["type"] == "StageConnected")
        .count();
    assert_eq!(connected, 3);
    assert!(lines.iter().any(|e| e["type"] == "AccountConnected"));
}

#[test]
fn stored_flow_feeds_scorecard_command() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("flow.json");
    let store_arg = store.to_str().unwrap();

    let output = run_cli(&run_args(&["--quiet", "--store", store_arg]));
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = run_cli(&["scorecard", "--store", store_arg, "--format", "json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let card: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(card["total"], 810);

    // A second run restores every stage instead of scanning again.
    let output = run_cli(&run_args(&["--store", store_arg]));
    assert!(output.status.success());
    assert!(stderr(&output).contains("Wallet already connected (6750)"));
}

#[test]
fn reset_forgets_stored_stages() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("flow.json");
    let store_arg = store.to_str().unwrap();

    assert!(run_cli(&run_args(&["--quiet", "--store", store_arg])).status.success());
    let output = run_cli(&run_args(&["--store", store_arg, "--reset"]));
    assert!(output.status.success());
    let err = stderr(&output);
    assert!(!err.contains("already connected"), "stderr: {err}");
    assert!(err.contains("Scanning Twitter"));
}

#[test]
fn scorecard_on_incomplete_store_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("empty.json");
    let output = run_cli(&["scorecard", "--store", store.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(6));
    assert!(stderr(&output).contains("connect twitter first"));
}

#[test]
fn unknown_provider_exits_with_connect_error() {
    let output = run_cli(&run_args(&["--quiet", "--provider", "metamsk"]));
    assert_eq!(output.status.code(), Some(7));
    assert!(stderr(&output).contains("did you mean 'metamask'?"));
}

#[test]
fn run_rejects_invalid_config() {
    let path = fixture_path("invalid_flow.yaml");
    let output = run_cli(&run_args(&["--quiet", "--config", path.to_str().unwrap()]));
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn run_with_custom_config() {
    let path = fixture_path("custom_targets.yaml");
    let output = run_cli(&[
        "run",
        "--quiet",
        "--format",
        "json",
        "--config",
        path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let card: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(card["total"], 1000);
    assert_eq!(card["badge"], "Alpha Finder");
}

#[test]
fn json_logs_are_one_object_per_line() {
    let output = run_cli(&run_args(&["-v", "--log-format", "json", "--format", "json"]));
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let logs: Vec<serde_json::Value> = stderr(&output)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert!(
        logs.iter()
            .any(|l| l["fields"]["message"] == "sequence started")
    );
    assert!(logs.iter().all(|l| l["level"] != "DEBUG"));
}

#[test]
fn partial_flow_store_feeds_scorecard_command() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("flow.json");
    let store_arg = store.to_str().unwrap();
    let config = fixture_path("partial_flow.yaml");

    let output = run_cli(&[
        "run",
        "--quiet",
        "--config",
        config.to_str().unwrap(),
        "--store",
        store_arg,
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = run_cli(&["scorecard", "--store", store_arg, "--format", "json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let card: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(card["total"], (5250 + 6750) / 20);
    assert_eq!(card["scores"]["twitter"], 0);
}

#[test]
fn oversized_interval_override_rejected() {
    let output = run_cli(&["run", "--quiet", "--step-interval", "2h"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("validation failed for <command line>"));
}

#[test]
fn reset_recovers_corrupt_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("flow.json");
    std::fs::write(&store, r#"{"degenscore.context": "{not json"}"#).unwrap();
    let store_arg = store.to_str().unwrap();

    let output = run_cli(&run_args(&["--quiet", "--store", store_arg]));
    assert_eq!(output.status.code(), Some(6), "stderr: {}", stderr(&output));

    let output = run_cli(&run_args(&["--quiet", "--store", store_arg, "--reset"]));
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let output = run_cli(&["scorecard", "--store", store_arg, "--format", "json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
}
