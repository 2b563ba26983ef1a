//! CLI replay integration tests
//!
//! These tests run the `dashkit` binary against scripts and fixtures written
//! to a temporary directory.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;

const FIXTURE: &str = r#"{
  "dashboards": [
    {
      "ref": {"identifier": "dashboard.sales"},
      "title": "Sales",
      "layout": {
        "sections": [
          {"items": [
            {"widget": {"ref": {"identifier": "w1"}, "title": "Revenue", "type": "kpi", "measure": {"identifier": "m.revenue"}}}
          ]}
        ]
      }
    }
  ],
  "displayForms": [
    {"ref": {"identifier": "label.region"}, "attribute": {"identifier": "attr.region"}, "title": "Region"}
  ]
}"#;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn dashkit(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dashkit"))
        .current_dir(dir.path())
        .env("DASHKIT_LOG_PROFILE", "test")
        .env_remove("DASHKIT_WORKSPACE")
        .env_remove("DASHKIT_DASHBOARD")
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

/// Event lines printed to stdout, parsed as JSON
fn event_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| line.starts_with('{'))
        .map(|line| serde_json::from_str(line).expect("Each event line should be JSON"))
        .collect()
}

fn script(commands: Value) -> String {
    serde_json::to_string_pretty(&commands).unwrap()
}

#[test]
fn test_replay_prints_started_and_terminal_events() {
    // GIVEN a fixture and a script initializing and renaming a dashboard
    let dir = TempDir::new().unwrap();
    let fixture = write(&dir, "fixture.json", FIXTURE);
    let script_path = write(
        &dir,
        "script.json",
        &script(json!([
            {"type": "GDC.DASH/CMD.INITIALIZE", "correlationId": "c1", "payload": {"dashboard": {"identifier": "dashboard.sales"}}},
            {"type": "GDC.DASH/CMD.RENAME", "correlationId": "c2", "payload": {"newTitle": "Regional sales"}}
        ])),
    );

    // WHEN the script is replayed
    let output = dashkit(
        &dir,
        &[
            "replay",
            script_path.to_str().unwrap(),
            "--fixture",
            fixture.to_str().unwrap(),
        ],
    );

    // THEN each command prints CommandStarted followed by its terminal event
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let types: Vec<_> = event_lines(&output)
        .iter()
        .map(|e| e["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        types,
        vec![
            "GDC.DASH/EVT.COMMAND.STARTED",
            "GDC.DASH/EVT.INITIALIZED",
            "GDC.DASH/EVT.COMMAND.STARTED",
            "GDC.DASH/EVT.RENAMED",
        ]
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Replayed 2 commands: 2 succeeded"));
}

#[test]
fn test_replay_prints_final_state() {
    let dir = TempDir::new().unwrap();
    let fixture = write(&dir, "fixture.json", FIXTURE);
    let script_path = write(
        &dir,
        "script.json",
        &script(json!([
            {"type": "GDC.DASH/CMD.INITIALIZE", "payload": {"dashboard": {"identifier": "dashboard.sales"}}},
            {"type": "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.ADD", "payload": {"displayForm": {"identifier": "label.region"}, "index": -1}}
        ])),
    );

    let output = dashkit(
        &dir,
        &[
            "replay",
            script_path.to_str().unwrap(),
            "--fixture",
            fixture.to_str().unwrap(),
            "--print-state",
        ],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"title\": \"Region\""));
    assert!(stdout.contains("\"title\": \"Sales\""));
}

#[test]
fn test_strict_replay_fails_on_rejected_command() {
    // GIVEN a script with a command type this build does not handle
    let dir = TempDir::new().unwrap();
    let script_path = write(
        &dir,
        "script.json",
        &script(json!([
            {"type": "GDC.DASH/CMD.KPI_WIDGET.REFRESH", "payload": {"ref": {"identifier": "w1"}}}
        ])),
    );

    // WHEN replayed without and with --strict
    let lenient = dashkit(&dir, &["replay", script_path.to_str().unwrap()]);
    let strict = dashkit(&dir, &["replay", script_path.to_str().unwrap(), "--strict"]);

    // THEN the rejection is printed, and only strict mode exits with failure
    assert!(lenient.status.success());
    let events = event_lines(&lenient);
    assert_eq!(events.last().unwrap()["type"], "GDC.DASH/EVT.COMMAND.REJECTED");
    assert!(!strict.status.success());
}

#[test]
fn test_malformed_script_entry_aborts_before_running() {
    let dir = TempDir::new().unwrap();
    let script_path = write(
        &dir,
        "script.json",
        &script(json!([
            {"type": "GDC.DASH/CMD.RENAME", "payload": {"newTitle": "Fine"}},
            {"type": "GDC.DASH/CMD.RENAME", "payload": {"title": 42}}
        ])),
    );

    let output = dashkit(&dir, &["replay", script_path.to_str().unwrap()]);

    assert!(!output.status.success());
    assert!(event_lines(&output).is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("command #1"));
}

#[test]
fn test_commands_listing_marks_rejected_types() {
    let dir = TempDir::new().unwrap();

    let output = dashkit(&dir, &["commands", "--json"]);

    assert!(output.status.success());
    let listing: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    let status_of = |command_type: &str| {
        listing
            .iter()
            .find(|e| e["type"] == command_type)
            .map(|e| e["handled"].as_bool().unwrap())
    };
    assert_eq!(status_of("GDC.DASH/CMD.RENAME"), Some(true));
    assert_eq!(status_of("GDC.DASH/CMD.KPI_WIDGET.REFRESH"), Some(false));
}
