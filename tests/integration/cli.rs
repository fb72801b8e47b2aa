//! Binary-level tests driving the tracelens CLI against real archives.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};

use super::common::fixtures::{five_step_trace, page_tree, TraceBuilder};

fn tracelens() -> Command {
    Command::cargo_bin("tracelens").expect("binary builds")
}

#[test]
fn show_renders_action_table() {
    let path = five_step_trace();
    tracelens()
        .arg("show")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("goto"))
        .stdout(predicate::str::contains("expect"))
        .stdout(predicate::str::contains("✗"))
        .stdout(predicate::str::contains("Timeout 5000ms exceeded"))
        .stdout(predicate::str::contains("Result: FAILED"));
}

#[test]
fn show_json_is_machine_readable() {
    let path = five_step_trace();
    let output = tracelens()
        .arg("show")
        .arg(&path)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["result"], "FAILED");
    assert_eq!(parsed["actions"].as_array().unwrap().len(), 5);
    assert_eq!(parsed["actions"][3]["status"], "failed");
    assert_eq!(parsed["actions"][0]["step"], 1);
}

#[test]
fn summary_reports_failure_step_and_counts() {
    let path = five_step_trace();
    tracelens()
        .arg("summary")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("FAILED at step 4"))
        .stdout(predicate::str::contains("1 errors"));
}

#[test]
fn step_shows_error_and_nearby_console_output() {
    let path = five_step_trace();
    tracelens()
        .args(["step"])
        .arg(&path)
        .arg("4")
        .assert()
        .success()
        .stdout(predicate::str::contains("Status:   FAILED"))
        .stdout(predicate::str::contains("Timeout 5000ms exceeded"))
        .stdout(predicate::str::contains("Uncaught TypeError: boom"));
}

#[test]
fn step_out_of_range_fails_cleanly() {
    let path = five_step_trace();
    tracelens()
        .arg("step")
        .arg(&path)
        .arg("12")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Step 12 not found"));
}

#[test]
fn console_level_filter_is_a_threshold() {
    let path = five_step_trace();
    tracelens()
        .arg("console")
        .arg(&path)
        .args(["--level", "error"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uncaught TypeError"))
        .stdout(predicate::str::contains("page loaded").not());
}

#[test]
fn dom_renders_resolved_snapshot() {
    let path = TraceBuilder::new()
        .event(json!({
            "type": "before", "callId": "call@9", "method": "click",
            "startTime": 100.0, "beforeSnapshot": "before@call@9",
        }))
        .event(json!({"type": "after", "callId": "call@9", "endTime": 160.0}))
        .snapshot("before@call@9", 100.0, page_tree())
        .write();
    tracelens()
        .arg("dom")
        .arg(&path)
        .args(["--step", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<button id=\"submit\""))
        .stdout(predicate::str::contains("Submit"));
}

#[test]
fn dom_interactive_lists_controls_but_not_plain_anchors() {
    let path = TraceBuilder::new()
        .event(json!({
            "type": "before", "callId": "call@9", "method": "click",
            "startTime": 100.0, "beforeSnapshot": "before@call@9",
        }))
        .event(json!({"type": "after", "callId": "call@9", "endTime": 160.0}))
        .snapshot(
            "before@call@9",
            100.0,
            json!(["HTML", {}, ["BODY", {},
                ["BUTTON", {"id": "go"}, "Go"],
                ["A", {}, "no href"],
                ["A", {"href": "/x"}, "linked"],
            ]]),
        )
        .write();
    let output = tracelens()
        .arg("dom")
        .arg(&path)
        .args(["--step", "1", "--interactive"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Found 2 interactive element(s)"));
}

#[test]
fn network_table_redacts_sensitive_headers() {
    let path = TraceBuilder::new()
        .action("c1", "goto", 1.0, 2.0)
        .network_event(json!({
            "type": "resource-snapshot",
            "snapshot": {
                "request": {
                    "url": "http://localhost:3000/api/login",
                    "method": "POST",
                    "headers": {"Authorization": "Bearer hunter2", "Accept": "application/json"},
                },
                "response": {"status": 401, "headers": {}},
                "time": 42.0,
            },
        }))
        .write();
    let output = tracelens()
        .arg("network")
        .arg(&path)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: Value = serde_json::from_slice(&output.stdout).unwrap();
    let request_headers = &parsed[0]["request_headers"];
    assert_eq!(request_headers["Authorization"], "<redacted>");
    assert_eq!(request_headers["Accept"], "application/json");
    assert!(!String::from_utf8_lossy(&output.stdout).contains("hunter2"));
}

#[test]
fn screenshot_list_shows_position_relative_to_step() {
    let path = TraceBuilder::new()
        .with_context(1_700_000_000_000.0)
        .action("c1", "click", 100.0, 200.0)
        .entry("resources/page@abc-1700000000150.jpeg", b"tiny")
        .write();
    tracelens()
        .arg("screenshot")
        .arg(&path)
        .args(["--step", "1", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("During this step"));
}

#[test]
fn missing_trace_file_reports_not_found() {
    tracelens()
        .arg("summary")
        .arg("/no/such/trace.zip")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn ceiling_flags_reach_the_archive_reader() {
    let path = five_step_trace();
    tracelens()
        .arg("summary")
        .arg(&path)
        .args(["--max-entries", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("entries"));
}

#[test]
fn control_sequences_never_reach_stdout() {
    let path = TraceBuilder::new()
        .action("c1", "goto", 1.0, 2.0)
        .console("error", 1.5, "\u{1b}[31mred alert\u{1b}[0m and \u{7}bell")
        .write();
    let output = tracelens().arg("console").arg(&path).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("red alert"));
    assert!(!stdout.contains('\u{1b}'));
    assert!(!stdout.contains('\u{7}'));
}
