//! Full load path: archive in, reconstructed actions and metadata out.

use super::common::fixtures::{five_step_trace, TraceBuilder};
use serde_json::json;
use tracelens::{ArchiveLimits, Trace, TraceError};

#[test]
fn every_step_number_resolves_to_an_action() {
    let path = five_step_trace();
    let trace = Trace::load(&path, ArchiveLimits::default()).unwrap();

    assert_eq!(trace.actions().len(), 5);
    for step in 1..=trace.actions().len() {
        let action = trace.action(step).expect("step in range");
        assert!((action.duration - (action.end_time - action.start_time)).abs() < f64::EPSILON);
        assert!(action.duration >= 0.0);
    }
    assert!(trace.action(0).is_none());
    assert!(trace.action(6).is_none());
}

#[test]
fn five_step_trace_matches_expected_shape() {
    let path = five_step_trace();
    let trace = Trace::load(&path, ArchiveLimits::default()).unwrap();

    let failed = trace.failed_actions();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].method, "expect");
    assert_eq!(trace.first_failed_step(), Some(4));

    // max(end) - min(start) across the five pairs.
    assert!((trace.total_duration() - (5700.0 - 10.0)).abs() < f64::EPSILON);
}

#[test]
fn action_order_follows_before_event_file_order() {
    // Afters arrive out of order; the befores decide the sequence.
    let path = TraceBuilder::new()
        .event(json!({"type": "before", "callId": "c1", "method": "goto", "startTime": 1.0}))
        .event(json!({"type": "before", "callId": "c2", "method": "click", "startTime": 2.0}))
        .event(json!({"type": "after", "callId": "c2", "endTime": 4.0}))
        .event(json!({"type": "after", "callId": "c1", "endTime": 3.0}))
        .write();
    let trace = Trace::load(&path, ArchiveLimits::default()).unwrap();

    let methods: Vec<&str> = trace.actions().iter().map(|a| a.method.as_str()).collect();
    assert_eq!(methods, ["goto", "click"]);
}

#[test]
fn trace_with_no_errors_has_no_failed_actions() {
    let path = TraceBuilder::new()
        .action("c1", "goto", 1.0, 2.0)
        .action("c2", "click", 3.0, 4.0)
        .write();
    let trace = Trace::load(&path, ArchiveLimits::default()).unwrap();
    assert!(trace.failed_actions().is_empty());
    assert!(trace.first_failed_step().is_none());
}

#[test]
fn empty_trace_has_zero_total_duration() {
    let path = TraceBuilder::new().with_context(0.0).write();
    let trace = Trace::load(&path, ArchiveLimits::default()).unwrap();
    assert!(trace.actions().is_empty());
    assert_eq!(trace.total_duration(), 0.0);
}

#[test]
fn missing_log_entry_is_fatal() {
    let path = TraceBuilder::new()
        .without_log()
        .entry("resources/page.jpeg", b"not really a jpeg")
        .write();
    let err = Trace::load(&path, ArchiveLimits::default()).err().unwrap();
    assert!(matches!(err, TraceError::MissingLog));
}

#[test]
fn empty_log_entry_is_fatal() {
    let path = TraceBuilder::new().write();
    let err = Trace::load(&path, ArchiveLimits::default()).err().unwrap();
    assert!(matches!(err, TraceError::MissingLog));
}

#[test]
fn malformed_lines_are_counted_not_fatal() {
    let path = TraceBuilder::new()
        .raw_line("{ this is not json")
        .action("c1", "goto", 1.0, 2.0)
        .raw_line("also not json")
        .write();
    let trace = Trace::load(&path, ArchiveLimits::default()).unwrap();
    assert_eq!(trace.skipped_lines(), 2);
    assert_eq!(trace.actions().len(), 1);
}

#[test]
fn run_metadata_comes_from_context_options() {
    let path = five_step_trace();
    let trace = Trace::load(&path, ArchiveLimits::default()).unwrap();

    let meta = trace.metadata();
    assert_eq!(meta.browser_name.as_deref(), Some("chromium"));
    assert_eq!(meta.base_url.as_deref(), Some("http://localhost:3000"));
    let viewport = meta.viewport.unwrap();
    assert_eq!((viewport.width, viewport.height), (1280, 720));
    assert_eq!(meta.wall_time, Some(1_700_000_000_000.0));
}

#[test]
fn screenshots_parse_filename_timestamps() {
    let path = TraceBuilder::new()
        .action("c1", "goto", 1.0, 2.0)
        .entry("resources/page@abc-1700000000123.jpeg", b"fake")
        .entry("resources/page@abc-1700000000456.png", b"fake")
        .entry("resources/odd-name.jpeg", b"fake")
        .entry("resources/body.json", b"{}")
        .write();
    let trace = Trace::load(&path, ArchiveLimits::default()).unwrap();

    let shots = trace.screenshots();
    assert_eq!(shots.len(), 3);
    assert_eq!(shots[0].timestamp, Some(1_700_000_000_123.0));
    assert_eq!(shots[1].timestamp, Some(1_700_000_000_456.0));
    assert_eq!(shots[2].timestamp, None);
}

#[test]
fn nested_groups_resolve_titles_and_depths() {
    let path = TraceBuilder::new()
        .event(json!({
            "type": "before", "callId": "g1", "method": "tracingGroup",
            "title": "Navigate and verify", "startTime": 1.0,
            "stack": [{"file": "login.spec.ts", "line": 12, "column": 5}],
        }))
        .event(json!({
            "type": "before", "callId": "a1", "method": "goto",
            "parentId": "g1", "startTime": 2.0,
        }))
        .event(json!({
            "type": "before", "callId": "g2", "method": "tracingGroup",
            "title": "Verify header text", "parentId": "g1", "startTime": 3.0,
        }))
        .event(json!({
            "type": "before", "callId": "a2", "method": "expect",
            "parentId": "g2", "startTime": 4.0,
        }))
        .event(json!({"type": "after", "callId": "a2", "endTime": 5.0}))
        .event(json!({"type": "after", "callId": "g2", "endTime": 6.0}))
        .event(json!({"type": "after", "callId": "a1", "endTime": 7.0}))
        .event(json!({"type": "after", "callId": "g1", "endTime": 8.0}))
        .write();
    let trace = Trace::load(&path, ArchiveLimits::default()).unwrap();

    let actions = trace.actions();
    assert_eq!(actions.len(), 4);

    assert_eq!(actions[0].step_title.as_deref(), Some("Navigate and verify"));
    assert_eq!(actions[0].nesting_depth, 0);
    assert_eq!(
        actions[0]
            .source_location
            .as_ref()
            .and_then(|f| f.file.as_deref()),
        Some("login.spec.ts")
    );

    assert_eq!(actions[1].step_title.as_deref(), Some("Navigate and verify"));
    assert_eq!(actions[1].nesting_depth, 1);

    assert_eq!(actions[2].step_title.as_deref(), Some("Verify header text"));
    assert_eq!(actions[2].nesting_depth, 1);

    assert_eq!(actions[3].step_title.as_deref(), Some("Verify header text"));
    assert_eq!(actions[3].nesting_depth, 2);
}
