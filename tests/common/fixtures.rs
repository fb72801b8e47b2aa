//! Trace archive fixture builder.

use std::io::Write;

use serde_json::{json, Value};
use tempfile::TempPath;
use zip::write::FileOptions;
use zip::ZipWriter;

/// Builds a trace archive line by line and writes it as a real zip file.
#[derive(Default)]
pub struct TraceBuilder {
    events: Vec<String>,
    network: Vec<String>,
    extras: Vec<(String, Vec<u8>)>,
    omit_log: bool,
}

impl TraceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard run header with a chromium context.
    pub fn with_context(self, wall_time: f64) -> Self {
        self.event(json!({
            "type": "context-options",
            "browserName": "chromium",
            "wallTime": wall_time,
            "monotonicTime": 0.0,
            "options": {
                "viewport": {"width": 1280, "height": 720},
                "baseURL": "http://localhost:3000",
            },
        }))
    }

    pub fn event(mut self, value: Value) -> Self {
        self.events.push(value.to_string());
        self
    }

    /// A verbatim line, for malformed-input tests.
    pub fn raw_line(mut self, line: &str) -> Self {
        self.events.push(line.to_string());
        self
    }

    /// A matched before/after pair for a passing call.
    pub fn action(self, call_id: &str, method: &str, start: f64, end: f64) -> Self {
        self.event(json!({
            "type": "before",
            "callId": call_id,
            "method": method,
            "startTime": start,
        }))
        .event(json!({
            "type": "after",
            "callId": call_id,
            "endTime": end,
        }))
    }

    /// A matched pair whose `after` carries an error payload.
    pub fn failed_action(self, call_id: &str, method: &str, start: f64, end: f64, message: &str) -> Self {
        self.event(json!({
            "type": "before",
            "callId": call_id,
            "method": method,
            "startTime": start,
        }))
        .event(json!({
            "type": "after",
            "callId": call_id,
            "endTime": end,
            "error": {"error": {"message": message}},
        }))
    }

    pub fn console(self, level: &str, time: f64, text: &str) -> Self {
        self.event(json!({
            "type": "console",
            "messageType": level,
            "time": time,
            "text": text,
        }))
    }

    pub fn snapshot(self, name: &str, timestamp: f64, html: Value) -> Self {
        self.event(json!({
            "type": "frame-snapshot",
            "snapshot": {
                "snapshotName": name,
                "frameUrl": "http://localhost:3000/",
                "timestamp": timestamp,
                "html": html,
            },
        }))
    }

    pub fn network_event(mut self, value: Value) -> Self {
        self.network.push(value.to_string());
        self
    }

    /// An arbitrary extra archive entry (screenshot bytes, response body).
    pub fn entry(mut self, name: &str, data: &[u8]) -> Self {
        self.extras.push((name.to_string(), data.to_vec()));
        self
    }

    /// Skip writing the trace.trace entry entirely.
    pub fn without_log(mut self) -> Self {
        self.omit_log = true;
        self
    }

    pub fn write(self) -> TempPath {
        let file = tempfile::NamedTempFile::new().expect("create temp file");
        let mut zip = ZipWriter::new(file.reopen().expect("reopen temp file"));

        if !self.omit_log {
            zip.start_file("trace.trace", FileOptions::default())
                .expect("start trace.trace");
            let mut log = self.events.join("\n");
            if !log.is_empty() {
                log.push('\n');
            }
            zip.write_all(log.as_bytes()).expect("write trace.trace");
        }

        if !self.network.is_empty() {
            zip.start_file("trace.network", FileOptions::default())
                .expect("start trace.network");
            let mut log = self.network.join("\n");
            log.push('\n');
            zip.write_all(log.as_bytes()).expect("write trace.network");
        }

        for (name, data) in &self.extras {
            zip.start_file(name, FileOptions::default())
                .expect("start extra entry");
            zip.write_all(data).expect("write extra entry");
        }

        zip.finish().expect("finish zip");
        file.into_temp_path()
    }
}

/// A DOM tree with real element content.
pub fn page_tree() -> Value {
    json!([
        "HTML",
        {},
        ["BODY", {},
            ["H1", {}, "Welcome"],
            ["BUTTON", {"id": "submit", "class": "btn btn-primary"}, "Submit"],
            ["A", {"href": "/docs"}, "Docs"],
            ["INPUT", {"type": "email", "name": "email"}],
        ],
    ])
}

/// A placeholder tree with no element content.
pub fn empty_tree() -> Value {
    json!(["HTML", {}])
}

/// A five-action login flow with one timed-out assertion.
pub fn five_step_trace() -> TempPath {
    TraceBuilder::new()
        .with_context(1_700_000_000_000.0)
        .action("call@1", "goto", 10.0, 250.0)
        .action("call@2", "click", 300.0, 350.0)
        .action("call@3", "fill", 400.0, 420.0)
        .failed_action("call@4", "expect", 500.0, 5500.0, "Timeout 5000ms exceeded")
        .action("call@5", "screenshot", 5600.0, 5700.0)
        .console("error", 510.0, "Uncaught TypeError: boom")
        .console("log", 20.0, "page loaded")
        .write()
}
