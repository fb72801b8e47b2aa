//! Typed model of the newline-delimited trace event log.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One decoded log record, discriminated by the wire `type` tag. Unknown
/// types are retained as [`TraceEvent::Raw`] for forward compatibility but
/// are never interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TraceEvent {
    ContextOptions(ContextOptionsEvent),
    Before(BeforeEvent),
    After(AfterEvent),
    Console(ConsoleEvent),
    FrameSnapshot(FrameSnapshotEvent),
    ResourceSnapshot(ResourceSnapshotEvent),
    Raw { data: Value },
}

/// Run metadata emitted once at context creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextOptionsEvent {
    pub browser_name: Option<String>,
    #[serde(default)]
    pub options: ContextOptions,
    pub wall_time: Option<f64>,
    pub monotonic_time: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextOptions {
    pub viewport: Option<Viewport>,
    #[serde(rename = "baseURL")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Call start. `call_id` is unique among `before` events in a well-formed
/// log; `parent_id` points at an enclosing call, enabling step-group
/// nesting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeforeEvent {
    pub call_id: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub start_time: f64,
    pub parent_id: Option<String>,
    pub title: Option<String>,
    pub stack: Option<Vec<StackFrame>>,
    pub before_snapshot: Option<String>,
}

/// Call end, matched to at most one `before` by equal `call_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AfterEvent {
    pub call_id: String,
    #[serde(default)]
    pub end_time: f64,
    pub error: Option<Value>,
    pub after_snapshot: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleEvent {
    #[serde(default)]
    pub message_type: String,
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSnapshotEvent {
    pub snapshot: FrameSnapshot,
}

/// DOM capture at one instant. `html` is the raw tree encoding: a string is
/// a text node, a two-element numeric pair is an opaque back-reference, and
/// `[tag, attrs, ...children]` is an element.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    pub snapshot_name: Option<String>,
    pub frame_url: Option<String>,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub html: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSnapshotEvent {
    pub snapshot: ResourceSnapshot,
}

/// One network request/response record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub request: Option<RequestInfo>,
    pub response: Option<ResponseInfo>,
    #[serde(default)]
    pub time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestInfo {
    pub url: Option<String>,
    pub method: Option<String>,
    #[serde(default)]
    pub headers: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseInfo {
    pub status: Option<u32>,
    #[serde(default)]
    pub headers: Map<String, Value>,
    pub content: Option<ResponseContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseContent {
    pub mime_type: Option<String>,
    #[serde(rename = "_sha1")]
    pub sha1: Option<String>,
}

/// First stack frame of a step group, used as its source location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackFrame {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub function: Option<String>,
}

/// Result of parsing an event log: the decoded events in file order plus a
/// count of lines that failed to decode.
#[derive(Debug, Default)]
pub struct ParsedEvents {
    pub events: Vec<TraceEvent>,
    pub skipped: usize,
}

/// Splits `text` on newlines and decodes each non-blank line as one event.
/// A line that fails to decode is dropped with a warning; one corrupt line
/// never invalidates the rest of the log.
pub fn parse_events(text: &str) -> ParsedEvents {
    let mut parsed = ParsedEvents::default();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                warn_skipped(line, &err.to_string());
                parsed.skipped += 1;
                continue;
            }
        };

        let Some(event_type) = value.get("type").and_then(Value::as_str).map(str::to_owned)
        else {
            warn_skipped(line, "missing type tag");
            parsed.skipped += 1;
            continue;
        };

        let event = match event_type.as_str() {
            "context-options" => serde_json::from_value(value).map(TraceEvent::ContextOptions),
            "before" => serde_json::from_value(value).map(TraceEvent::Before),
            "after" => serde_json::from_value(value).map(TraceEvent::After),
            "console" => serde_json::from_value(value).map(TraceEvent::Console),
            "frame-snapshot" => serde_json::from_value(value).map(TraceEvent::FrameSnapshot),
            "resource-snapshot" => serde_json::from_value(value).map(TraceEvent::ResourceSnapshot),
            _ => Ok(TraceEvent::Raw { data: value }),
        };

        match event {
            Ok(event) => parsed.events.push(event),
            Err(err) => {
                warn_skipped(line, &err.to_string());
                parsed.skipped += 1;
            }
        }
    }

    parsed
}

fn warn_skipped(line: &str, reason: &str) {
    let preview: String = line.chars().take(50).collect();
    tracing::warn!(line = %preview, reason, "failed to parse trace line");
}
