//! Snapshot indexing, phase fallback resolution, and DOM tree queries.
//!
//! Instrumentation does not guarantee every timing phase produced a
//! captured, non-empty snapshot, so phase lookups degrade through a fixed
//! fallback order instead of failing hard. The before and after chains are
//! asymmetric on purpose; they encode different producer-side guarantees.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::trace::action::Action;
use crate::trace::events::{FrameSnapshot, TraceEvent};

/// Timing phase of a snapshot relative to an action's execution window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotPhase {
    Before,
    Action,
    After,
}

impl SnapshotPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotPhase::Before => "before",
            SnapshotPhase::Action => "action",
            SnapshotPhase::After => "after",
        }
    }
}

/// Which fallback satisfied a phase lookup, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFallback {
    Action,
    Before,
    After,
    Closest,
}

impl SnapshotFallback {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotFallback::Action => "action",
            SnapshotFallback::Before => "before",
            SnapshotFallback::After => "after",
            SnapshotFallback::Closest => "closest",
        }
    }
}

/// A resolved snapshot plus the fallback (if any) that produced it, so
/// callers can surface the degradation.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedSnapshot<'a> {
    pub snapshot: &'a FrameSnapshot,
    pub fallback: Option<SnapshotFallback>,
}

fn call_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@call@(\d+)$").expect("valid call-id regex"))
}

/// Index of all frame snapshots in a trace, by name and by time.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    snapshots: Vec<FrameSnapshot>,
    by_name: HashMap<String, usize>,
}

impl SnapshotStore {
    pub fn from_events(events: &[TraceEvent]) -> Self {
        let mut store = SnapshotStore::default();
        for event in events {
            if let TraceEvent::FrameSnapshot(snap) = event {
                let index = store.snapshots.len();
                if let Some(name) = &snap.snapshot.snapshot_name {
                    store.by_name.entry(name.clone()).or_insert(index);
                }
                store.snapshots.push(snap.snapshot.clone());
            }
        }
        store
    }

    /// Exact lookup by snapshot name.
    pub fn get(&self, name: &str) -> Option<&FrameSnapshot> {
        self.by_name.get(name).map(|&index| &self.snapshots[index])
    }

    /// Non-trivial snapshot with minimum absolute time distance to
    /// `timestamp`; ties go to the first encountered.
    pub fn near_time(&self, timestamp: f64) -> Option<&FrameSnapshot> {
        let mut best: Option<(&FrameSnapshot, f64)> = None;
        for snap in self.snapshots.iter().filter(|s| !is_trivial_tree(&s.html)) {
            let distance = (snap.timestamp - timestamp).abs();
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((snap, distance));
            }
        }
        best.map(|(snap, _)| snap)
    }

    /// The `input@call@<id>` snapshot for the action's call, located via
    /// the callId embedded in its before/after snapshot reference.
    pub fn action_snapshot(&self, action: &Action) -> Option<&FrameSnapshot> {
        let reference = action
            .before_snapshot
            .as_deref()
            .or(action.after_snapshot.as_deref())?;
        let call_id = call_id_re().captures(reference)?.get(1)?.as_str();
        self.get(&format!("input@call@{call_id}"))
    }

    /// Resolves the snapshot for a timing phase of `action`, degrading
    /// through the phase's fallback chain when the nominal snapshot is
    /// missing or trivial.
    pub fn resolve(&self, action: &Action, phase: SnapshotPhase) -> Option<ResolvedSnapshot<'_>> {
        match phase {
            SnapshotPhase::Action => self.action_snapshot(action).map(|snapshot| ResolvedSnapshot {
                snapshot,
                fallback: None,
            }),
            SnapshotPhase::Before => self.resolve_chain(
                action,
                action.before_snapshot.as_deref(),
                action.after_snapshot.as_deref(),
                SnapshotFallback::After,
                action.start_time,
            ),
            SnapshotPhase::After => self.resolve_chain(
                action,
                action.after_snapshot.as_deref(),
                action.before_snapshot.as_deref(),
                SnapshotFallback::Before,
                action.end_time,
            ),
        }
    }

    fn resolve_chain<'a>(
        &'a self,
        action: &Action,
        nominal: Option<&str>,
        opposite: Option<&str>,
        opposite_kind: SnapshotFallback,
        near: f64,
    ) -> Option<ResolvedSnapshot<'a>> {
        if let Some(snapshot) = nominal
            .and_then(|name| self.get(name))
            .filter(|s| !is_trivial_tree(&s.html))
        {
            return Some(ResolvedSnapshot {
                snapshot,
                fallback: None,
            });
        }

        if let Some(snapshot) = self
            .action_snapshot(action)
            .filter(|s| !is_trivial_tree(&s.html))
        {
            tracing::debug!(call_id = %action.call_id, "phase snapshot empty; using input snapshot");
            return Some(ResolvedSnapshot {
                snapshot,
                fallback: Some(SnapshotFallback::Action),
            });
        }

        if let Some(snapshot) = opposite
            .and_then(|name| self.get(name))
            .filter(|s| !is_trivial_tree(&s.html))
        {
            tracing::debug!(call_id = %action.call_id, fallback = opposite_kind.as_str(), "phase snapshot empty; using opposite phase");
            return Some(ResolvedSnapshot {
                snapshot,
                fallback: Some(opposite_kind),
            });
        }

        self.near_time(near).map(|snapshot| ResolvedSnapshot {
            snapshot,
            fallback: Some(SnapshotFallback::Closest),
        })
    }
}

/// A tree with no real element content: anything but an array of more than
/// two slots whose first slot is a tag name.
pub fn is_trivial_tree(html: &Value) -> bool {
    !matches!(html.as_array(), Some(arr) if arr.len() > 2 && arr[0].is_string())
}

/// True for a two-element numeric pair, the encoding of a back-reference
/// to a previously emitted node. Back-references are opaque; they are
/// rendered as a marker and never dereferenced.
pub fn is_back_reference(node: &Value) -> bool {
    matches!(node.as_array(), Some(arr) if arr.len() == 2 && arr[0].is_number() && arr[1].is_number())
}

/// An element node surfaced by [`find_all`].
#[derive(Debug, Clone, Copy)]
pub struct ElementNode<'a> {
    pub tag: &'a str,
    pub attrs: Option<&'a Map<String, Value>>,
    /// First string child, or empty.
    pub text: &'a str,
    /// The raw tree node, for re-rendering.
    pub html: &'a Value,
}

impl ElementNode<'_> {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs?.get(key).and_then(Value::as_str)
    }
}

/// Depth-first pre-order traversal collecting element nodes for which
/// `predicate(tag, attrs)` holds. Text and back-reference nodes are never
/// matched but do not stop descent into sibling subtrees.
pub fn find_all<'a, F>(tree: &'a Value, predicate: F) -> Vec<ElementNode<'a>>
where
    F: Fn(&str, Option<&Map<String, Value>>) -> bool,
{
    let mut results = Vec::new();
    let mut stack = vec![tree];

    while let Some(node) = stack.pop() {
        let Some(arr) = node.as_array() else { continue };
        if arr.len() < 2 {
            continue;
        }

        if let Some(tag) = arr[0].as_str() {
            let attrs = arr[1].as_object();
            if predicate(tag, attrs) {
                let text = arr[2..]
                    .iter()
                    .find_map(Value::as_str)
                    .unwrap_or("");
                results.push(ElementNode {
                    tag,
                    attrs,
                    text,
                    html: node,
                });
            }
        }

        for child in arr[2..].iter().rev() {
            stack.push(child);
        }
    }

    results
}

/// Matches exactly three selector forms: `#id` (exact id), `.class`
/// (member of the whitespace-split class list), and a bare tag name
/// (case-insensitive). No combinators, no attribute selectors.
pub fn matches_selector(tag: &str, attrs: Option<&Map<String, Value>>, selector: &str) -> bool {
    if let Some(id) = selector.strip_prefix('#') {
        return attrs
            .and_then(|a| a.get("id"))
            .and_then(Value::as_str)
            .is_some_and(|v| v == id);
    }
    if let Some(class) = selector.strip_prefix('.') {
        return attrs
            .and_then(|a| a.get("class"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .split_whitespace()
            .any(|c| c == class);
    }
    tag.eq_ignore_ascii_case(selector)
}

/// button/input/select/textarea are always interactive; anchors only when
/// an `href` is present.
pub fn is_interactive(tag: &str, attrs: Option<&Map<String, Value>>) -> bool {
    match tag.to_ascii_lowercase().as_str() {
        "button" | "input" | "select" | "textarea" => true,
        "a" => attrs
            .and_then(|a| a.get("href"))
            .is_some_and(|href| !href.is_null()),
        _ => false,
    }
}

const SELF_CLOSING_TAGS: [&str; 6] = ["input", "img", "br", "hr", "meta", "link"];

const SIMPLIFIED_ATTRS: [&str; 9] = [
    "id",
    "class",
    "name",
    "type",
    "disabled",
    "href",
    "value",
    "placeholder",
    "required",
];

/// Marker rendered for back-reference nodes.
pub const REF_MARKER: &str = "[ref]";

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Depth beyond which a tag is opened and immediately truncated.
    pub max_depth: usize,
    /// Restrict attributes to the display allow-list.
    pub simplify: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_depth: 10,
            simplify: true,
        }
    }
}

/// Renders a snapshot tree as human-readable nested markup. Output size is
/// bounded by `max_depth`; callers still pass the result through the
/// sanitizer before printing.
pub fn render_html(node: &Value, options: &RenderOptions) -> String {
    render_node(node, 0, options)
}

fn render_node(node: &Value, indent: usize, options: &RenderOptions) -> String {
    if let Some(text) = node.as_str() {
        return text.to_string();
    }

    if is_back_reference(node) {
        return REF_MARKER.to_string();
    }

    let Some(arr) = node.as_array() else {
        return String::new();
    };
    let Some(tag_name) = arr.first().and_then(Value::as_str) else {
        return String::new();
    };

    let tag = tag_name.to_ascii_lowercase();
    let spaces = "  ".repeat(indent);
    let attrs = arr.get(1).and_then(Value::as_object);
    let attr_string = format_attrs(attrs, options.simplify);

    let open_tag = if attr_string.is_empty() {
        format!("<{tag}>")
    } else {
        format!("<{tag} {attr_string}>")
    };

    let self_closing = SELF_CLOSING_TAGS.contains(&tag.as_str());
    let children = &arr[2.min(arr.len())..];

    if indent >= options.max_depth {
        return if self_closing {
            format!("{spaces}{open_tag}")
        } else {
            format!("{spaces}{open_tag}...</{tag}>")
        };
    }

    if children.is_empty() {
        return if self_closing {
            format!("{spaces}{open_tag}")
        } else {
            format!("{spaces}{open_tag}</{tag}>")
        };
    }

    if children.len() == 1 {
        if let Some(text) = children[0].as_str() {
            let text = text.trim();
            if text.len() < 50 {
                return format!("{spaces}{open_tag}{text}</{tag}>");
            }
        }
    }

    let rendered: Vec<String> = children
        .iter()
        .map(|child| render_node(child, indent + 1, options))
        .filter(|s| !s.is_empty())
        .collect();

    if rendered.is_empty() {
        return format!("{spaces}{open_tag}</{tag}>");
    }

    format!(
        "{spaces}{open_tag}\n{}\n{spaces}</{tag}>",
        rendered.join("\n")
    )
}

fn format_attrs(attrs: Option<&Map<String, Value>>, simplify: bool) -> String {
    let Some(attrs) = attrs else {
        return String::new();
    };

    let format_one = |key: &str, value: &Value| -> String {
        match value {
            Value::String(s) if s.is_empty() => key.to_string(),
            Value::String(s) => format!("{key}=\"{s}\""),
            other => format!("{key}=\"{other}\""),
        }
    };

    let parts: Vec<String> = if simplify {
        SIMPLIFIED_ATTRS
            .iter()
            .filter_map(|&key| attrs.get(key).map(|value| format_one(key, value)))
            .collect()
    } else {
        attrs
            .iter()
            .filter(|(key, _)| !key.starts_with("__playwright"))
            .map(|(key, value)| format_one(key, value))
            .collect()
    };

    parts.join(" ")
}
