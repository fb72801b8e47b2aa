//! Reconstruction of executed actions from the flat before/after event
//! stream, including step-group nesting.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::trace::events::{AfterEvent, BeforeEvent, StackFrame, TraceEvent};

/// Method name of the synthetic bracketing call that opens a step group.
pub const GROUP_METHOD: &str = "tracingGroup";

/// Cap on parent-chain traversal so a malformed cycle terminates.
const MAX_GROUP_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Passed,
    Failed,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Passed => "passed",
            ActionStatus::Failed => "failed",
        }
    }
}

/// One reconstructed unit of test execution, spanning a matched
/// before/after pair. Immutable once built; held in chronological
/// `before`-event order and addressed by 1-based step number.
#[derive(Debug, Clone)]
pub struct Action {
    pub call_id: String,
    pub method: String,
    pub params: Map<String, Value>,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub status: ActionStatus,
    pub error: Option<Value>,
    pub before_snapshot: Option<String>,
    pub after_snapshot: Option<String>,
    pub step_title: Option<String>,
    pub nesting_depth: usize,
    pub source_location: Option<StackFrame>,
}

impl Action {
    pub fn is_failed(&self) -> bool {
        self.status == ActionStatus::Failed
    }

    pub fn is_group(&self) -> bool {
        self.method == GROUP_METHOD
    }

    /// Best-effort human-readable message from the opaque error payload.
    pub fn error_message(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        if let Some(message) = error
            .get("error")
            .and_then(|inner| inner.get("message"))
            .and_then(Value::as_str)
        {
            return Some(message.to_string());
        }
        if let Some(message) = error.get("message").and_then(Value::as_str) {
            return Some(message.to_string());
        }
        Some(error.to_string())
    }

    /// Param shorthand used by the renderers.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

struct StepGroup<'a> {
    title: Option<&'a str>,
    parent_id: Option<&'a str>,
    stack: Option<&'a [StackFrame]>,
}

/// Pairs `before`/`after` events into [`Action`]s. Two passes: register
/// every step group first, then resolve each pair's ancestry by following
/// `parent_id` pointers through the registry.
pub fn reconstruct(events: &[TraceEvent]) -> Vec<Action> {
    let mut afters: HashMap<&str, &AfterEvent> = HashMap::new();
    for event in events {
        if let TraceEvent::After(after) = event {
            // First after wins; a callId is matched at most once.
            afters.entry(after.call_id.as_str()).or_insert(after);
        }
    }

    let pairs: Vec<(&BeforeEvent, &AfterEvent)> = events
        .iter()
        .filter_map(|event| match event {
            TraceEvent::Before(before) => afters
                .get(before.call_id.as_str())
                .map(|after| (before, *after)),
            _ => None,
        })
        .collect();

    let mut groups: HashMap<&str, StepGroup<'_>> = HashMap::new();
    for (before, _) in &pairs {
        if before.method == GROUP_METHOD {
            groups.insert(
                before.call_id.as_str(),
                StepGroup {
                    title: before.title.as_deref(),
                    parent_id: before.parent_id.as_deref(),
                    stack: before.stack.as_deref(),
                },
            );
        }
    }

    pairs
        .iter()
        .map(|(before, after)| build_action(before, after, &groups))
        .collect()
}

fn build_action(before: &BeforeEvent, after: &AfterEvent, groups: &HashMap<&str, StepGroup<'_>>) -> Action {
    let mut step_title = None;
    let mut nesting_depth = 0;
    let mut source_location = None;

    if before.method == GROUP_METHOD {
        step_title = before.title.clone();
        nesting_depth = chain_depth(groups, before.parent_id.as_deref());
        source_location = before
            .stack
            .as_ref()
            .and_then(|stack| stack.first())
            .cloned();
    } else if let Some(parent_id) = before.parent_id.as_deref() {
        if let Some(group) = groups.get(parent_id) {
            step_title = group.title.map(str::to_owned);
            nesting_depth = chain_depth(groups, Some(parent_id));
            source_location = group.stack.and_then(|stack| stack.first()).cloned();
        }
    }

    let status = if after.error.is_some() {
        ActionStatus::Failed
    } else {
        ActionStatus::Passed
    };

    Action {
        call_id: before.call_id.clone(),
        method: before.method.clone(),
        params: before.params.clone(),
        start_time: before.start_time,
        end_time: after.end_time,
        duration: after.end_time - before.start_time,
        status,
        error: after.error.clone(),
        before_snapshot: before.before_snapshot.clone(),
        after_snapshot: after.after_snapshot.clone(),
        step_title,
        nesting_depth,
        source_location,
    }
}

/// Number of registered groups traversed from `start` to the chain's end.
/// Traversal is capped; a cycle saturates instead of spinning.
fn chain_depth(groups: &HashMap<&str, StepGroup<'_>>, start: Option<&str>) -> usize {
    let mut depth = 0;
    let mut current = start;
    while let Some(id) = current {
        let Some(group) = groups.get(id) else { break };
        depth += 1;
        if depth >= MAX_GROUP_DEPTH {
            tracing::warn!(call_id = id, "step group chain too deep; truncating");
            break;
        }
        current = group.parent_id;
    }
    depth
}
