//! The trace model: archive in, ordered actions and snapshot queries out.

pub mod action;
pub mod events;
pub mod snapshot;

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::archive::{ArchiveLimits, EntryInfo, TraceArchive};
use crate::error::TraceError;

pub use action::{reconstruct, Action, ActionStatus, GROUP_METHOD};
pub use events::{
    parse_events, AfterEvent, BeforeEvent, ConsoleEvent, ContextOptionsEvent, FrameSnapshot,
    ParsedEvents, RequestInfo, ResourceSnapshot, ResponseInfo, StackFrame, TraceEvent, Viewport,
};
pub use snapshot::{
    find_all, is_back_reference, is_interactive, is_trivial_tree, matches_selector, render_html,
    ElementNode, RenderOptions, ResolvedSnapshot, SnapshotFallback, SnapshotPhase, SnapshotStore,
    REF_MARKER,
};

/// Archive entry holding the event log.
pub const TRACE_LOG_ENTRY: &str = "trace.trace";
/// Archive entry holding the network event log, when present.
pub const NETWORK_LOG_ENTRY: &str = "trace.network";
/// Prefix under which binary resources (screenshots, bodies) live.
pub const RESOURCES_PREFIX: &str = "resources/";

/// Run metadata extracted from the `context-options` event.
#[derive(Debug, Clone, Default)]
pub struct RunMetadata {
    pub browser_name: Option<String>,
    pub viewport: Option<Viewport>,
    pub base_url: Option<String>,
    pub wall_time: Option<f64>,
    pub monotonic_time: Option<f64>,
}

impl RunMetadata {
    fn from_events(events: &[TraceEvent]) -> Self {
        for event in events {
            if let TraceEvent::ContextOptions(ctx) = event {
                return Self {
                    browser_name: ctx.browser_name.clone(),
                    viewport: ctx.options.viewport,
                    base_url: ctx.options.base_url.clone(),
                    wall_time: ctx.wall_time,
                    monotonic_time: ctx.monotonic_time,
                };
            }
        }
        Self::default()
    }
}

/// A screenshot resource entry with the timestamp parsed from its
/// filename's trailing numeric component.
#[derive(Debug, Clone)]
pub struct ScreenshotEntry {
    pub name: String,
    pub timestamp: Option<f64>,
}

fn screenshot_timestamp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-(\d+)\.(?:jpeg|jpg|png)$").expect("valid screenshot regex"))
}

fn is_image_entry(name: &str) -> bool {
    name.ends_with(".jpeg") || name.ends_with(".jpg") || name.ends_with(".png")
}

/// A loaded trace: owns the validated archive, the parsed event stream,
/// the reconstructed actions, and a lazily built snapshot index. All query
/// methods are pure reads over immutable state.
pub struct Trace {
    archive: TraceArchive,
    events: Vec<TraceEvent>,
    skipped_lines: usize,
    actions: Vec<Action>,
    metadata: RunMetadata,
    snapshots: OnceLock<SnapshotStore>,
}

impl Trace {
    /// Opens, validates, and fully loads the trace archive at `path`.
    pub fn load(path: impl AsRef<Path>, limits: ArchiveLimits) -> Result<Self, TraceError> {
        let mut archive = TraceArchive::open(path, limits)?;

        let content = archive
            .read_text(TRACE_LOG_ENTRY)
            .filter(|content| !content.is_empty())
            .ok_or(TraceError::MissingLog)?;

        let ParsedEvents { events, skipped } = parse_events(&content);
        if skipped > 0 {
            tracing::warn!(skipped, "trace log contained undecodable lines");
        }

        let metadata = RunMetadata::from_events(&events);
        let actions = reconstruct(&events);

        Ok(Self {
            archive,
            events,
            skipped_lines: skipped,
            actions,
            metadata,
            snapshots: OnceLock::new(),
        })
    }

    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Lines of the event log that failed to decode and were skipped.
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Action by 1-based step number.
    pub fn action(&self, step: usize) -> Option<&Action> {
        step.checked_sub(1).and_then(|index| self.actions.get(index))
    }

    /// Failed actions in chronological order.
    pub fn failed_actions(&self) -> Vec<&Action> {
        self.actions.iter().filter(|a| a.is_failed()).collect()
    }

    /// 1-based step number of the first failed action.
    pub fn first_failed_step(&self) -> Option<usize> {
        self.actions
            .iter()
            .position(|a| a.is_failed())
            .map(|index| index + 1)
    }

    /// Wall span of the run: max end time minus min start time across all
    /// actions, or 0 when there are none.
    pub fn total_duration(&self) -> f64 {
        let min_start = self
            .actions
            .iter()
            .map(|a| a.start_time)
            .fold(f64::INFINITY, f64::min);
        let max_end = self
            .actions
            .iter()
            .map(|a| a.end_time)
            .fold(f64::NEG_INFINITY, f64::max);
        if self.actions.is_empty() {
            0.0
        } else {
            max_end - min_start
        }
    }

    pub fn console_events(&self) -> impl Iterator<Item = &ConsoleEvent> {
        self.events.iter().filter_map(|event| match event {
            TraceEvent::Console(console) => Some(console),
            _ => None,
        })
    }

    /// Image resources in archive order, with filename timestamps.
    pub fn screenshots(&self) -> Vec<ScreenshotEntry> {
        self.archive
            .entries()
            .iter()
            .filter(|e| e.name.starts_with(RESOURCES_PREFIX) && is_image_entry(&e.name))
            .map(|e| ScreenshotEntry {
                name: e.name.clone(),
                timestamp: screenshot_timestamp_re()
                    .captures(&e.name)
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse::<f64>().ok()),
            })
            .collect()
    }

    pub fn entries(&self) -> &[EntryInfo] {
        self.archive.entries()
    }

    fn snapshot_store(&self) -> &SnapshotStore {
        self.snapshots
            .get_or_init(|| SnapshotStore::from_events(&self.events))
    }

    /// Exact snapshot lookup by name.
    pub fn snapshot(&self, name: &str) -> Option<&FrameSnapshot> {
        self.snapshot_store().get(name)
    }

    /// Nearest non-trivial snapshot by timestamp.
    pub fn snapshot_near_time(&self, timestamp: f64) -> Option<&FrameSnapshot> {
        self.snapshot_store().near_time(timestamp)
    }

    /// The `input@` snapshot captured during the action itself.
    pub fn action_snapshot(&self, action: &Action) -> Option<&FrameSnapshot> {
        self.snapshot_store().action_snapshot(action)
    }

    /// Snapshot for a timing phase of `action`, with fallback metadata.
    pub fn resolve_snapshot(
        &self,
        action: &Action,
        phase: SnapshotPhase,
    ) -> Option<ResolvedSnapshot<'_>> {
        self.snapshot_store().resolve(action, phase)
    }

    /// Reads an auxiliary archive entry as text (`trace.network`, resource
    /// bodies). `None` when absent.
    pub fn read_entry_text(&mut self, name: &str) -> Option<String> {
        self.archive.read_text(name)
    }

    /// Reads an auxiliary archive entry as bytes. `None` when absent.
    pub fn read_entry_bytes(&mut self, name: &str) -> Option<Vec<u8>> {
        self.archive.read_bytes(name)
    }
}
