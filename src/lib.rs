pub mod archive;
pub mod commands;
pub mod error;
pub mod render;
pub mod sanitize;
pub mod trace;

pub use archive::{ArchiveLimits, EntryInfo, TraceArchive};
pub use error::TraceError;
pub use trace::{
    Action, ActionStatus, FrameSnapshot, ResolvedSnapshot, RunMetadata, ScreenshotEntry,
    SnapshotFallback, SnapshotPhase, SnapshotStore, Trace, TraceEvent,
};
