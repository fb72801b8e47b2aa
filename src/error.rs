use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures while opening, validating, or loading a trace archive.
///
/// Per-line decode failures in the event log are not errors; they are
/// recovered locally and surfaced only as a skipped-line count.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Trace file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read zip file: {0}")]
    CorruptArchive(#[source] zip::result::ZipError),
    #[error("Unsafe zip entry path: {0}")]
    UnsafeEntry(String),
    #[error("Zip too large: {count} entries (max {limit})")]
    TooManyEntries { count: usize, limit: usize },
    #[error("Zip entry too large: {name} ({size} bytes, max {limit})")]
    EntryTooLarge {
        name: String,
        size: u64,
        limit: u64,
    },
    #[error("Zip uncompressed size exceeds limit ({total} bytes, max {limit})")]
    ArchiveTooLarge { total: u64, limit: u64 },
    #[error("Invalid trace file: missing or empty trace.trace entry. Is this a Playwright trace?")]
    MissingLog,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
