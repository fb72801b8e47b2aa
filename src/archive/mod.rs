pub mod reader;

pub use reader::{ArchiveLimits, EntryInfo, TraceArchive};
