//! Bounded, traversal-safe reading of trace zip archives.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::TraceError;

/// Safety ceilings applied while validating an archive. All three are
/// independently configurable at construction time.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveLimits {
    /// Maximum number of entries in the archive.
    pub max_entries: usize,
    /// Maximum uncompressed size of any single entry, in bytes.
    pub max_entry_size: u64,
    /// Maximum total uncompressed size across all entries, in bytes.
    pub max_total_size: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: 5000,
            max_entry_size: 10 * 1024 * 1024,
            max_total_size: 500 * 1024 * 1024,
        }
    }
}

/// Name and declared uncompressed size of a validated archive entry.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub name: String,
    pub size: u64,
}

/// A validated trace archive. Entries are enumerated once during
/// validation; reads go back to the underlying zip on demand.
pub struct TraceArchive {
    zip: ZipArchive<File>,
    entries: Vec<EntryInfo>,
    limits: ArchiveLimits,
}

impl TraceArchive {
    /// Opens and validates the archive at `path`. Every entry is checked
    /// for path traversal and against the configured ceilings before any
    /// entry content is trusted. Sizes come from the central directory, so
    /// validation never inflates an entry.
    pub fn open(path: impl AsRef<Path>, limits: ArchiveLimits) -> Result<Self, TraceError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TraceError::NotFound(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let mut zip = ZipArchive::new(file).map_err(TraceError::CorruptArchive)?;
        let entries = validate(&mut zip, &limits)?;

        Ok(Self {
            zip,
            entries,
            limits,
        })
    }

    /// All validated entries, in archive order.
    pub fn entries(&self) -> &[EntryInfo] {
        &self.entries
    }

    /// Entries whose names match the given prefix and suffix.
    pub fn list_entries(&self, prefix: &str, suffix: &str) -> Vec<&EntryInfo> {
        self.entries
            .iter()
            .filter(|e| e.name.starts_with(prefix) && e.name.ends_with(suffix))
            .collect()
    }

    /// Reads an entry as raw bytes. Returns `None` when the entry is
    /// missing, unreadable, or inflates past the per-entry ceiling its
    /// header declared it would stay under.
    pub fn read_bytes(&mut self, name: &str) -> Option<Vec<u8>> {
        let mut entry = match self.zip.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return None,
            Err(err) => {
                tracing::debug!(entry = name, error = %err, "failed to open archive entry");
                return None;
            }
        };

        let cap = self.limits.max_entry_size;
        let mut data = Vec::new();
        if let Err(err) = entry.by_ref().take(cap + 1).read_to_end(&mut data) {
            tracing::debug!(entry = name, error = %err, "failed to read archive entry");
            return None;
        }
        if data.len() as u64 > cap {
            tracing::warn!(entry = name, "entry inflated past the per-entry ceiling; discarded");
            return None;
        }
        Some(data)
    }

    /// Reads an entry as text, replacing invalid UTF-8. Returns `None` for
    /// a missing entry, never an error.
    pub fn read_text(&mut self, name: &str) -> Option<String> {
        self.read_bytes(name)
            .map(|data| String::from_utf8_lossy(&data).into_owned())
    }
}

fn validate(zip: &mut ZipArchive<File>, limits: &ArchiveLimits) -> Result<Vec<EntryInfo>, TraceError> {
    if zip.len() > limits.max_entries {
        return Err(TraceError::TooManyEntries {
            count: zip.len(),
            limit: limits.max_entries,
        });
    }

    let mut entries = Vec::with_capacity(zip.len());
    let mut total: u64 = 0;

    for index in 0..zip.len() {
        let entry = zip.by_index(index).map_err(TraceError::CorruptArchive)?;
        let name = entry.name().replace('\\', "/");

        if name.starts_with('/') || name.split('/').any(|segment| segment == "..") {
            return Err(TraceError::UnsafeEntry(entry.name().to_string()));
        }

        let size = entry.size();
        if size > limits.max_entry_size {
            return Err(TraceError::EntryTooLarge {
                name,
                size,
                limit: limits.max_entry_size,
            });
        }

        total = total.saturating_add(size);
        if total > limits.max_total_size {
            return Err(TraceError::ArchiveTooLarge {
                total,
                limit: limits.max_total_size,
            });
        }

        entries.push(EntryInfo { name, size });
    }

    Ok(entries)
}
