//! Safety ceilings enforced through the full load path.

use super::common::fixtures::TraceBuilder;
use tracelens::{ArchiveLimits, Trace, TraceError};

#[test]
fn missing_path_is_not_found() {
    let err = Trace::load("/no/such/trace.zip", ArchiveLimits::default())
        .err()
        .unwrap();
    assert!(matches!(err, TraceError::NotFound(_)));
}

#[test]
fn non_zip_file_is_corrupt_archive() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"PK this is not actually a zip").unwrap();
    let err = Trace::load(file.path(), ArchiveLimits::default())
        .err()
        .unwrap();
    assert!(matches!(err, TraceError::CorruptArchive(_)));
}

#[test]
fn traversal_entry_rejected_regardless_of_size() {
    let path = TraceBuilder::new()
        .action("c1", "goto", 1.0, 2.0)
        .entry("../evil.txt", b"x")
        .write();
    let err = Trace::load(&path, ArchiveLimits::default()).err().unwrap();
    assert!(matches!(err, TraceError::UnsafeEntry(name) if name.contains("evil")));
}

#[test]
fn entry_count_ceiling_applies() {
    let mut builder = TraceBuilder::new().action("c1", "goto", 1.0, 2.0);
    for index in 0..10 {
        builder = builder.entry(&format!("resources/r{index}"), b"data");
    }
    let path = builder.write();

    let limits = ArchiveLimits {
        max_entries: 5,
        ..ArchiveLimits::default()
    };
    let err = Trace::load(&path, limits).err().unwrap();
    assert!(matches!(err, TraceError::TooManyEntries { limit: 5, .. }));

    // Same archive passes once the ceiling is raised.
    assert!(Trace::load(&path, ArchiveLimits::default()).is_ok());
}

#[test]
fn per_entry_size_ceiling_applies() {
    let path = TraceBuilder::new()
        .action("c1", "goto", 1.0, 2.0)
        .entry("resources/huge.bin", &vec![0u8; 4096])
        .write();
    let limits = ArchiveLimits {
        max_entry_size: 1024,
        ..ArchiveLimits::default()
    };
    let err = Trace::load(&path, limits).err().unwrap();
    assert!(
        matches!(err, TraceError::EntryTooLarge { name, size: 4096, .. } if name.contains("huge"))
    );
}

#[test]
fn total_size_ceiling_applies() {
    let path = TraceBuilder::new()
        .action("c1", "goto", 1.0, 2.0)
        .entry("resources/a.bin", &vec![0u8; 600])
        .entry("resources/b.bin", &vec![0u8; 600])
        .write();
    let limits = ArchiveLimits {
        max_entry_size: 1024,
        max_total_size: 1000,
        ..ArchiveLimits::default()
    };
    let err = Trace::load(&path, limits).err().unwrap();
    assert!(matches!(err, TraceError::ArchiveTooLarge { limit: 1000, .. }));
}
