//! Disk Inspector -- mount usage and watched-directory statistics.
//!
//! Directory statistics fail soft: an absent or unreadable path reads as
//! zero, because a pressure decision must never crash over a directory
//! that was concurrently deleted. Mount-level readings are different: an
//! unreadable mount is reported as `None` ("cannot assess"), not as a
//! healthy 0%, so the caller can decide what a transient stat failure
//! means instead of silently under-triggering escalation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sysinfo::Disks;
use walkdir::WalkDir;

// ---------------------------------------------------------------------------
// DiskSnapshot
// ---------------------------------------------------------------------------

/// One immutable reading of a mount's pressure. Never cached: every
/// decision re-reads the mount.
#[derive(Debug, Clone, Serialize)]
pub struct DiskSnapshot {
    pub mount: PathBuf,
    /// Used capacity, 0-100.
    pub used_percent: u8,
    /// Free space in whole megabytes.
    pub free_mb: u64,
    pub taken_at: DateTime<Utc>,
}

/// Read usage and free space for the disk holding `mount`.
///
/// Returns `None` when no disk covers the path or the reading is unusable.
pub fn snapshot(mount: &Path) -> Option<DiskSnapshot> {
    let disks = Disks::new_with_refreshed_list();
    // The disk whose mount point is the longest prefix of the queried path.
    let disk = disks
        .iter()
        .filter(|d| mount.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())?;

    let total = disk.total_space();
    if total == 0 {
        return None;
    }
    let free = disk.available_space();
    let used_percent = (((total.saturating_sub(free)) * 100) / total) as u8;

    Some(DiskSnapshot {
        mount: mount.to_path_buf(),
        used_percent,
        free_mb: free / (1024 * 1024),
        taken_at: Utc::now(),
    })
}

// ---------------------------------------------------------------------------
// Directory statistics
// ---------------------------------------------------------------------------

/// Total size in bytes of all files under `path`. Absent paths and
/// unreadable entries contribute zero.
pub fn directory_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Count of files under `path` whose name satisfies `matches`. Absent
/// paths and unreadable entries contribute zero.
pub fn file_count(path: &Path, matches: impl Fn(&str) -> bool) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().is_some_and(|n| matches(n)))
        .count() as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_size_counts_nested_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.flac"), vec![0u8; 100]).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.flac"), vec![0u8; 50]).unwrap();

        assert_eq!(directory_size(dir.path()), 150);
    }

    #[test]
    fn test_missing_path_reads_as_zero() {
        let dir = tempfile::TempDir::new().unwrap();
        let gone = dir.path().join("never-created");

        assert_eq!(directory_size(&gone), 0);
        assert_eq!(file_count(&gone, |_| true), 0);
    }

    #[test]
    fn test_file_count_applies_predicate() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.flac"), b"x").unwrap();
        std::fs::write(dir.path().join("b.wav"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        assert_eq!(file_count(dir.path(), |n| n.ends_with(".flac")), 1);
        assert_eq!(file_count(dir.path(), |_| true), 3);
    }
}
