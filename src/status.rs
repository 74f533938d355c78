//! Read-only status reporting over the mount, the watched directories,
//! and the active configuration.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::StorageConfig;
use crate::system::disk::{self, DiskSnapshot};
use crate::targets::Category;

/// Directory statistics for one watched location.
#[derive(Debug, Serialize)]
pub struct TargetStatus {
    pub category: Category,
    pub path: PathBuf,
    /// Total bytes under the directory (all files, managed or not).
    pub size_bytes: u64,
    /// Count of files matching the category's patterns.
    pub managed_files: u64,
}

/// Everything `status` prints: one snapshot, per-target statistics, and
/// the configuration in force.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// `None` when the mount could not be assessed.
    pub snapshot: Option<DiskSnapshot>,
    pub targets: Vec<TargetStatus>,
    pub config: StorageConfig,
}

/// Gather a status report. Read-only; absent directories read as zero.
pub fn collect(config: &StorageConfig) -> StatusReport {
    let targets = config
        .targets()
        .into_iter()
        .map(|target| {
            let category = target.category;
            TargetStatus {
                size_bytes: disk::directory_size(&target.path),
                managed_files: disk::file_count(&target.path, |name| category.matches(name)),
                category,
                path: target.path,
            }
        })
        .collect();

    StatusReport {
        snapshot: disk::snapshot(&config.paths.mount),
        targets,
        config: config.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_counts_managed_files_only() {
        let dir = tempfile::TempDir::new().unwrap();
        let recordings = dir.path().join("recordings");
        std::fs::create_dir(&recordings).unwrap();
        std::fs::write(recordings.join("a.flac"), vec![0u8; 10]).unwrap();
        std::fs::write(recordings.join("stray.txt"), vec![0u8; 5]).unwrap();

        let mut config = StorageConfig::default();
        config.paths.recording_dir = recordings;
        config.paths.log_dir = dir.path().join("logs");
        config.paths.temp_dir = dir.path().join("tmp");
        config.paths.buffer_dir = dir.path().join("buffer");

        let report = collect(&config);
        let rec = report
            .targets
            .iter()
            .find(|t| t.category == Category::Recording)
            .unwrap();

        assert_eq!(rec.managed_files, 1);
        assert_eq!(rec.size_bytes, 15);

        // Absent directories read as zero, never error.
        let logs = report
            .targets
            .iter()
            .find(|t| t.category == Category::Log)
            .unwrap();
        assert_eq!(logs.managed_files, 0);
        assert_eq!(logs.size_bytes, 0);
    }

    #[test]
    fn test_report_serializes() {
        let config = StorageConfig::default();
        let report = collect(&config);
        let json = serde_json::to_string_pretty(&report).unwrap();
        assert!(json.contains("\"targets\""));
        assert!(json.contains("\"thresholds\""));
    }
}
