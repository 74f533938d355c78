//! Emergency Evictor -- bounded, age-policy-overriding deletion under
//! hard capacity exhaustion.
//!
//! The only component allowed to delete content that has not aged past
//! its retention window. Recordings are ranked globally by modification
//! time and only the oldest `max_delete` go; the bound keeps one
//! emergency pass from becoming an unbounded wipe of a directory holding
//! millions of small files. Rotated log artifacts and all scratch
//! content are cleared without any age check.

use chrono::{DateTime, Utc};
use tracing::debug;
use walkdir::WalkDir;

use crate::plan::{ActionKind, CleanupAction};
use crate::targets::{is_rotated_log, Category, StorageTarget};

/// Plan an emergency eviction pass over all targets. Returns the planned
/// actions and the number of files that could not be assessed.
pub fn plan_eviction(targets: &[StorageTarget], max_delete: usize) -> (Vec<CleanupAction>, u64) {
    let mut actions = Vec::new();
    let mut skipped = 0u64;

    // Oldest recordings first, across every recording target.
    let mut recordings: Vec<(DateTime<Utc>, u64, std::path::PathBuf)> = Vec::new();
    for target in targets.iter().filter(|t| t.category == Category::Recording) {
        for entry in walk_files(target) {
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !target.matches(name) {
                continue;
            }
            let metadata = entry.metadata().ok();
            let size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
            let Some(modified) = metadata.and_then(|m| m.modified().ok()) else {
                debug!(path = %entry.path().display(), "modification time unreadable, skipping");
                skipped += 1;
                continue;
            };
            recordings.push((modified.into(), size, entry.into_path()));
        }
    }
    recordings.sort_by_key(|(modified, _, _)| *modified);
    for (_, size, path) in recordings.into_iter().take(max_delete) {
        actions.push(CleanupAction {
            kind: ActionKind::Delete,
            category: Category::Recording,
            path,
            bytes: size,
            reason: format!("emergency eviction, oldest {max_delete} recordings"),
        });
    }

    // Rotated and compressed log artifacts go unconditionally.
    for target in targets.iter().filter(|t| t.category == Category::Log) {
        for entry in walk_files(target) {
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !is_rotated_log(name) {
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            actions.push(CleanupAction {
                kind: ActionKind::Delete,
                category: Category::Log,
                path: entry.into_path(),
                bytes: size,
                reason: "emergency eviction, rotated log artifact".into(),
            });
        }
    }

    // Scratch areas are cleared entirely.
    for target in targets
        .iter()
        .filter(|t| matches!(t.category, Category::Temp | Category::Buffer))
    {
        for entry in walk_files(target) {
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !target.matches(name) {
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            actions.push(CleanupAction {
                kind: ActionKind::Delete,
                category: target.category,
                path: entry.into_path(),
                bytes: size,
                reason: format!("emergency eviction, clearing {} area", target.category),
            });
        }
    }

    (actions, skipped)
}

fn walk_files(target: &StorageTarget) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(&target.path)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
}
