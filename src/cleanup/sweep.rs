//! Retention Sweep -- age-based deletion of managed files.
//!
//! Each file's eligibility is independent: a file is selected when its
//! name matches the target's category and its modification time has
//! outlived the category's retention window. Freed-bytes figures use the
//! size observed at stat time; a file may shrink or vanish between stat
//! and unlink under a concurrent writer.

use chrono::{DateTime, Utc};
use tracing::debug;
use walkdir::WalkDir;

use crate::plan::{ActionKind, CleanupAction};
use crate::targets::{is_expired, StorageTarget};

/// Plan deletions for one target. Returns the planned actions and the
/// number of files that could not be assessed (unreadable metadata).
pub fn plan_sweep(
    target: &StorageTarget,
    max_age: chrono::Duration,
    now: DateTime<Utc>,
) -> (Vec<CleanupAction>, u64) {
    if !target.path.is_dir() {
        debug!(
            category = %target.category,
            path = %target.path.display(),
            "target directory absent, nothing to sweep"
        );
        return (Vec::new(), 0);
    }

    let mut actions = Vec::new();
    let mut skipped = 0u64;

    for entry in WalkDir::new(&target.path)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            // Non-UTF-8 names are never pipeline content.
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
        let modified: DateTime<Utc> = modified.into();

        if is_expired(modified, now, max_age) {
            let age = now.signed_duration_since(modified);
            actions.push(CleanupAction {
                kind: ActionKind::Delete,
                category: target.category,
                path: entry.into_path(),
                bytes: size,
                reason: format!(
                    "age {}h exceeds {}h {} retention window",
                    age.num_hours(),
                    max_age.num_hours(),
                    target.category
                ),
            });
        } else {
            debug!(
                path = %entry.path().display(),
                age_hours = now.signed_duration_since(modified).num_hours(),
                window_hours = max_age.num_hours(),
                "within retention window, keeping"
            );
        }
    }

    (actions, skipped)
}

/// Remove directories left empty under `root` after a sweep, preserving
/// `root` itself. `remove_dir` refuses non-empty directories, so a
/// contents-first walk is all that is needed.
pub fn prune_empty_dirs(root: &std::path::Path) {
    for entry in WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(Result::ok)
    {
        if entry.file_type().is_dir() && std::fs::remove_dir(entry.path()).is_ok() {
            debug!(path = %entry.path().display(), "removed empty directory");
        }
    }
}
