//! Log Compactor -- bounded truncation of oversized logs via atomic replace.
//!
//! Only active log files over the size cap are touched; the retained
//! content is exactly the file's trailing bytes. The replacement is
//! written to a temporary sibling and renamed over the original, so a
//! concurrent reader never observes a zero-length or partially-written
//! log.

use std::fs;
use std::io::{self, Seek, SeekFrom};
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::plan::{ActionKind, CleanupAction};
use crate::targets::{is_active_log, StorageTarget};

/// Plan truncations for every active log over `cap_bytes`. Returns the
/// planned actions and the number of files that could not be assessed.
pub fn plan_compaction(
    target: &StorageTarget,
    cap_bytes: u64,
    retain_bytes: u64,
) -> (Vec<CleanupAction>, u64) {
    if !target.path.is_dir() {
        debug!(
            path = %target.path.display(),
            "log directory absent, nothing to compact"
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
            continue;
        };
        if !is_active_log(name) {
            continue;
        }

        let size = match entry.metadata() {
            Ok(m) => m.len(),
            Err(_) => {
                debug!(path = %entry.path().display(), "size unreadable, skipping");
                skipped += 1;
                continue;
            }
        };

        if size <= cap_bytes {
            debug!(
                path = %entry.path().display(),
                size,
                cap_bytes,
                "under size cap, keeping"
            );
            continue;
        }

        actions.push(CleanupAction {
            kind: ActionKind::Truncate { retain_bytes },
            category: target.category,
            path: entry.into_path(),
            bytes: size.saturating_sub(retain_bytes),
            reason: format!("size {size} exceeds {cap_bytes} byte log cap"),
        });
    }

    (actions, skipped)
}

/// Replace `path` with its final `retain_bytes`, atomically.
///
/// The tail is copied to a temporary sibling which is then renamed over
/// the original; rename within one directory is atomic at the
/// file-system level. A file already at or under the retained size is
/// left alone, which makes re-running on already-compacted logs a no-op.
pub fn truncate_file(path: &Path, retain_bytes: u64) -> io::Result<()> {
    let mut src = fs::File::open(path)?;
    let len = src.metadata()?.len();
    if len <= retain_bytes {
        return Ok(());
    }
    src.seek(SeekFrom::Start(len - retain_bytes))?;

    let name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "log path has no file name"))?;
    let mut tmp_name = name.to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let mut dst = fs::File::create(&tmp)?;
    io::copy(&mut src, &mut dst)?;
    dst.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::Category;

    #[test]
    fn test_only_oversized_active_logs_planned() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("big.log"), vec![b'x'; 1000]).unwrap();
        fs::write(dir.path().join("small.log"), vec![b'x'; 100]).unwrap();
        fs::write(dir.path().join("rotated.log.1"), vec![b'x'; 1000]).unwrap();

        let target = StorageTarget::new(Category::Log, dir.path());
        let (actions, skipped) = plan_compaction(&target, 500, 200);

        assert_eq!(skipped, 0);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].path, dir.path().join("big.log"));
        assert_eq!(actions[0].bytes, 800);
        assert!(matches!(
            actions[0].kind,
            ActionKind::Truncate { retain_bytes: 200 }
        ));
    }

    #[test]
    fn test_file_at_cap_untouched() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("edge.log"), vec![b'x'; 500]).unwrap();

        let target = StorageTarget::new(Category::Log, dir.path());
        let (actions, _) = plan_compaction(&target, 500, 200);
        assert!(actions.is_empty());
    }

    #[test]
    fn test_truncate_keeps_exact_tail() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("recorder.log");
        let content: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        fs::write(&path, &content).unwrap();

        truncate_file(&path, 64).unwrap();

        let after = fs::read(&path).unwrap();
        assert_eq!(after.len(), 64);
        assert_eq!(after[..], content[1000 - 64..]);
        // No temporary sibling left behind.
        assert!(!dir.path().join("recorder.log.tmp").exists());
    }

    #[test]
    fn test_truncate_short_file_is_no_op() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("short.log");
        fs::write(&path, b"brief").unwrap();

        truncate_file(&path, 64).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"brief");
    }

    #[test]
    fn test_second_compaction_pass_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("recorder.log");
        fs::write(&path, vec![b'x'; 1000]).unwrap();

        let target = StorageTarget::new(Category::Log, dir.path());
        let (actions, _) = plan_compaction(&target, 500, 200);
        for a in &actions {
            if let ActionKind::Truncate { retain_bytes } = a.kind {
                truncate_file(&a.path, retain_bytes).unwrap();
            }
        }

        let (again, _) = plan_compaction(&target, 500, 200);
        assert!(again.is_empty());
    }
}
