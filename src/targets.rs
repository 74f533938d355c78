//! Watched storage locations and the predicates that select managed files.
//!
//! Selection is a pure function of the file name and modification time, so
//! the matching logic is unit-testable without touching a file system.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Recording containers the pipeline is known to produce.
const RECORDING_EXTENSIONS: &[&str] = &["wav", "flac", "mp3", "ogg", "opus", "m4a", "aac"];

/// Name prefix for scratch files in the temp area.
const TEMP_PREFIX: &str = "tmp";

/// Name prefix for pre-roll buffer segments.
const BUFFER_PREFIX: &str = "buf";

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// The kind of content a watched directory holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Recording,
    Log,
    Temp,
    Buffer,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Recording,
        Category::Log,
        Category::Temp,
        Category::Buffer,
    ];

    /// Categories swept by the cheap (Warning-tier) pass.
    pub const SHORT_LIVED: [Category; 2] = [Category::Temp, Category::Buffer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Recording => "recording",
            Category::Log => "log",
            Category::Temp => "temp",
            Category::Buffer => "buffer",
        }
    }

    /// Whether `name` is managed content for this category.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Category::Recording => has_recording_extension(name),
            Category::Log => is_log_name(name),
            Category::Temp => name.starts_with(TEMP_PREFIX),
            Category::Buffer => name.starts_with(BUFFER_PREFIX),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StorageTarget
// ---------------------------------------------------------------------------

/// A watched location: one directory managed under one category's rules.
///
/// Derived from configuration at each invocation, never persisted.
#[derive(Debug, Clone)]
pub struct StorageTarget {
    pub category: Category,
    pub path: PathBuf,
}

impl StorageTarget {
    pub fn new(category: Category, path: impl Into<PathBuf>) -> Self {
        Self {
            category,
            path: path.into(),
        }
    }

    /// Whether a file with this name qualifies as managed content here.
    pub fn matches(&self, name: &str) -> bool {
        self.category.matches(name)
    }
}

// ---------------------------------------------------------------------------
// Name predicates
// ---------------------------------------------------------------------------

/// Active or rotated log file name: `foo.log`, `foo.log.1`, `foo.log.2.gz`.
pub fn is_log_name(name: &str) -> bool {
    is_active_log(name) || is_rotated_log(name)
}

/// A log currently being appended to (the only kind the compactor touches).
pub fn is_active_log(name: &str) -> bool {
    name.ends_with(".log")
}

/// A rotated or compressed log artifact. Deleted unconditionally by the
/// emergency evictor; aged out like any log otherwise.
pub fn is_rotated_log(name: &str) -> bool {
    name.contains(".log.") || name.ends_with(".gz")
}

fn has_recording_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            RECORDING_EXTENSIONS.iter().any(|e| *e == ext)
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Age predicate
// ---------------------------------------------------------------------------

/// Whether a file last modified at `modified` has outlived `max_age` as of
/// `now`. A zero `max_age` makes any already-written file eligible; there is
/// no way to express "no limit".
pub fn is_expired(modified: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    now.signed_duration_since(modified) > max_age
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_extensions() {
        assert!(Category::Recording.matches("show-2026-08-01.flac"));
        assert!(Category::Recording.matches("TAKE7.WAV"));
        assert!(Category::Recording.matches("voice.opus"));
        assert!(!Category::Recording.matches("notes.txt"));
        assert!(!Category::Recording.matches("flac")); // no stem
        assert!(!Category::Recording.matches(".flac"));
    }

    #[test]
    fn test_log_names() {
        assert!(Category::Log.matches("recorder.log"));
        assert!(Category::Log.matches("recorder.log.1"));
        assert!(Category::Log.matches("recorder.log.2.gz"));
        assert!(!Category::Log.matches("recorder.txt"));

        assert!(is_active_log("recorder.log"));
        assert!(!is_active_log("recorder.log.1"));

        assert!(is_rotated_log("recorder.log.1"));
        assert!(is_rotated_log("old-audit.gz"));
        assert!(!is_rotated_log("recorder.log"));
    }

    #[test]
    fn test_prefix_categories() {
        assert!(Category::Temp.matches("tmp_segment_0013.raw"));
        assert!(!Category::Temp.matches("segment_tmp.raw"));
        assert!(Category::Buffer.matches("buf0001.raw"));
        assert!(!Category::Buffer.matches("prebuffer.raw"));
    }

    #[test]
    fn test_expiry_boundaries() {
        let now = Utc::now();
        let window = Duration::days(30);

        assert!(is_expired(now - Duration::days(31), now, window));
        assert!(!is_expired(now - Duration::days(29), now, window));
        // Exactly at the window is not yet expired.
        assert!(!is_expired(now - window, now, window));
    }

    #[test]
    fn test_zero_window_is_immediately_eligible() {
        let now = Utc::now();
        let earlier = now - Duration::seconds(1);
        assert!(is_expired(earlier, now, Duration::zero()));
        // A file stamped "now" has no age yet.
        assert!(!is_expired(now, now, Duration::zero()));
    }
}
