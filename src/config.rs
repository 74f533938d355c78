//! TOML configuration for DiskMedic.
//!
//! A layered configuration model with sensible defaults: an explicit
//! `--config` path (or the `DISKMEDIC_CONFIG` environment variable), then
//! the standard system location, then compiled-in defaults. The loaded
//! configuration is validated once, before any component runs; an invalid
//! configuration stops the invocation before any file-system mutation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::targets::{Category, StorageTarget};

/// Standard system location for the configuration file.
const SYSTEM_CONFIG_PATH: &str = "/etc/diskmedic/diskmedic.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration, immutable after load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub paths: PathsConfig,
    pub retention: RetentionConfig,
    pub thresholds: ThresholdConfig,
    pub compaction: CompactionConfig,
    pub eviction: EvictionConfig,
}

impl StorageConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve the active configuration: an explicit path if given, then the
    /// system location if present, then compiled-in defaults.
    ///
    /// Unlike a missing file, an unreadable or unparsable file is an error:
    /// proceeding with defaults when the operator wrote a config would risk
    /// cleanup under the wrong thresholds.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            return Self::load(system_path);
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }

    /// Check cross-field invariants. Called once after load, before any
    /// tier decision or file-system mutation.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let t = &self.thresholds;
        if !(t.warning_percent < t.critical_percent && t.critical_percent < t.emergency_percent) {
            return Err(ConfigError::ThresholdOrdering {
                warning: t.warning_percent,
                critical: t.critical_percent,
                emergency: t.emergency_percent,
            });
        }
        if t.emergency_percent > 100 {
            return Err(ConfigError::ThresholdOutOfRange(t.emergency_percent));
        }
        if self.compaction.retain_bytes > self.compaction.max_log_size_mb * 1024 * 1024 {
            return Err(ConfigError::RetainExceedsCap {
                retain_bytes: self.compaction.retain_bytes,
                cap_mb: self.compaction.max_log_size_mb,
            });
        }
        if self.eviction.max_delete == 0 {
            return Err(ConfigError::ZeroEvictionBound);
        }
        Ok(())
    }

    /// The watched locations, derived fresh from the configured paths.
    pub fn targets(&self) -> Vec<StorageTarget> {
        vec![
            StorageTarget::new(Category::Recording, &self.paths.recording_dir),
            StorageTarget::new(Category::Log, &self.paths.log_dir),
            StorageTarget::new(Category::Temp, &self.paths.temp_dir),
            StorageTarget::new(Category::Buffer, &self.paths.buffer_dir),
        ]
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Configuration invariant violations. All are fatal: the invocation must
/// stop before mutating anything, since inconsistent thresholds risk
/// wrong-tier action selection.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "usage thresholds must be strictly ordered warning < critical < emergency \
         (got {warning} / {critical} / {emergency})"
    )]
    ThresholdOrdering {
        warning: u8,
        critical: u8,
        emergency: u8,
    },

    #[error("emergency threshold {0}% exceeds 100%")]
    ThresholdOutOfRange(u8),

    #[error("compaction retain_bytes ({retain_bytes}) exceeds the {cap_mb} MB log size cap")]
    RetainExceedsCap { retain_bytes: u64, cap_mb: u64 },

    #[error("eviction max_delete must be at least 1")]
    ZeroEvictionBound,
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Watched directories and the mount point whose pressure drives escalation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Mount point the escalation monitor reads usage and free space from.
    pub mount: PathBuf,
    /// Directory the pipeline writes finished recordings into.
    pub recording_dir: PathBuf,
    /// Directory holding the pipeline's log files.
    pub log_dir: PathBuf,
    /// Scratch area for in-progress encodes.
    pub temp_dir: PathBuf,
    /// Pre-roll buffer segments.
    pub buffer_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            mount: PathBuf::from("/var/lib/recorder"),
            recording_dir: PathBuf::from("/var/lib/recorder/recordings"),
            log_dir: PathBuf::from("/var/log/recorder"),
            temp_dir: PathBuf::from("/var/lib/recorder/tmp"),
            buffer_dir: PathBuf::from("/var/lib/recorder/buffer"),
        }
    }
}

// ---------------------------------------------------------------------------
// Retention
// ---------------------------------------------------------------------------

/// Per-category maximum file age. Zero means "eligible immediately"; there
/// is no way to express "keep forever" other than a very large value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Days a finished recording is kept.
    pub recording_days: u64,
    /// Days a log file (active or rotated) is kept.
    pub log_days: u64,
    /// Hours a temp scratch file is kept.
    pub temp_hours: u64,
    /// Hours a buffer segment is kept.
    pub buffer_hours: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            recording_days: 30,
            log_days: 14,
            temp_hours: 6,
            buffer_hours: 1,
        }
    }
}

impl RetentionConfig {
    /// The retention window for a category.
    pub fn max_age(&self, category: Category) -> Duration {
        match category {
            Category::Recording => Duration::days(self.recording_days as i64),
            Category::Log => Duration::days(self.log_days as i64),
            Category::Temp => Duration::hours(self.temp_hours as i64),
            Category::Buffer => Duration::hours(self.buffer_hours as i64),
        }
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Disk pressure thresholds driving tier selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Usage percentage at which the Warning tier starts (inclusive).
    pub warning_percent: u8,
    /// Usage percentage at which the Critical tier starts (inclusive).
    pub critical_percent: u8,
    /// Usage percentage at which the Emergency tier starts (inclusive).
    pub emergency_percent: u8,
    /// Free-space floor in megabytes; below this the tier is Emergency
    /// regardless of the usage percentage.
    pub min_free_mb: u64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            warning_percent: 80,
            critical_percent: 90,
            emergency_percent: 95,
            min_free_mb: 500,
        }
    }
}

// ---------------------------------------------------------------------------
// Compaction
// ---------------------------------------------------------------------------

/// Log compactor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionConfig {
    /// Size cap in megabytes; logs over this are compacted.
    pub max_log_size_mb: u64,
    /// Trailing bytes kept when a log is compacted.
    pub retain_bytes: u64,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            max_log_size_mb: 100,
            retain_bytes: 10 * 1024 * 1024,
        }
    }
}

impl CompactionConfig {
    pub fn cap_bytes(&self) -> u64 {
        self.max_log_size_mb * 1024 * 1024
    }
}

// ---------------------------------------------------------------------------
// Eviction
// ---------------------------------------------------------------------------

/// Emergency evictor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvictionConfig {
    /// Upper bound on recording deletions per emergency pass. Keeps one
    /// pass from turning into an unbounded full-directory wipe when the
    /// directory holds a very large number of small files.
    pub max_delete: usize,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self { max_delete: 50 }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = StorageConfig::default();

        assert_eq!(cfg.paths.mount, PathBuf::from("/var/lib/recorder"));
        assert_eq!(
            cfg.paths.recording_dir,
            PathBuf::from("/var/lib/recorder/recordings")
        );
        assert_eq!(cfg.paths.log_dir, PathBuf::from("/var/log/recorder"));

        assert_eq!(cfg.retention.recording_days, 30);
        assert_eq!(cfg.retention.log_days, 14);
        assert_eq!(cfg.retention.temp_hours, 6);
        assert_eq!(cfg.retention.buffer_hours, 1);

        assert_eq!(cfg.thresholds.warning_percent, 80);
        assert_eq!(cfg.thresholds.critical_percent, 90);
        assert_eq!(cfg.thresholds.emergency_percent, 95);
        assert_eq!(cfg.thresholds.min_free_mb, 500);

        assert_eq!(cfg.compaction.max_log_size_mb, 100);
        assert_eq!(cfg.compaction.retain_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.eviction.max_delete, 50);

        cfg.validate().expect("defaults must validate");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[retention]
recording_days = 7

[thresholds]
warning_percent = 70
"#;
        let cfg: StorageConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(cfg.retention.recording_days, 7);
        assert_eq!(cfg.retention.log_days, 14);
        assert_eq!(cfg.thresholds.warning_percent, 70);
        assert_eq!(cfg.thresholds.critical_percent, 90);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_threshold_ordering_rejected() {
        let toml_str = r#"
[thresholds]
warning_percent = 90
critical_percent = 85
emergency_percent = 95
"#;
        let cfg: StorageConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ThresholdOrdering { .. })
        ));
    }

    #[test]
    fn test_equal_thresholds_rejected() {
        let mut cfg = StorageConfig::default();
        cfg.thresholds.critical_percent = cfg.thresholds.warning_percent;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ThresholdOrdering { .. })
        ));
    }

    #[test]
    fn test_emergency_over_100_rejected() {
        let mut cfg = StorageConfig::default();
        cfg.thresholds.emergency_percent = 101;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ThresholdOutOfRange(101))
        ));
    }

    #[test]
    fn test_retain_over_cap_rejected() {
        let mut cfg = StorageConfig::default();
        cfg.compaction.max_log_size_mb = 1;
        cfg.compaction.retain_bytes = 2 * 1024 * 1024;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RetainExceedsCap { .. })
        ));
    }

    #[test]
    fn test_zero_max_delete_rejected() {
        let mut cfg = StorageConfig::default();
        cfg.eviction.max_delete = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroEvictionBound)));
    }

    #[test]
    fn test_retention_windows() {
        let cfg = RetentionConfig::default();
        assert_eq!(cfg.max_age(Category::Recording), Duration::days(30));
        assert_eq!(cfg.max_age(Category::Buffer), Duration::hours(1));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("diskmedic.toml");
        std::fs::write(
            &path,
            r#"
[paths]
mount = "/srv/audio"
"#,
        )
        .unwrap();

        let cfg = StorageConfig::load(&path).unwrap();
        assert_eq!(cfg.paths.mount, PathBuf::from("/srv/audio"));
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(StorageConfig::load(Path::new("/nonexistent/diskmedic.toml")).is_err());
    }

    #[test]
    fn test_targets_cover_every_category() {
        let cfg = StorageConfig::default();
        let targets = cfg.targets();
        assert_eq!(targets.len(), Category::ALL.len());
        for category in Category::ALL {
            assert!(targets.iter().any(|t| t.category == category));
        }
    }
}
