//! Escalation Monitor -- maps disk pressure to a response tier and runs
//! the minimum sufficient cleanup for that tier.
//!
//! Tier selection is a pure function of one fresh [`DiskSnapshot`]; there
//! is no hysteresis and no memory of the previous tier. Rapid oscillation
//! near a boundary re-runs the same tier's actions, which is safe because
//! every action is idempotent.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::cleanup;
use crate::config::{StorageConfig, ThresholdConfig};
use crate::plan::CleanupReport;
use crate::system::disk;
use crate::targets::Category;

// ---------------------------------------------------------------------------
// EscalationTier
// ---------------------------------------------------------------------------

/// Ordered response levels. Derived ordering follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTier {
    Normal,
    Warning,
    Critical,
    Emergency,
}

impl EscalationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationTier::Normal => "normal",
            EscalationTier::Warning => "warning",
            EscalationTier::Critical => "critical",
            EscalationTier::Emergency => "emergency",
        }
    }
}

impl fmt::Display for EscalationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tier selection
// ---------------------------------------------------------------------------

/// Select the response tier for a usage/free-space reading. Threshold
/// boundaries are inclusive: a reading exactly at a threshold classifies
/// into the higher tier.
pub fn select_tier(usage_percent: u8, free_mb: u64, thresholds: &ThresholdConfig) -> EscalationTier {
    if usage_percent >= thresholds.emergency_percent || free_mb < thresholds.min_free_mb {
        EscalationTier::Emergency
    } else if usage_percent >= thresholds.critical_percent {
        EscalationTier::Critical
    } else if usage_percent >= thresholds.warning_percent {
        EscalationTier::Warning
    } else {
        EscalationTier::Normal
    }
}

// ---------------------------------------------------------------------------
// Monitor pass
// ---------------------------------------------------------------------------

/// One monitor pass: read the mount, select a tier, run that tier's
/// cleanup. Returns `None` for the tier when the mount could not be
/// assessed -- a transient stat failure is deliberately not read as
/// "0% used, healthy", and equally not as an emergency; the pass logs a
/// warning and takes no action.
pub fn run_monitor(config: &StorageConfig, dry_run: bool) -> (Option<EscalationTier>, CleanupReport) {
    let mut report = CleanupReport::new(dry_run);

    let Some(snapshot) = disk::snapshot(&config.paths.mount) else {
        warn!(
            mount = %config.paths.mount.display(),
            "mount unreadable, cannot assess disk pressure; taking no action"
        );
        return (None, report);
    };

    let tier = select_tier(snapshot.used_percent, snapshot.free_mb, &config.thresholds);
    info!(
        mount = %snapshot.mount.display(),
        used_percent = snapshot.used_percent,
        free_mb = snapshot.free_mb,
        tier = %tier,
        "disk pressure evaluated"
    );

    match tier {
        EscalationTier::Normal => {}
        EscalationTier::Warning => {
            cleanup::compact_logs(config, dry_run, &mut report);
            cleanup::sweep_categories(config, &Category::SHORT_LIVED, dry_run, &mut report);
        }
        EscalationTier::Critical => {
            cleanup::compact_logs(config, dry_run, &mut report);
            cleanup::sweep_categories(config, &Category::ALL, dry_run, &mut report);
        }
        EscalationTier::Emergency => {
            cleanup::evict_oldest(config, dry_run, &mut report);
            cleanup::compact_logs(config, dry_run, &mut report);
            cleanup::sweep_categories(config, &Category::ALL, dry_run, &mut report);
        }
    }

    (Some(tier), report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
