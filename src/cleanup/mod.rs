//! Cleanup orchestration -- the plan/apply passes behind the CLI verbs.
//!
//! Component order is fixed: compaction before sweep (cheap wins before
//! destructive ones), and under emergency the evictor runs before both
//! (survival outranks cheapness). Every pass is idempotent, so
//! overlapping invocations converge rather than diverge.

pub mod compact;
pub mod evict;
pub mod sweep;

use chrono::Utc;

use crate::config::StorageConfig;
use crate::plan::{self, CleanupReport};
use crate::targets::Category;

/// Log Compactor plus full Retention Sweep, regardless of current tier.
pub fn run_cleanup(config: &StorageConfig, dry_run: bool) -> CleanupReport {
    let mut report = CleanupReport::new(dry_run);
    compact_logs(config, dry_run, &mut report);
    sweep_categories(config, &Category::ALL, dry_run, &mut report);
    report
}

/// Emergency Evictor first, then the full cleanup pass.
pub fn run_emergency(config: &StorageConfig, dry_run: bool) -> CleanupReport {
    let mut report = CleanupReport::new(dry_run);
    evict_oldest(config, dry_run, &mut report);
    compact_logs(config, dry_run, &mut report);
    sweep_categories(config, &Category::ALL, dry_run, &mut report);
    report
}

/// Compact every oversized active log.
pub(crate) fn compact_logs(config: &StorageConfig, dry_run: bool, report: &mut CleanupReport) {
    for target in config
        .targets()
        .iter()
        .filter(|t| t.category == Category::Log)
    {
        let (actions, skipped) = compact::plan_compaction(
            target,
            config.compaction.cap_bytes(),
            config.compaction.retain_bytes,
        );
        report.skipped += skipped;
        plan::apply(actions, dry_run, report);
    }
}

/// Sweep the given categories against their retention windows. After a
/// real (non-dry-run) sweep of a recording target, directories left empty
/// under it are pruned; the target root is preserved.
pub(crate) fn sweep_categories(
    config: &StorageConfig,
    categories: &[Category],
    dry_run: bool,
    report: &mut CleanupReport,
) {
    let now = Utc::now();
    for target in config
        .targets()
        .iter()
        .filter(|t| categories.contains(&t.category))
    {
        let (actions, skipped) =
            sweep::plan_sweep(target, config.retention.max_age(target.category), now);
        report.skipped += skipped;
        plan::apply(actions, dry_run, report);

        if !dry_run && target.category == Category::Recording {
            sweep::prune_empty_dirs(&target.path);
        }
    }
}

/// One bounded emergency eviction pass over all targets.
pub(crate) fn evict_oldest(config: &StorageConfig, dry_run: bool, report: &mut CleanupReport) {
    let targets = config.targets();
    let (actions, skipped) = evict::plan_eviction(&targets, config.eviction.max_delete);
    report.skipped += skipped;
    plan::apply(actions, dry_run, report);
}
