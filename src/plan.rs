//! Planned cleanup actions and the apply phase.
//!
//! Planning is pure: the sweep, compactor, and evictor produce
//! [`CleanupAction`] values without touching the file system and without
//! consulting dry-run. [`apply`] is the single place that branches on
//! dry-run, which makes "the report equals what would happen" a structural
//! guarantee rather than a convention every call site must remember.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::cleanup::compact;
use crate::targets::Category;

// ---------------------------------------------------------------------------
// CleanupAction
// ---------------------------------------------------------------------------

/// The effect a planned action will have when applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Remove the file.
    Delete,
    /// Keep only the trailing `retain_bytes` of the file, via atomic replace.
    Truncate { retain_bytes: u64 },
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Delete => "delete",
            ActionKind::Truncate { .. } => "truncate",
        }
    }
}

/// A planned effect on one file: resolved by the planning pass, then either
/// executed or only reported.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupAction {
    pub kind: ActionKind,
    pub category: Category,
    pub path: PathBuf,
    /// Bytes this action is expected to free, from the size observed at
    /// stat time. The file may shrink or vanish before the action applies;
    /// the report keeps the observed figure.
    pub bytes: u64,
    /// Why this file was selected, for the diagnostic log.
    pub reason: String,
}

// ---------------------------------------------------------------------------
// CleanupReport
// ---------------------------------------------------------------------------

/// Per-category accounting for one invocation.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CategoryTotals {
    pub actions: u64,
    pub bytes: u64,
}

/// Aggregate of executed (or, under dry-run, planned) actions for one
/// invocation.
#[derive(Debug, Serialize)]
pub struct CleanupReport {
    pub dry_run: bool,
    pub actions: Vec<CleanupAction>,
    pub totals: BTreeMap<Category, CategoryTotals>,
    /// Files that could not be assessed (unreadable metadata).
    pub skipped: u64,
    /// Actions that failed to apply (permissions, file in use).
    pub failed: u64,
}

impl CleanupReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            actions: Vec::new(),
            totals: BTreeMap::new(),
            skipped: 0,
            failed: 0,
        }
    }

    fn record(&mut self, action: CleanupAction) {
        let totals = self.totals.entry(action.category).or_default();
        totals.actions += 1;
        totals.bytes += action.bytes;
        self.actions.push(action);
    }

    pub fn total_actions(&self) -> u64 {
        self.totals.values().map(|t| t.actions).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.totals.values().map(|t| t.bytes).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.failed == 0
    }
}

impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run { "planned" } else { "applied" };
        writeln!(
            f,
            "{} {} actions, {} {}",
            verb,
            self.total_actions(),
            format_mb(self.total_bytes()),
            if self.dry_run {
                "would be freed"
            } else {
                "freed"
            }
        )?;
        for (category, totals) in &self.totals {
            writeln!(
                f,
                "  {:<10} {} files, {}",
                category.as_str(),
                totals.actions,
                format_mb(totals.bytes)
            )?;
        }
        if self.skipped > 0 || self.failed > 0 {
            writeln!(f, "  skipped: {}, failed: {}", self.skipped, self.failed)?;
        }
        Ok(())
    }
}

/// Whole-megabyte formatting for human output.
pub fn format_mb(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

// ---------------------------------------------------------------------------
// Apply phase
// ---------------------------------------------------------------------------

/// Execute (or, under dry-run, merely record) a batch of planned actions.
///
/// Every action is logged before it is applied, so the diagnostic stream
/// alone can explain after the fact why a file disappeared. Per-file
/// failures are counted and skipped, never fatal to the rest of the batch.
pub fn apply(actions: Vec<CleanupAction>, dry_run: bool, report: &mut CleanupReport) {
    for action in actions {
        info!(
            kind = action.kind.as_str(),
            category = %action.category,
            path = %action.path.display(),
            bytes = action.bytes,
            reason = %action.reason,
            dry_run,
            "cleanup action"
        );

        if dry_run {
            report.record(action);
            continue;
        }

        let outcome = match action.kind {
            ActionKind::Delete => delete_file(&action.path),
            ActionKind::Truncate { retain_bytes } => {
                compact::truncate_file(&action.path, retain_bytes)
            }
        };

        match outcome {
            Ok(()) => report.record(action),
            Err(e) => {
                warn!(
                    path = %action.path.display(),
                    error = %e,
                    "cleanup action failed, continuing"
                );
                report.failed += 1;
            }
        }
    }
}

/// Unlink a file. A file that is already gone counts as success: a
/// concurrent invocation (or the pipeline itself) got there first.
fn delete_file(path: &std::path::Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
