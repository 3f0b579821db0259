//! Run accounting: attempted/succeeded counters, per-unit failures, and
//! periodic progress surfacing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::unit::Shape;

/// How often a progress line is surfaced, in attempted units.
pub const PROGRESS_EVERY: u64 = 100;

/// Callback invoked with `(attempted, total, percentage)` every
/// [`PROGRESS_EVERY`] attempted units.
pub type ProgressFn = Box<dyn Fn(u64, u64, f64) + Send + Sync>;

/// A recoverable failure recorded against one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitError {
    /// Unit identifier: the key, or the synthesized document key.
    pub unit: String,
    /// Human-readable failure description.
    pub message: String,
}

/// Final accounting for one migration run.
///
/// `attempted` counts units the run actually processed, not units listed:
/// key-value units with empty payloads are skipped before they count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Units processed.
    pub attempted: u64,
    /// Units that completed without error.
    pub succeeded: u64,
    /// Per-unit failures, in the order they occurred.
    pub errors: Vec<UnitError>,
    /// Succeeded key-value units by shape (empty in document mode).
    pub keys_by_shape: HashMap<Shape, u64>,
}

/// Tracks one run's progress and failures.
///
/// Purely sequential: the run processes one unit at a time, so plain
/// mutable state is all this needs.
pub struct ProgressTracker {
    total: u64,
    stats: RunStats,
    progress: Option<ProgressFn>,
}

impl ProgressTracker {
    /// Create a tracker for a run over `total` listed units.
    pub fn new(total: u64, progress: Option<ProgressFn>) -> Self {
        Self {
            total,
            stats: RunStats::default(),
            progress,
        }
    }

    /// Number of units the enumerator listed.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Record that a unit is about to be processed. Surfaces a progress
    /// line every [`PROGRESS_EVERY`] attempted units. Never divides by
    /// zero: a run over zero units surfaces no progress at all.
    pub fn on_attempt(&mut self) {
        self.stats.attempted += 1;
        if self.total > 0 && self.stats.attempted % PROGRESS_EVERY == 0 {
            let pct = self.stats.attempted as f64 / self.total as f64 * 100.0;
            info!(
                attempted = self.stats.attempted,
                total = self.total,
                "progress: {:.1}%",
                pct
            );
            if let Some(cb) = &self.progress {
                cb(self.stats.attempted, self.total, pct);
            }
        }
    }

    /// Record that the current unit completed without error.
    pub fn on_success(&mut self) {
        self.stats.succeeded += 1;
    }

    /// Record a recoverable failure. The run continues with the next unit.
    pub fn on_failure(&mut self, unit: &str, message: String) {
        warn!(unit, %message, "unit failed, continuing");
        self.stats.errors.push(UnitError {
            unit: unit.to_string(),
            message,
        });
    }

    /// Count a migrated key-value shape for the final summary.
    pub fn note_shape(&mut self, shape: Shape) {
        *self.stats.keys_by_shape.entry(shape).or_insert(0) += 1;
    }

    /// Point-in-time copy of the stats.
    pub fn snapshot(&self) -> RunStats {
        self.stats.clone()
    }

    /// Consume the tracker, yielding the final stats.
    pub fn finish(self) -> RunStats {
        self.stats
    }
}
