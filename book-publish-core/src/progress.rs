//! Progress reporting for a publish run.
//!
//! The pipeline pre-declares a budget of units and consumes it one tick at a time.
//! Ticks arrive from concurrent archive branches and from the upload body stream,
//! so sinks must be callable from any task without exclusive locking.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Host-facing progress capability.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait ProgressSink: Send + Sync {
    /// Sets the total budget.
    fn expand_to(&self, total: u64);
    /// Grows the total budget by `units`.
    fn expand_by(&self, units: u64);
    /// Consumes one unit.
    fn tick(&self);
    /// Marks the run complete, consuming whatever budget remains.
    fn fill(&self);
}

/// Lock-free progress counter that logs its percentage through `tracing`.
#[derive(Debug, Default)]
pub struct AtomicProgress {
    total: AtomicU64,
    done: AtomicU64,
    filled: AtomicBool,
}

impl AtomicProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::SeqCst)
    }

    pub fn is_filled(&self) -> bool {
        self.filled.load(Ordering::SeqCst)
    }

    fn percent(done: u64, total: u64) -> u64 {
        if total == 0 {
            0
        } else {
            done * 100 / total
        }
    }
}

impl ProgressSink for AtomicProgress {
    fn expand_to(&self, total: u64) {
        self.total.store(total, Ordering::SeqCst);
        debug!(total, "Progress budget set");
    }

    fn expand_by(&self, units: u64) {
        let total = self.total.fetch_add(units, Ordering::SeqCst) + units;
        debug!(units, total, "Progress budget expanded");
    }

    fn tick(&self) {
        let total = self.total();
        // Saturates at the declared total.
        let ticked = self
            .done
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |done| {
                (done < total).then_some(done + 1)
            });
        if let Ok(previous) = ticked {
            debug!(
                done = previous + 1,
                total,
                percent = Self::percent(previous + 1, total),
                "Progress"
            );
        }
    }

    fn fill(&self) {
        let total = self.total();
        self.done.store(total, Ordering::SeqCst);
        if !self.filled.swap(true, Ordering::SeqCst) {
            info!(total, "Progress complete");
        }
    }
}
