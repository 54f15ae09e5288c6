//! Per-run progress accounting.

use std::sync::atomic::{AtomicU64, Ordering};

/// File-completion counter for one reconciliation run.
///
/// The tracker is shared by reference through the recursive call tree and
/// may be observed concurrently (UI overlay, log line, HTTP response), so
/// the counters are atomic. `file_done` is called after a file operation
/// completes, never before, so an observer polling `percent` cannot
/// overshoot. Within one run the percentage is non-decreasing and reaches
/// 100 only after the last file resolves.
#[derive(Debug)]
pub struct ProgressTracker {
    completed: AtomicU64,
    total: AtomicU64,
}

impl ProgressTracker {
    /// Create an idle tracker.
    pub fn new() -> Self {
        Self {
            completed: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Start a run over `total` files, resetting the completion count.
    pub fn begin(&self, total: u64) {
        self.completed.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
    }

    /// Record one completed file operation and return the new percentage.
    pub fn file_done(&self) -> u8 {
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.percent()
    }

    /// Files completed so far in the current run.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Total files in the current run.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    /// Current completion percentage (0-100).
    ///
    /// A run over zero files is complete by definition.
    pub fn percent(&self) -> u8 {
        let total = self.total();
        if total == 0 {
            return 100;
        }
        let completed = self.completed().min(total);
        ((completed * 100) / total) as u8
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
