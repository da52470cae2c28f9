//! Shared run counters and cooperative cancellation.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// A consistent view of the counters at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl ProgressSnapshot {
    /// Fraction processed, 0.0 to 1.0
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.processed as f64 / self.total as f64
    }

    pub fn is_complete(&self) -> bool {
        self.processed == self.total
    }
}

/// Counters shared by every worker of a run.
///
/// `processed` moves only through [`ProgressCounters::record`], once per
/// asset, together with the matching success or failure count.
#[derive(Debug, Default)]
pub struct ProgressCounters {
    state: Mutex<ProgressSnapshot>,
}

impl ProgressCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ProgressSnapshot> {
        // a panicking reader cannot leave the counters half-updated
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reset for a new run of `total` assets
    pub fn begin(&self, total: usize) {
        *self.lock() = ProgressSnapshot {
            total,
            ..ProgressSnapshot::default()
        };
    }

    /// Count one asset reaching a terminal result
    pub fn record(&self, succeeded: bool) -> ProgressSnapshot {
        let mut state = self.lock();
        state.processed += 1;
        if succeeded {
            state.succeeded += 1;
        } else {
            state.failed += 1;
        }
        *state
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.lock()
    }
}

/// Cooperative cancellation shared between a run and its caller.
///
/// Work already started finishes; nothing new starts once cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
