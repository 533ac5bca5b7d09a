//! Process-scoped live-handle counting for leak diagnostics.
//!
//! Nothing in the library reads these counts to make decisions. A host that
//! wants to assert "every handle was released" at teardown creates one
//! [`RefTracker`], injects it into the sources and [`crate::RomData`]
//! instances it opens, and checks [`RefTracker::live`] at the end.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared counter of live tracked handles.
#[derive(Debug, Clone, Default)]
pub struct RefTracker {
    live: Arc<AtomicUsize>,
}

impl RefTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked handles currently alive.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Count one more live handle until the returned guard is dropped.
    pub(crate) fn guard(&self) -> TrackerGuard {
        self.live.fetch_add(1, Ordering::AcqRel);
        TrackerGuard {
            tracker: self.clone(),
        }
    }
}

/// One counted handle. Decrements the tracker on drop.
#[derive(Debug)]
pub(crate) struct TrackerGuard {
    tracker: RefTracker,
}

impl TrackerGuard {
    pub(crate) fn tracker(&self) -> &RefTracker {
        &self.tracker
    }
}

impl Clone for TrackerGuard {
    fn clone(&self) -> Self {
        self.tracker.guard()
    }
}

impl Drop for TrackerGuard {
    fn drop(&mut self) {
        self.tracker.live.fetch_sub(1, Ordering::AcqRel);
    }
}
