//! Commit fencing for torn-down caches
//!
//! Every background fetch shares the fence of the cache that spawned it.
//! Shutdown raises the fence; a fetch that finishes afterwards drops its
//! result instead of committing, so a dead session can never write into
//! a live one. Results committed before the fence went up remain valid.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Fence between fetch completion and view mutation
///
/// Raised at most once, on shutdown, and never lowered. Checks are
/// advisory: a fetch in the middle of a network call only notices at
/// its next commit point.
#[derive(Debug, Clone, Default)]
pub struct CommitFence {
    raised: Arc<AtomicBool>,
}

impl CommitFence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Permanently bar further commits
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Relaxed);
    }

    /// Whether commits are barred
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_fence_admits_commits() {
        assert!(!CommitFence::new().is_raised());
    }

    #[test]
    fn raising_reaches_every_fetch_holding_a_clone() {
        let fence = CommitFence::new();
        let held_by_fetch = fence.clone();
        assert!(!held_by_fetch.is_raised());

        fence.raise();
        assert!(held_by_fetch.is_raised());
        // Raising again is harmless; the fence never lowers
        held_by_fetch.raise();
        assert!(fence.is_raised());
    }
}
