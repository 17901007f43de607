//! The sync guard
//!
//! Engine writes to the flow file and the files directory would otherwise
//! be seen by the watchers and trigger another sync. While a [`SyncScope`]
//! is alive the guard reports held and watcher callbacks are suppressed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared "engine is writing" flag
///
/// Cloning yields another handle to the same flag. Overlapping scopes are
/// counted, so the guard is only released when the last scope drops.
#[derive(Debug, Clone, Default)]
pub struct SyncGuard {
    holders: Arc<AtomicUsize>,
}

impl SyncGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the guard until the returned scope is dropped
    pub fn hold(&self) -> SyncScope {
        self.holders.fetch_add(1, Ordering::SeqCst);
        SyncScope {
            holders: self.holders.clone(),
        }
    }

    /// Whether any scope is currently alive
    pub fn is_held(&self) -> bool {
        self.holders.load(Ordering::SeqCst) > 0
    }
}

/// RAII scope returned by [`SyncGuard::hold`]
#[must_use = "the guard is released as soon as the scope is dropped"]
#[derive(Debug)]
pub struct SyncScope {
    holders: Arc<AtomicUsize>,
}

impl Drop for SyncScope {
    fn drop(&mut self) {
        self.holders.fetch_sub(1, Ordering::SeqCst);
    }
}
