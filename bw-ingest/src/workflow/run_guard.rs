//! Single-run guard
//!
//! Refresh triggers reject instead of queueing: a second `POST /refresh`
//! while a run is active gets 409 Conflict, so the filings source and the
//! model are never hit by two runs at once.

use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Shared guard; clone freely
#[derive(Clone, Default)]
pub struct RunGuard {
    lock: Arc<Mutex<()>>,
}

/// Held for the duration of a run; released on drop
pub struct RunPermit {
    _guard: OwnedMutexGuard<()>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the run slot, or `None` if a run is already active
    pub fn try_start(&self) -> Option<RunPermit> {
        self.lock
            .clone()
            .try_lock_owned()
            .ok()
            .map(|guard| RunPermit { _guard: guard })
    }

    pub fn is_running(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}
