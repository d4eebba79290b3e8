//! Cooperative cancellation for long-running camera operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation token shared between a running exposure/readout and whoever
/// may want to cancel it.
///
/// Clones share one flag. Drivers only ever read it; setting it from any
/// thread or task is the only external mutation.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    flag: Arc<AtomicBool>,
}

impl AbortSignal {
    /// Signal that is not set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Re-arm the token for another operation.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
