//! Cooperative cancellation for streamed responses.
//!
//! One boolean shared between the sidebar (which sets it when the user hits
//! "stop") and the stream consumer (which checks it on every increment).
//! Setting it never aborts the underlying request; it only ends local
//! consumption.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable handle to a single shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation (idempotent).
    pub fn cancel(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            tracing::debug!("Cancellation requested");
        }
    }

    /// Check the flag without blocking.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
