//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is shared between whoever issued a request and the
//! code doing the work. Cancelling flips a flag; long-running code polls it
//! with [`CancellationToken::check`] at convenient points and bails out with
//! [`Cancelled`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Signal that a computation observed a cancellation request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[error("resolution was cancelled")]
pub struct Cancelled;

/// Shared cancellation flag.
///
/// Cloning produces another handle to the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a fresh, non-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            debug!("CancellationToken::cancel");
        }
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any handle.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns `Err(Cancelled)` if cancellation was requested.
    #[inline]
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "../tests/cancel_tests.rs"]
mod tests;
