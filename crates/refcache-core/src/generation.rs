//! Invalidation generation counter.
//!
//! Every invalidation (full clear, partition clear, single-reference forget)
//! bumps the counter before touching any map and again once the maps are
//! emptied. A resolution captures the value before its store lookup and
//! hands it back at write time; if the two differ, some invalidation
//! overlapped the resolution and the result must not be cached.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing invalidation counter.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    value: AtomicU64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation.
    #[inline]
    pub fn current(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }

    /// Advance to the next generation and return it.
    #[inline]
    pub fn bump(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether no invalidation happened since `start` was captured.
    #[inline]
    pub fn is_current(&self, start: u64) -> bool {
        self.current() == start
    }
}
