//! Cache effectiveness counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters updated on the resolve path.
///
/// All updates use relaxed ordering; the numbers are diagnostics, not
/// synchronisation. When disabled every `record_*` call is a no-op.
#[derive(Debug, Default)]
pub struct CacheStats {
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
    recursion_refusals: AtomicU64,
    stale_writes_dropped: AtomicU64,
    complete_code_reuses: AtomicU64,
    clears: AtomicU64,
    reclaimed: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub recursion_refusals: u64,
    pub stale_writes_dropped: u64,
    pub complete_code_reuses: u64,
    pub clears: u64,
    pub reclaimed: u64,
}

impl CacheStatsSnapshot {
    /// Fraction of lookups answered from the cache, or `0.0` before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

macro_rules! counter {
    ($record:ident, $field:ident) => {
        #[inline]
        pub(crate) fn $record(&self) {
            if self.enabled {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        }
    };
}

impl CacheStats {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    /// Whether counters are being maintained.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    counter!(record_hit, hits);
    counter!(record_miss, misses);
    counter!(record_recursion_refusal, recursion_refusals);
    counter!(record_stale_write, stale_writes_dropped);
    counter!(record_complete_code_reuse, complete_code_reuses);
    counter!(record_clear, clears);

    #[inline]
    pub(crate) fn record_reclaimed(&self, count: usize) {
        if self.enabled && count > 0 {
            self.reclaimed.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            recursion_refusals: self.recursion_refusals.load(Ordering::Relaxed),
            stale_writes_dropped: self.stale_writes_dropped.load(Ordering::Relaxed),
            complete_code_reuses: self.complete_code_reuses.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.recursion_refusals,
            &self.stale_writes_dropped,
            &self.complete_code_reuses,
            &self.clears,
            &self.reclaimed,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
