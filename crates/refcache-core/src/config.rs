//! Cache configuration.

use crate::store::DEFAULT_PRUNE_INTERVAL;
use tracing::debug;

/// Environment variable that disables statistics when set to `0` or `false`.
pub const TRACK_STATS_ENV: &str = "REFCACHE_TRACK_STATS";

/// Environment variable with the per-partition initial map capacity.
pub const INITIAL_CAPACITY_ENV: &str = "REFCACHE_INITIAL_CAPACITY";

/// Environment variable with the dead-key sweep interval (`0` disables).
pub const PRUNE_INTERVAL_ENV: &str = "REFCACHE_PRUNE_INTERVAL";

/// Tunables for a [`ResolveCache`](crate::ResolveCache) and its companions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maintain hit/miss/refusal counters.
    pub track_stats: bool,
    /// Initial capacity of every partition map.
    pub initial_capacity: usize,
    /// Successful writes into a result store between sweeps for entries
    /// whose reference was dropped. `0` disables the sweep.
    pub prune_interval: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            track_stats: true,
            initial_capacity: 0,
            prune_interval: DEFAULT_PRUNE_INTERVAL,
        }
    }
}

impl CacheConfig {
    /// Builder: enable or disable statistics.
    pub const fn with_track_stats(mut self, track_stats: bool) -> Self {
        self.track_stats = track_stats;
        self
    }

    /// Builder: set the initial capacity of every partition map.
    pub const fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Builder: set the dead-key sweep interval.
    pub const fn with_prune_interval(mut self, prune_interval: usize) -> Self {
        self.prune_interval = prune_interval;
        self
    }

    /// Defaults overridden by `REFCACHE_TRACK_STATS`,
    /// `REFCACHE_INITIAL_CAPACITY` and `REFCACHE_PRUNE_INTERVAL`. Malformed
    /// values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup(TRACK_STATS_ENV) {
            match value.trim().to_lowercase().as_str() {
                "0" | "false" | "off" | "no" => config.track_stats = false,
                "1" | "true" | "on" | "yes" => config.track_stats = true,
                other => debug!(value = other, "ignoring malformed {TRACK_STATS_ENV}"),
            }
        }

        if let Some(value) = lookup(INITIAL_CAPACITY_ENV) {
            match value.trim().parse::<usize>() {
                Ok(capacity) => config.initial_capacity = capacity,
                Err(_) => debug!(value = %value, "ignoring malformed {INITIAL_CAPACITY_ENV}"),
            }
        }

        if let Some(value) = lookup(PRUNE_INTERVAL_ENV) {
            match value.trim().parse::<usize>() {
                Ok(interval) => config.prune_interval = interval,
                Err(_) => debug!(value = %value, "ignoring malformed {PRUNE_INTERVAL_ENV}"),
            }
        }

        config
    }
}

#[cfg(test)]
#[path = "../tests/config_tests.rs"]
mod tests;
