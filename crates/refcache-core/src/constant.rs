//! Constant-value memoization.
//!
//! Caches "what constant does this variable evaluate to" per variable
//! identity, split into physical and non-physical partitions like the
//! resolve cache. A variable whose value is not a constant is remembered as
//! such: the slot payload is `Option<C>`, so a present `None` is a hit that
//! answers "no constant" and a missing entry is a miss.
//!
//! There is no recursion guard. Cycles (`a = b + 1; b = a + 1`) are broken by
//! the caller-owned [`VisitedVars`] set that is threaded through to the
//! computer, which is expected to return `None` for a variable it has
//! already visited.

use crate::config::CacheConfig;
use crate::events::ModelChangeListener;
use crate::slot::{RefKey, ReclaimableSlot, reclaim_slots};
use dashmap::DashMap;
use refcache_common::{ElementId, ModelNode};
use rustc_hash::{FxBuildHasher, FxHashSet};
use std::sync::Arc;
use tracing::{debug, trace};

/// Variables already on the evaluation path.
pub type VisitedVars = FxHashSet<ElementId>;

type ConstantMap<V, C> = DashMap<RefKey, ReclaimableSlot<V, Option<C>>, FxBuildHasher>;

/// Memoizes variable -> constant value.
pub struct ConstantCache<V: ?Sized, C> {
    physical: ConstantMap<V, C>,
    non_physical: ConstantMap<V, C>,
}

impl<V, C> Default for ConstantCache<V, C>
where
    V: ModelNode + ?Sized,
    C: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, C> ConstantCache<V, C>
where
    V: ModelNode + ?Sized,
    C: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self::with_config(&CacheConfig::default())
    }

    pub fn with_config(config: &CacheConfig) -> Self {
        Self {
            physical: DashMap::with_capacity_and_hasher(config.initial_capacity, FxBuildHasher),
            non_physical: DashMap::with_capacity_and_hasher(
                config.initial_capacity,
                FxBuildHasher,
            ),
        }
    }

    fn map(&self, physical: bool) -> &ConstantMap<V, C> {
        if physical {
            &self.physical
        } else {
            &self.non_physical
        }
    }

    /// Constant value of `variable`, computing it with `computer` on a miss.
    ///
    /// `visited` is handed to `computer` untouched; the cache neither reads
    /// nor modifies it.
    pub fn compute_constant<F>(
        &self,
        variable: &Arc<V>,
        computer: F,
        visited: &mut VisitedVars,
    ) -> Option<C>
    where
        F: FnOnce(&Arc<V>, &mut VisitedVars) -> Option<C>,
    {
        let physical = variable.is_physical();
        let map = self.map(physical);
        let key = RefKey::of(variable);

        if let Some(slot) = map.get(&key) {
            if let Some(cached) = slot.payload() {
                trace!(variable = %variable.anchor(), physical, "constant cache hit");
                return cached.clone();
            }
        }

        // No map guard is held here: the computer may evaluate other
        // variables through this cache.
        let value = computer(variable, visited);
        map.insert(key, ReclaimableSlot::new(variable, 0, value.clone()));
        trace!(
            variable = %variable.anchor(),
            physical,
            is_constant = value.is_some(),
            "constant computed"
        );
        value
    }

    /// Cached answer without computing. The outer `None` means "not cached".
    pub fn cached(&self, variable: &Arc<V>) -> Option<Option<C>> {
        let slot = self.map(variable.is_physical()).get(&RefKey::of(variable))?;
        slot.payload().cloned()
    }

    /// Drop the physical partition (or both when `physical` is `false`).
    pub fn clear(&self, physical: bool) {
        self.physical.clear();
        if !physical {
            self.non_physical.clear();
        }
        debug!(physical_only = physical, "ConstantCache::clear");
    }

    /// Drop every payload and prune entries whose variable is gone.
    pub fn reclaim(&self) -> usize {
        let (physical, physical_pruned) = reclaim_slots(&self.physical);
        let (non_physical, non_physical_pruned) = reclaim_slots(&self.non_physical);
        let reclaimed = physical + non_physical;
        debug!(
            reclaimed,
            pruned = physical_pruned + non_physical_pruned,
            "ConstantCache::reclaim"
        );
        reclaimed
    }

    /// Entries in the physical or non-physical partition.
    pub fn partition_len(&self, physical: bool) -> usize {
        self.map(physical).len()
    }

    pub fn len(&self) -> usize {
        self.physical.len() + self.non_physical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.physical.is_empty() && self.non_physical.is_empty()
    }
}

impl<V, C> ModelChangeListener for ConstantCache<V, C>
where
    V: ModelNode + ?Sized,
    C: Clone + Send + Sync,
{
    fn on_structural_change(&self) {
        self.clear(true);
    }

    fn on_any_change(&self) {
        self.clear(false);
    }
}

#[cfg(test)]
#[path = "../tests/constant_tests.rs"]
mod tests;
