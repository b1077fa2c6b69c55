//! Partitioned result store.
//!
//! Four independent concurrent maps per result kind. The partition is
//! chosen by the physical-ness of the reference's anchor and by the
//! incomplete-code flag of the request:
//!
//! | Partition | physical | incomplete_code |
//! |-----------|----------|-----------------|
//! | 0 | yes | no |
//! | 1 | yes | yes |
//! | 2 | no | no |
//! | 3 | no | yes |
//!
//! Splitting on physical-ness lets a structural edit drop only the physical
//! partitions. Splitting on the incomplete-code flag keeps the lenient and
//! strict answers for the same reference apart.

use crate::generation::GenerationCounter;
use crate::slot::{RefKey, ReclaimableSlot, prune_dead_slots, reclaim_slots};
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

/// Number of partitions per store.
pub const PARTITION_COUNT: usize = 4;

/// Successful writes between two sweeps for entries whose key is gone.
pub const DEFAULT_PRUNE_INTERVAL: usize = 1024;

/// One of the four key spaces of a [`PartitionedStore`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Partition(u8);

impl Partition {
    /// All partitions, in index order.
    pub const ALL: [Self; PARTITION_COUNT] = [Self(0), Self(1), Self(2), Self(3)];

    /// Partitions holding results for physical anchors.
    pub const PHYSICAL: [Self; 2] = [Self(0), Self(1)];

    /// Partitions holding results for non-physical anchors.
    pub const NON_PHYSICAL: [Self; 2] = [Self(2), Self(3)];

    /// `((physical ? 0 : 1) << 1) | (incomplete_code ? 1 : 0)`
    #[inline]
    pub const fn of(physical: bool, incomplete_code: bool) -> Self {
        let physical_bit = if physical { 0 } else { 1 };
        let incomplete_bit = if incomplete_code { 1 } else { 0 };
        Self((physical_bit << 1) | incomplete_bit)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_physical(self) -> bool {
        self.0 & 0b10 == 0
    }

    #[inline]
    pub const fn is_incomplete_code(self) -> bool {
        self.0 & 0b01 != 0
    }
}

type SlotMap<T, V> = DashMap<RefKey, ReclaimableSlot<T, V>, FxBuildHasher>;

/// Identity-keyed, generation-checked result store.
///
/// Reads and writes only take `DashMap` shard locks, never a store-wide
/// lock, and no lock is held after a method returns.
pub struct PartitionedStore<T: ?Sized, V> {
    /// Label for log events ("single", "poly", ...).
    kind: &'static str,
    partitions: [SlotMap<T, V>; PARTITION_COUNT],
    generation: Arc<GenerationCounter>,
    /// `0` disables write-driven pruning.
    prune_interval: usize,
    writes: AtomicUsize,
}

impl<T: ?Sized, V: Clone> PartitionedStore<T, V> {
    /// Create an empty store that validates writes against `generation`.
    pub fn new(kind: &'static str, generation: Arc<GenerationCounter>) -> Self {
        Self::with_capacity(kind, generation, 0)
    }

    /// Like [`new`](Self::new), pre-sizing every partition map.
    pub fn with_capacity(
        kind: &'static str,
        generation: Arc<GenerationCounter>,
        capacity: usize,
    ) -> Self {
        Self {
            kind,
            partitions: std::array::from_fn(|_| {
                DashMap::with_capacity_and_hasher(capacity, FxBuildHasher)
            }),
            generation,
            prune_interval: DEFAULT_PRUNE_INTERVAL,
            writes: AtomicUsize::new(0),
        }
    }

    /// Every `interval` successful writes, sweep the partition just written
    /// for dead keys. `0` leaves dead keys to [`reclaim`](Self::reclaim) and
    /// the clears.
    pub fn with_prune_interval(mut self, interval: usize) -> Self {
        self.prune_interval = interval;
        self
    }

    /// The counter this store validates writes against.
    pub fn generation(&self) -> &Arc<GenerationCounter> {
        &self.generation
    }

    #[inline]
    fn map(&self, partition: Partition) -> &SlotMap<T, V> {
        &self.partitions[partition.index()]
    }

    /// Cached value for `reference`, or `None` if absent or reclaimed.
    pub fn get(&self, reference: &Arc<T>, physical: bool, incomplete_code: bool) -> Option<V> {
        let partition = Partition::of(physical, incomplete_code);
        let slot = self.map(partition).get(&RefKey::of(reference))?;
        let value = slot.payload().cloned();
        if value.is_none() {
            trace!(
                target: "refcache::resolve",
                kind = self.kind,
                partition = partition.index(),
                "slot reclaimed"
            );
        }
        value
    }

    /// Store `value` for `reference` if no invalidation happened since
    /// `start_generation` was captured.
    ///
    /// Returns `false` when the write was dropped as stale. A clear that
    /// lands between the generation check and the insert is caught by a
    /// second check after the insert, which takes the fresh slot back out.
    pub fn put(
        &self,
        reference: &Arc<T>,
        value: V,
        physical: bool,
        incomplete_code: bool,
        start_generation: u64,
    ) -> bool {
        let partition = Partition::of(physical, incomplete_code);
        if !self.generation.is_current(start_generation) {
            debug!(
                target: "refcache::resolve",
                kind = self.kind,
                partition = partition.index(),
                start_generation,
                current_generation = self.generation.current(),
                "dropping stale write"
            );
            return false;
        }

        let key = RefKey::of(reference);
        let map = self.map(partition);
        map.insert(
            key,
            ReclaimableSlot::new(reference, start_generation, value),
        );

        if !self.generation.is_current(start_generation) {
            map.remove_if(&key, |_, slot| slot.generation() == start_generation);
            debug!(
                target: "refcache::resolve",
                kind = self.kind,
                partition = partition.index(),
                start_generation,
                "invalidated during write, slot withdrawn"
            );
            return false;
        }

        trace!(
            target: "refcache::resolve",
            kind = self.kind,
            partition = partition.index(),
            generation = start_generation,
            "stored"
        );
        self.prune_if_due(map, partition);
        true
    }

    fn prune_if_due(&self, map: &SlotMap<T, V>, partition: Partition) {
        if self.prune_interval == 0 {
            return;
        }
        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % self.prune_interval != 0 {
            return;
        }
        let pruned = prune_dead_slots(map);
        if pruned > 0 {
            debug!(
                kind = self.kind,
                partition = partition.index(),
                pruned,
                "pruned entries of dropped references"
            );
        }
    }

    /// Empty all four partitions.
    ///
    /// Every invalidation bumps the generation both before and after touching
    /// the maps. A resolution that captured the intermediate value may still
    /// have read an entry that was about to be cleared; the second bump makes
    /// its write stale.
    pub fn clear(&self) {
        self.generation.bump();
        for map in &self.partitions {
            map.clear();
        }
        let generation = self.generation.bump();
        debug!(kind = self.kind, generation, "PartitionedStore::clear");
    }

    /// Empty both physical partitions.
    pub fn clear_physical(&self) {
        self.generation.bump();
        for partition in Partition::PHYSICAL {
            self.map(partition).clear();
        }
        let generation = self.generation.bump();
        debug!(kind = self.kind, generation, "PartitionedStore::clear_physical");
    }

    /// Empty one partition.
    pub fn clear_partition(&self, partition: Partition) {
        self.generation.bump();
        self.map(partition).clear();
        let generation = self.generation.bump();
        debug!(
            kind = self.kind,
            generation,
            partition = partition.index(),
            "PartitionedStore::clear_partition"
        );
    }

    /// Drop `reference` from every partition. An invalidation like
    /// [`clear`](Self::clear).
    ///
    /// Returns `true` if any partition held an entry for it.
    pub fn remove(&self, reference: &Arc<T>) -> bool {
        self.generation.bump();
        let key = RefKey::of(reference);
        let mut removed = false;
        for map in &self.partitions {
            removed |= map.remove(&key).is_some();
        }
        self.generation.bump();
        removed
    }

    /// Drop every payload and remove entries whose key object is gone.
    ///
    /// Does not bump the generation: reclaiming forgets answers, it never
    /// makes one stale. Returns the number of payloads dropped.
    pub fn reclaim(&self) -> usize {
        let (reclaimed, pruned) = self
            .partitions
            .iter()
            .map(reclaim_slots)
            .fold((0, 0), |(r, p), (dr, dp)| (r + dr, p + dp));
        debug!(kind = self.kind, reclaimed, pruned, "PartitionedStore::reclaim");
        reclaimed
    }

    /// Whether `reference` has an entry (live or reclaimed) in `partition`.
    pub fn contains(&self, reference: &Arc<T>, partition: Partition) -> bool {
        self.map(partition).contains_key(&RefKey::of(reference))
    }

    /// Whether `reference` has a reclaimed entry in `partition`.
    pub fn is_reclaimed(&self, reference: &Arc<T>, partition: Partition) -> bool {
        self.map(partition)
            .get(&RefKey::of(reference))
            .is_some_and(|slot| slot.is_reclaimed())
    }

    /// Entries (live or reclaimed) in one partition.
    pub fn partition_len(&self, partition: Partition) -> usize {
        self.map(partition).len()
    }

    /// Entries (live or reclaimed) across all partitions.
    pub fn len(&self) -> usize {
        self.partitions.iter().map(DashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(DashMap::is_empty)
    }
}

#[cfg(test)]
#[path = "../tests/store_tests.rs"]
mod tests;
