//! Reclaimable slots and identity keys.
//!
//! A slot is what a cache map stores for one key object. It has three
//! observable states:
//!
//! | State | Map entry | `payload()` | Meaning |
//! |-------|-----------|-------------|---------|
//! | absent | no | - | never computed, or cleared |
//! | live | yes | `Some` | cached |
//! | reclaimed | yes | `None` | computed once, payload dropped |
//!
//! Only *live* answers a lookup. *Reclaimed* is a miss, exactly like
//! *absent*, but tells diagnostics that the entry was evicted rather than
//! never filled.
//!
//! Each slot also keeps a `Weak` handle to its key object. Holding the weak
//! count pins the allocation, so the address used as [`RefKey`] can never be
//! handed to another object while the entry exists. When every strong handle
//! is gone the entry is dead: it can never be hit again, but it keeps its
//! payload and the key allocation until something removes it. The result
//! stores sweep dead entries on write, every
//! [`prune_interval`](crate::CacheConfig::prune_interval) writes; otherwise
//! [`reclaim`](crate::ResolveCache::reclaim) or a clear removes them. Hosts
//! that disable the sweep should call `reclaim` periodically.

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::{Arc, Weak};

/// Identity of a key object: the address of its `Arc` allocation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct RefKey(usize);

impl RefKey {
    #[inline]
    pub(crate) fn of<T: ?Sized>(object: &Arc<T>) -> Self {
        Self(Arc::as_ptr(object) as *const () as usize)
    }
}

/// A cached value whose payload may be dropped without removing the entry.
#[derive(Debug)]
pub struct ReclaimableSlot<K: ?Sized, V> {
    owner: Weak<K>,
    generation: u64,
    payload: Option<V>,
}

impl<K: ?Sized, V> ReclaimableSlot<K, V> {
    /// Create a live slot for `owner`, written in `generation`.
    pub fn new(owner: &Arc<K>, generation: u64, value: V) -> Self {
        Self {
            owner: Arc::downgrade(owner),
            generation,
            payload: Some(value),
        }
    }

    /// The payload, unless it was reclaimed.
    #[inline]
    pub fn payload(&self) -> Option<&V> {
        self.payload.as_ref()
    }

    /// Generation the slot was written in.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the payload was dropped.
    #[inline]
    pub fn is_reclaimed(&self) -> bool {
        self.payload.is_none()
    }

    /// Whether the key object still has strong handles.
    #[inline]
    pub fn is_owner_alive(&self) -> bool {
        self.owner.strong_count() > 0
    }

    /// Drop the payload. Returns `true` if there was one.
    pub fn reclaim(&mut self) -> bool {
        self.payload.take().is_some()
    }
}

/// Drop every payload in `map` and remove entries whose owner is gone.
///
/// Returns `(reclaimed, pruned)`.
pub(crate) fn reclaim_slots<K: ?Sized, V>(
    map: &DashMap<RefKey, ReclaimableSlot<K, V>, FxBuildHasher>,
) -> (usize, usize) {
    let mut reclaimed = 0;
    let mut pruned = 0;
    map.retain(|_, slot| {
        if !slot.is_owner_alive() {
            pruned += 1;
            return false;
        }
        if slot.reclaim() {
            reclaimed += 1;
        }
        true
    });
    (reclaimed, pruned)
}

/// Remove entries whose owner is gone, leaving live payloads alone.
///
/// Returns the number of entries removed.
pub(crate) fn prune_dead_slots<K: ?Sized, V>(
    map: &DashMap<RefKey, ReclaimableSlot<K, V>, FxBuildHasher>,
) -> usize {
    let mut pruned = 0;
    map.retain(|_, slot| {
        let alive = slot.is_owner_alive();
        if !alive {
            pruned += 1;
        }
        alive
    });
    pruned
}
