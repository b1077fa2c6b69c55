//! Per-thread recursion guard for cached resolution.
//!
//! Resolving a reference sometimes requires resolving another reference
//! owned by the same element (a type parameter bound mentioning the type it
//! bounds, a field initializer naming its own class). On a single call stack
//! that would recurse forever. The guard records which anchors the current
//! thread is resolving; a second attempt for the same anchor is refused and
//! the caller answers "nothing" for that inner call. The outer call still
//! completes and fills the cache.
//!
//! # Design
//!
//! The registry is a thread-local set of `(guard instance, anchor)` pairs:
//! - Only the current thread is ever consulted, so there is no shared lock
//!   and nothing can be held across the resolver call.
//! - Other threads resolving the same anchor are never refused.
//! - The guard instance id keeps two caches (two program models) on the same
//!   thread from refusing each other.
//!
//! Locks are RAII values. Dropping a [`RecursionLock`] unregisters the anchor,
//! including while unwinding from a panicking resolver.

use refcache_common::ElementId;
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Source of unique guard instance ids.
static NEXT_GUARD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Anchors being resolved on this thread, tagged with the owning guard.
    static RESOLVING: RefCell<FxHashSet<(u64, ElementId)>> =
        RefCell::new(FxHashSet::default());
}

/// Refuses re-entrant resolution of an anchor on the same thread.
#[derive(Debug)]
pub struct RecursionGuard {
    instance_id: u64,
}

impl Default for RecursionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl RecursionGuard {
    pub fn new() -> Self {
        Self {
            instance_id: NEXT_GUARD_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Register the current thread as resolving `anchor`.
    ///
    /// Returns `None` if this thread already holds `anchor`. Otherwise the
    /// returned lock must be kept alive for the duration of the resolution.
    pub fn try_lock(&self, anchor: ElementId) -> Option<RecursionLock> {
        let entered = RESOLVING.with(|set| set.borrow_mut().insert((self.instance_id, anchor)));
        if !entered {
            trace!(
                target: "refcache::resolve",
                guard = self.instance_id,
                %anchor,
                "recursion refused"
            );
            return None;
        }
        Some(RecursionLock {
            instance_id: self.instance_id,
            anchor,
            _not_send: PhantomData,
        })
    }

    /// Whether the current thread holds `anchor`.
    pub fn is_locked_by_current_thread(&self, anchor: ElementId) -> bool {
        RESOLVING.with(|set| set.borrow().contains(&(self.instance_id, anchor)))
    }

    /// Number of anchors the current thread holds on this guard.
    pub fn held_by_current_thread(&self) -> usize {
        RESOLVING.with(|set| {
            set.borrow()
                .iter()
                .filter(|(id, _)| *id == self.instance_id)
                .count()
        })
    }
}

/// Registration of one anchor on the current thread.
///
/// Not `Send`: it must be released on the thread that took it.
#[must_use = "dropping the lock immediately unregisters the anchor"]
#[derive(Debug)]
pub struct RecursionLock {
    instance_id: u64,
    anchor: ElementId,
    _not_send: PhantomData<*const ()>,
}

impl RecursionLock {
    /// The anchor this lock registers.
    pub fn anchor(&self) -> ElementId {
        self.anchor
    }

    /// Release the lock. Equivalent to dropping it.
    pub fn unlock(self) {}
}

impl Drop for RecursionLock {
    fn drop(&mut self) {
        let key = (self.instance_id, self.anchor);
        // `try_with`: the thread-local may already be gone during thread teardown.
        let was_present = RESOLVING
            .try_with(|set| set.borrow_mut().remove(&key))
            .unwrap_or(true);

        debug_assert!(
            was_present,
            "RecursionLock released for an anchor that is not registered on this thread"
        );
    }
}

#[cfg(test)]
#[path = "../tests/recursion_tests.rs"]
mod tests;
