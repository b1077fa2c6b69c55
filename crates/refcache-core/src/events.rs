//! Model change notification.
//!
//! The program model owns a [`ModelChangeTracker`] and calls it at well
//! defined points (after a batch edit commits). Caches subscribe as
//! [`ModelChangeListener`]s and drop whatever the event invalidates.
//!
//! | Event | Meaning | Resolve cache | Constants | Types |
//! |-------|---------|---------------|-----------|-------|
//! | structural | physical content changed | physical partitions | physical | all |
//! | any | anything changed | all partitions | all | all |

use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use tracing::debug;

/// Receiver of model change events.
pub trait ModelChangeListener: Send + Sync {
    /// Physical content changed structurally.
    fn on_structural_change(&self);

    /// Anything changed, physical or not.
    fn on_any_change(&self);
}

/// Fans model change events out to subscribed listeners.
///
/// Listeners are held weakly: a cache dropped by its owner silently
/// unsubscribes.
#[derive(Default)]
pub struct ModelChangeTracker {
    listeners: RwLock<Vec<Weak<dyn ModelChangeListener>>>,
    modification_count: AtomicU64,
}

impl ModelChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `listener` to every future event.
    pub fn subscribe<L>(&self, listener: &Arc<L>)
    where
        L: ModelChangeListener + 'static,
    {
        let weak: Weak<L> = Arc::downgrade(listener);
        let weak: Weak<dyn ModelChangeListener> = weak;
        match self.listeners.write() {
            Ok(mut listeners) => listeners.push(weak),
            Err(e) => e.into_inner().push(weak),
        }
    }

    /// Number of live subscribers.
    pub fn listener_count(&self) -> usize {
        match self.listeners.read() {
            Ok(listeners) => listeners.iter().filter(|l| l.strong_count() > 0).count(),
            Err(e) => e.into_inner().iter().filter(|l| l.strong_count() > 0).count(),
        }
    }

    /// Total events delivered so far.
    pub fn modification_count(&self) -> u64 {
        self.modification_count.load(Ordering::SeqCst)
    }

    /// Report a structural change to physical content.
    pub fn structural_change(&self) {
        let count = self.modification_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(modification_count = count, "ModelChangeTracker::structural_change");
        for listener in self.live_listeners() {
            listener.on_structural_change();
        }
    }

    /// Report a change of any kind.
    pub fn any_change(&self) {
        let count = self.modification_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(modification_count = count, "ModelChangeTracker::any_change");
        for listener in self.live_listeners() {
            listener.on_any_change();
        }
    }

    /// Upgrade listeners, dropping dead ones. Listeners are called after the
    /// lock is released so they may subscribe others.
    fn live_listeners(&self) -> SmallVec<[Arc<dyn ModelChangeListener>; 4]> {
        let mut listeners = match self.listeners.write() {
            Ok(listeners) => listeners,
            Err(e) => e.into_inner(),
        };
        let mut live = SmallVec::new();
        listeners.retain(|weak| match weak.upgrade() {
            Some(listener) => {
                live.push(listener);
                true
            }
            None => false,
        });
        live
    }
}

#[cfg(test)]
#[path = "../tests/events_tests.rs"]
mod tests;
