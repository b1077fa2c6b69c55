//! Expression type memoization.
//!
//! A single weak-identity map from expression to its computed type. Unlike
//! the resolve cache it is not partitioned and not generation-checked: any
//! model change drops the whole map. Whether a cached type is still usable
//! (for example because its declaration was deleted) is for the caller to
//! check after retrieval.

use crate::config::CacheConfig;
use crate::events::ModelChangeListener;
use crate::slot::{RefKey, ReclaimableSlot, reclaim_slots};
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use tracing::debug;

/// Memoizes expression -> type.
pub struct TypeCache<E: ?Sized, Ty> {
    types: DashMap<RefKey, ReclaimableSlot<E, Ty>, FxBuildHasher>,
}

impl<E, Ty> Default for TypeCache<E, Ty>
where
    E: Send + Sync + ?Sized,
    Ty: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, Ty> TypeCache<E, Ty>
where
    E: Send + Sync + ?Sized,
    Ty: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self::with_config(&CacheConfig::default())
    }

    pub fn with_config(config: &CacheConfig) -> Self {
        Self {
            types: DashMap::with_capacity_and_hasher(config.initial_capacity, FxBuildHasher),
        }
    }

    /// Cached type of `expr`, if any.
    pub fn get(&self, expr: &Arc<E>) -> Option<Ty> {
        self.types
            .get(&RefKey::of(expr))
            .and_then(|slot| slot.payload().cloned())
    }

    /// Type of `expr`, computing it with `f` on a miss.
    pub fn get_or_compute<F>(&self, expr: &Arc<E>, f: F) -> Ty
    where
        F: FnOnce(&Arc<E>) -> Ty,
    {
        if let Some(ty) = self.get(expr) {
            return ty;
        }
        // Computed outside any map guard: `f` usually asks for the types of
        // subexpressions through this same cache.
        let ty = f(expr);
        self.types
            .insert(RefKey::of(expr), ReclaimableSlot::new(expr, 0, ty.clone()));
        ty
    }

    pub fn clear(&self) {
        self.types.clear();
        debug!("TypeCache::clear");
    }

    /// Drop every payload and prune entries whose expression is gone.
    pub fn reclaim(&self) -> usize {
        let (reclaimed, pruned) = reclaim_slots(&self.types);
        debug!(reclaimed, pruned, "TypeCache::reclaim");
        reclaimed
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl<E, Ty> ModelChangeListener for TypeCache<E, Ty>
where
    E: Send + Sync + ?Sized,
    Ty: Clone + Send + Sync,
{
    fn on_structural_change(&self) {
        self.clear();
    }

    fn on_any_change(&self) {
        self.clear();
    }
}

#[cfg(test)]
#[path = "../tests/type_cache_tests.rs"]
mod tests;
