//! Memoized reference resolution.
//!
//! [`ResolveCache`] is the entry point callers use instead of invoking a
//! resolver directly. One cache exists per program model instance.
//!
//! ## Algorithm
//!
//! For a request `(reference, prevent_recursion, incomplete_code)`:
//!
//! 1. Bail out with `Cancelled` if the resolver reports cancellation.
//! 2. Capture the current generation.
//! 3. Return the cached result on a hit.
//! 4. For incomplete-code requests, resolve in complete-code mode first; a
//!    non-empty strict answer is preferred and stored for the lenient
//!    partition as well.
//! 5. If recursion prevention is on and this thread is already resolving the
//!    same anchor, answer "nothing" without calling the resolver.
//! 6. Call the resolver and store its result, unless the generation moved.
//!
//! Single-valued and poly-variant resolution share this algorithm and the
//! generation counter but have separate stores.

use crate::config::CacheConfig;
use crate::error::ResolveError;
use crate::events::ModelChangeListener;
use crate::generation::GenerationCounter;
use crate::recursion::RecursionGuard;
use crate::resolver::{CachedResult, Candidates, PolyVariantResolver, Resolver};
use crate::stats::{CacheStats, CacheStatsSnapshot};
use crate::store::{Partition, PartitionedStore};
use refcache_common::ModelNode;
use smallvec::SmallVec;
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};

/// Callback run after the cache drops its contents.
pub type ClearHook = Arc<dyn Fn() + Send + Sync>;

/// Generation-checked, recursion-safe memoization of reference resolution.
///
/// `T` is the reference type (held by callers as `Arc<T>`), `D` the
/// declaration type.
pub struct ResolveCache<T: ?Sized, D> {
    single: PartitionedStore<T, Option<D>>,
    poly: PartitionedStore<T, Candidates<D>>,
    generation: Arc<GenerationCounter>,
    guard: RecursionGuard,
    stats: CacheStats,
    clear_hooks: RwLock<Vec<ClearHook>>,
}

impl<T, D> Default for ResolveCache<T, D>
where
    T: ModelNode + ?Sized,
    D: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, D> ResolveCache<T, D>
where
    T: ModelNode + ?Sized,
    D: Clone + Send + Sync,
{
    /// Create a cache with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a cache with an explicit configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        let generation = Arc::new(GenerationCounter::new());
        let guard = RecursionGuard::new();
        debug!(?config, "ResolveCache::new");
        Self {
            single: PartitionedStore::with_capacity(
                "single",
                Arc::clone(&generation),
                config.initial_capacity,
            )
            .with_prune_interval(config.prune_interval),
            poly: PartitionedStore::with_capacity(
                "poly",
                Arc::clone(&generation),
                config.initial_capacity,
            )
            .with_prune_interval(config.prune_interval),
            generation,
            guard,
            stats: CacheStats::new(config.track_stats),
            clear_hooks: RwLock::new(Vec::new()),
        }
    }

    // -------------------------------------------------------------------------
    // Resolution
    // -------------------------------------------------------------------------

    /// Resolve `reference` to at most one declaration, using the cache.
    ///
    /// `Ok(None)` means "nothing", which is also the answer for a call
    /// refused by the recursion guard. Callers passing
    /// `prevent_recursion = true` must not read such a `None` as a final
    /// verdict: the outer call on the stack will fill the cache.
    pub fn resolve<R>(
        &self,
        reference: &Arc<T>,
        resolver: &R,
        prevent_recursion: bool,
        incomplete_code: bool,
    ) -> Result<Option<D>, ResolveError<R::Error>>
    where
        R: Resolver<T, D> + ?Sized,
    {
        self.resolve_with_caching(
            &self.single,
            reference,
            prevent_recursion,
            incomplete_code,
            true,
            &|| resolver.is_cancelled(),
            &|reference: &Arc<T>, incomplete_code: bool| {
                resolver.resolve(reference, incomplete_code)
            },
        )
    }

    /// Resolve `reference` to a ranked candidate list, using the cache.
    ///
    /// An empty list means "nothing" (or a refused recursive call).
    pub fn resolve_poly_variant<R>(
        &self,
        reference: &Arc<T>,
        resolver: &R,
        prevent_recursion: bool,
        incomplete_code: bool,
    ) -> Result<Candidates<D>, ResolveError<R::Error>>
    where
        R: PolyVariantResolver<T, D> + ?Sized,
    {
        self.resolve_with_caching(
            &self.poly,
            reference,
            prevent_recursion,
            incomplete_code,
            true,
            &|| resolver.is_cancelled(),
            &|reference: &Arc<T>, incomplete_code: bool| {
                resolver.resolve(reference, incomplete_code).map(Arc::from)
            },
        )
    }

    /// `count_lookup` is `false` for the strict lookup nested inside an
    /// incomplete-code request, so each caller request counts once as a hit
    /// or a miss.
    fn resolve_with_caching<V, E, C, F>(
        &self,
        store: &PartitionedStore<T, V>,
        reference: &Arc<T>,
        prevent_recursion: bool,
        incomplete_code: bool,
        count_lookup: bool,
        is_cancelled: &C,
        compute: &F,
    ) -> Result<V, ResolveError<E>>
    where
        V: CachedResult,
        C: Fn() -> bool,
        F: Fn(&Arc<T>, bool) -> Result<V, ResolveError<E>>,
    {
        if is_cancelled() {
            trace!(target: "refcache::resolve", "cancelled before lookup");
            return Err(ResolveError::Cancelled);
        }

        let physical = reference.is_physical();
        let start_generation = self.generation.current();

        if let Some(cached) = store.get(reference, physical, incomplete_code) {
            if count_lookup {
                self.stats.record_hit();
            }
            trace!(
                target: "refcache::resolve",
                anchor = %reference.anchor(),
                physical,
                incomplete_code,
                "cache hit"
            );
            return Ok(cached);
        }
        if count_lookup {
            self.stats.record_miss();
        }

        if incomplete_code {
            let complete = self.resolve_with_caching(
                store,
                reference,
                prevent_recursion,
                false,
                false,
                is_cancelled,
                compute,
            )?;
            if !complete.is_unresolved() {
                self.stats.record_complete_code_reuse();
                self.store_result(
                    store,
                    reference,
                    complete.clone(),
                    physical,
                    true,
                    start_generation,
                );
                return Ok(complete);
            }
        }

        let lock = if prevent_recursion {
            match self.guard.try_lock(reference.anchor()) {
                Some(lock) => Some(lock),
                None => {
                    self.stats.record_recursion_refusal();
                    return Ok(V::refused());
                }
            }
        } else {
            None
        };

        trace!(
            target: "refcache::resolve",
            anchor = %reference.anchor(),
            physical,
            incomplete_code,
            start_generation,
            "cache miss, invoking resolver"
        );
        let result = compute(reference, incomplete_code);
        drop(lock);
        let result = result?;

        self.store_result(
            store,
            reference,
            result.clone(),
            physical,
            incomplete_code,
            start_generation,
        );
        Ok(result)
    }

    fn store_result<V: CachedResult>(
        &self,
        store: &PartitionedStore<T, V>,
        reference: &Arc<T>,
        value: V,
        physical: bool,
        incomplete_code: bool,
        start_generation: u64,
    ) {
        if !store.put(reference, value, physical, incomplete_code, start_generation) {
            self.stats.record_stale_write();
        }
    }

    // -------------------------------------------------------------------------
    // Lookup without computing
    // -------------------------------------------------------------------------

    /// Cached single-valued result, without calling any resolver.
    ///
    /// The outer `None` means "not cached".
    pub fn cached(&self, reference: &Arc<T>, incomplete_code: bool) -> Option<Option<D>> {
        self.single
            .get(reference, reference.is_physical(), incomplete_code)
    }

    /// Cached poly-variant result, without calling any resolver.
    pub fn cached_poly_variant(
        &self,
        reference: &Arc<T>,
        incomplete_code: bool,
    ) -> Option<Candidates<D>> {
        self.poly
            .get(reference, reference.is_physical(), incomplete_code)
    }

    // -------------------------------------------------------------------------
    // Invalidation
    // -------------------------------------------------------------------------

    /// Drop every cached result for `reference`, in all partitions of both
    /// stores. Counts as an invalidation: in-flight resolutions will not
    /// store their results.
    pub fn forget(&self, reference: &Arc<T>) {
        let single = self.single.remove(reference);
        let poly = self.poly.remove(reference);
        debug!(
            anchor = %reference.anchor(),
            removed = single || poly,
            "ResolveCache::forget"
        );
    }

    /// Drop everything, in all partitions of both stores.
    pub fn clear_all(&self) {
        self.single.clear();
        self.poly.clear();
        self.stats.record_clear();
        self.run_clear_hooks();
    }

    /// Drop results for physical anchors only.
    pub fn clear_physical(&self) {
        self.single.clear_physical();
        self.poly.clear_physical();
        self.stats.record_clear();
        self.run_clear_hooks();
    }

    /// Drop every payload and prune entries whose reference is gone.
    ///
    /// The host calls this under memory pressure. Entries survive as
    /// reclaimed and are recomputed on the next request.
    pub fn reclaim(&self) -> usize {
        let reclaimed = self.single.reclaim() + self.poly.reclaim();
        self.stats.record_reclaimed(reclaimed);
        reclaimed
    }

    /// Register a callback to run after every [`clear_all`](Self::clear_all)
    /// and [`clear_physical`](Self::clear_physical).
    pub fn add_clear_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        let hook: ClearHook = Arc::new(hook);
        match self.clear_hooks.write() {
            Ok(mut hooks) => hooks.push(hook),
            Err(e) => e.into_inner().push(hook),
        }
    }

    fn run_clear_hooks(&self) {
        // Snapshot first so a hook may register further hooks.
        let hooks: SmallVec<[ClearHook; 4]> = match self.clear_hooks.read() {
            Ok(hooks) => hooks.iter().cloned().collect(),
            Err(e) => e.into_inner().iter().cloned().collect(),
        };
        for hook in hooks {
            hook();
        }
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    /// Current invalidation generation.
    pub fn generation(&self) -> u64 {
        self.generation.current()
    }

    /// Counters since creation (or the last [`CacheStats::reset`]).
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// The recursion guard scoping this cache's per-thread registrations.
    pub fn recursion_guard(&self) -> &RecursionGuard {
        &self.guard
    }

    /// Entries (live or reclaimed) in one single-valued partition.
    pub fn single_partition_len(&self, partition: Partition) -> usize {
        self.single.partition_len(partition)
    }

    /// Entries (live or reclaimed) in one poly-variant partition.
    pub fn poly_partition_len(&self, partition: Partition) -> usize {
        self.poly.partition_len(partition)
    }

    /// Entries (live or reclaimed) across both stores.
    pub fn len(&self) -> usize {
        self.single.len() + self.poly.len()
    }

    pub fn is_empty(&self) -> bool {
        self.single.is_empty() && self.poly.is_empty()
    }
}

impl<T, D> ModelChangeListener for ResolveCache<T, D>
where
    T: ModelNode + ?Sized,
    D: Clone + Send + Sync,
{
    fn on_structural_change(&self) {
        self.clear_physical();
    }

    fn on_any_change(&self) {
        self.clear_all();
    }
}

#[cfg(test)]
#[path = "../tests/resolve_cache_tests.rs"]
mod tests;
