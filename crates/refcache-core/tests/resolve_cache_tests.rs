use super::*;
use crate::resolver::{Candidate, cancellable};
use refcache_common::{CancellationToken, ElementId};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug)]
struct TestRef {
    anchor: ElementId,
    physical: bool,
}

impl ModelNode for TestRef {
    fn anchor(&self) -> ElementId {
        self.anchor
    }

    fn is_physical(&self) -> bool {
        self.physical
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TestError(&'static str);

type Decl = Arc<str>;
type Cache = ResolveCache<TestRef, Decl>;
type SingleResult = Result<Option<Decl>, ResolveError<TestError>>;
type PolyResult = Result<Vec<Candidate<Decl>>, ResolveError<TestError>>;

fn physical_ref(anchor: u32) -> Arc<TestRef> {
    Arc::new(TestRef {
        anchor: ElementId(anchor),
        physical: true,
    })
}

fn transient_ref(anchor: u32) -> Arc<TestRef> {
    Arc::new(TestRef {
        anchor: ElementId(anchor),
        physical: false,
    })
}

fn decl(name: &str) -> Decl {
    Arc::from(name)
}

/// Pins the closure signature so the error type is known.
fn resolver<F>(f: F) -> F
where
    F: Fn(&Arc<TestRef>, bool) -> SingleResult,
{
    f
}

fn poly_resolver<F>(f: F) -> F
where
    F: Fn(&Arc<TestRef>, bool) -> PolyResult,
{
    f
}

// =============================================================================
// Memoization and invalidation
// =============================================================================

#[test]
fn test_resolve_is_memoized_until_any_change() {
    let cache = Cache::new();
    let ref1 = physical_ref(1);
    let calls = AtomicUsize::new(0);
    let r1 = resolver(|_, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(decl("X")))
    });

    let first = cache
        .resolve(&ref1, &r1, true, false)
        .expect("resolve")
        .expect("resolved");
    assert_eq!(&*first, "X");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let second = cache
        .resolve(&ref1, &r1, true, false)
        .expect("resolve")
        .expect("resolved");
    assert!(Arc::ptr_eq(&first, &second), "hit returns the cached instance");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cache.on_any_change();

    let third = cache
        .resolve(&ref1, &r1, true, false)
        .expect("resolve")
        .expect("resolved");
    assert_eq!(&*third, "X");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.clears, 1);
}

#[test]
fn test_empty_result_is_cached() {
    let cache = Cache::new();
    let reference = physical_ref(1);
    let calls = AtomicUsize::new(0);
    let unresolvable = resolver(|_, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    });

    assert_eq!(cache.resolve(&reference, &unresolvable, true, false).expect("resolve"), None);
    assert_eq!(cache.resolve(&reference, &unresolvable, true, false).expect("resolve"), None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.cached(&reference, false), Some(None));
}

#[test]
fn test_references_are_keyed_by_identity() {
    let cache = Cache::new();
    let a = physical_ref(1);
    let b = physical_ref(1);
    let calls = AtomicUsize::new(0);
    let r = resolver(|_, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(decl("same")))
    });

    cache.resolve(&a, &r, false, false).expect("resolve");
    cache.resolve(&b, &r, false, false).expect("resolve");
    cache.resolve(&Arc::clone(&a), &r, false, false).expect("resolve");

    assert_eq!(calls.load(Ordering::SeqCst), 2, "equal-looking references are distinct keys");
}

#[test]
fn test_structural_change_keeps_non_physical_results() {
    let cache = Cache::new();
    let physical = physical_ref(1);
    let transient = transient_ref(2);
    let r = resolver(|_, _| Ok(Some(decl("D"))));

    cache.resolve(&physical, &r, true, false).expect("resolve");
    cache.resolve(&transient, &r, true, false).expect("resolve");
    let before = cache.generation();

    cache.on_structural_change();

    assert!(cache.generation() > before);
    assert_eq!(cache.cached(&physical, false), None);
    assert_eq!(cache.cached(&transient, false), Some(Some(decl("D"))));

    cache.on_any_change();
    assert_eq!(cache.cached(&transient, false), None);
    assert!(cache.is_empty());
}

#[test]
fn test_forget_drops_one_reference_from_every_partition() {
    let cache = Cache::new();
    let forgotten = physical_ref(1);
    let kept = physical_ref(2);
    let calls = AtomicUsize::new(0);
    let r = resolver(|_, incomplete_code| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(if incomplete_code { Some(decl("lenient")) } else { None })
    });
    let poly = poly_resolver(|_, _| Ok(vec![Candidate::valid(decl("P"))]));

    cache.resolve(&forgotten, &r, false, true).expect("resolve");
    cache.resolve_poly_variant(&forgotten, &poly, false, false).expect("resolve");
    cache.resolve(&kept, &r, false, false).expect("resolve");
    assert_eq!(cache.len(), 4);
    let before = cache.generation();

    cache.forget(&forgotten);

    assert!(cache.generation() > before, "forget is an invalidation");
    assert_eq!(cache.cached(&forgotten, false), None);
    assert_eq!(cache.cached(&forgotten, true), None);
    assert_eq!(cache.cached_poly_variant(&forgotten, false), None);
    assert_eq!(cache.cached(&kept, false), Some(None));
    assert_eq!(cache.len(), 1);

    let calls_before = calls.load(Ordering::SeqCst);
    cache.resolve(&forgotten, &r, false, true).expect("resolve");
    assert!(calls.load(Ordering::SeqCst) > calls_before);
}

// =============================================================================
// Partitions and incomplete code
// =============================================================================

#[test]
fn test_partition_isolation() {
    let cache = Cache::new();
    let reference = physical_ref(1);
    let r = resolver(|_, _| Ok(Some(decl("D"))));

    cache.resolve(&reference, &r, false, false).expect("resolve");

    assert_eq!(cache.single_partition_len(Partition::of(true, false)), 1);
    assert_eq!(cache.single_partition_len(Partition::of(true, true)), 0);
    assert_eq!(cache.single_partition_len(Partition::of(false, false)), 0);
    assert_eq!(cache.single_partition_len(Partition::of(false, true)), 0);
    assert_eq!(cache.cached(&reference, true), None);

    for partition in Partition::ALL {
        assert_eq!(cache.poly_partition_len(partition), 0);
    }
}

#[test]
fn test_incomplete_code_reuses_non_empty_complete_result() {
    let cache = Cache::new();
    let reference = physical_ref(1);
    let seen = Mutex::new(Vec::new());
    let r = resolver(|_, incomplete_code| {
        seen.lock().expect("lock").push(incomplete_code);
        Ok(Some(decl(if incomplete_code { "lenient" } else { "strict" })))
    });

    let result = cache.resolve(&reference, &r, true, true).expect("resolve");

    assert_eq!(result.as_deref(), Some("strict"));
    assert_eq!(*seen.lock().expect("lock"), vec![false]);
    assert_eq!(cache.cached(&reference, false), Some(Some(decl("strict"))));
    assert_eq!(cache.cached(&reference, true), Some(Some(decl("strict"))));
    assert_eq!(cache.stats().complete_code_reuses, 1);

    // Both partitions are now warm.
    cache.resolve(&reference, &r, true, true).expect("resolve");
    cache.resolve(&reference, &r, true, false).expect("resolve");
    assert_eq!(seen.lock().expect("lock").len(), 1);
}

#[test]
fn test_incomplete_code_falls_back_when_complete_result_is_empty() {
    let cache = Cache::new();
    let reference = physical_ref(1);
    let seen = Mutex::new(Vec::new());
    let r = resolver(|_, incomplete_code| {
        seen.lock().expect("lock").push(incomplete_code);
        Ok(incomplete_code.then(|| decl("lenient")))
    });

    let result = cache.resolve(&reference, &r, true, true).expect("resolve");

    assert_eq!(result.as_deref(), Some("lenient"));
    assert_eq!(*seen.lock().expect("lock"), vec![false, true]);
    assert_eq!(cache.cached(&reference, false), Some(None));
    assert_eq!(cache.cached(&reference, true), Some(Some(decl("lenient"))));
    assert_eq!(cache.stats().complete_code_reuses, 0);
}

#[test]
fn test_poly_variant_incomplete_code_fallback() {
    let cache = Cache::new();
    let strict_ref = physical_ref(1);
    let lenient_ref = physical_ref(2);
    let seen = Mutex::new(Vec::new());
    let r = poly_resolver(|reference, incomplete_code| {
        seen.lock()
            .expect("lock")
            .push((reference.anchor, incomplete_code));
        Ok(match (reference.anchor.0, incomplete_code) {
            (1, _) => vec![Candidate::valid(decl("strict"))],
            (_, false) => Vec::new(),
            (_, true) => vec![Candidate::valid(decl("lenient"))],
        })
    });

    let strict = cache
        .resolve_poly_variant(&strict_ref, &r, true, true)
        .expect("resolve");
    let lenient = cache
        .resolve_poly_variant(&lenient_ref, &r, true, true)
        .expect("resolve");

    assert_eq!(&*strict[0].declaration, "strict");
    assert_eq!(&*lenient[0].declaration, "lenient");
    assert_eq!(
        *seen.lock().expect("lock"),
        vec![
            (ElementId(1), false),
            (ElementId(2), false),
            (ElementId(2), true),
        ]
    );

    let reused = cache
        .cached_poly_variant(&strict_ref, true)
        .expect("strict list stored for incomplete code");
    assert!(Arc::ptr_eq(&strict, &reused));
    assert_eq!(
        cache.cached_poly_variant(&lenient_ref, false).map(|c| c.len()),
        Some(0),
        "empty strict list is cached"
    );
    assert_eq!(cache.stats().complete_code_reuses, 1);
}

#[test]
fn test_cancellation_in_nested_complete_code_resolve() {
    let cache = Cache::new();
    let reference = physical_ref(1);
    let seen = Mutex::new(Vec::new());
    let r = resolver(|_, incomplete_code| {
        seen.lock().expect("lock").push(incomplete_code);
        if incomplete_code {
            Ok(Some(decl("lenient")))
        } else {
            Err(ResolveError::Cancelled)
        }
    });

    let err = cache
        .resolve(&reference, &r, true, true)
        .expect_err("cancelled");

    assert!(err.is_cancelled());
    assert_eq!(*seen.lock().expect("lock"), vec![false], "lenient pass never ran");
    for partition in Partition::ALL {
        assert_eq!(cache.single_partition_len(partition), 0);
    }
    assert!(!cache.recursion_guard().is_locked_by_current_thread(ElementId(1)));
}

#[test]
fn test_incomplete_code_request_counts_one_lookup() {
    let cache = Cache::new();
    let reference = physical_ref(1);
    let r = resolver(|_, _| Ok(Some(decl("strict"))));

    cache.resolve(&reference, &r, true, true).expect("resolve");
    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses), (0, 1));

    cache.resolve(&reference, &r, true, true).expect("resolve");
    cache.resolve(&reference, &r, true, false).expect("resolve");
    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses), (2, 1));
    assert!((stats.hit_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
}

// =============================================================================
// Recursion
// =============================================================================

/// Resolves `outer` by first resolving `inner` through the same cache.
/// Any other reference answers "inner" directly.
struct Reentrant<'a> {
    cache: &'a Cache,
    outer: Arc<TestRef>,
    inner: Arc<TestRef>,
    prevent_recursion: bool,
    answer: &'static str,
    inner_results: Mutex<Vec<Option<Decl>>>,
}

impl<'a> Reentrant<'a> {
    fn new(cache: &'a Cache, outer: &Arc<TestRef>, inner: &Arc<TestRef>, answer: &'static str) -> Self {
        Self {
            cache,
            outer: Arc::clone(outer),
            inner: Arc::clone(inner),
            prevent_recursion: true,
            answer,
            inner_results: Mutex::new(Vec::new()),
        }
    }
}

impl Resolver<TestRef, Decl> for Reentrant<'_> {
    type Error = TestError;

    fn resolve(&self, reference: &Arc<TestRef>, _incomplete_code: bool) -> SingleResult {
        if !Arc::ptr_eq(reference, &self.outer) {
            return Ok(Some(decl("inner")));
        }
        let inner = self
            .cache
            .resolve(&self.inner, self, self.prevent_recursion, false)?;
        self.inner_results.lock().expect("lock").push(inner);
        Ok(Some(decl(self.answer)))
    }
}

#[test]
fn test_self_recursive_resolution_is_refused_inside() {
    let cache = Cache::new();
    let ref2 = physical_ref(2);
    let r = Reentrant::new(&cache, &ref2, &ref2, "Y");

    let top = cache.resolve(&ref2, &r, true, false).expect("resolve");

    assert_eq!(top.as_deref(), Some("Y"));
    assert_eq!(*r.inner_results.lock().expect("lock"), vec![None]);
    assert_eq!(cache.cached(&ref2, false), Some(Some(decl("Y"))));
    assert_eq!(cache.stats().recursion_refusals, 1);
    assert!(!cache.recursion_guard().is_locked_by_current_thread(ElementId(2)));
}

#[test]
fn test_same_anchor_different_reference_is_refused() {
    let cache = Cache::new();
    let bound = physical_ref(7);
    let bounded = physical_ref(7);
    let r = Reentrant::new(&cache, &bound, &bounded, "T");

    let top = cache.resolve(&bound, &r, true, false).expect("resolve");

    assert_eq!(top.as_deref(), Some("T"));
    assert_eq!(*r.inner_results.lock().expect("lock"), vec![None]);
    assert_eq!(cache.cached(&bounded, false), None, "refusal is not cached");
}

#[test]
fn test_different_anchor_is_not_refused() {
    let cache = Cache::new();
    let outer = physical_ref(1);
    let inner = physical_ref(2);
    let r = Reentrant::new(&cache, &outer, &inner, "outer");

    let top = cache.resolve(&outer, &r, true, false).expect("resolve");

    assert_eq!(top.as_deref(), Some("outer"));
    assert_eq!(*r.inner_results.lock().expect("lock"), vec![Some(decl("inner"))]);
    assert_eq!(cache.cached(&inner, false), Some(Some(decl("inner"))));
    assert_eq!(cache.stats().recursion_refusals, 0);
}

#[test]
fn test_recursion_allowed_without_prevention() {
    let cache = Cache::new();
    let outer = physical_ref(3);
    let inner = physical_ref(3);
    let mut r = Reentrant::new(&cache, &outer, &inner, "outer");
    r.prevent_recursion = false;

    cache.resolve(&outer, &r, false, false).expect("resolve");

    assert_eq!(*r.inner_results.lock().expect("lock"), vec![Some(decl("inner"))]);
}

#[test]
fn test_two_caches_do_not_refuse_each_other() {
    let first = Cache::new();
    let second = Cache::new();
    let reference = physical_ref(4);
    let inner_result = Mutex::new(None);

    let inner = resolver(|_, _| Ok(Some(decl("second"))));
    let outer = resolver(|reference, _| {
        let nested = second.resolve(reference, &inner, true, false)?;
        *inner_result.lock().expect("lock") = nested;
        Ok(Some(decl("first")))
    });

    first.resolve(&reference, &outer, true, false).expect("resolve");

    assert_eq!(*inner_result.lock().expect("lock"), Some(decl("second")));
}

// =============================================================================
// Stale writes
// =============================================================================

#[test]
fn test_invalidation_during_resolve_drops_the_write() {
    let cache = Cache::new();
    let reference = physical_ref(1);
    let calls = AtomicUsize::new(0);
    let invalidate = AtomicBool::new(true);
    let r = resolver(|_, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        if invalidate.swap(false, Ordering::SeqCst) {
            cache.on_any_change();
        }
        Ok(Some(decl("Z")))
    });

    let result = cache.resolve(&reference, &r, true, false).expect("resolve");
    assert_eq!(result.as_deref(), Some("Z"), "caller still gets the value");
    assert_eq!(cache.cached(&reference, false), None, "but it is not cached");
    assert_eq!(cache.stats().stale_writes_dropped, 1);

    cache.resolve(&reference, &r, true, false).expect("resolve");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.cached(&reference, false), Some(Some(decl("Z"))));
}

#[test]
fn test_forget_of_other_reference_during_resolve_drops_the_write() {
    let cache = Cache::new();
    let reference = physical_ref(1);
    let unrelated = physical_ref(2);
    let r = resolver(|_, _| {
        cache.forget(&unrelated);
        Ok(Some(decl("Z")))
    });

    cache.resolve(&reference, &r, false, false).expect("resolve");

    assert_eq!(cache.cached(&reference, false), None);
}

// =============================================================================
// Errors and cancellation
// =============================================================================

#[test]
fn test_cancelled_before_lookup() {
    let cache = Cache::new();
    let reference = physical_ref(1);
    let calls = AtomicUsize::new(0);
    let token = CancellationToken::new();
    let r = cancellable(
        resolver(|_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(decl("X")))
        }),
        token.clone(),
    );

    cache.resolve(&reference, &r, true, false).expect("resolve");
    token.cancel();

    // Even a cached answer is not handed out once cancelled.
    let err = cache
        .resolve(&reference, &r, true, false)
        .expect_err("cancelled");
    assert!(err.is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cancellation_reported_by_resolver_is_not_cached() {
    let cache = Cache::new();
    let reference = physical_ref(1);
    let r = resolver(|_, _| Err(ResolveError::Cancelled));

    let err = cache
        .resolve(&reference, &r, true, false)
        .expect_err("cancelled");

    assert!(err.is_cancelled());
    assert!(cache.is_empty());
    assert!(!cache.recursion_guard().is_locked_by_current_thread(ElementId(1)));
}

#[test]
fn test_resolver_error_propagates_unchanged() {
    let cache = Cache::new();
    let reference = physical_ref(1);
    let r = resolver(|_, _| Err(ResolveError::Resolver(TestError("boom"))));

    let err = cache
        .resolve(&reference, &r, true, true)
        .expect_err("resolver failure");

    assert_eq!(err.into_resolver_error(), Some(TestError("boom")));
    assert!(cache.is_empty());
    assert_eq!(cache.recursion_guard().held_by_current_thread(), 0);
}

#[test]
fn test_resolver_panic_releases_recursion_lock() {
    let cache = Cache::new();
    let reference = physical_ref(9);
    let r = resolver(|_, _| panic!("resolver blew up"));

    let outcome = catch_unwind(AssertUnwindSafe(|| cache.resolve(&reference, &r, true, false)));

    assert!(outcome.is_err());
    assert!(!cache.recursion_guard().is_locked_by_current_thread(ElementId(9)));
    assert!(cache.is_empty());

    let ok = resolver(|_, _| Ok(Some(decl("after"))));
    let result = cache.resolve(&reference, &ok, true, false).expect("resolve");
    assert_eq!(result.as_deref(), Some("after"));
}

// =============================================================================
// Poly-variant
// =============================================================================

#[test]
fn test_poly_variant_memoized_separately() {
    let cache = Cache::new();
    let reference = physical_ref(1);
    let calls = AtomicUsize::new(0);
    let r = poly_resolver(|_, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            Candidate::valid(decl("best")),
            Candidate::invalid(decl("by-name")),
        ])
    });

    let first = cache
        .resolve_poly_variant(&reference, &r, true, false)
        .expect("resolve");
    let second = cache
        .resolve_poly_variant(&reference, &r, true, false)
        .expect("resolve");

    assert_eq!(first.len(), 2);
    assert!(first[0].is_valid);
    assert!(!first[1].is_valid);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.cached(&reference, false), None, "single store untouched");
}

#[test]
fn test_poly_variant_refusal_is_empty() {
    let cache = Cache::new();
    let reference = physical_ref(5);
    let inner_len = Mutex::new(None);
    let calls = AtomicUsize::new(0);

    struct Recursive<'a> {
        cache: &'a Cache,
        inner_len: &'a Mutex<Option<usize>>,
        calls: &'a AtomicUsize,
    }

    impl PolyVariantResolver<TestRef, Decl> for Recursive<'_> {
        type Error = TestError;

        fn resolve(&self, reference: &Arc<TestRef>, _incomplete_code: bool) -> PolyResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let inner = self.cache.resolve_poly_variant(reference, self, true, false)?;
            *self.inner_len.lock().expect("lock") = Some(inner.len());
            Ok(vec![Candidate::valid(decl("only"))])
        }
    }

    let r = Recursive {
        cache: &cache,
        inner_len: &inner_len,
        calls: &calls,
    };
    let result = cache
        .resolve_poly_variant(&reference, &r, true, false)
        .expect("resolve");

    assert_eq!(result.len(), 1);
    assert_eq!(*inner_len.lock().expect("lock"), Some(0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Reclamation, hooks, configuration
// =============================================================================

#[test]
fn test_reclaimed_payload_is_recomputed() {
    let cache = Cache::new();
    let reference = physical_ref(1);
    let calls = AtomicUsize::new(0);
    let r = resolver(|_, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(decl("X")))
    });

    cache.resolve(&reference, &r, true, false).expect("resolve");
    let generation = cache.generation();

    assert_eq!(cache.reclaim(), 1);
    assert_eq!(cache.generation(), generation, "reclaim is not an invalidation");
    assert_eq!(cache.cached(&reference, false), None);
    assert_eq!(
        cache.single_partition_len(Partition::of(true, false)),
        1,
        "wrapper survives reclamation"
    );

    cache.resolve(&reference, &r, true, false).expect("resolve");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.stats().reclaimed, 1);
}

#[test]
fn test_reclaim_prunes_dropped_references() {
    let cache = Cache::new();
    let r = resolver(|_, _| Ok(Some(decl("X"))));
    let kept = physical_ref(1);

    {
        let temporary = physical_ref(2);
        cache.resolve(&temporary, &r, true, false).expect("resolve");
    }
    cache.resolve(&kept, &r, true, false).expect("resolve");
    assert_eq!(cache.len(), 2);

    cache.reclaim();

    assert_eq!(cache.len(), 1);
}

#[test]
fn test_clear_hooks_run_on_clears_only() {
    let cache = Cache::new();
    let reference = physical_ref(1);
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    cache.add_clear_hook(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    cache.clear_all();
    cache.on_structural_change();
    cache.forget(&reference);
    cache.reclaim();

    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn test_stats_can_be_disabled() {
    let cache = Cache::with_config(CacheConfig::default().with_track_stats(false));
    let reference = physical_ref(1);
    let r = resolver(|_, _| Ok(Some(decl("X"))));

    cache.resolve(&reference, &r, true, false).expect("resolve");
    cache.resolve(&reference, &r, true, false).expect("resolve");
    cache.clear_all();

    assert_eq!(cache.stats(), CacheStatsSnapshot::default());
}

#[test]
fn test_stats_hit_rate_and_reset() {
    let cache = Cache::new();
    let reference = physical_ref(1);
    let r = resolver(|_, _| Ok(Some(decl("X"))));

    for _ in 0..4 {
        cache.resolve(&reference, &r, true, false).expect("resolve");
    }

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 3);
    assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);

    cache.reset_stats();
    assert_eq!(cache.stats().hit_rate(), 0.0);
}
