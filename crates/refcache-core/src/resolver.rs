//! Resolver capabilities and the result shapes the cache stores.
//!
//! The cache never knows what a reference means. A resolver is handed to
//! every call and does the real work; the cache decides whether to call it.
//! Two flavours exist side by side:
//!
//! | Trait | Result | Empty |
//! |-------|--------|-------|
//! | [`Resolver`] | `Option<D>` | `None` |
//! | [`PolyVariantResolver`] | [`Candidates<D>`] (ranked) | empty slice |
//!
//! Both are implemented for plain closures, so tests and small callers can
//! pass `|reference, incomplete_code| Ok(...)`.

use crate::error::ResolveError;
use refcache_common::CancellationToken;
use std::sync::Arc;

// =============================================================================
// Result shapes
// =============================================================================

/// One ranked candidate of a poly-variant resolution.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Candidate<D> {
    /// The declaration the reference may point to.
    pub declaration: D,
    /// `false` for candidates that match by name only (wrong arity,
    /// inaccessible, ...), kept so callers can report them.
    pub is_valid: bool,
}

impl<D> Candidate<D> {
    pub const fn valid(declaration: D) -> Self {
        Self {
            declaration,
            is_valid: true,
        }
    }

    pub const fn invalid(declaration: D) -> Self {
        Self {
            declaration,
            is_valid: false,
        }
    }
}

/// Ranked, immutable candidate list. Cloning shares the allocation, so two
/// lookups of the same cached entry return `Arc::ptr_eq` results.
pub type Candidates<D> = Arc<[Candidate<D>]>;

/// A value the resolve cache can store and hand back.
pub trait CachedResult: Clone + Send + Sync {
    /// Whether the result carries no declaration.
    fn is_unresolved(&self) -> bool;

    /// The answer for a call refused by the recursion guard.
    fn refused() -> Self;
}

impl<D: Clone + Send + Sync> CachedResult for Option<D> {
    #[inline]
    fn is_unresolved(&self) -> bool {
        self.is_none()
    }

    #[inline]
    fn refused() -> Self {
        None
    }
}

impl<D: Send + Sync> CachedResult for Candidates<D> {
    #[inline]
    fn is_unresolved(&self) -> bool {
        self.is_empty()
    }

    #[inline]
    fn refused() -> Self {
        Arc::from(Vec::new())
    }
}

// =============================================================================
// Resolver traits
// =============================================================================

/// Resolves a reference to at most one declaration.
pub trait Resolver<T: ?Sized, D> {
    /// Resolver-specific failure, passed through the cache unchanged.
    type Error;

    /// Compute the declaration `reference` points to.
    ///
    /// Long-running resolvers should poll their cancellation source and
    /// return [`ResolveError::Cancelled`] when it fires.
    fn resolve(
        &self,
        reference: &Arc<T>,
        incomplete_code: bool,
    ) -> Result<Option<D>, ResolveError<Self::Error>>;

    /// Checked by the cache on entry, before any lookup or locking.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Resolves a reference to a ranked list of candidates.
pub trait PolyVariantResolver<T: ?Sized, D> {
    /// Resolver-specific failure, passed through the cache unchanged.
    type Error;

    /// Compute the candidates for `reference`, best first.
    fn resolve(
        &self,
        reference: &Arc<T>,
        incomplete_code: bool,
    ) -> Result<Vec<Candidate<D>>, ResolveError<Self::Error>>;

    /// Checked by the cache on entry, before any lookup or locking.
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl<T, D, E, F> Resolver<T, D> for F
where
    T: ?Sized,
    F: Fn(&Arc<T>, bool) -> Result<Option<D>, ResolveError<E>>,
{
    type Error = E;

    fn resolve(
        &self,
        reference: &Arc<T>,
        incomplete_code: bool,
    ) -> Result<Option<D>, ResolveError<E>> {
        self(reference, incomplete_code)
    }
}

impl<T, D, E, F> PolyVariantResolver<T, D> for F
where
    T: ?Sized,
    F: Fn(&Arc<T>, bool) -> Result<Vec<Candidate<D>>, ResolveError<E>>,
{
    type Error = E;

    fn resolve(
        &self,
        reference: &Arc<T>,
        incomplete_code: bool,
    ) -> Result<Vec<Candidate<D>>, ResolveError<E>> {
        self(reference, incomplete_code)
    }
}

// =============================================================================
// Cancellation adapter
// =============================================================================

/// A resolver bound to a [`CancellationToken`].
///
/// The cache checks the token before doing anything; the wrapped resolver
/// is only called while the token is not cancelled.
#[derive(Clone, Debug)]
pub struct WithCancellation<R> {
    resolver: R,
    token: CancellationToken,
}

/// Bind `resolver` to `token`.
pub fn cancellable<R>(resolver: R, token: CancellationToken) -> WithCancellation<R> {
    WithCancellation { resolver, token }
}

impl<R> WithCancellation<R> {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn into_inner(self) -> R {
        self.resolver
    }
}

impl<T: ?Sized, D, R: Resolver<T, D>> Resolver<T, D> for WithCancellation<R> {
    type Error = R::Error;

    fn resolve(
        &self,
        reference: &Arc<T>,
        incomplete_code: bool,
    ) -> Result<Option<D>, ResolveError<R::Error>> {
        self.token.check()?;
        self.resolver.resolve(reference, incomplete_code)
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.resolver.is_cancelled()
    }
}

impl<T: ?Sized, D, R: PolyVariantResolver<T, D>> PolyVariantResolver<T, D>
    for WithCancellation<R>
{
    type Error = R::Error;

    fn resolve(
        &self,
        reference: &Arc<T>,
        incomplete_code: bool,
    ) -> Result<Vec<Candidate<D>>, ResolveError<R::Error>> {
        self.token.check()?;
        self.resolver.resolve(reference, incomplete_code)
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.resolver.is_cancelled()
    }
}
