//! Errors surfaced by cached resolution.
//!
//! Only two things are errors here. Recursion refusal and dropped stale
//! writes are expected steady-state behaviour and never show up as `Err`.

use refcache_common::Cancelled;

/// Failure of a cached resolution call.
///
/// `E` is the resolver's own error type and is passed through untouched.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError<E> {
    /// The request was cancelled, either before the cache did anything or by
    /// the resolver while it was running. Nothing was cached.
    #[error("resolution was cancelled")]
    Cancelled,

    /// The resolver failed. Nothing was cached.
    #[error("resolver failed: {0}")]
    Resolver(E),
}

impl<E> ResolveError<E> {
    /// Returns `true` for [`ResolveError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The resolver's error, if this is one.
    pub fn into_resolver_error(self) -> Option<E> {
        match self {
            Self::Resolver(err) => Some(err),
            Self::Cancelled => None,
        }
    }
}

impl<E> From<Cancelled> for ResolveError<E> {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}
