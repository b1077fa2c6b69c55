//! Reference-Resolution Memoization Cache
//!
//! Sits between a symbol resolver (reference -> declaration(s)) and its
//! callers, so that each reference is resolved at most once per generation of
//! the program model.
//!
//! It combines:
//!
//! - **Partitioned storage**: four concurrent maps per result kind, selected
//!   by `(physical, incomplete_code)`, keyed by reference identity
//! - **Generation checks**: a result computed across an invalidation is
//!   returned but never stored
//! - **Recursion refusal**: re-entrant resolution of the same anchor on one
//!   thread yields an empty answer instead of overflowing the stack
//! - **Reclaimable slots**: payloads can be dropped under memory pressure
//!   without disturbing the invariants above
//!
//! Companion memoizers cover constant values ([`ConstantCache`]) and
//! expression types ([`TypeCache`]). Everything is wired to the program model
//! through [`ModelChangeListener`].
mod config;
mod constant;
mod error;
mod events;
pub mod generation;
pub mod recursion;
mod resolve_cache;
mod resolver;
pub mod slot;
mod stats;
pub mod store;
mod type_cache;

pub use config::CacheConfig;
pub use constant::{ConstantCache, VisitedVars};
pub use error::ResolveError;
pub use events::{ModelChangeListener, ModelChangeTracker};
pub use generation::GenerationCounter;
pub use recursion::{RecursionGuard, RecursionLock};
pub use resolve_cache::ResolveCache;
pub use resolver::{
    CachedResult, Candidate, Candidates, PolyVariantResolver, Resolver, WithCancellation,
    cancellable,
};
pub use slot::ReclaimableSlot;
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use store::{Partition, PartitionedStore};
pub use type_cache::TypeCache;

pub use refcache_common::{CancellationToken, Cancelled, ElementId, ModelNode};
