//! Common types and utilities for the refcache resolve cache.
//!
//! This crate provides foundational types shared by the cache crates:
//! - Program element identity (`ElementId`, `ModelNode`)
//! - Cooperative cancellation (`CancellationToken`, `Cancelled`)
//! - Tracing subscriber setup driven by environment variables

// Element identity - the boundary with the program model
pub mod element;
pub use element::{ElementId, ModelNode};

// Cooperative cancellation shared between callers and resolvers
pub mod cancel;
pub use cancel::{CancellationToken, Cancelled};

// Logging setup for binaries and tests
pub mod tracing_config;
pub use tracing_config::init_tracing;
