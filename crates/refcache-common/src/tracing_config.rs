//! Tracing configuration for debugging cache behaviour.
//!
//! Supports three output formats controlled by `REFCACHE_LOG_FORMAT`:
//!
//! - `text` (default): Standard `tracing-subscriber` flat output
//! - `tree`: Hierarchical indented output via `tracing-tree`
//! - `json`: One JSON object per span/event
//!
//! ## Quick start
//!
//! ```bash
//! # Every cache hit, miss and store
//! REFCACHE_LOG=refcache::resolve=trace cargo test -p refcache-core
//!
//! # Clears, reclaims and dropped stale writes only
//! REFCACHE_LOG=debug REFCACHE_LOG_FORMAT=tree cargo test
//! ```
//!
//! The subscriber is only initialised when `REFCACHE_LOG` (or `RUST_LOG`) is
//! set, so there is zero overhead otherwise.

use std::sync::Once;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

static INIT: Once = Once::new();

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Standard flat text lines (default).
    Text,
    /// Hierarchical indented tree via `tracing-tree`.
    Tree,
    /// Newline-delimited JSON objects.
    Json,
}

impl LogFormat {
    /// Parse a format name; unknown names fall back to [`LogFormat::Text`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Read from the `REFCACHE_LOG_FORMAT` environment variable.
    fn from_env() -> Self {
        Self::parse(&std::env::var("REFCACHE_LOG_FORMAT").unwrap_or_default())
    }
}

/// Build an `EnvFilter` from `REFCACHE_LOG`, falling back to `RUST_LOG`.
fn build_filter() -> EnvFilter {
    if let Ok(val) = std::env::var("REFCACHE_LOG") {
        EnvFilter::builder().parse_lossy(val)
    } else {
        EnvFilter::from_default_env()
    }
}

/// Initialise the global tracing subscriber.
///
/// Does nothing when neither `REFCACHE_LOG` nor `RUST_LOG` is set. Safe to
/// call more than once (test harnesses call it from every test); only the
/// first call installs a subscriber. Output goes to stderr.
pub fn init_tracing() {
    let has_refcache_log = std::env::var("REFCACHE_LOG").is_ok();
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if !has_refcache_log && !has_rust_log {
        return;
    }

    INIT.call_once(|| {
        let filter = build_filter();

        // `try_init` so an embedding application's subscriber wins.
        let _ = match LogFormat::from_env() {
            LogFormat::Tree => {
                let tree_layer = tracing_tree::HierarchicalLayer::default()
                    .with_indent_amount(2)
                    .with_indent_lines(true)
                    .with_targets(true)
                    .with_writer(std::io::stderr);

                Registry::default().with(filter).with(tree_layer).try_init()
            }
            LogFormat::Json => {
                let json_layer = fmt::layer().json().with_writer(std::io::stderr);

                Registry::default().with(filter).with(json_layer).try_init()
            }
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish()
                .try_init(),
        };
    });
}

#[cfg(test)]
#[path = "../tests/tracing_config_tests.rs"]
mod tests;
