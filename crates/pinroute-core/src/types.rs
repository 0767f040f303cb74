//! Common types for the routing engine
//!
//! Centralizes type definitions and defaults shared across modules.

use serde::{Deserialize, Serialize};

/// Logical or physical database alias
pub type Alias = String;

/// The master alias every configuration is expected to provide
pub const DEFAULT_ALIAS: &str = "default";

/// Default number of seconds reads stay pinned to a master after a write
pub const DEFAULT_PIN_TTL_SECS: u64 = 15;

/// Default name of the cookie that carries the pinned set between requests
pub const DEFAULT_PIN_COOKIE: &str = "pinroute_pinned_set";

/// Physical alias of the `index`-th replica of `master`
pub fn replica_alias(master: &str, index: usize) -> Alias {
    format!("{}-{}", master, index)
}

/// How writes to an unpinned database set are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingPolicy {
    /// Refuse the write; the caller must pin first (or allow it explicitly)
    #[default]
    Strict,
    /// Pin the set on the spot and let the write through
    Greedy,
}

impl std::fmt::Display for RoutingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutingPolicy::Strict => write!(f, "strict"),
            RoutingPolicy::Greedy => write!(f, "greedy"),
        }
    }
}
