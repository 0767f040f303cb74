//! Configuration surface for the routing engine
//!
//! The engine never interprets connection settings; they are opaque JSON
//! objects handed back to the embedding application once the registry has
//! synthesized the full physical database map.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Alias, RoutingPolicy, DEFAULT_PIN_COOKIE, DEFAULT_PIN_TTL_SECS};

/// Opaque connection settings for one physical database
pub type DbSettings = serde_json::Map<String, serde_json::Value>;

/// Routing engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Master connection settings per database-set alias
    pub masters: HashMap<Alias, DbSettings>,

    /// Replica override settings per database-set alias
    ///
    /// Every master must have an entry here, even an empty one. Each override
    /// is merged over the master's settings to produce one replica.
    pub replica_sets: HashMap<Alias, Vec<DbSettings>>,

    /// Seconds reads stay pinned to a master after a write
    #[serde(default = "default_pin_ttl")]
    pub pin_ttl_secs: u64,

    /// Name of the cookie carrying the pinned set between requests
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Write handling policy
    #[serde(default)]
    pub policy: RoutingPolicy,

    /// Whether a master named "default" is required
    #[serde(default = "default_true")]
    pub require_default: bool,
}

fn default_pin_ttl() -> u64 {
    DEFAULT_PIN_TTL_SECS
}

fn default_cookie_name() -> String {
    DEFAULT_PIN_COOKIE.to_string()
}

fn default_true() -> bool {
    true
}

impl RouterConfig {
    /// Create a configuration from master settings and replica override sets
    pub fn new(
        masters: HashMap<Alias, DbSettings>,
        replica_sets: HashMap<Alias, Vec<DbSettings>>,
    ) -> Self {
        Self {
            masters,
            replica_sets,
            pin_ttl_secs: DEFAULT_PIN_TTL_SECS,
            cookie_name: DEFAULT_PIN_COOKIE.to_string(),
            policy: RoutingPolicy::default(),
            require_default: true,
        }
    }

    /// Set the write policy
    pub fn with_policy(mut self, policy: RoutingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the pin TTL in seconds
    pub fn with_pin_ttl(mut self, secs: u64) -> Self {
        self.pin_ttl_secs = secs;
        self
    }

    /// Set the pin cookie name
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Accept configurations without a "default" master
    pub fn allow_missing_default(mut self) -> Self {
        self.require_default = false;
        self
    }
}

/// Merge replica override settings over a master's base settings
///
/// Top-level keys from the override win; everything else is inherited.
pub(crate) fn merge_settings(base: &DbSettings, overrides: &DbSettings) -> DbSettings {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
