//! Db-set registry
//!
//! Validates the configured masters and replica override sets once at
//! startup and synthesizes the full physical database map: one entry per
//! master plus one merged entry per replica, named `"<master>-<index>"`.
//! Immutable after construction, so it is safely shared read-only across
//! concurrent units of work.

use std::collections::HashMap;

use tracing::warn;

use crate::config::{merge_settings, DbSettings, RouterConfig};
use crate::error::RouterError;
use crate::types::{replica_alias, Alias, DEFAULT_ALIAS};

/// Validated, immutable view of every configured database set
#[derive(Debug, Clone)]
pub struct DbSetRegistry {
    /// Full physical map: masters and synthesized replicas
    databases: HashMap<Alias, DbSettings>,

    /// Back-references marking each replica as a mirror of its master, for
    /// environments that need replicas recognized as replicas (integration
    /// setups that mirror schema from the master)
    mirrors: HashMap<Alias, Alias>,

    /// Zero-based replica count per master: `len - 1`, with `-1` meaning
    /// master only
    replica_counts: HashMap<Alias, i64>,
}

impl DbSetRegistry {
    /// Build and validate the registry from a configuration
    pub fn new(config: &RouterConfig) -> Result<Self, RouterError> {
        if config.require_default && !config.masters.contains_key(DEFAULT_ALIAS) {
            return Err(RouterError::MissingDefaultMaster);
        }

        let mut databases = HashMap::new();
        let mut mirrors = HashMap::new();
        let mut replica_counts = HashMap::new();

        for (alias, master_settings) in &config.masters {
            let overrides = config
                .replica_sets
                .get(alias)
                .ok_or_else(|| RouterError::MissingReplicaSet(alias.clone()))?;

            databases.insert(alias.clone(), master_settings.clone());
            replica_counts.insert(alias.clone(), overrides.len() as i64 - 1);

            if overrides.is_empty() {
                // Not an error: the set just serves every read from its master.
                warn!(alias = %alias, "master has no replicas; it will serve all read traffic");
            }

            for (index, override_settings) in overrides.iter().enumerate() {
                let replica = replica_alias(alias, index);
                databases.insert(replica.clone(), merge_settings(master_settings, override_settings));
                mirrors.insert(replica, alias.clone());
            }
        }

        Ok(Self {
            databases,
            mirrors,
            replica_counts,
        })
    }

    /// Whether an alias names a registry-managed database set
    pub fn is_managed(&self, alias: &str) -> bool {
        self.replica_counts.contains_key(alias)
    }

    /// Zero-based replica count for a master (`-1` = no replicas)
    pub fn replica_count(&self, alias: &str) -> Option<i64> {
        self.replica_counts.get(alias).copied()
    }

    /// Connection settings for any physical alias, master or replica
    pub fn settings(&self, alias: &str) -> Option<&DbSettings> {
        self.databases.get(alias)
    }

    /// The full synthesized physical database map
    pub fn databases(&self) -> &HashMap<Alias, DbSettings> {
        &self.databases
    }

    /// The master a replica alias mirrors, if the alias is a replica
    pub fn mirror_of(&self, alias: &str) -> Option<&str> {
        self.mirrors.get(alias).map(String::as_str)
    }

    /// All managed master aliases
    pub fn master_aliases(&self) -> impl Iterator<Item = &str> {
        self.replica_counts.keys().map(String::as_str)
    }
}
