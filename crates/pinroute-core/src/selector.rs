//! Replica selection
//!
//! Picks a physical database for an unpinned read: the master itself when the
//! set has no replicas, otherwise one replica drawn uniformly at random.
//!
//! There is no session affinity: two reads in the same unit of work may land
//! on different replicas, which can lag each other independently. This is a
//! known limitation; a future extension would cache the first draw per alias
//! per unit of work.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::error::RouterError;
use crate::registry::DbSetRegistry;
use crate::types::{replica_alias, Alias};

/// Source of the replica draw, substitutable for deterministic tests
pub trait ReplicaPicker: Send + Sync {
    /// Draw an index in `0..replicas`, with `replicas >= 1`
    fn pick(&self, replicas: usize) -> usize;
}

/// Uniform random picker, the production default
pub struct RandomPicker {
    rng: Mutex<SmallRng>,
}

impl RandomPicker {
    /// Create a picker seeded from the OS entropy source
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(SmallRng::from_entropy()),
        }
    }
}

impl Default for RandomPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicaPicker for RandomPicker {
    fn pick(&self, replicas: usize) -> usize {
        self.rng.lock().gen_range(0..replicas)
    }
}

/// Selects the physical database that serves an unpinned read
pub struct ReplicaSelector {
    registry: Arc<DbSetRegistry>,
    picker: Box<dyn ReplicaPicker>,
}

impl ReplicaSelector {
    /// Create a selector with the default random picker
    pub fn new(registry: Arc<DbSetRegistry>) -> Self {
        Self::with_picker(registry, Box::new(RandomPicker::new()))
    }

    /// Create a selector with a custom picker
    pub fn with_picker(registry: Arc<DbSetRegistry>, picker: Box<dyn ReplicaPicker>) -> Self {
        Self { registry, picker }
    }

    /// Pick the physical alias an unpinned read of `master` should use
    ///
    /// Returns the master itself when the set has no replicas, and
    /// `RouterError::UnknownAlias` when `master` is not a managed set.
    pub fn select(&self, master: &str) -> Result<Alias, RouterError> {
        let count = self
            .registry
            .replica_count(master)
            .ok_or_else(|| RouterError::UnknownAlias(master.to_string()))?;

        if count < 0 {
            return Ok(master.to_string());
        }

        let index = self.picker.pick(count as usize + 1);
        let replica = replica_alias(master, index);
        trace!(master = %master, replica = %replica, "selected replica for read");
        Ok(replica)
    }
}

#[cfg(test)]
pub(crate) struct FixedPicker(pub usize);

#[cfg(test)]
impl ReplicaPicker for FixedPicker {
    fn pick(&self, replicas: usize) -> usize {
        self.0 % replicas
    }
}
