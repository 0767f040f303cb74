//! Per-unit-of-work pinning state
//!
//! One `PinningContext` exists per unit of work (one request, one task run)
//! and is never shared between units. Isolation is structural, not lock-based:
//! the embedding application creates a context at the start of the unit and
//! discards it at the end. Cross-unit persistence happens explicitly through
//! the cookie codec, never through this state.

use std::collections::HashSet;

use crate::error::RouterError;
use crate::types::Alias;

/// Which database sets are pinned to their master, and which of those pins
/// were created during the current unit of work
#[derive(Debug, Clone, Default)]
pub struct PinningContext {
    /// All pinned database-set aliases
    pinned: HashSet<Alias>,
    /// Pins established during this unit of work, as opposed to pins carried
    /// over from a previous one
    newly: HashSet<Alias>,
}

impl PinningContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a database set to its master. Idempotent.
    ///
    /// `count_as_new` marks the pin as created in this unit of work; only
    /// such pins are persisted with a fresh expiry by the cookie codec.
    /// Carried-over pins are re-applied with `count_as_new = false` so they
    /// can eventually expire.
    pub fn pin(&mut self, alias: &str, count_as_new: bool) {
        self.pinned.insert(alias.to_string());
        if count_as_new {
            self.newly.insert(alias.to_string());
        }
    }

    /// Reset both pin sets to empty
    ///
    /// Called at the start of every unit of work so no state leaks between
    /// units sharing an execution context.
    pub fn unpin_all(&mut self) {
        self.pinned.clear();
        self.newly.clear();
    }

    /// Remove one alias from the pinned set without touching the newly-pinned
    /// set, so its persistence status survives a temporary unpin.
    ///
    /// Callers must confirm pinned status first; only the scope guards use
    /// this, and they restore the pin on exit.
    pub(crate) fn unpin_one(&mut self, alias: &str) -> Result<(), RouterError> {
        if self.pinned.remove(alias) {
            Ok(())
        } else {
            Err(RouterError::NotPinned(alias.to_string()))
        }
    }

    /// Whether a database set is pinned to its master
    pub fn is_pinned(&self, alias: &str) -> bool {
        self.pinned.contains(alias)
    }

    /// Whether a pin was established during this unit of work
    pub fn is_newly_pinned(&self, alias: &str) -> bool {
        self.newly.contains(alias)
    }

    /// All pinned aliases (defensive copy)
    pub fn pinned(&self) -> HashSet<Alias> {
        self.pinned.clone()
    }

    /// Aliases pinned during this unit of work (defensive copy)
    pub fn newly_pinned(&self) -> HashSet<Alias> {
        self.newly.clone()
    }
}
