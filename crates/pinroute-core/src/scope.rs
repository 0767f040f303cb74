//! Scoped pin overrides
//!
//! Temporary pin and unpin wrappers with guaranteed restoration. Both scopes
//! restore the prior state on every exit path, including panics, via drop
//! guards; a failing body's error propagates unchanged after restoration.
//!
//! - [`with_replicas`] forces reads at a replica even while the set is pinned
//!   (the pin comes back when the scope ends).
//! - [`with_masters`] forces master access for one operation without making
//!   the pin visible to the rest of the unit of work, and without counting it
//!   as newly pinned for persistence.
//!
//! Batch variants compose independent per-alias restorations, so restoration
//! order does not matter.

use crate::pinning::PinningContext;
use crate::types::Alias;

/// Drop guard that re-pins aliases unpinned on entry
struct ReplicaScope<'a> {
    ctx: &'a mut PinningContext,
    restore: Vec<Alias>,
}

impl<'a> ReplicaScope<'a> {
    fn enter(ctx: &'a mut PinningContext, aliases: &[&str]) -> Self {
        let mut restore = Vec::new();
        for alias in aliases {
            if ctx.unpin_one(alias).is_ok() {
                restore.push(alias.to_string());
            }
        }
        Self { ctx, restore }
    }

    fn context(&mut self) -> &mut PinningContext {
        self.ctx
    }
}

impl Drop for ReplicaScope<'_> {
    fn drop(&mut self) {
        for alias in &self.restore {
            // unpin_one left the newly-pinned set alone, so re-pinning
            // without counting as new restores the exact prior state.
            self.ctx.pin(alias, false);
        }
    }
}

/// Drop guard that unpins aliases that were not pinned on entry
struct MasterScope<'a> {
    ctx: &'a mut PinningContext,
    transient: Vec<Alias>,
}

impl<'a> MasterScope<'a> {
    fn enter(ctx: &'a mut PinningContext, aliases: &[&str]) -> Self {
        let mut transient = Vec::new();
        for alias in aliases {
            if !ctx.is_pinned(alias) {
                transient.push(alias.to_string());
            }
            // Transient pins must never reach the persisted cookie.
            ctx.pin(alias, false);
        }
        Self { ctx, transient }
    }

    fn context(&mut self) -> &mut PinningContext {
        self.ctx
    }
}

impl Drop for MasterScope<'_> {
    fn drop(&mut self) {
        for alias in &self.transient {
            self.ctx.unpin_one(alias).ok();
        }
    }
}

/// Run `body` with the given database sets unpinned, restoring any pins
/// that existed on entry once the body finishes
pub fn with_replicas<T>(
    ctx: &mut PinningContext,
    aliases: &[&str],
    body: impl FnOnce(&mut PinningContext) -> T,
) -> T {
    let mut scope = ReplicaScope::enter(ctx, aliases);
    body(scope.context())
}

/// Single-alias form of [`with_replicas`]
pub fn with_replica<T>(
    ctx: &mut PinningContext,
    alias: &str,
    body: impl FnOnce(&mut PinningContext) -> T,
) -> T {
    with_replicas(ctx, &[alias], body)
}

/// Run `body` with the given database sets pinned, unpinning on exit any
/// that were not pinned on entry
pub fn with_masters<T>(
    ctx: &mut PinningContext,
    aliases: &[&str],
    body: impl FnOnce(&mut PinningContext) -> T,
) -> T {
    let mut scope = MasterScope::enter(ctx, aliases);
    body(scope.context())
}

/// Single-alias form of [`with_masters`]
pub fn with_master<T>(
    ctx: &mut PinningContext,
    alias: &str,
    body: impl FnOnce(&mut PinningContext) -> T,
) -> T {
    with_masters(ctx, &[alias], body)
}
