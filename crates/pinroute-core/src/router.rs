//! Routing policies
//!
//! The router answers one question per operation: which physical alias serves
//! this read or write? Reads go to the master while its set is pinned and to
//! a selected replica otherwise. Writes always go to the master; the policies
//! differ only in how they treat a write to an unpinned set:
//!
//! - **Strict** refuses it with [`RouterError::UnpinnedWrite`]; the caller is
//!   expected to pin and retry, or allow the write explicitly for operations
//!   known to be safe.
//! - **Greedy** pins the set on the spot (counted as newly pinned, so it
//!   persists) and lets the write through. Greedy never refuses a write.
//!
//! Aliases not managed by the registry pass through unchanged; the engine has
//! no authority over them. Relation and schema-sync questions are delegated
//! to the embedding application's resolver unmodified.

use std::sync::Arc;

use tracing::trace;

use crate::delegate::DelegateResolver;
use crate::error::RouterError;
use crate::pinning::PinningContext;
use crate::registry::DbSetRegistry;
use crate::selector::{ReplicaPicker, ReplicaSelector};
use crate::types::{Alias, RoutingPolicy, DEFAULT_ALIAS};

/// Routing decision engine for one registry of database sets
pub struct PinRouter {
    registry: Arc<DbSetRegistry>,
    selector: ReplicaSelector,
    policy: RoutingPolicy,
    delegate: Option<Box<dyn DelegateResolver>>,
}

impl PinRouter {
    /// Create a router over a validated registry
    pub fn new(registry: Arc<DbSetRegistry>, policy: RoutingPolicy) -> Self {
        let selector = ReplicaSelector::new(registry.clone());
        Self {
            registry,
            selector,
            policy,
            delegate: None,
        }
    }

    /// Inject the application's delegate resolver
    pub fn with_delegate(mut self, delegate: Box<dyn DelegateResolver>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Replace the replica picker (deterministic pickers for tests)
    pub fn with_picker(mut self, picker: Box<dyn ReplicaPicker>) -> Self {
        self.selector = ReplicaSelector::with_picker(self.registry.clone(), picker);
        self
    }

    /// The registry backing this router
    pub fn registry(&self) -> &Arc<DbSetRegistry> {
        &self.registry
    }

    /// The write policy in effect
    pub fn policy(&self) -> RoutingPolicy {
        self.policy
    }

    /// Physical alias that serves a read of the logical set `alias`
    pub fn resolve_read(&self, ctx: &PinningContext, alias: &str) -> Result<Alias, RouterError> {
        if !self.registry.is_managed(alias) {
            return Ok(alias.to_string());
        }
        if ctx.is_pinned(alias) {
            trace!(alias = %alias, "read routed to master (pinned)");
            return Ok(alias.to_string());
        }
        self.selector.select(alias)
    }

    /// Physical alias that serves a write to the logical set `alias`
    ///
    /// `allow_unpinned` is the escape hatch for writes known to be safe on an
    /// unpinned set; it permits the write without establishing a pin in
    /// either policy.
    pub fn resolve_write(
        &self,
        ctx: &mut PinningContext,
        alias: &str,
        allow_unpinned: bool,
    ) -> Result<Alias, RouterError> {
        if !self.registry.is_managed(alias) {
            return Ok(alias.to_string());
        }
        if !ctx.is_pinned(alias) && !allow_unpinned {
            match self.policy {
                RoutingPolicy::Strict => {
                    return Err(RouterError::UnpinnedWrite(alias.to_string()));
                }
                RoutingPolicy::Greedy => {
                    trace!(alias = %alias, "write pinned set greedily");
                    ctx.pin(alias, true);
                }
            }
        }
        Ok(alias.to_string())
    }

    /// Physical alias for a read of `model`, resolving the logical set
    /// through the delegate (falls back to the default set)
    pub fn db_for_read(&self, ctx: &PinningContext, model: &str) -> Result<Alias, RouterError> {
        let alias = self.delegated_read_alias(model);
        self.resolve_read(ctx, &alias)
    }

    /// Physical alias for a write of `model`, resolving the logical set
    /// through the delegate (falls back to the default set)
    pub fn db_for_write(&self, ctx: &mut PinningContext, model: &str) -> Result<Alias, RouterError> {
        let alias = self.delegated_write_alias(model);
        self.resolve_write(ctx, &alias, false)
    }

    /// Like [`db_for_write`](Self::db_for_write) but with the unpinned-write
    /// escape hatch engaged
    pub fn db_for_write_allow_unpinned(
        &self,
        ctx: &mut PinningContext,
        model: &str,
    ) -> Result<Alias, RouterError> {
        let alias = self.delegated_write_alias(model);
        self.resolve_write(ctx, &alias, true)
    }

    /// Whether a relation between the two models is allowed; the delegate's
    /// answer passes through unchanged, and absence defaults to allowed
    pub fn allow_relation(&self, model_a: &str, model_b: &str) -> bool {
        self.delegate
            .as_ref()
            .and_then(|d| d.allow_relation(model_a, model_b))
            .unwrap_or(true)
    }

    /// Whether `model`'s schema may be synced to `alias`; the delegate's
    /// answer passes through unchanged, and absence defaults to allowed
    pub fn allow_schema_sync(&self, alias: &str, model: &str) -> bool {
        self.delegate
            .as_ref()
            .and_then(|d| d.allow_schema_sync(alias, model))
            .unwrap_or(true)
    }

    fn delegated_read_alias(&self, model: &str) -> Alias {
        self.delegate
            .as_ref()
            .and_then(|d| d.db_for_read(model))
            .unwrap_or_else(|| DEFAULT_ALIAS.to_string())
    }

    fn delegated_write_alias(&self, model: &str) -> Alias {
        self.delegate
            .as_ref()
            .and_then(|d| d.db_for_write(model))
            .unwrap_or_else(|| DEFAULT_ALIAS.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DbSettings, RouterConfig};
    use crate::selector::FixedPicker;
    use std::collections::HashMap;

    fn registry() -> Arc<DbSetRegistry> {
        let masters = HashMap::from([
            ("default".to_string(), DbSettings::new()),
            ("egg".to_string(), DbSettings::new()),
        ]);
        let replica_sets = HashMap::from([
            (
                "default".to_string(),
                vec![DbSettings::new(), DbSettings::new()],
            ),
            ("egg".to_string(), vec![]),
        ]);
        let config = RouterConfig::new(masters, replica_sets);
        Arc::new(DbSetRegistry::new(&config).unwrap())
    }

    #[test]
    fn test_unpinned_read_goes_to_replica() {
        let router = PinRouter::new(registry(), RoutingPolicy::Strict)
            .with_picker(Box::new(FixedPicker(1)));
        let ctx = PinningContext::new();

        assert_eq!(router.resolve_read(&ctx, "default").unwrap(), "default-1");
    }

    #[test]
    fn test_pinned_read_goes_to_master() {
        let router = PinRouter::new(registry(), RoutingPolicy::Strict);
        let mut ctx = PinningContext::new();
        ctx.pin("default", true);

        assert_eq!(router.resolve_read(&ctx, "default").unwrap(), "default");
    }

    #[test]
    fn test_read_of_replicaless_set_goes_to_master() {
        let router = PinRouter::new(registry(), RoutingPolicy::Strict);
        let ctx = PinningContext::new();

        assert_eq!(router.resolve_read(&ctx, "egg").unwrap(), "egg");
    }

    #[test]
    fn test_unmanaged_alias_passes_through() {
        let router = PinRouter::new(registry(), RoutingPolicy::Strict);
        let mut ctx = PinningContext::new();

        assert_eq!(router.resolve_read(&ctx, "frob").unwrap(), "frob");
        assert_eq!(router.resolve_write(&mut ctx, "frob", false).unwrap(), "frob");
        assert!(!ctx.is_pinned("frob"));
    }

    #[test]
    fn test_strict_refuses_unpinned_write() {
        let router = PinRouter::new(registry(), RoutingPolicy::Strict);
        let mut ctx = PinningContext::new();

        assert_eq!(
            router.resolve_write(&mut ctx, "egg", false).unwrap_err(),
            RouterError::UnpinnedWrite("egg".to_string())
        );

        // Pinning another set does not help.
        ctx.pin("default", true);
        assert!(router.resolve_write(&mut ctx, "egg", false).is_err());

        // Pinning the right set makes the same write succeed.
        ctx.pin("egg", true);
        assert_eq!(router.resolve_write(&mut ctx, "egg", false).unwrap(), "egg");
    }

    #[test]
    fn test_greedy_pins_on_write() {
        let router = PinRouter::new(registry(), RoutingPolicy::Greedy);
        let mut ctx = PinningContext::new();

        assert!(!ctx.is_pinned("egg"));
        assert_eq!(router.resolve_write(&mut ctx, "egg", false).unwrap(), "egg");
        assert!(ctx.is_pinned("egg"));
        // The pin counts as new, otherwise it would never be persisted.
        assert!(ctx.is_newly_pinned("egg"));
    }

    #[test]
    fn test_escape_hatch_permits_without_pinning() {
        let mut ctx = PinningContext::new();

        for policy in [RoutingPolicy::Strict, RoutingPolicy::Greedy] {
            let router = PinRouter::new(registry(), policy);
            assert_eq!(router.resolve_write(&mut ctx, "egg", true).unwrap(), "egg");
            assert!(!ctx.is_pinned("egg"));
        }
    }

    #[test]
    fn test_delegate_abstains_to_default() {
        let router = PinRouter::new(registry(), RoutingPolicy::Greedy)
            .with_picker(Box::new(FixedPicker(0)));
        let mut ctx = PinningContext::new();

        // No delegate configured: everything resolves to the default set.
        assert_eq!(router.db_for_read(&ctx, "HamModel").unwrap(), "default-0");
        assert_eq!(router.db_for_write(&mut ctx, "HamModel").unwrap(), "default");
        assert!(ctx.is_pinned("default"));
        assert!(router.allow_relation("HamModel", "EggModel"));
        assert!(router.allow_schema_sync("default", "HamModel"));
    }

    struct EggDelegate;

    impl DelegateResolver for EggDelegate {
        fn db_for_read(&self, model: &str) -> Option<String> {
            (model == "EggModel").then(|| "egg".to_string())
        }

        fn db_for_write(&self, model: &str) -> Option<String> {
            (model == "EggModel").then(|| "egg".to_string())
        }

        fn allow_schema_sync(&self, alias: &str, model: &str) -> Option<bool> {
            Some(alias == "egg" && model == "EggModel")
        }
    }

    #[test]
    fn test_delegate_resolution_used() {
        let router = PinRouter::new(registry(), RoutingPolicy::Greedy)
            .with_delegate(Box::new(EggDelegate))
            .with_picker(Box::new(FixedPicker(0)));
        let mut ctx = PinningContext::new();

        assert_eq!(router.db_for_read(&ctx, "EggModel").unwrap(), "egg");
        assert_eq!(router.db_for_read(&ctx, "HamModel").unwrap(), "default-0");

        assert_eq!(router.db_for_write(&mut ctx, "EggModel").unwrap(), "egg");
        assert!(ctx.is_pinned("egg"));
        assert!(!ctx.is_pinned("default"));

        // Permission answers pass through unreinterpreted.
        assert!(router.allow_schema_sync("egg", "EggModel"));
        assert!(!router.allow_schema_sync("default", "EggModel"));
        assert!(router.allow_relation("HamModel", "EggModel"));
    }
}
