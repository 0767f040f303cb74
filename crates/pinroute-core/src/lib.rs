//! Pinroute - Master/Replica Routing with Read-Your-Write Pinning
//!
//! Routes database reads and writes across a master and its read replicas,
//! guaranteeing that a client never observes a stale read right after its own
//! write while otherwise load-balancing reads across replicas.
//!
//! # Architecture
//!
//! ```text
//! Operation (model)
//!     │
//!     ▼
//! ┌─────────────────────────┐
//! │    DelegateResolver     │  Which database set? (embedding app)
//! └───────────┬─────────────┘
//!             ▼
//! ┌─────────────────────────┐
//! │       PinRouter         │  Master or replica?
//! │  (Strict | Greedy)      │  consults PinningContext + DbSetRegistry
//! └───────────┬─────────────┘
//!             ▼
//! ┌─────────────────────────┐
//! │    ReplicaSelector      │  Which replica? (uniform random draw)
//! └─────────────────────────┘
//! ```
//!
//! # Unit-of-work protocol
//!
//! A "unit of work" is one inbound request or one background task run. Each
//! owns its own [`PinningContext`]; nothing mutable is shared between units.
//! After a write pins a set, [`PinCodec`] carries that pin to the client as a
//! cookie payload with a short TTL, so the user's next request also reads
//! from the master while replication catches up.
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use pinroute_core::{
//!     DbSetRegistry, PinCodec, PinRouter, PinningContext, RouterConfig, RoutingPolicy,
//! };
//!
//! # fn main() -> Result<(), pinroute_core::RouterError> {
//! let config = RouterConfig::new(
//!     HashMap::from([("default".to_string(), Default::default())]),
//!     HashMap::from([("default".to_string(), vec![Default::default()])]),
//! )
//! .with_policy(RoutingPolicy::Greedy);
//!
//! let registry = Arc::new(DbSetRegistry::new(&config)?);
//! let router = PinRouter::new(registry.clone(), config.policy);
//! let codec = PinCodec::from_config(registry, &config);
//!
//! // One request:
//! let mut ctx = PinningContext::new();
//! let carried = codec.begin(&mut ctx, None, 100.0);
//! let read_db = router.db_for_read(&ctx, "Article")?;   // a replica
//! let write_db = router.db_for_write(&mut ctx, "Article")?; // "default", now pinned
//! let cookie = codec.finish(&carried, &ctx, 100.0);     // Some(payload) to send back
//! # assert!(cookie.is_some());
//! # let _ = (read_db, write_db);
//! # Ok(())
//! # }
//! ```

// Core modules
mod config;
mod cookie;
mod delegate;
mod error;
mod pinning;
mod registry;
mod router;
mod scope;
mod selector;
mod types;


// Re-exports: Error types
pub use error::RouterError;

// Re-exports: Core types and defaults
pub use types::{
    replica_alias, Alias, RoutingPolicy, DEFAULT_ALIAS, DEFAULT_PIN_COOKIE, DEFAULT_PIN_TTL_SECS,
};

// Re-exports: Configuration and registry
pub use config::{DbSettings, RouterConfig};
pub use registry::DbSetRegistry;

// Re-exports: Pinning state and scoped overrides
pub use pinning::PinningContext;
pub use scope::{with_master, with_masters, with_replica, with_replicas};

// Re-exports: Routing
pub use delegate::DelegateResolver;
pub use router::PinRouter;
pub use selector::{RandomPicker, ReplicaPicker, ReplicaSelector};

// Re-exports: Persistence
pub use cookie::{PersistedPin, PinCodec};
