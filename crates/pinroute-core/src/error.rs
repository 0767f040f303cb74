//! Error types for the routing engine

use thiserror::Error;

/// Routing engine error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    /// No master named "default" was configured
    #[error("no master named \"default\"; either configure one or disable require_default")]
    MissingDefaultMaster,

    /// A configured master has no replica-set entry (an empty list must be
    /// declared explicitly for master-only sets)
    #[error("master \"{0}\" has no replica set entry; declare an empty list for master-only sets")]
    MissingReplicaSet(String),

    /// Write attempted on an unpinned database set under the strict policy
    #[error("write to unpinned database set \"{0}\"; pin it first or allow the write explicitly")]
    UnpinnedWrite(String),

    /// Alias is not managed by the registry
    #[error("alias \"{0}\" is not managed by the registry")]
    UnknownAlias(String),

    /// Alias was expected to be pinned but is not
    #[error("alias \"{0}\" is not pinned")]
    NotPinned(String),
}
