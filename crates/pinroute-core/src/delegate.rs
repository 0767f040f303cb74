//! Delegate resolver contract
//!
//! The embedding application decides which logical database set a data-access
//! operation belongs to; the routing engine decides which physical database
//! inside that set serves it. A concrete resolver is constructed by the
//! application and injected at router construction time.
//!
//! Every method may abstain by returning `None`: an abstaining read or write
//! resolution falls back to the `"default"` set, and abstaining permission
//! answers default to allowed.

/// Maps data-access operations to logical database-set aliases
pub trait DelegateResolver: Send + Sync {
    /// Database set a read of `model` should use, or `None` to abstain
    fn db_for_read(&self, _model: &str) -> Option<String> {
        None
    }

    /// Database set a write of `model` should use, or `None` to abstain
    fn db_for_write(&self, _model: &str) -> Option<String> {
        None
    }

    /// Whether a relation between two models is allowed, or `None` to abstain
    fn allow_relation(&self, _model_a: &str, _model_b: &str) -> Option<bool> {
        None
    }

    /// Whether `model`'s schema may be synced to the database at `alias`,
    /// or `None` to abstain
    fn allow_schema_sync(&self, _alias: &str, _model: &str) -> Option<bool> {
        None
    }
}
