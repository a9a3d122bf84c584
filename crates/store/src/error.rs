//! Error types for the graph store.

use common::action::Action;
use uuid::Uuid;

use crate::models::NodeRef;

/// Errors that can occur when working with the graph store.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Object storage error
    #[error("object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// S3 bucket not found - must be created before use
    #[error("S3 bucket '{0}' does not exist. Create it before starting the node.")]
    BucketNotFound(String),

    /// A row in the database could not be mapped back to a record
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// A caller-supplied field was rejected
    #[error("invalid field: {0}")]
    InvalidField(String),

    #[error("{0} not found")]
    NotFound(NodeRef),

    #[error("content {0} has no stored value")]
    ValueNotFound(Uuid),

    #[error("reference {0} not found")]
    ReferenceNotFound(Uuid),

    /// The target is still referenced by references that do not cascade
    #[error(
        "{target} is still referenced by {} non-recursive reference(s)",
        references.len()
    )]
    IntegrityViolation {
        target: NodeRef,
        references: Vec<Uuid>,
    },

    #[error("a reference from {from} to {to} in group {group:?} already exists")]
    DuplicateReference {
        from: NodeRef,
        to: NodeRef,
        group: String,
    },

    #[error("{0} cannot reference itself")]
    SelfReference(NodeRef),

    /// The access gate refused the action
    #[error("{action} on {node} is not permitted")]
    Forbidden { action: Action, node: NodeRef },
}

/// Result type alias for graph store operations.
pub type Result<T> = std::result::Result<T, GraphError>;
