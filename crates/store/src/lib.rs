//! Graph store for secretgraph
//!
//! Clusters own contents, contents hold at most one stored value, and
//! references link any two nodes. Metadata lives in SQLite; value payloads
//! live in pluggable object storage (S3/MinIO/local filesystem/memory).
//!
//! # Features
//!
//! - Cascading deletion through a [`DeletionObserver`] fired inside the
//!   deletion transaction, with payload releases deferred until commit
//! - Configurable handling of non-recursive references ([`DanglingPolicy`])
//! - Optimistic concurrency through per-record `update_id` tokens
//! - Every operation names its [`Action`](common::action::Action) and asks an
//!   [`AccessGate`]
//!
//! # Example
//!
//! ```rust,no_run
//! use secretgraph_store::{GraphStore, NewCluster, NewContent};
//!
//! # async fn example() -> Result<(), secretgraph_store::GraphError> {
//! let store = GraphStore::ephemeral().await?;
//! let cluster = store
//!     .create_cluster(NewCluster {
//!         name: "keys".to_string(),
//!         description: String::new(),
//!     })
//!     .await?;
//! let content = store
//!     .create_content(NewContent {
//!         cluster_id: cluster.id,
//!         content_type: "PublicKey".to_string(),
//!         state: "public".to_string(),
//!     })
//!     .await?;
//! store.set_value(content.id, "-----BEGIN".into()).await?;
//! # Ok(())
//! # }
//! ```

mod access;
mod cascade;
mod database;
mod error;
mod graph_store;
mod models;
mod storage;

pub use access::{AccessGate, AllowAll, DenyActions};
pub use cascade::{
    CascadeDeleter, DanglingPolicy, DeletionObserver, DeletionReport, DeletionScope,
    PayloadReleaseFailure, SetValueReport,
};
pub use error::{GraphError, Result};
pub use graph_store::GraphStore;
pub use models::{
    Cluster, ClusterUpdate, Content, ContentUpdate, ContentValue, NewCluster, NewContent,
    NewReference, NodeKind, NodeRef, NodeRefParseError, NodeReferences, Reference, WriteResult,
};
pub use storage::{PayloadStorage, PayloadStoreConfig};
