//! GraphStore - clusters, contents, values and references over SQLite + object storage.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use common::action::Action;
use sqlx::sqlite::SqliteConnection;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::access::{AccessGate, AllowAll};
use crate::cascade::{
    release_payloads, CascadeDeleter, DanglingPolicy, DeletionObserver, DeletionReport,
    DeletionScope, SetValueReport,
};
use crate::database::{self, Database};
use crate::error::{GraphError, Result};
use crate::models::{
    Cluster, ClusterUpdate, Content, ContentUpdate, ContentValue, NewCluster, NewContent,
    NewReference, NodeReferences, NodeRef, Reference, WriteResult,
};
use crate::storage::{PayloadStorage, PayloadStoreConfig};

/// The graph of clusters, contents and references.
///
/// Metadata lives in SQLite, value payloads in object storage. Every
/// operation names the [`Action`] it exercises and asks the configured
/// [`AccessGate`] before touching anything. Deletions fire the registered
/// [`DeletionObserver`] inside their transaction.
///
/// # Example
///
/// ```rust,no_run
/// use secretgraph_store::{DanglingPolicy, GraphStore, NewCluster};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), secretgraph_store::GraphError> {
/// let store = GraphStore::new_local(Path::new("/tmp/graph"), DanglingPolicy::Restrict).await?;
/// let cluster = store
///     .create_cluster(NewCluster {
///         name: "keys".to_string(),
///         description: String::new(),
///     })
///     .await?;
/// let report = store.delete_cluster(cluster.id).await?;
/// assert_eq!(report.deleted_clusters, vec![cluster.id]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GraphStore {
    db: Database,
    payloads: PayloadStorage,
    observer: Arc<dyn DeletionObserver>,
    gate: Arc<dyn AccessGate>,
}

impl GraphStore {
    fn assemble(db: Database, payloads: PayloadStorage, policy: DanglingPolicy) -> Self {
        Self {
            db,
            payloads,
            observer: Arc::new(CascadeDeleter::new(policy)),
            gate: Arc::new(AllowAll),
        }
    }

    /// Create a store with a file-based SQLite database.
    pub async fn new(
        db_path: &Path,
        config: PayloadStoreConfig,
        policy: DanglingPolicy,
    ) -> Result<Self> {
        let db = Database::new(db_path).await?;
        let payloads = PayloadStorage::new(config).await?;
        Ok(Self::assemble(db, payloads, policy))
    }

    /// Create a store from a `sqlite:` URL.
    pub async fn connect(
        url: &str,
        config: PayloadStoreConfig,
        policy: DanglingPolicy,
    ) -> Result<Self> {
        let db = Database::connect(url).await?;
        let payloads = PayloadStorage::new(config).await?;
        Ok(Self::assemble(db, payloads, policy))
    }

    /// Create a store with an in-memory SQLite database.
    pub async fn in_memory(config: PayloadStoreConfig, policy: DanglingPolicy) -> Result<Self> {
        let db = Database::in_memory().await?;
        let payloads = PayloadStorage::new(config).await?;
        Ok(Self::assemble(db, payloads, policy))
    }

    /// Create a store backed by the local filesystem under `data_dir`.
    pub async fn new_local(data_dir: &Path, policy: DanglingPolicy) -> Result<Self> {
        let db_path = data_dir.join("graph.db");
        let config = PayloadStoreConfig::Local {
            path: data_dir.join("payloads"),
        };
        Self::new(&db_path, config, policy).await
    }

    /// Create a fully ephemeral store (in-memory DB + in-memory payloads).
    pub async fn ephemeral() -> Result<Self> {
        Self::in_memory(PayloadStoreConfig::Memory, DanglingPolicy::default()).await
    }

    /// Replace the deletion observer.
    pub fn with_observer(mut self, observer: Arc<dyn DeletionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replace the access gate.
    pub fn with_access_gate(mut self, gate: Arc<dyn AccessGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn payloads(&self) -> &PayloadStorage {
        &self.payloads
    }

    /// Readiness probe.
    pub async fn is_ready(&self) -> Result<()> {
        self.db.ping().await
    }

    async fn check(&self, action: Action, node: NodeRef) -> Result<()> {
        if self.gate.admit(action, node).await {
            Ok(())
        } else {
            debug!(%action, %node, "access gate refused");
            Err(GraphError::Forbidden { action, node })
        }
    }

    // Clusters

    pub async fn create_cluster(&self, new: NewCluster) -> Result<Cluster> {
        require("name", &new.name)?;

        let mut tx = self.db.begin().await?;
        let cluster = database::insert_cluster(&mut tx, &new.name, &new.description).await?;
        // Checked before commit; a refusal rolls the insert back
        self.check(Action::Manage, NodeRef::Cluster(cluster.id))
            .await?;
        tx.commit().await?;

        info!(cluster_id = %cluster.id, name = %cluster.name, "cluster created");
        Ok(cluster)
    }

    pub async fn get_cluster(&self, id: Uuid) -> Result<Cluster> {
        let mut conn = self.db.acquire().await?;
        let cluster = load_cluster(&mut conn, id).await?;
        self.check(Action::View, NodeRef::Cluster(id)).await?;
        Ok(cluster)
    }

    /// Apply `update` if its `update_id` still matches.
    pub async fn update_cluster(
        &self,
        id: Uuid,
        update: ClusterUpdate,
    ) -> Result<WriteResult<Cluster>> {
        let mut tx = self.db.begin().await?;
        let mut cluster = load_cluster(&mut tx, id).await?;
        self.check(Action::Update, NodeRef::Cluster(id)).await?;

        if cluster.update_id != update.update_id {
            debug!(cluster_id = %id, "stale update_id, cluster not written");
            return Ok(WriteResult {
                write_ok: false,
                record: cluster,
            });
        }

        if let Some(name) = update.name {
            require("name", &name)?;
            cluster.name = name;
        }
        if let Some(description) = update.description {
            cluster.description = description;
        }
        database::save_cluster(&mut tx, &mut cluster).await?;
        tx.commit().await?;

        info!(cluster_id = %id, "cluster updated");
        Ok(WriteResult {
            write_ok: true,
            record: cluster,
        })
    }

    /// Delete a cluster together with every content it owns.
    pub async fn delete_cluster(&self, id: Uuid) -> Result<DeletionReport> {
        let mut scope = DeletionScope::begin(&self.db).await?;
        load_cluster(scope.connection(), id).await?;
        self.check(Action::Manage, NodeRef::Cluster(id)).await?;

        let contents: Vec<Uuid> = database::list_contents(scope.connection(), id)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        self.purge(&mut scope, &contents, Some(id)).await?;

        let report = self.finish(scope).await?;
        info!(
            cluster_id = %id,
            contents = report.deleted_contents.len(),
            references = report.deleted_references.len(),
            "cluster deleted"
        );
        Ok(report)
    }

    pub async fn list_contents(&self, cluster_id: Uuid) -> Result<Vec<Content>> {
        let mut conn = self.db.acquire().await?;
        load_cluster(&mut conn, cluster_id).await?;
        self.check(Action::View, NodeRef::Cluster(cluster_id))
            .await?;
        database::list_contents(&mut conn, cluster_id).await
    }

    // Contents

    pub async fn create_content(&self, new: NewContent) -> Result<Content> {
        require("content_type", &new.content_type)?;
        require("state", &new.state)?;

        let mut tx = self.db.begin().await?;
        load_cluster(&mut tx, new.cluster_id).await?;
        self.check(Action::Update, NodeRef::Cluster(new.cluster_id))
            .await?;
        let content =
            database::insert_content(&mut tx, new.cluster_id, &new.content_type, &new.state)
                .await?;
        tx.commit().await?;

        info!(
            content_id = %content.id,
            cluster_id = %content.cluster_id,
            content_type = %content.content_type,
            "content created"
        );
        Ok(content)
    }

    pub async fn get_content(&self, id: Uuid) -> Result<Content> {
        let mut conn = self.db.acquire().await?;
        let content = load_content(&mut conn, id).await?;
        self.check(Action::View, NodeRef::Content(id)).await?;
        Ok(content)
    }

    /// Apply `update` if its `update_id` still matches.
    ///
    /// Moving a content also needs `Update` on the destination cluster.
    pub async fn update_content(
        &self,
        id: Uuid,
        update: ContentUpdate,
    ) -> Result<WriteResult<Content>> {
        let mut tx = self.db.begin().await?;
        let mut content = load_content(&mut tx, id).await?;
        self.check(Action::Update, NodeRef::Content(id)).await?;

        if content.update_id != update.update_id {
            debug!(content_id = %id, "stale update_id, content not written");
            return Ok(WriteResult {
                write_ok: false,
                record: content,
            });
        }

        if let Some(cluster_id) = update.cluster_id {
            if cluster_id != content.cluster_id {
                load_cluster(&mut tx, cluster_id).await?;
                self.check(Action::Update, NodeRef::Cluster(cluster_id))
                    .await?;
                content.cluster_id = cluster_id;
            }
        }
        if let Some(content_type) = update.content_type {
            require("content_type", &content_type)?;
            content.content_type = content_type;
        }
        if let Some(state) = update.state {
            require("state", &state)?;
            content.state = state;
        }
        database::save_content(&mut tx, &mut content).await?;
        tx.commit().await?;

        info!(content_id = %id, "content updated");
        Ok(WriteResult {
            write_ok: true,
            record: content,
        })
    }

    pub async fn delete_content(&self, id: Uuid) -> Result<DeletionReport> {
        let mut scope = DeletionScope::begin(&self.db).await?;
        load_content(scope.connection(), id).await?;
        self.check(Action::Manage, NodeRef::Content(id)).await?;

        self.purge(&mut scope, &[id], None).await?;

        let report = self.finish(scope).await?;
        info!(
            content_id = %id,
            references = report.deleted_references.len(),
            dangling = report.dangling_references.len(),
            "content deleted"
        );
        Ok(report)
    }

    // Values

    /// Store `data` as the value of a content, replacing any previous value.
    ///
    /// The payload is written first under a fresh key, then the metadata is
    /// swapped in one transaction. The replaced payload is released after
    /// commit and the returned report says whether that worked; if the swap
    /// fails the new payload is removed again.
    ///
    /// Setting a first value exercises [`Action::Update`], replacing one
    /// [`Action::StoredReplace`]. The choice is made under the swap's write
    /// lock, so a concurrent writer cannot turn a replace into an update.
    pub async fn set_value(&self, content_id: Uuid, data: Bytes) -> Result<SetValueReport> {
        {
            let mut conn = self.db.acquire().await?;
            load_content(&mut conn, content_id).await?;
        }

        let size = data.len() as i64;
        let key = if data.is_empty() {
            None
        } else {
            let key = PayloadStorage::payload_key(content_id);
            self.payloads.put_payload(&key, data).await?;
            Some(key)
        };

        match self.swap_value(content_id, key.as_deref(), size).await {
            Ok(stored) => {
                info!(
                    content_id = %content_id,
                    size,
                    release_failures = stored.replaced.release_failures.len(),
                    "value stored"
                );
                Ok(stored)
            }
            Err(e) => {
                if let Some(key) = &key {
                    if let Err(cleanup) = self.payloads.delete_payload(key).await {
                        warn!(
                            content_id = %content_id,
                            key = %key,
                            error = %cleanup,
                            "failed to remove payload of rejected value"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    async fn swap_value(
        &self,
        content_id: Uuid,
        payload_key: Option<&str>,
        size: i64,
    ) -> Result<SetValueReport> {
        let node = NodeRef::Content(content_id);
        let mut scope = DeletionScope::begin_immediate(&self.db).await?;
        load_content(scope.connection(), content_id).await?;

        let previous = database::get_value(scope.connection(), content_id).await?;
        let action = match previous {
            Some(_) => Action::StoredReplace,
            None => Action::Update,
        };
        self.check(action, node).await?;

        if let Some(previous) = &previous {
            self.observer.on_value_deleted(&mut scope, previous).await?;
            scope.report_mut().deleted_values.push(content_id);
        }
        let value =
            database::upsert_value(scope.connection(), content_id, payload_key, size).await?;

        let replaced = self.finish(scope).await?;
        if !replaced.released_payloads.is_empty() {
            debug!(content_id = %content_id, "released replaced payload");
        }
        Ok(SetValueReport { value, replaced })
    }

    /// Metadata and bytes of a content's value.
    pub async fn get_value(&self, content_id: Uuid) -> Result<(ContentValue, Bytes)> {
        let value = {
            let mut conn = self.db.acquire().await?;
            load_content(&mut conn, content_id).await?;
            self.check(Action::Fetch, NodeRef::Content(content_id))
                .await?;
            database::get_value(&mut conn, content_id)
                .await?
                .ok_or(GraphError::ValueNotFound(content_id))?
        };

        let data = match &value.payload_key {
            None => Bytes::new(),
            Some(key) => self.payloads.get_payload(key).await?.ok_or_else(|| {
                GraphError::InvalidRecord(format!("payload {} of content {} is missing", key, content_id))
            })?,
        };
        Ok((value, data))
    }

    /// Remove a content's value, keeping the content itself.
    pub async fn delete_value(&self, content_id: Uuid) -> Result<DeletionReport> {
        let mut scope = DeletionScope::begin(&self.db).await?;
        load_content(scope.connection(), content_id).await?;
        self.check(Action::StoredDelete, NodeRef::Content(content_id))
            .await?;

        let value = database::get_value(scope.connection(), content_id)
            .await?
            .ok_or(GraphError::ValueNotFound(content_id))?;
        self.observer.on_value_deleted(&mut scope, &value).await?;
        database::delete_value_row(scope.connection(), content_id).await?;
        scope.report_mut().deleted_values.push(content_id);

        let report = self.finish(scope).await?;
        info!(content_id = %content_id, "value deleted");
        Ok(report)
    }

    // References

    pub async fn add_reference(&self, new: NewReference) -> Result<Reference> {
        if new.source == new.target {
            return Err(GraphError::SelfReference(new.source));
        }

        let mut tx = self.db.begin().await?;
        load_node(&mut tx, new.source).await?;
        load_node(&mut tx, new.target).await?;
        self.check(Action::Update, new.source).await?;

        let reference = match database::insert_reference(
            &mut tx,
            new.source,
            new.target,
            &new.group,
            new.delete_recursive,
        )
        .await
        {
            Ok(reference) => reference,
            Err(GraphError::Database(sqlx::Error::Database(e))) if e.is_unique_violation() => {
                return Err(GraphError::DuplicateReference {
                    from: new.source,
                    to: new.target,
                    group: new.group,
                });
            }
            Err(e) => return Err(e),
        };
        tx.commit().await?;

        info!(
            reference_id = %reference.id,
            source = %reference.source,
            target = %reference.target,
            delete_recursive = reference.delete_recursive,
            "reference added"
        );
        Ok(reference)
    }

    /// Delete a single reference, returning it.
    pub async fn delete_reference(&self, id: Uuid) -> Result<Reference> {
        let mut tx = self.db.begin().await?;
        let reference = database::get_reference(&mut tx, id)
            .await?
            .ok_or(GraphError::ReferenceNotFound(id))?;
        self.check(Action::Update, reference.source).await?;
        database::delete_reference_row(&mut tx, id).await?;
        tx.commit().await?;

        info!(reference_id = %id, "reference deleted");
        Ok(reference)
    }

    /// References pointing at and leaving `node`.
    pub async fn references_of(&self, node: NodeRef) -> Result<NodeReferences> {
        let mut conn = self.db.acquire().await?;
        load_node(&mut conn, node).await?;
        self.check(Action::View, node).await?;
        Ok(NodeReferences {
            incoming: database::references_to(&mut conn, node).await?,
            outgoing: database::references_from(&mut conn, node).await?,
        })
    }

    /// Remove `contents` and optionally their owning cluster inside `scope`.
    async fn purge(
        &self,
        scope: &mut DeletionScope,
        contents: &[Uuid],
        cluster: Option<Uuid>,
    ) -> Result<()> {
        let mut doomed: Vec<NodeRef> = contents.iter().copied().map(NodeRef::Content).collect();
        doomed.extend(cluster.map(NodeRef::Cluster));

        // References cannot outlive their source
        for node in &doomed {
            let removed = database::delete_references_from(scope.connection(), *node).await?;
            scope.report_mut().deleted_references.extend(removed);
        }

        for id in contents {
            if let Some(value) = database::get_value(scope.connection(), *id).await? {
                self.observer.on_value_deleted(scope, &value).await?;
                database::delete_value_row(scope.connection(), *id).await?;
                scope.report_mut().deleted_values.push(*id);
            }
        }

        for node in &doomed {
            self.observer.on_instance_deleted(scope, *node).await?;
        }

        for id in contents {
            database::delete_content_row(scope.connection(), *id).await?;
            scope.report_mut().deleted_contents.push(*id);
        }
        if let Some(id) = cluster {
            database::delete_cluster_row(scope.connection(), id).await?;
            scope.report_mut().deleted_clusters.push(id);
        }
        Ok(())
    }

    async fn finish(&self, scope: DeletionScope) -> Result<DeletionReport> {
        let (mut report, releases) = scope.commit().await?;
        release_payloads(&self.payloads, releases, &mut report).await;
        Ok(report)
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GraphError::InvalidField(format!("{} must not be empty", field)));
    }
    Ok(())
}

async fn load_cluster(conn: &mut SqliteConnection, id: Uuid) -> Result<Cluster> {
    database::get_cluster(conn, id)
        .await?
        .ok_or(GraphError::NotFound(NodeRef::Cluster(id)))
}

async fn load_content(conn: &mut SqliteConnection, id: Uuid) -> Result<Content> {
    database::get_content(conn, id)
        .await?
        .ok_or(GraphError::NotFound(NodeRef::Content(id)))
}

async fn load_node(conn: &mut SqliteConnection, node: NodeRef) -> Result<()> {
    match node {
        NodeRef::Cluster(id) => load_cluster(conn, id).await.map(|_| ()),
        NodeRef::Content(id) => load_content(conn, id).await.map(|_| ()),
    }
}
