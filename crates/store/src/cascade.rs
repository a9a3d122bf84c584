//! Referential integrity on deletion.
//!
//! Every deletion in the [`GraphStore`](crate::GraphStore) runs inside a
//! [`DeletionScope`], which wraps one SQLite transaction. The store fires the
//! registered [`DeletionObserver`] for each doomed value and node before the
//! transaction commits, so anything the observer deletes goes away together
//! with the node, or not at all.
//!
//! Object storage cannot take part in the transaction. Payload releases are
//! therefore only *scheduled* inside the scope and carried out once the
//! metadata has committed. A failed release leaves an orphaned object behind,
//! never a record pointing at a missing one.

use std::collections::HashSet;
use std::fmt::{self, Debug};
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteConnection;
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

use crate::database::{self, Database};
use crate::error::{GraphError, Result};
use crate::models::{ContentValue, NodeRef};
use crate::storage::PayloadStorage;

/// What happens to a reference without `delete_recursive` when its target
/// is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DanglingPolicy {
    /// Refuse the deletion while such references exist.
    #[default]
    Restrict,
    /// Delete the target and keep the references, now dangling.
    Retain,
}

impl DanglingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DanglingPolicy::Restrict => "restrict",
            DanglingPolicy::Retain => "retain",
        }
    }
}

impl fmt::Display for DanglingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DanglingPolicy {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "restrict" => Ok(DanglingPolicy::Restrict),
            "retain" => Ok(DanglingPolicy::Retain),
            other => Err(GraphError::InvalidConfig(format!(
                "unknown dangling policy {:?}",
                other
            ))),
        }
    }
}

/// A payload that could not be removed from object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadReleaseFailure {
    pub content_id: Uuid,
    pub payload_key: String,
    pub message: String,
}

/// Everything a deletion removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionReport {
    pub deleted_clusters: Vec<Uuid>,
    pub deleted_contents: Vec<Uuid>,
    /// Contents whose stored value was removed.
    pub deleted_values: Vec<Uuid>,
    pub deleted_references: Vec<Uuid>,
    /// Non-recursive references left pointing at a deleted node.
    pub dangling_references: Vec<Uuid>,
    /// Payload keys released from object storage.
    pub released_payloads: Vec<String>,
    pub release_failures: Vec<PayloadReleaseFailure>,
}

/// A stored value, plus what replacing the previous one released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetValueReport {
    pub value: ContentValue,
    /// Empty when the content had no value before.
    pub replaced: DeletionReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingRelease {
    pub content_id: Uuid,
    pub payload_key: String,
}

/// One deletion transaction plus the side effects queued for after commit.
///
/// Dropping a scope without committing rolls the transaction back and
/// discards every scheduled release.
pub struct DeletionScope {
    tx: Transaction<'static, Sqlite>,
    releases: Vec<PendingRelease>,
    scheduled: HashSet<String>,
    report: DeletionReport,
}

impl Debug for DeletionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeletionScope")
            .field("releases", &self.releases)
            .field("report", &self.report)
            .finish()
    }
}

impl DeletionScope {
    pub(crate) async fn begin(db: &Database) -> Result<Self> {
        Ok(Self::wrap(db.begin().await?))
    }

    /// Like [`begin`](Self::begin), but takes the write lock up front so
    /// reads inside the scope cannot go stale before the scope writes.
    pub(crate) async fn begin_immediate(db: &Database) -> Result<Self> {
        Ok(Self::wrap(db.begin_immediate().await?))
    }

    fn wrap(tx: Transaction<'static, Sqlite>) -> Self {
        Self {
            tx,
            releases: Vec::new(),
            scheduled: HashSet::new(),
            report: DeletionReport::default(),
        }
    }

    /// The transaction the deletion runs in.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub fn report(&self) -> &DeletionReport {
        &self.report
    }

    pub fn report_mut(&mut self) -> &mut DeletionReport {
        &mut self.report
    }

    /// Queue a payload for release once the scope commits.
    ///
    /// Scheduling the same key twice queues it once.
    pub fn schedule_release(&mut self, content_id: Uuid, payload_key: &str) {
        if !self.scheduled.insert(payload_key.to_string()) {
            return;
        }
        self.releases.push(PendingRelease {
            content_id,
            payload_key: payload_key.to_string(),
        });
    }

    pub(crate) async fn commit(self) -> Result<(DeletionReport, Vec<PendingRelease>)> {
        self.tx.commit().await?;
        Ok((self.report, self.releases))
    }
}

/// Observer fired by the store for every node and value it deletes.
///
/// Both hooks run inside the deletion's transaction. Returning an error
/// aborts the whole deletion.
#[async_trait]
pub trait DeletionObserver: Send + Sync + Debug {
    /// A cluster or content is about to be deleted.
    async fn on_instance_deleted(&self, scope: &mut DeletionScope, node: NodeRef) -> Result<()>;

    /// A content's stored value is about to be deleted or replaced.
    async fn on_value_deleted(&self, scope: &mut DeletionScope, value: &ContentValue) -> Result<()>;
}

/// Removes cascading references into deleted nodes and schedules the release
/// of deleted payloads.
///
/// Only direct incoming references are touched. Nodes that lose their last
/// reference are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct CascadeDeleter {
    policy: DanglingPolicy,
}

impl CascadeDeleter {
    pub fn new(policy: DanglingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DanglingPolicy {
        self.policy
    }
}

#[async_trait]
impl DeletionObserver for CascadeDeleter {
    async fn on_instance_deleted(&self, scope: &mut DeletionScope, node: NodeRef) -> Result<()> {
        let removed = database::delete_recursive_references_to(scope.connection(), node).await?;
        if !removed.is_empty() {
            tracing::debug!(%node, count = removed.len(), "deleted cascading references");
        }
        scope.report_mut().deleted_references.extend(removed);

        let remaining: Vec<Uuid> = database::references_to(scope.connection(), node)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        if remaining.is_empty() {
            return Ok(());
        }

        match self.policy {
            DanglingPolicy::Restrict => {
                tracing::warn!(
                    %node,
                    count = remaining.len(),
                    "deletion blocked by non-recursive references"
                );
                Err(GraphError::IntegrityViolation {
                    target: node,
                    references: remaining,
                })
            }
            DanglingPolicy::Retain => {
                tracing::debug!(%node, count = remaining.len(), "leaving references dangling");
                scope.report_mut().dangling_references.extend(remaining);
                Ok(())
            }
        }
    }

    async fn on_value_deleted(&self, scope: &mut DeletionScope, value: &ContentValue) -> Result<()> {
        if let Some(key) = &value.payload_key {
            scope.schedule_release(value.content_id, key);
        }
        Ok(())
    }
}

/// Release committed payloads, recording each outcome in `report`.
///
/// Failures are logged and collected; the metadata deletion has already
/// committed and stays.
pub(crate) async fn release_payloads(
    storage: &PayloadStorage,
    releases: Vec<PendingRelease>,
    report: &mut DeletionReport,
) {
    for release in releases {
        match storage.delete_payload(&release.payload_key).await {
            Ok(()) => {
                tracing::debug!(
                    content_id = %release.content_id,
                    key = %release.payload_key,
                    "released payload"
                );
                report.released_payloads.push(release.payload_key);
            }
            Err(e) => {
                tracing::warn!(
                    content_id = %release.content_id,
                    key = %release.payload_key,
                    error = %e,
                    "failed to release payload, object left orphaned"
                );
                report.release_failures.push(PayloadReleaseFailure {
                    content_id: release.content_id,
                    payload_key: release.payload_key,
                    message: e.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (Database, Uuid, Uuid) {
        let db = Database::in_memory().await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let cluster = database::insert_cluster(&mut conn, "keys", "").await.unwrap();
        let a = database::insert_content(&mut conn, cluster.id, "File", "internal")
            .await
            .unwrap();
        let b = database::insert_content(&mut conn, cluster.id, "File", "internal")
            .await
            .unwrap();
        drop(conn);
        (db, a.id, b.id)
    }

    #[tokio::test]
    async fn test_value_without_payload_is_noop() {
        let (db, a, _) = seeded().await;
        let mut scope = DeletionScope::begin(&db).await.unwrap();

        let value = ContentValue {
            content_id: a,
            payload_key: None,
            size: 0,
            created_at: 0,
        };
        CascadeDeleter::default()
            .on_value_deleted(&mut scope, &value)
            .await
            .unwrap();

        let (_, releases) = scope.commit().await.unwrap();
        assert!(releases.is_empty());
    }

    #[tokio::test]
    async fn test_release_scheduled_once() {
        let (db, a, _) = seeded().await;
        let mut scope = DeletionScope::begin(&db).await.unwrap();

        let value = ContentValue {
            content_id: a,
            payload_key: Some("values/a/1".to_string()),
            size: 1,
            created_at: 0,
        };
        let deleter = CascadeDeleter::default();
        deleter.on_value_deleted(&mut scope, &value).await.unwrap();
        deleter.on_value_deleted(&mut scope, &value).await.unwrap();

        // Many distinct keys keep their scheduling order
        for i in 2..200 {
            scope.schedule_release(a, &format!("values/a/{}", i));
        }
        scope.schedule_release(a, "values/a/1");
        scope.schedule_release(a, "values/a/100");

        let (_, releases) = scope.commit().await.unwrap();
        assert_eq!(releases.len(), 199);
        assert_eq!(releases[0].payload_key, "values/a/1");
        assert_eq!(releases[198].payload_key, "values/a/199");
    }

    #[tokio::test]
    async fn test_restrict_blocks_on_plain_reference() {
        let (db, a, b) = seeded().await;
        let mut conn = db.acquire().await.unwrap();
        let plain = database::insert_reference(
            &mut conn,
            NodeRef::Content(b),
            NodeRef::Content(a),
            "",
            false,
        )
        .await
        .unwrap();
        drop(conn);

        let mut scope = DeletionScope::begin(&db).await.unwrap();
        let err = CascadeDeleter::new(DanglingPolicy::Restrict)
            .on_instance_deleted(&mut scope, NodeRef::Content(a))
            .await
            .unwrap_err();

        match err {
            GraphError::IntegrityViolation { target, references } => {
                assert_eq!(target, NodeRef::Content(a));
                assert_eq!(references, vec![plain.id]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_retain_records_dangling_reference() {
        let (db, a, b) = seeded().await;
        let mut conn = db.acquire().await.unwrap();
        let cascading = database::insert_reference(
            &mut conn,
            NodeRef::Content(b),
            NodeRef::Content(a),
            "key",
            true,
        )
        .await
        .unwrap();
        let plain = database::insert_reference(
            &mut conn,
            NodeRef::Content(b),
            NodeRef::Content(a),
            "",
            false,
        )
        .await
        .unwrap();
        drop(conn);

        let mut scope = DeletionScope::begin(&db).await.unwrap();
        CascadeDeleter::new(DanglingPolicy::Retain)
            .on_instance_deleted(&mut scope, NodeRef::Content(a))
            .await
            .unwrap();

        assert_eq!(scope.report().deleted_references, vec![cascading.id]);
        assert_eq!(scope.report().dangling_references, vec![plain.id]);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("restrict".parse::<DanglingPolicy>().unwrap(), DanglingPolicy::Restrict);
        assert_eq!("retain".parse::<DanglingPolicy>().unwrap(), DanglingPolicy::Retain);
        assert!("cascade".parse::<DanglingPolicy>().is_err());
    }
}
