//! Integration tests for cascading deletion of clusters and contents

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use secretgraph_store::{
    ContentValue, DanglingPolicy, DeletionObserver, DeletionScope, GraphError, NodeRef,
};

#[tokio::test]
async fn test_recursive_reference_removed_with_target() {
    let store = common::setup_store(DanglingPolicy::Restrict).await;
    let cluster = common::cluster(&store, "keys").await;
    let a = common::content(&store, &cluster).await;
    let b = common::content(&store, &cluster).await;
    let r = common::reference(&store, &b, &a, "key", true).await;

    let report = store.delete_content(a.id).await.unwrap();
    assert_eq!(report.deleted_contents, vec![a.id]);
    assert_eq!(report.deleted_references, vec![r.id]);
    assert!(report.dangling_references.is_empty());

    let refs = store.references_of(NodeRef::Content(b.id)).await.unwrap();
    assert!(refs.outgoing.is_empty());
    assert!(store.get_content(b.id).await.is_ok());
}

#[tokio::test]
async fn test_restrict_blocks_and_rolls_back() {
    let store = common::setup_store(DanglingPolicy::Restrict).await;
    let cluster = common::cluster(&store, "keys").await;
    let a = common::content(&store, &cluster).await;
    let b = common::content(&store, &cluster).await;
    let c = common::content(&store, &cluster).await;
    let cascading = common::reference(&store, &c, &a, "key", true).await;
    let plain = common::reference(&store, &b, &a, "signature", false).await;
    store.set_value(a.id, "secret".into()).await.unwrap();

    let err = store.delete_content(a.id).await.unwrap_err();
    match err {
        GraphError::IntegrityViolation { target, references } => {
            assert_eq!(target, NodeRef::Content(a.id));
            assert_eq!(references, vec![plain.id]);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Nothing of the attempted deletion survives, not even the cascading part
    assert!(store.get_content(a.id).await.is_ok());
    let incoming = store
        .references_of(NodeRef::Content(a.id))
        .await
        .unwrap()
        .incoming;
    let mut ids: Vec<_> = incoming.iter().map(|r| r.id).collect();
    let mut expected = vec![cascading.id, plain.id];
    ids.sort();
    expected.sort();
    assert_eq!(ids, expected);

    let (_, data) = store.get_value(a.id).await.unwrap();
    assert_eq!(&data[..], b"secret");
}

#[tokio::test]
async fn test_retain_keeps_dangling_reference() {
    let store = common::setup_store(DanglingPolicy::Retain).await;
    let cluster = common::cluster(&store, "keys").await;
    let a = common::content(&store, &cluster).await;
    let b = common::content(&store, &cluster).await;
    let plain = common::reference(&store, &b, &a, "signature", false).await;

    let report = store.delete_content(a.id).await.unwrap();
    assert_eq!(report.deleted_contents, vec![a.id]);
    assert!(report.deleted_references.is_empty());
    assert_eq!(report.dangling_references, vec![plain.id]);

    assert!(matches!(
        store.get_content(a.id).await,
        Err(GraphError::NotFound(NodeRef::Content(id))) if id == a.id
    ));
    let outgoing = store
        .references_of(NodeRef::Content(b.id))
        .await
        .unwrap()
        .outgoing;
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].target, NodeRef::Content(a.id));
}

#[tokio::test]
async fn test_policy_outcome_is_deterministic() {
    for _ in 0..3 {
        let store = common::setup_store(DanglingPolicy::Restrict).await;
        let cluster = common::cluster(&store, "keys").await;
        let a = common::content(&store, &cluster).await;
        let b = common::content(&store, &cluster).await;
        common::reference(&store, &b, &a, "", false).await;

        assert!(matches!(
            store.delete_content(a.id).await,
            Err(GraphError::IntegrityViolation { .. })
        ));
    }
}

#[tokio::test]
async fn test_outgoing_references_removed_with_source() {
    let store = common::setup_store(DanglingPolicy::Restrict).await;
    let x = common::cluster(&store, "x").await;
    let y = common::cluster(&store, "y").await;
    let a = common::content(&store, &x).await;
    let b = common::content(&store, &y).await;
    let r = common::reference(&store, &a, &b, "", false).await;

    let report = store.delete_content(a.id).await.unwrap();
    assert_eq!(report.deleted_references, vec![r.id]);

    let incoming = store
        .references_of(NodeRef::Content(b.id))
        .await
        .unwrap()
        .incoming;
    assert!(incoming.is_empty());
}

#[tokio::test]
async fn test_cluster_deletion_cascades_into_other_clusters() {
    let store = common::setup_store(DanglingPolicy::Restrict).await;
    let x = common::cluster(&store, "x").await;
    let y = common::cluster(&store, "y").await;
    let a = common::content(&store, &x).await;
    let b = common::content(&store, &y).await;
    let r = common::reference(&store, &b, &a, "key", true).await;

    let report = store.delete_cluster(x.id).await.unwrap();
    assert_eq!(report.deleted_clusters, vec![x.id]);
    assert_eq!(report.deleted_contents, vec![a.id]);
    assert_eq!(report.deleted_references, vec![r.id]);

    assert!(store.get_cluster(x.id).await.is_err());
    assert!(store.get_content(a.id).await.is_err());
    assert!(store.get_content(b.id).await.is_ok());
    let outgoing = store
        .references_of(NodeRef::Content(b.id))
        .await
        .unwrap()
        .outgoing;
    assert!(outgoing.is_empty());
}

#[tokio::test]
async fn test_intra_cluster_references_do_not_block() {
    let store = common::setup_store(DanglingPolicy::Restrict).await;
    let x = common::cluster(&store, "x").await;
    let a = common::content(&store, &x).await;
    let b = common::content(&store, &x).await;
    common::reference(&store, &b, &a, "", false).await;
    common::reference(&store, &a, &b, "", false).await;

    let report = store.delete_cluster(x.id).await.unwrap();
    assert_eq!(report.deleted_contents.len(), 2);
    assert_eq!(report.deleted_references.len(), 2);
    assert!(report.dangling_references.is_empty());
}

#[tokio::test]
async fn test_external_plain_reference_blocks_cluster_deletion() {
    let store = common::setup_store(DanglingPolicy::Restrict).await;
    let x = common::cluster(&store, "x").await;
    let y = common::cluster(&store, "y").await;
    let a = common::content(&store, &x).await;
    let other = common::content(&store, &x).await;
    let c = common::content(&store, &y).await;
    common::reference(&store, &c, &a, "", false).await;

    assert!(matches!(
        store.delete_cluster(x.id).await,
        Err(GraphError::IntegrityViolation { .. })
    ));

    let contents = store.list_contents(x.id).await.unwrap();
    let ids: Vec<_> = contents.iter().map(|c| c.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&a.id));
    assert!(ids.contains(&other.id));
}

#[tokio::test]
async fn test_reference_to_cluster_cascades() {
    let store = common::setup_store(DanglingPolicy::Restrict).await;
    let x = common::cluster(&store, "x").await;
    let y = common::cluster(&store, "y").await;
    let b = common::content(&store, &y).await;
    let r = store
        .add_reference(secretgraph_store::NewReference {
            source: NodeRef::Content(b.id),
            target: NodeRef::Cluster(x.id),
            group: "member".to_string(),
            delete_recursive: true,
        })
        .await
        .unwrap();

    let report = store.delete_cluster(x.id).await.unwrap();
    assert_eq!(report.deleted_references, vec![r.id]);
}

#[derive(Debug)]
struct Frozen;

#[async_trait]
impl DeletionObserver for Frozen {
    async fn on_instance_deleted(
        &self,
        _scope: &mut DeletionScope,
        node: NodeRef,
    ) -> secretgraph_store::Result<()> {
        Err(GraphError::InvalidField(format!("{} is frozen", node)))
    }

    async fn on_value_deleted(
        &self,
        scope: &mut DeletionScope,
        value: &ContentValue,
    ) -> secretgraph_store::Result<()> {
        if let Some(key) = &value.payload_key {
            scope.schedule_release(value.content_id, key);
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_observer_error_aborts_deletion() {
    let store = common::setup_store(DanglingPolicy::Restrict)
        .await
        .with_observer(Arc::new(Frozen));
    let cluster = common::cluster(&store, "keys").await;
    let a = common::content(&store, &cluster).await;
    store.set_value(a.id, "secret".into()).await.unwrap();

    assert!(matches!(
        store.delete_content(a.id).await,
        Err(GraphError::InvalidField(_))
    ));

    // The value was scheduled for release, but the scope never committed
    let (value, data) = store.get_value(a.id).await.unwrap();
    assert_eq!(&data[..], b"secret");
    let key = value.payload_key.unwrap();
    assert!(store.payloads().has_payload(&key).await.unwrap());
}
