//! Integration tests for the actions operations exercise

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ::common::action::Action;
use secretgraph_store::{AccessGate, DanglingPolicy, DenyActions, GraphError, NodeRef};

/// Admits everything and remembers what it was asked.
#[derive(Debug, Default)]
struct Recorder(Mutex<Vec<(Action, NodeRef)>>);

impl Recorder {
    fn take(&self) -> Vec<(Action, NodeRef)> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

#[async_trait]
impl AccessGate for Recorder {
    async fn admit(&self, action: Action, node: NodeRef) -> bool {
        self.0.lock().unwrap().push((action, node));
        true
    }
}

#[tokio::test]
async fn test_operations_name_their_action() {
    let recorder = Arc::new(Recorder::default());
    let store = common::setup_store(DanglingPolicy::Restrict)
        .await
        .with_access_gate(recorder.clone());

    let cluster = common::cluster(&store, "keys").await;
    assert_eq!(
        recorder.take(),
        vec![(Action::Manage, NodeRef::Cluster(cluster.id))]
    );

    let a = common::content(&store, &cluster).await;
    assert_eq!(
        recorder.take(),
        vec![(Action::Update, NodeRef::Cluster(cluster.id))]
    );

    let node = NodeRef::Content(a.id);
    store.set_value(a.id, "one".into()).await.unwrap();
    store.set_value(a.id, "two".into()).await.unwrap();
    store.get_value(a.id).await.unwrap();
    store.delete_value(a.id).await.unwrap();
    assert_eq!(
        recorder.take(),
        vec![
            (Action::Update, node),
            (Action::StoredReplace, node),
            (Action::Fetch, node),
            (Action::StoredDelete, node),
        ]
    );

    store.get_content(a.id).await.unwrap();
    store.references_of(node).await.unwrap();
    store.list_contents(cluster.id).await.unwrap();
    assert_eq!(
        recorder.take(),
        vec![
            (Action::View, node),
            (Action::View, node),
            (Action::View, NodeRef::Cluster(cluster.id)),
        ]
    );

    store.delete_content(a.id).await.unwrap();
    store.delete_cluster(cluster.id).await.unwrap();
    assert_eq!(
        recorder.take(),
        vec![
            (Action::Manage, node),
            (Action::Manage, NodeRef::Cluster(cluster.id)),
        ]
    );
}

#[tokio::test]
async fn test_denied_stored_delete_keeps_value() {
    let store = common::setup_store(DanglingPolicy::Restrict)
        .await
        .with_access_gate(Arc::new(DenyActions::from_iter([Action::StoredDelete])));
    let cluster = common::cluster(&store, "keys").await;
    let a = common::content(&store, &cluster).await;
    store.set_value(a.id, "secret".into()).await.unwrap();

    let err = store.delete_value(a.id).await.unwrap_err();
    assert!(matches!(
        err,
        GraphError::Forbidden { action: Action::StoredDelete, node } if node == NodeRef::Content(a.id)
    ));

    let (_, data) = store.get_value(a.id).await.unwrap();
    assert_eq!(&data[..], b"secret");
}

#[tokio::test]
async fn test_denied_replace_writes_no_payload() {
    let store = common::setup_store(DanglingPolicy::Restrict)
        .await
        .with_access_gate(Arc::new(DenyActions::from_iter([Action::StoredReplace])));
    let cluster = common::cluster(&store, "keys").await;
    let a = common::content(&store, &cluster).await;

    // Setting a first value is a plain update
    store.set_value(a.id, "one".into()).await.unwrap();
    assert!(matches!(
        store.set_value(a.id, "two".into()).await,
        Err(GraphError::Forbidden { action: Action::StoredReplace, .. })
    ));

    assert_eq!(store.payloads().list_payload_keys().await.unwrap().len(), 1);
    let (_, data) = store.get_value(a.id).await.unwrap();
    assert_eq!(&data[..], b"one");
}

/// Append-only gate that lingers over every plain update.
#[derive(Debug)]
struct SlowAppendOnly;

#[async_trait]
impl AccessGate for SlowAppendOnly {
    async fn admit(&self, action: Action, _node: NodeRef) -> bool {
        match action {
            Action::Update => {
                tokio::time::sleep(Duration::from_millis(100)).await;
                true
            }
            Action::StoredReplace => false,
            _ => true,
        }
    }
}

#[tokio::test]
async fn test_concurrent_first_values_cannot_replace() {
    let (store, _temp_dir) = common::setup_local_store(DanglingPolicy::Restrict).await;
    let cluster = common::cluster(&store, "keys").await;
    let a = common::content(&store, &cluster).await;
    let store = store.with_access_gate(Arc::new(SlowAppendOnly));

    let (first, second) = tokio::join!(
        store.set_value(a.id, "first".into()),
        store.set_value(a.id, "second".into()),
    );

    let (stored, denied) = match (first, second) {
        (Ok(stored), Err(denied)) | (Err(denied), Ok(stored)) => (stored, denied),
        (first, second) => panic!("expected one write to win: {first:?} {second:?}"),
    };
    assert!(matches!(
        denied,
        GraphError::Forbidden { action: Action::StoredReplace, .. }
    ));

    let (loaded, _) = store.get_value(a.id).await.unwrap();
    assert_eq!(loaded, stored.value);
    assert_eq!(store.payloads().list_payload_keys().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_denied_manage_rolls_back_cluster_creation() {
    let gate = Arc::new(DenyActions::from_iter([Action::Manage]));
    let store = common::setup_store(DanglingPolicy::Restrict)
        .await
        .with_access_gate(gate);

    let err = store
        .create_cluster(secretgraph_store::NewCluster {
            name: "keys".to_string(),
            description: String::new(),
        })
        .await
        .unwrap_err();
    let GraphError::Forbidden { node, .. } = err else {
        panic!("expected forbidden");
    };
    assert!(matches!(
        store.get_cluster(node.id()).await,
        Err(GraphError::NotFound(_))
    ));
}
