//! Integration tests for stored values and payload release

mod common;

use secretgraph_store::{DanglingPolicy, GraphError};

#[tokio::test]
async fn test_set_and_get_value() {
    let store = common::setup_store(DanglingPolicy::Restrict).await;
    let cluster = common::cluster(&store, "keys").await;
    let a = common::content(&store, &cluster).await;

    let value = store.set_value(a.id, "secret".into()).await.unwrap().value;
    assert_eq!(value.content_id, a.id);
    assert_eq!(value.size, 6);

    let (loaded, data) = store.get_value(a.id).await.unwrap();
    assert_eq!(loaded, value);
    assert_eq!(&data[..], b"secret");
}

#[tokio::test]
async fn test_get_missing_value() {
    let store = common::setup_store(DanglingPolicy::Restrict).await;
    let cluster = common::cluster(&store, "keys").await;
    let a = common::content(&store, &cluster).await;

    assert!(matches!(
        store.get_value(a.id).await,
        Err(GraphError::ValueNotFound(id)) if id == a.id
    ));
}

#[tokio::test]
async fn test_replace_releases_previous_payload() {
    let store = common::setup_store(DanglingPolicy::Restrict).await;
    let cluster = common::cluster(&store, "keys").await;
    let a = common::content(&store, &cluster).await;

    let first = store.set_value(a.id, "one".into()).await.unwrap();
    assert_eq!(first.replaced, secretgraph_store::DeletionReport::default());
    let first = first.value;

    let stored = store.set_value(a.id, "two".into()).await.unwrap();
    assert_eq!(stored.replaced.deleted_values, vec![a.id]);
    assert_eq!(
        stored.replaced.released_payloads,
        vec![first.payload_key.clone().unwrap()]
    );
    assert!(stored.replaced.release_failures.is_empty());
    let second = stored.value;
    assert_ne!(first.payload_key, second.payload_key);

    let keys = store.payloads().list_payload_keys().await.unwrap();
    assert_eq!(keys, vec![second.payload_key.clone().unwrap()]);

    let (_, data) = store.get_value(a.id).await.unwrap();
    assert_eq!(&data[..], b"two");
}

#[tokio::test]
async fn test_delete_value_releases_payload_once() {
    let store = common::setup_store(DanglingPolicy::Restrict).await;
    let cluster = common::cluster(&store, "keys").await;
    let a = common::content(&store, &cluster).await;
    let value = store.set_value(a.id, "secret".into()).await.unwrap().value;
    let key = value.payload_key.unwrap();

    let report = store.delete_value(a.id).await.unwrap();
    assert_eq!(report.deleted_values, vec![a.id]);
    assert_eq!(report.released_payloads, vec![key.clone()]);
    assert!(report.release_failures.is_empty());
    assert!(!store.payloads().has_payload(&key).await.unwrap());

    // The content outlives its value
    assert!(store.get_content(a.id).await.is_ok());
    assert!(matches!(
        store.delete_value(a.id).await,
        Err(GraphError::ValueNotFound(_))
    ));

    // Releasing an already-missing payload is not an error
    store.payloads().delete_payload(&key).await.unwrap();
}

#[tokio::test]
async fn test_delete_content_releases_payload() {
    let store = common::setup_store(DanglingPolicy::Restrict).await;
    let cluster = common::cluster(&store, "keys").await;
    let a = common::content(&store, &cluster).await;
    let value = store.set_value(a.id, "secret".into()).await.unwrap().value;
    let key = value.payload_key.unwrap();

    let report = store.delete_content(a.id).await.unwrap();
    assert_eq!(report.deleted_values, vec![a.id]);
    assert_eq!(report.released_payloads, vec![key]);
    assert!(store.payloads().list_payload_keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_value_has_no_payload() {
    let store = common::setup_store(DanglingPolicy::Restrict).await;
    let cluster = common::cluster(&store, "keys").await;
    let a = common::content(&store, &cluster).await;

    let value = store
        .set_value(a.id, bytes::Bytes::new())
        .await
        .unwrap()
        .value;
    assert!(value.payload_key.is_none());
    let (_, data) = store.get_value(a.id).await.unwrap();
    assert!(data.is_empty());

    let report = store.delete_value(a.id).await.unwrap();
    assert_eq!(report.deleted_values, vec![a.id]);
    assert!(report.released_payloads.is_empty());
}

#[tokio::test]
async fn test_set_value_on_missing_content_writes_nothing() {
    let store = common::setup_store(DanglingPolicy::Restrict).await;

    let missing = uuid::Uuid::new_v4();
    assert!(matches!(
        store.set_value(missing, "secret".into()).await,
        Err(GraphError::NotFound(_))
    ));
    assert!(store.payloads().list_payload_keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_release_failure_is_reported() {
    let (store, temp_dir) = common::setup_local_store(DanglingPolicy::Restrict).await;
    let cluster = common::cluster(&store, "keys").await;
    let a = common::content(&store, &cluster).await;
    let value = store.set_value(a.id, "secret".into()).await.unwrap().value;
    let key = value.payload_key.unwrap();

    // Put a non-empty directory where the payload file was; it cannot be unlinked
    let object = temp_dir.path().join("payloads").join(&key);
    assert!(object.is_file());
    std::fs::remove_file(&object).unwrap();
    std::fs::create_dir_all(object.join("blocker")).unwrap();

    let report = store.delete_content(a.id).await.unwrap();
    assert_eq!(report.deleted_contents, vec![a.id]);
    assert!(report.released_payloads.is_empty());
    assert_eq!(report.release_failures.len(), 1);
    assert_eq!(report.release_failures[0].content_id, a.id);
    assert_eq!(report.release_failures[0].payload_key, key);

    // The committed metadata deletion stands
    assert!(matches!(
        store.get_content(a.id).await,
        Err(GraphError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_replace_release_failure_is_reported() {
    let (store, temp_dir) = common::setup_local_store(DanglingPolicy::Restrict).await;
    let cluster = common::cluster(&store, "keys").await;
    let a = common::content(&store, &cluster).await;
    let old = store.set_value(a.id, "one".into()).await.unwrap().value;
    let old_key = old.payload_key.unwrap();

    let object = temp_dir.path().join("payloads").join(&old_key);
    std::fs::remove_file(&object).unwrap();
    std::fs::create_dir_all(object.join("blocker")).unwrap();

    let stored = store.set_value(a.id, "two".into()).await.unwrap();
    assert!(stored.replaced.released_payloads.is_empty());
    assert_eq!(stored.replaced.release_failures.len(), 1);
    assert_eq!(stored.replaced.release_failures[0].content_id, a.id);
    assert_eq!(stored.replaced.release_failures[0].payload_key, old_key);

    // The new value is in place regardless
    let (loaded, data) = store.get_value(a.id).await.unwrap();
    assert_eq!(loaded, stored.value);
    assert_eq!(&data[..], b"two");
}

#[tokio::test]
async fn test_local_store_persists_payloads_on_disk() {
    let (store, temp_dir) = common::setup_local_store(DanglingPolicy::Restrict).await;
    let cluster = common::cluster(&store, "keys").await;
    let a = common::content(&store, &cluster).await;

    let value = store.set_value(a.id, "secret".into()).await.unwrap().value;
    let key = value.payload_key.unwrap();
    assert!(temp_dir.path().join("payloads").join(&key).exists());
    assert!(temp_dir.path().join("graph.db").exists());
}
