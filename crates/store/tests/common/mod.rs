//! Shared helpers for graph store integration tests
#![allow(dead_code)]

use secretgraph_store::{
    Cluster, Content, DanglingPolicy, GraphStore, NewCluster, NewContent, NewReference, NodeRef,
    PayloadStoreConfig, Reference,
};
use tempfile::TempDir;

/// Ephemeral store with the given dangling policy
pub async fn setup_store(policy: DanglingPolicy) -> GraphStore {
    GraphStore::in_memory(PayloadStoreConfig::Memory, policy)
        .await
        .unwrap()
}

/// Store with payloads on disk, so tests can inspect and sabotage them
pub async fn setup_local_store(policy: DanglingPolicy) -> (GraphStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = GraphStore::new_local(temp_dir.path(), policy).await.unwrap();
    (store, temp_dir)
}

pub async fn cluster(store: &GraphStore, name: &str) -> Cluster {
    store
        .create_cluster(NewCluster {
            name: name.to_string(),
            description: String::new(),
        })
        .await
        .unwrap()
}

pub async fn content(store: &GraphStore, cluster: &Cluster) -> Content {
    store
        .create_content(NewContent {
            cluster_id: cluster.id,
            content_type: "File".to_string(),
            state: "internal".to_string(),
        })
        .await
        .unwrap()
}

pub async fn reference(
    store: &GraphStore,
    source: &Content,
    target: &Content,
    group: &str,
    delete_recursive: bool,
) -> Reference {
    store
        .add_reference(NewReference {
            source: NodeRef::Content(source.id),
            target: NodeRef::Content(target.id),
            group: group.to_string(),
            delete_recursive,
        })
        .await
        .unwrap()
}
