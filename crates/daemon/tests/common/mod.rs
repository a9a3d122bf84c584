#![allow(dead_code)]

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use url::Url;

use ::common::action::Action;
use secretgraph_daemon::http_server::{self, api::client::ApiClient};
use secretgraph_daemon::ServiceState;
use store::{DenyActions, GraphStore};

/// API server bound to an ephemeral local port. Stops when dropped.
pub struct TestServer {
    pub client: ApiClient,
    pub store: GraphStore,
    _shutdown: watch::Sender<()>,
}

pub async fn spawn_server(store: GraphStore) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let state = ServiceState::from_store(store.clone());
    let config = http_server::Config::new(addr);
    tokio::spawn(async move {
        http_server::serve(listener, config, state, shutdown_rx)
            .await
            .unwrap();
    });

    let remote = Url::parse(&format!("http://{}", addr)).unwrap();
    TestServer {
        client: ApiClient::new(&remote).unwrap(),
        store,
        _shutdown: shutdown_tx,
    }
}

pub async fn setup_server() -> TestServer {
    spawn_server(GraphStore::ephemeral().await.unwrap()).await
}

pub async fn setup_server_denying(actions: &[Action]) -> TestServer {
    let gate: DenyActions = actions.iter().copied().collect();
    let store = GraphStore::ephemeral()
        .await
        .unwrap()
        .with_access_gate(Arc::new(gate));
    spawn_server(store).await
}
