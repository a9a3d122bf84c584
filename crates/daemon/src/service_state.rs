use std::sync::Arc;

use store::{DenyActions, GraphError, GraphStore};

use super::service_config::Config;

/// Main service state
#[derive(Debug, Clone)]
pub struct State {
    store: GraphStore,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        let sqlite_database_url = match config.sqlite_path {
            Some(ref path) => {
                if !path.exists() {
                    return Err(StateSetupError::DatabasePathDoesNotExist);
                }
                format!("sqlite://{}", path.display())
            }
            // otherwise just set up an in-memory database
            None => "sqlite::memory:".to_string(),
        };
        tracing::info!(url = %sqlite_database_url, "connecting graph store");

        let mut store = GraphStore::connect(
            &sqlite_database_url,
            config.payload_store.clone(),
            config.dangling_policy,
        )
        .await?;
        tracing::info!(policy = %config.dangling_policy, "graph store ready");

        if !config.denied_actions.is_empty() {
            tracing::info!(denied = ?config.denied_actions, "refusing configured actions");
            let gate: DenyActions = config.denied_actions.iter().copied().collect();
            store = store.with_access_gate(Arc::new(gate));
        }

        Ok(Self { store })
    }

    pub fn from_store(store: GraphStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }
}

impl AsRef<GraphStore> for State {
    fn as_ref(&self) -> &GraphStore {
        &self.store
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("Database path does not exist")]
    DatabasePathDoesNotExist,
    #[error("Graph store setup error: {0}")]
    Store(#[from] GraphError),
}
