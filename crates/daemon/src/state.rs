use std::{fs, path::PathBuf};

use common::action::Action;
use serde::{Deserialize, Serialize};
use store::{DanglingPolicy, PayloadStoreConfig};

pub const APP_NAME: &str = "secretgraph";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "graph.sqlite";
pub const PAYLOADS_DIR_NAME: &str = "payloads";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the API server
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// What deleting a node does to non-recursive references pointing at it
    #[serde(default)]
    pub dangling_policy: DanglingPolicy,
    /// Default log level for the daemon (overridden by RUST_LOG)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Actions the daemon refuses on every node
    #[serde(default)]
    pub denied_actions: Vec<Action>,
    /// Where value payloads are stored (kept last, it serializes as a table)
    #[serde(default)]
    pub payload_store: PayloadStoreSetting,
}

fn default_api_port() -> u16 {
    5001
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            dangling_policy: DanglingPolicy::default(),
            log_level: default_log_level(),
            denied_actions: Vec::new(),
            payload_store: PayloadStoreSetting::default(),
        }
    }
}

/// Payload storage backend as written in config.toml.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PayloadStoreSetting {
    /// Local filesystem
    Local {
        /// Defaults to <state dir>/payloads/
        path: Option<PathBuf>,
    },

    /// Lost when the daemon exits
    Memory,

    /// S3-compatible object storage
    S3 {
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
        endpoint: String,
        access_key: String,
        secret_key: String,
        bucket: String,
        /// Optional region (defaults to "us-east-1")
        region: Option<String>,
    },
}

impl Default for PayloadStoreSetting {
    fn default() -> Self {
        PayloadStoreSetting::Local { path: None }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the state directory (~/.secretgraph)
    pub state_dir: PathBuf,
    /// Path to the SQLite database
    pub db_path: PathBuf,
    /// Path to the default payloads directory
    pub payloads_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the state directory path (custom or default ~/.secretgraph)
    pub fn state_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let state_dir = Self::state_dir(custom_path)?;

        if state_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&state_dir)?;

        let payloads_path = state_dir.join(PAYLOADS_DIR_NAME);
        fs::create_dir_all(&payloads_path)?;

        let config = config.unwrap_or_default();
        let config_path = state_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        // Schema is applied by the store when the daemon first connects
        let db_path = state_dir.join(DB_FILE_NAME);
        fs::write(&db_path, "")?;

        Ok(Self {
            state_dir,
            db_path,
            payloads_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the state directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let state_dir = Self::state_dir(custom_path)?;

        if !state_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let db_path = state_dir.join(DB_FILE_NAME);
        let payloads_path = state_dir.join(PAYLOADS_DIR_NAME);
        let config_path = state_dir.join(CONFIG_FILE_NAME);

        if !db_path.exists() {
            return Err(StateError::MissingFile(DB_FILE_NAME.to_string()));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            state_dir,
            db_path,
            payloads_path,
            config_path,
            config,
        })
    }

    /// Resolve the configured payload backend against this state directory
    pub fn payload_store(&self) -> PayloadStoreConfig {
        match &self.config.payload_store {
            PayloadStoreSetting::Local { path } => PayloadStoreConfig::Local {
                path: path.clone().unwrap_or_else(|| self.payloads_path.clone()),
            },
            PayloadStoreSetting::Memory => PayloadStoreConfig::Memory,
            PayloadStoreSetting::S3 {
                endpoint,
                access_key,
                secret_key,
                bucket,
                region,
            } => PayloadStoreConfig::S3 {
                endpoint: endpoint.clone(),
                access_key: access_key.clone(),
                secret_key: secret_key.clone(),
                bucket: bucket.clone(),
                region: region.clone(),
            },
        }
    }

    pub fn log_level(&self) -> Result<tracing::Level, StateError> {
        self.config
            .log_level
            .parse()
            .map_err(|_| StateError::InvalidLogLevel(self.config.log_level.clone()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("secretgraph directory not initialized. Run 'secretgraph init' first")]
    NotInitialized,

    #[error("secretgraph directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("state");

        let state = AppState::init(Some(dir.clone()), None).unwrap();
        assert!(state.db_path.exists());
        assert!(state.payloads_path.is_dir());
        assert_eq!(state.config.api_port, 5001);

        let loaded = AppState::load(Some(dir)).unwrap();
        assert_eq!(loaded.config, state.config);
        assert_eq!(
            loaded.payload_store(),
            PayloadStoreConfig::Local {
                path: loaded.payloads_path.clone()
            }
        );
    }

    #[test]
    fn test_init_twice_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("state");

        AppState::init(Some(dir.clone()), None).unwrap();
        assert!(matches!(
            AppState::init(Some(dir), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_uninitialized() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AppState::load(Some(temp_dir.path().join("missing"))),
            Err(StateError::NotInitialized)
        ));
    }

    #[test]
    fn test_config_parses_policy_and_denied_actions() {
        let config: AppConfig = toml::from_str(
            r#"
            api_port = 6000
            dangling_policy = "retain"
            denied_actions = ["stored_delete", "manage"]

            [payload_store]
            type = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_port, 6000);
        assert_eq!(config.dangling_policy, DanglingPolicy::Retain);
        assert_eq!(
            config.denied_actions,
            vec![Action::StoredDelete, Action::Manage]
        );
        assert_eq!(config.payload_store, PayloadStoreSetting::Memory);
        assert_eq!(config.log_level, "info");
    }
}
