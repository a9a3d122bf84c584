use std::path::PathBuf;

use common::action::Action;
use store::{DanglingPolicy, PayloadStoreConfig};

#[derive(Debug, Clone)]
pub struct Config {
    // http server configuration
    /// Port for the API HTTP server
    pub api_port: u16,

    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,
    /// Payload storage backend
    pub payload_store: PayloadStoreConfig,
    /// Handling of non-recursive references when their target is deleted
    pub dangling_policy: DanglingPolicy,
    /// Actions refused on every node
    pub denied_actions: Vec<Action>,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    /// Fully in-memory service on the default port
    fn default() -> Self {
        Self {
            api_port: 5001,
            sqlite_path: None,
            payload_store: PayloadStoreConfig::Memory,
            dangling_policy: DanglingPolicy::default(),
            denied_actions: Vec::new(),
            log_level: tracing::Level::INFO,
            log_dir: None,
        }
    }
}
