// Service modules (daemon functionality)
pub mod cluster_mutation;
pub mod content_mutation;
pub mod http_server;
pub mod process;
pub mod service_config;
pub mod service_state;

// App state (configuration, paths)
pub mod state;

pub use cluster_mutation::{ClusterMutation, ClusterTarget};
pub use content_mutation::{ContentMutation, ContentTarget};
pub use process::{spawn_service, start_service, ShutdownHandle};
pub use service_config::Config as ServiceConfig;
pub use service_state::State as ServiceState;
pub use state::{AppConfig, AppState, PayloadStoreSetting, StateError};
