use clap::Args;

use common::action::Action;
use secretgraph_daemon::state::{AppConfig, AppState, StateError};
use store::DanglingPolicy;

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// API server port
    #[arg(long, default_value_t = 5001)]
    pub api_port: u16,

    /// What deleting a node does to plain references pointing at it
    /// (restrict or retain)
    #[arg(long, default_value_t = DanglingPolicy::Restrict)]
    pub dangling_policy: DanglingPolicy,

    /// Action the daemon refuses on every node (repeatable)
    #[arg(long = "deny")]
    pub denied_actions: Vec<Action>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            api_port: self.api_port,
            dangling_policy: self.dangling_policy,
            denied_actions: self.denied_actions.clone(),
            ..Default::default()
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let output = format!(
            "Initialized secretgraph directory at: {}\n\
             - Database: {}\n\
             - Payloads: {}\n\
             - Config: {}\n\
             - API port: {}\n\
             - Dangling policy: {}",
            state.state_dir.display(),
            state.db_path.display(),
            state.payloads_path.display(),
            state.config_path.display(),
            state.config.api_port,
            state.config.dangling_policy,
        );

        Ok(output)
    }
}
