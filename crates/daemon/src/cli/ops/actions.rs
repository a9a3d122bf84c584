use clap::Args;

use secretgraph_daemon::http_server::api::client::ApiError;
use secretgraph_daemon::http_server::api::v0::actions::ActionsRequest;

/// List the actions the daemon understands.
#[derive(Args, Debug, Clone)]
pub struct Actions;

#[derive(Debug, thiserror::Error)]
pub enum ActionsError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Actions {
    type Error = ActionsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx.client.call(ActionsRequest::default()).await?;

        Ok(response
            .actions
            .iter()
            .map(|action| action.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
