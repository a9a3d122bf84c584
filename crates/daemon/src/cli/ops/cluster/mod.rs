use clap::{Args, Subcommand};

pub mod create;
pub mod update;

use common::retry::{Run, Stop};
use secretgraph_daemon::http_server::api::client::ApiError;
use secretgraph_daemon::http_server::api::v0::cluster::delete::DeleteClusterRequest;
use secretgraph_daemon::http_server::api::v0::cluster::get::GetClusterRequest;
use secretgraph_daemon::http_server::api::v0::cluster::ClusterMutationResponse;

use crate::cli::op::Op;

crate::api_op!(GetClusterRequest, DeleteClusterRequest);

crate::command_enum! {
    (Create, create::Create),
    (Update, update::Update),
    (Show, GetClusterRequest),
    (Delete, DeleteClusterRequest),
}

pub type ClusterCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Cluster {
    #[command(subcommand)]
    pub command: ClusterCommand,
}

#[async_trait::async_trait]
impl Op for Cluster {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClusterWriteError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("failed to render response: {0}")]
    Render(#[from] serde_json::Error),
    #[error("write not accepted after {attempts} attempt(s) ({stop:?}), current update_id is {update_id}")]
    NotAccepted {
        attempts: u32,
        stop: Stop,
        update_id: uuid::Uuid,
    },
}

/// Render a finished run, failing when the write never went through.
fn finish(run: Run<ClusterMutationResponse>) -> Result<String, ClusterWriteError> {
    if !run.write_ok() {
        return Err(ClusterWriteError::NotAccepted {
            attempts: run.attempts,
            stop: run.stop,
            update_id: run.outcome.cluster.update_id,
        });
    }
    tracing::debug!(attempts = run.attempts, "cluster write accepted");
    Ok(serde_json::to_string_pretty(&run.into_outcome().cluster)?)
}
