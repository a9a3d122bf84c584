use clap::{Args, Subcommand};

pub mod create;
pub mod update;

use common::retry::{Run, Stop};
use secretgraph_daemon::http_server::api::client::ApiError;
use secretgraph_daemon::http_server::api::v0::content::delete::DeleteContentRequest;
use secretgraph_daemon::http_server::api::v0::content::get::GetContentRequest;
use secretgraph_daemon::http_server::api::v0::content::ContentMutationResponse;

use crate::cli::op::Op;

crate::api_op!(GetContentRequest, DeleteContentRequest);

crate::command_enum! {
    (Create, create::Create),
    (Update, update::Update),
    (Show, GetContentRequest),
    (Delete, DeleteContentRequest),
}

pub type ContentCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Content {
    #[command(subcommand)]
    pub command: ContentCommand,
}

#[async_trait::async_trait]
impl Op for Content {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContentWriteError {
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

fn finish(run: Run<ContentMutationResponse>) -> Result<String, ContentWriteError> {
    if !run.write_ok() {
        return Err(ContentWriteError::NotAccepted {
            attempts: run.attempts,
            stop: run.stop,
            update_id: run.outcome.content.update_id,
        });
    }
    tracing::debug!(attempts = run.attempts, "content write accepted");
    Ok(serde_json::to_string_pretty(&run.into_outcome().content)?)
}
