use clap::Args;
use uuid::Uuid;

use secretgraph_daemon::{ContentMutation, ContentTarget};

use super::{finish, ContentWriteError};
use crate::cli::op::RetryArgs;

#[derive(Args, Debug, Clone)]
pub struct Create {
    /// Cluster that will own the content
    #[arg(long)]
    pub cluster_id: Uuid,

    /// Content type, e.g. "File" or "PublicKey"
    #[arg(long = "type")]
    pub content_type: String,

    /// Content state, e.g. "internal" or "public"
    #[arg(long, default_value = "internal")]
    pub state: String,

    #[command(flatten)]
    pub retry: RetryArgs,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Create {
    type Error = ContentWriteError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mutation =
            ContentMutation::new(Some(self.content_type.clone()), Some(self.state.clone()));
        let target = ContentTarget::New {
            cluster_id: self.cluster_id,
        };
        let (driver, watcher) = self.retry.driver();

        let run = driver.run(&mutation, target, &ctx.client).await;
        watcher.abort();

        finish(run?)
    }
}
