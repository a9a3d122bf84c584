use clap::Args;
use uuid::Uuid;

use secretgraph_daemon::{ContentMutation, ContentTarget};

use super::{finish, ContentWriteError};
use crate::cli::op::RetryArgs;

#[derive(Args, Debug, Clone)]
pub struct Update {
    /// Content to update
    #[arg(long)]
    pub content_id: Uuid,

    /// Token last seen on the content; fetched from the daemon when omitted
    #[arg(long)]
    pub update_id: Option<Uuid>,

    /// Move the content into this cluster
    #[arg(long = "move-to")]
    pub cluster_id: Option<Uuid>,

    #[arg(long = "type")]
    pub content_type: Option<String>,

    #[arg(long)]
    pub state: Option<String>,

    #[command(flatten)]
    pub retry: RetryArgs,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Update {
    type Error = ContentWriteError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut mutation = ContentMutation::new(self.content_type.clone(), self.state.clone());
        if let Some(cluster_id) = self.cluster_id {
            mutation = mutation.move_to(cluster_id);
        }
        let target = ContentTarget::Existing {
            id: self.content_id,
            update_id: self.update_id,
        };
        let (driver, watcher) = self.retry.driver();

        let run = driver.run(&mutation, target, &ctx.client).await;
        watcher.abort();

        finish(run?)
    }
}
