use clap::Args;

use secretgraph_daemon::{ClusterMutation, ClusterTarget};

use super::{finish, ClusterWriteError};
use crate::cli::op::RetryArgs;

#[derive(Args, Debug, Clone)]
pub struct Create {
    /// Name of the cluster to create
    #[arg(long)]
    pub name: String,

    /// Free-form description
    #[arg(long)]
    pub description: Option<String>,

    #[command(flatten)]
    pub retry: RetryArgs,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Create {
    type Error = ClusterWriteError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mutation = ClusterMutation::new(Some(self.name.clone()), self.description.clone());
        let (driver, watcher) = self.retry.driver();

        let run = driver.run(&mutation, ClusterTarget::New, &ctx.client).await;
        watcher.abort();

        finish(run?)
    }
}
