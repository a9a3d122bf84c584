use clap::Args;
use uuid::Uuid;

use secretgraph_daemon::{ClusterMutation, ClusterTarget};

use super::{finish, ClusterWriteError};
use crate::cli::op::RetryArgs;

#[derive(Args, Debug, Clone)]
pub struct Update {
    /// Cluster to update
    #[arg(long)]
    pub cluster_id: Uuid,

    /// Token last seen on the cluster; fetched from the daemon when omitted
    #[arg(long)]
    pub update_id: Option<Uuid>,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New description
    #[arg(long)]
    pub description: Option<String>,

    #[command(flatten)]
    pub retry: RetryArgs,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Update {
    type Error = ClusterWriteError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mutation = ClusterMutation::new(self.name.clone(), self.description.clone());
        let target = ClusterTarget::Existing {
            id: self.cluster_id,
            update_id: self.update_id,
        };
        let (driver, watcher) = self.retry.driver();

        let run = driver.run(&mutation, target, &ctx.client).await;
        watcher.abort();

        finish(run?)
    }
}
