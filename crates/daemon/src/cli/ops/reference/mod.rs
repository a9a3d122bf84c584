use clap::{Args, Subcommand};

use secretgraph_daemon::http_server::api::v0::reference::add::AddReferenceRequest;
use secretgraph_daemon::http_server::api::v0::reference::delete::DeleteReferenceRequest;
use secretgraph_daemon::http_server::api::v0::reference::list::ListReferencesRequest;

use crate::cli::op::Op;

crate::api_op!(AddReferenceRequest, ListReferencesRequest, DeleteReferenceRequest);

crate::command_enum! {
    (Add, AddReferenceRequest),
    (List, ListReferencesRequest),
    (Delete, DeleteReferenceRequest),
}

pub type ReferenceCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Reference {
    #[command(subcommand)]
    pub command: ReferenceCommand,
}

#[async_trait::async_trait]
impl Op for Reference {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
