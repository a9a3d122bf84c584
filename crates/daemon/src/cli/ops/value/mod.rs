use clap::{Args, Subcommand};

pub mod get;
pub mod set;

use secretgraph_daemon::http_server::api::v0::value::delete::DeleteValueRequest;

use crate::cli::op::Op;

crate::api_op!(DeleteValueRequest);

crate::command_enum! {
    (Set, set::Set),
    (Get, get::Get),
    (Delete, DeleteValueRequest),
}

pub type ValueCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Value {
    #[command(subcommand)]
    pub command: ValueCommand,
}

#[async_trait::async_trait]
impl Op for Value {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
