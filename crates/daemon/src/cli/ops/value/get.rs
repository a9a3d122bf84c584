use std::path::PathBuf;

use clap::Args;
use uuid::Uuid;

use secretgraph_daemon::http_server::api::client::ApiError;
use secretgraph_daemon::http_server::api::v0::value::get::GetValueRequest;

#[derive(Args, Debug, Clone)]
pub struct Get {
    /// Content whose value to fetch
    #[arg(long)]
    pub content_id: Uuid,

    /// Write the value to this file instead of printing it
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ValueGetError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to write {0}: {1}")]
    Write(PathBuf, std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Get {
    type Error = ValueGetError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx
            .client
            .call(GetValueRequest {
                content_id: self.content_id,
            })
            .await?;
        let data = response.bytes()?;

        match &self.output {
            Some(path) => {
                tokio::fs::write(path, &data)
                    .await
                    .map_err(|e| ValueGetError::Write(path.clone(), e))?;
                Ok(format!("Wrote {} byte(s) to {}", data.len(), path.display()))
            }
            None => Ok(String::from_utf8_lossy(&data).into_owned()),
        }
    }
}
