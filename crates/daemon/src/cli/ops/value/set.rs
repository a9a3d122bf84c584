use std::path::PathBuf;

use clap::Args;
use uuid::Uuid;

use secretgraph_daemon::http_server::api::client::ApiError;
use secretgraph_daemon::http_server::api::v0::value::set::SetValueRequest;

#[derive(Args, Debug, Clone)]
pub struct Set {
    /// Content to store the value on
    #[arg(long)]
    pub content_id: Uuid,

    /// Read the value from this file
    #[arg(long, group = "source")]
    pub file: Option<PathBuf>,

    /// Use this string as the value
    #[arg(long, group = "source")]
    pub data: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ValueSetError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("Either --file or --data must be provided")]
    NoSource,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Set {
    type Error = ValueSetError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let data = match (&self.file, &self.data) {
            (Some(path), _) => tokio::fs::read(path)
                .await
                .map_err(|e| ValueSetError::Read(path.clone(), e))?,
            (None, Some(data)) => data.clone().into_bytes(),
            (None, None) => return Err(ValueSetError::NoSource),
        };

        let stored = ctx
            .client
            .call(SetValueRequest::new(self.content_id, &data))
            .await?;

        let mut out = format!(
            "Stored {} byte(s) on content {}",
            stored.value.size, stored.value.content_id
        );
        for failure in &stored.replaced.release_failures {
            out.push_str(&format!(
                "\nwarning: previous payload {} was not released: {}",
                failure.payload_key, failure.message
            ));
        }
        Ok(out)
    }
}
