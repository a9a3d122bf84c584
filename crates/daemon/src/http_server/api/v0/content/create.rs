use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use store::NewContent;

use super::{ContentError, ContentMutationResponse};
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
pub struct CreateContentRequest {
    /// Cluster that will own the content
    #[arg(long)]
    pub cluster_id: Uuid,

    /// Content type, e.g. "File" or "PublicKey"
    #[arg(long = "type")]
    pub content_type: String,

    /// Content state, e.g. "internal" or "public"
    #[arg(long, default_value = "internal")]
    pub state: String,
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<CreateContentRequest>,
) -> Result<Response, ContentError> {
    let content = state
        .store()
        .create_content(NewContent {
            cluster_id: req.cluster_id,
            content_type: req.content_type,
            state: req.state,
        })
        .await?;
    tracing::info!(content = %content.id, cluster = %content.cluster_id, "content created");

    Ok((
        http::StatusCode::CREATED,
        Json(ContentMutationResponse {
            write_ok: true,
            content,
        }),
    )
        .into_response())
}

impl ApiRequest for CreateContentRequest {
    type Response = ContentMutationResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/content")?;
        Ok(client.post(full_url).json(&self))
    }
}
