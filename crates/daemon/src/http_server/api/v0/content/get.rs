use axum::extract::{Json, Path, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use store::{Content, NodeRef, NodeReferences};

use super::ContentError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct GetContentRequest {
    /// Content to show
    #[arg(long)]
    pub content_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetContentResponse {
    pub content: Content,
    pub references: NodeReferences,
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ContentError> {
    let content = state.store().get_content(id).await?;
    let references = state.store().references_of(NodeRef::Content(id)).await?;

    Ok((
        http::StatusCode::OK,
        Json(GetContentResponse {
            content,
            references,
        }),
    )
        .into_response())
}

impl ApiRequest for GetContentRequest {
    type Response = GetContentResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join(&format!("/api/v0/content/{}", self.content_id))?;
        Ok(client.get(full_url))
    }
}
