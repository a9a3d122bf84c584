use axum::extract::{Json, Path, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use store::ContentUpdate;

use super::{ContentError, ContentMutationResponse};
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

/// Guarded content update. The id travels in the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateContentRequest {
    #[serde(skip)]
    pub content_id: Uuid,
    /// Token the caller last saw on the content
    pub update_id: Uuid,
    /// Move the content into this cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateContentRequest>,
) -> Result<Response, ContentError> {
    let result = state
        .store()
        .update_content(
            id,
            ContentUpdate {
                update_id: req.update_id,
                cluster_id: req.cluster_id,
                content_type: req.content_type,
                state: req.state,
            },
        )
        .await?;

    Ok((
        http::StatusCode::OK,
        Json(ContentMutationResponse {
            write_ok: result.write_ok,
            content: result.record,
        }),
    )
        .into_response())
}

impl ApiRequest for UpdateContentRequest {
    type Response = ContentMutationResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join(&format!("/api/v0/content/{}", self.content_id))?;
        Ok(client.post(full_url).json(&self))
    }
}
