use axum::extract::{Json, Path, State};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use store::SetValueReport;

use super::{decode, encode, ValueError};
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

/// Store or replace the value of a content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetValueRequest {
    #[serde(skip)]
    pub content_id: Uuid,
    /// Base64 encoded payload
    pub data: String,
}

impl SetValueRequest {
    pub fn new(content_id: Uuid, data: &[u8]) -> Self {
        Self {
            content_id,
            data: encode(data),
        }
    }
}

#[tracing::instrument(skip(state, req))]
pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetValueRequest>,
) -> Result<Response, ValueError> {
    let data = Bytes::from(decode(&req.data)?);
    let stored = state.store().set_value(id, data).await?;
    if !stored.replaced.release_failures.is_empty() {
        tracing::warn!(
            content = %id,
            failures = stored.replaced.release_failures.len(),
            "replaced payload left orphaned"
        );
    }
    tracing::info!(content = %id, size = stored.value.size, "value stored");

    Ok((http::StatusCode::OK, Json(stored)).into_response())
}

impl ApiRequest for SetValueRequest {
    type Response = SetValueReport;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url =
            base_url.join(&format!("/api/v0/content/{}/value", self.content_id))?;
        Ok(client.put(full_url).json(&self))
    }
}
