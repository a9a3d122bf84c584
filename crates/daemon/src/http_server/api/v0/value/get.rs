use axum::extract::{Json, Path, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use store::ContentValue;

use super::{decode, encode, ValueError};
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct GetValueRequest {
    /// Content whose value to fetch
    #[arg(long)]
    pub content_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetValueResponse {
    pub value: ContentValue,
    /// Base64 encoded payload
    pub data: String,
}

impl GetValueResponse {
    pub fn bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        decode(&self.data)
    }
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ValueError> {
    let (value, data) = state.store().get_value(id).await?;

    Ok((
        http::StatusCode::OK,
        Json(GetValueResponse {
            value,
            data: encode(&data),
        }),
    )
        .into_response())
}

impl ApiRequest for GetValueRequest {
    type Response = GetValueResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url =
            base_url.join(&format!("/api/v0/content/{}/value", self.content_id))?;
        Ok(client.get(full_url))
    }
}
