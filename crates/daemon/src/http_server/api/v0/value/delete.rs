use axum::extract::{Json, Path, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use store::DeletionReport;

use super::ValueError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct DeleteValueRequest {
    /// Content whose value to remove; the content itself is kept
    #[arg(long)]
    pub content_id: Uuid,
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ValueError> {
    let report = state.store().delete_value(id).await?;

    Ok((http::StatusCode::OK, Json(report)).into_response())
}

impl ApiRequest for DeleteValueRequest {
    type Response = DeletionReport;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url =
            base_url.join(&format!("/api/v0/content/{}/value", self.content_id))?;
        Ok(client.delete(full_url))
    }
}
