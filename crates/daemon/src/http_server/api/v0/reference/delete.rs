use axum::extract::{Json, Path, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use store::Reference;

use super::ReferenceError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct DeleteReferenceRequest {
    /// Reference to remove
    #[arg(long)]
    pub reference_id: Uuid,
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ReferenceError> {
    let reference = state.store().delete_reference(id).await?;

    Ok((http::StatusCode::OK, Json(reference)).into_response())
}

impl ApiRequest for DeleteReferenceRequest {
    type Response = Reference;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join(&format!("/api/v0/reference/{}", self.reference_id))?;
        Ok(client.delete(full_url))
    }
}
