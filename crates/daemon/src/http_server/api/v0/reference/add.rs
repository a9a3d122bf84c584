use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use store::{NewReference, NodeRef, Reference};

use super::ReferenceError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
pub struct AddReferenceRequest {
    /// Source node, as cluster:<uuid> or content:<uuid>
    #[arg(long)]
    pub source: NodeRef,

    /// Target node, as cluster:<uuid> or content:<uuid>
    #[arg(long)]
    pub target: NodeRef,

    /// Reference group
    #[arg(long, default_value = "")]
    #[serde(default)]
    pub group: String,

    /// Remove the reference when its target is deleted
    #[arg(long)]
    #[serde(default)]
    pub delete_recursive: bool,
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<AddReferenceRequest>,
) -> Result<Response, ReferenceError> {
    let reference = state
        .store()
        .add_reference(NewReference {
            source: req.source,
            target: req.target,
            group: req.group,
            delete_recursive: req.delete_recursive,
        })
        .await?;
    tracing::info!(
        reference = %reference.id,
        source = %reference.source,
        target = %reference.target,
        "reference added"
    );

    Ok((http::StatusCode::CREATED, Json(reference)).into_response())
}

impl ApiRequest for AddReferenceRequest {
    type Response = Reference;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/reference")?;
        Ok(client.post(full_url).json(&self))
    }
}
