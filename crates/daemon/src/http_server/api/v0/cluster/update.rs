use axum::extract::{Json, Path, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use store::ClusterUpdate;

use super::{ClusterError, ClusterMutationResponse};
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

/// Guarded cluster update. The id travels in the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateClusterRequest {
    #[serde(skip)]
    pub cluster_id: Uuid,
    /// Token the caller last saw on the cluster
    pub update_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateClusterRequest>,
) -> Result<Response, ClusterError> {
    let result = state
        .store()
        .update_cluster(
            id,
            ClusterUpdate {
                update_id: req.update_id,
                name: req.name,
                description: req.description,
            },
        )
        .await?;

    if !result.write_ok {
        tracing::debug!(cluster = %id, stale = %req.update_id, "cluster update rejected");
    }

    Ok((
        http::StatusCode::OK,
        Json(ClusterMutationResponse {
            write_ok: result.write_ok,
            cluster: result.record,
        }),
    )
        .into_response())
}

impl ApiRequest for UpdateClusterRequest {
    type Response = ClusterMutationResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join(&format!("/api/v0/cluster/{}", self.cluster_id))?;
        Ok(client.post(full_url).json(&self))
    }
}
