use axum::extract::{Json, Path, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use store::{Cluster, Content};

use super::ClusterError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct GetClusterRequest {
    /// Cluster to show
    #[arg(long)]
    pub cluster_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetClusterResponse {
    pub cluster: Cluster,
    pub contents: Vec<Content>,
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ClusterError> {
    let cluster = state.store().get_cluster(id).await?;
    let contents = state.store().list_contents(id).await?;

    Ok((
        http::StatusCode::OK,
        Json(GetClusterResponse { cluster, contents }),
    )
        .into_response())
}

impl ApiRequest for GetClusterRequest {
    type Response = GetClusterResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join(&format!("/api/v0/cluster/{}", self.cluster_id))?;
        Ok(client.get(full_url))
    }
}
