use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use store::NewCluster;

use super::{ClusterError, ClusterMutationResponse};
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
pub struct CreateClusterRequest {
    /// Name of the cluster to create
    #[arg(long)]
    pub name: String,

    /// Free-form description
    #[arg(long, default_value = "")]
    #[serde(default)]
    pub description: String,
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<CreateClusterRequest>,
) -> Result<Response, ClusterError> {
    let cluster = state
        .store()
        .create_cluster(NewCluster {
            name: req.name,
            description: req.description,
        })
        .await?;
    tracing::info!(cluster = %cluster.id, "cluster created");

    Ok((
        http::StatusCode::CREATED,
        Json(ClusterMutationResponse {
            write_ok: true,
            cluster,
        }),
    )
        .into_response())
}

impl ApiRequest for CreateClusterRequest {
    type Response = ClusterMutationResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/cluster")?;
        Ok(client.post(full_url).json(&self))
    }
}
