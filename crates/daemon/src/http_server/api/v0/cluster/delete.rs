use axum::extract::{Json, Path, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use store::DeletionReport;

use super::ClusterError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct DeleteClusterRequest {
    /// Cluster to delete, together with its contents
    #[arg(long)]
    pub cluster_id: Uuid,
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ClusterError> {
    let report = state.store().delete_cluster(id).await?;
    tracing::info!(
        cluster = %id,
        contents = report.deleted_contents.len(),
        references = report.deleted_references.len(),
        "cluster deleted"
    );

    Ok((http::StatusCode::OK, Json(report)).into_response())
}

impl ApiRequest for DeleteClusterRequest {
    type Response = DeletionReport;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join(&format!("/api/v0/cluster/{}", self.cluster_id))?;
        Ok(client.delete(full_url))
    }
}
