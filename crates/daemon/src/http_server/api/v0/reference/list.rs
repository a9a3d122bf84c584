use axum::extract::{Json, Query, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use store::{NodeRef, NodeReferences};

use super::ReferenceError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct ListReferencesRequest {
    /// Node to list references of, as cluster:<uuid> or content:<uuid>
    #[arg(long)]
    pub node: NodeRef,
}

/// Query string form, the node is parsed in the handler.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub node: String,
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ReferenceError> {
    let node: NodeRef = query.node.parse()?;
    let references = state.store().references_of(node).await?;

    Ok((http::StatusCode::OK, Json(references)).into_response())
}

impl ApiRequest for ListReferencesRequest {
    type Response = NodeReferences;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let mut full_url = base_url.join("/api/v0/reference")?;
        full_url
            .query_pairs_mut()
            .append_pair("node", &self.node.to_string());
        Ok(client.get(full_url))
    }
}
