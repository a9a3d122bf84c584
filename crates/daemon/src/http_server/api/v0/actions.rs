use axum::response::IntoResponse;
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::action::Action;

use crate::http_server::api::client::ApiRequest;

#[derive(Debug, Clone, Default, Serialize, Deserialize, clap::Args)]
pub struct ActionsRequest {}

/// Every action a grant can name, in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionsResponse {
    pub actions: Vec<Action>,
}

#[tracing::instrument]
pub async fn handler() -> impl IntoResponse {
    Json(ActionsResponse {
        actions: Action::ALL.to_vec(),
    })
}

impl ApiRequest for ActionsRequest {
    type Response = ActionsResponse;

    fn build_request(
        self,
        base_url: &Url,
        client: &Client,
    ) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/actions")?;
        Ok(client.get(full_url))
    }
}
