//! Retryable content write over the HTTP API.
//!
//! Same shape as [`ClusterMutation`](crate::ClusterMutation): a retry after a
//! rejected write narrows to the content the server handed back, so it never
//! creates a second content and always carries the current `update_id`.

use async_trait::async_trait;
use uuid::Uuid;

use common::retry::{Attempt, Mutation};

use crate::http_server::api::client::{ApiClient, ApiError};
use crate::http_server::api::v0::content::create::CreateContentRequest;
use crate::http_server::api::v0::content::get::GetContentRequest;
use crate::http_server::api::v0::content::update::UpdateContentRequest;
use crate::http_server::api::v0::content::ContentMutationResponse;

const DEFAULT_STATE: &str = "internal";

/// Which content an attempt writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentTarget {
    /// Create a new content in this cluster.
    New { cluster_id: Uuid },
    /// Update an existing content. Without a token the current one is
    /// fetched first.
    Existing { id: Uuid, update_id: Option<Uuid> },
}

/// Desired content fields. `None` leaves a field untouched on update.
///
/// On update `cluster_id` moves the content; on create the target's cluster
/// wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentMutation {
    pub cluster_id: Option<Uuid>,
    pub content_type: Option<String>,
    pub state: Option<String>,
}

impl ContentMutation {
    pub fn new(content_type: Option<String>, state: Option<String>) -> Self {
        Self {
            cluster_id: None,
            content_type,
            state,
        }
    }

    pub fn move_to(mut self, cluster_id: Uuid) -> Self {
        self.cluster_id = Some(cluster_id);
        self
    }

    async fn create(
        &self,
        client: &ApiClient,
        cluster_id: Uuid,
    ) -> Result<ContentMutationResponse, ApiError> {
        client
            .call(CreateContentRequest {
                cluster_id,
                content_type: self.content_type.clone().unwrap_or_default(),
                state: self
                    .state
                    .clone()
                    .unwrap_or_else(|| DEFAULT_STATE.to_string()),
            })
            .await
    }

    async fn update(
        &self,
        client: &ApiClient,
        id: Uuid,
        update_id: Uuid,
    ) -> Result<ContentMutationResponse, ApiError> {
        client
            .call(UpdateContentRequest {
                content_id: id,
                update_id,
                cluster_id: self.cluster_id,
                content_type: self.content_type.clone(),
                state: self.state.clone(),
            })
            .await
    }
}

#[async_trait]
impl Mutation<ApiClient> for ContentMutation {
    type State = ContentTarget;
    type Outcome = ContentMutationResponse;
    type Error = ApiError;

    async fn attempt(
        &self,
        attempt: Attempt<ContentTarget, ContentMutationResponse>,
        client: &ApiClient,
    ) -> Result<ContentMutationResponse, ApiError> {
        let target = attempt.input.narrow(
            |initial| initial,
            |previous| ContentTarget::Existing {
                id: previous.content.id,
                update_id: Some(previous.content.update_id),
            },
        );
        tracing::debug!(attempt = attempt.number, ?target, "content mutation attempt");

        match target {
            ContentTarget::New { cluster_id } => self.create(client, cluster_id).await,
            ContentTarget::Existing {
                id,
                update_id: Some(update_id),
            } => self.update(client, id, update_id).await,
            ContentTarget::Existing {
                id,
                update_id: None,
            } => {
                let current = client.call(GetContentRequest { content_id: id }).await?;
                self.update(client, id, current.content.update_id).await
            }
        }
    }
}
