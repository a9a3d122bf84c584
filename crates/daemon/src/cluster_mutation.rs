//! Retryable cluster write over the HTTP API.
//!
//! [`ClusterMutation`] is the [`Mutation`] the CLI hands to the
//! [`RetryDriver`](common::retry::RetryDriver), with the [`ApiClient`] as
//! session. The first attempt starts from the caller's [`ClusterTarget`];
//! every retry narrows to the cluster the previous response returned, using
//! its fresh `update_id`, so a create that raced with an update is not
//! repeated and a stale token is replaced by the current one.

use async_trait::async_trait;
use uuid::Uuid;

use common::retry::{Attempt, Mutation};

use crate::http_server::api::client::{ApiClient, ApiError};
use crate::http_server::api::v0::cluster::create::CreateClusterRequest;
use crate::http_server::api::v0::cluster::get::GetClusterRequest;
use crate::http_server::api::v0::cluster::update::UpdateClusterRequest;
use crate::http_server::api::v0::cluster::ClusterMutationResponse;

/// Which cluster an attempt writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterTarget {
    /// Create a new cluster.
    New,
    /// Update an existing cluster. Without a token the current one is
    /// fetched first.
    Existing { id: Uuid, update_id: Option<Uuid> },
}

/// Desired cluster fields. `None` leaves a field untouched on update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterMutation {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl ClusterMutation {
    pub fn new(name: Option<String>, description: Option<String>) -> Self {
        Self { name, description }
    }

    async fn create(&self, client: &ApiClient) -> Result<ClusterMutationResponse, ApiError> {
        client
            .call(CreateClusterRequest {
                name: self.name.clone().unwrap_or_default(),
                description: self.description.clone().unwrap_or_default(),
            })
            .await
    }

    async fn update(
        &self,
        client: &ApiClient,
        id: Uuid,
        update_id: Uuid,
    ) -> Result<ClusterMutationResponse, ApiError> {
        client
            .call(UpdateClusterRequest {
                cluster_id: id,
                update_id,
                name: self.name.clone(),
                description: self.description.clone(),
            })
            .await
    }
}

#[async_trait]
impl Mutation<ApiClient> for ClusterMutation {
    type State = ClusterTarget;
    type Outcome = ClusterMutationResponse;
    type Error = ApiError;

    async fn attempt(
        &self,
        attempt: Attempt<ClusterTarget, ClusterMutationResponse>,
        client: &ApiClient,
    ) -> Result<ClusterMutationResponse, ApiError> {
        let target = attempt.input.narrow(
            |initial| initial,
            |previous| ClusterTarget::Existing {
                id: previous.cluster.id,
                update_id: Some(previous.cluster.update_id),
            },
        );
        tracing::debug!(attempt = attempt.number, ?target, "cluster mutation attempt");

        match target {
            ClusterTarget::New => self.create(client).await,
            ClusterTarget::Existing {
                id,
                update_id: Some(update_id),
            } => self.update(client, id, update_id).await,
            ClusterTarget::Existing {
                id,
                update_id: None,
            } => {
                let current = client.call(GetClusterRequest { cluster_id: id }).await?;
                self.update(client, id, current.cluster.update_id).await
            }
        }
    }
}
