//! Cluster endpoints.
//!
//! Create and update both answer with a [`ClusterMutationResponse`] so a
//! client retrying a write can treat them alike: `write_ok == false` means
//! the cluster moved on, and `cluster` carries its current `update_id`.

use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use common::retry::WriteOutcome;
use store::{Cluster, GraphError};

use super::store_error_response;

pub mod create;
pub mod delete;
pub mod get;
pub mod update;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMutationResponse {
    pub write_ok: bool,
    pub cluster: Cluster,
}

impl WriteOutcome for ClusterMutationResponse {
    fn write_ok(&self) -> bool {
        self.write_ok
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Store error: {0}")]
    Store(#[from] GraphError),
}

impl IntoResponse for ClusterError {
    fn into_response(self) -> Response {
        match self {
            ClusterError::Store(e) => store_error_response(e),
        }
    }
}
