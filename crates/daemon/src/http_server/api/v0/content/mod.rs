//! Content endpoints.

use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use common::retry::WriteOutcome;
use store::{Content, GraphError};

use super::store_error_response;

pub mod create;
pub mod delete;
pub mod get;
pub mod update;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMutationResponse {
    pub write_ok: bool,
    pub content: Content,
}

impl WriteOutcome for ContentMutationResponse {
    fn write_ok(&self) -> bool {
        self.write_ok
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Store error: {0}")]
    Store(#[from] GraphError),
}

impl IntoResponse for ContentError {
    fn into_response(self) -> Response {
        match self {
            ContentError::Store(e) => store_error_response(e),
        }
    }
}
