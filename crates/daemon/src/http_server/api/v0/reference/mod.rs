//! Reference endpoints.

use axum::response::{IntoResponse, Response};

use store::{GraphError, NodeRefParseError};

use super::store_error_response;

pub mod add;
pub mod delete;
pub mod list;

#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("{0}")]
    InvalidNode(#[from] NodeRefParseError),
    #[error("Store error: {0}")]
    Store(#[from] GraphError),
}

impl IntoResponse for ReferenceError {
    fn into_response(self) -> Response {
        match self {
            ReferenceError::InvalidNode(e) => {
                (http::StatusCode::BAD_REQUEST, e.to_string()).into_response()
            }
            ReferenceError::Store(e) => store_error_response(e),
        }
    }
}
