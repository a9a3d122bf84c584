//! Stored value endpoints.
//!
//! Payload bytes travel base64 encoded (standard alphabet, padded) in the
//! `data` field of the JSON body.

use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use store::GraphError;

use super::store_error_response;

pub mod delete;
pub mod get;
pub mod set;

pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

pub fn decode(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(data)
}

#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error("Invalid base64 payload: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("Store error: {0}")]
    Store(#[from] GraphError),
}

impl IntoResponse for ValueError {
    fn into_response(self) -> Response {
        match self {
            ValueError::Encoding(e) => (
                http::StatusCode::BAD_REQUEST,
                format!("Invalid base64 payload: {}", e),
            )
                .into_response(),
            ValueError::Store(e) => store_error_response(e),
        }
    }
}
