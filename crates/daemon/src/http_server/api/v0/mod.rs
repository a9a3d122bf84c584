use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use http::StatusCode;

use store::GraphError;

pub mod actions;
pub mod cluster;
pub mod content;
pub mod reference;
pub mod value;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/actions", get(actions::handler))
        .route("/cluster", post(cluster::create::handler))
        .route(
            "/cluster/:id",
            get(cluster::get::handler)
                .post(cluster::update::handler)
                .delete(cluster::delete::handler),
        )
        .route("/content", post(content::create::handler))
        .route(
            "/content/:id",
            get(content::get::handler)
                .post(content::update::handler)
                .delete(content::delete::handler),
        )
        .route(
            "/content/:id/value",
            get(value::get::handler)
                .put(value::set::handler)
                .delete(value::delete::handler),
        )
        .route(
            "/reference",
            get(reference::list::handler).post(reference::add::handler),
        )
        .route("/reference/:id", axum::routing::delete(reference::delete::handler))
        .with_state(state)
}

/// Status code a store error is reported with.
pub fn error_status(err: &GraphError) -> StatusCode {
    match err {
        GraphError::NotFound(_) | GraphError::ValueNotFound(_) | GraphError::ReferenceNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        GraphError::IntegrityViolation { .. } | GraphError::DuplicateReference { .. } => {
            StatusCode::CONFLICT
        }
        GraphError::Forbidden { .. } => StatusCode::FORBIDDEN,
        GraphError::InvalidField(_) | GraphError::SelfReference(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Render a store error, hiding internal details behind a generic message.
pub(crate) fn store_error_response(err: GraphError) -> Response {
    let status = error_status(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "store operation failed");
        return (status, "unknown server error").into_response();
    }
    tracing::debug!(error = %err, %status, "store operation rejected");
    (status, err.to_string()).into_response()
}
