//! HTTP handlers and shared response helpers.

pub mod backends;
pub mod health;
pub mod token;

use crate::errors::AuthError;
use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use tracing::error;

/// Error body shared by every endpoint:
/// `{"reason": [msg], "timestamp": [epoch], "status_code": code}`.
pub(crate) fn error_response(status: StatusCode, reason: &str) -> Response {
    let body = json!({
        "reason": [reason],
        "timestamp": [crate::token::now()],
        "status_code": status.as_u16(),
    });

    (status, Json(body)).into_response()
}

/// Map the manager taxonomy onto HTTP statuses.
pub(crate) fn manager_error(err: &AuthError) -> Response {
    let status = match err {
        AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
        AuthError::NotFound(_) => StatusCode::NOT_FOUND,
        AuthError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        AuthError::BackendUnavailable(_)
        | AuthError::StoreUnavailable(_)
        | AuthError::SchedulerUnavailable(_) => {
            error!("service dependency failed: {err:?}");
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    error_response(status, &err.to_string())
}
