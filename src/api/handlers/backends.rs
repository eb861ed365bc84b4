//! Enabled-backend listing.

use crate::token::Manager;
use axum::{extract::Extension, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/0.1/backends",
    responses(
        (status = 200, description = "Names of the enabled authentication backends")
    ),
    tag = "backends"
)]
pub async fn list(manager: Extension<Arc<Manager>>) -> impl IntoResponse {
    Json(json!({"data": manager.backend_names()}))
}
