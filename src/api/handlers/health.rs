//! Health endpoint: daemon metadata plus Consul reachability.

use crate::consul::ConsulClient;
use crate::GIT_COMMIT_HASH;
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    consul: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Consul is reachable", body = [Health]),
        (status = 503, description = "Consul is unreachable", body = [Health])
    ),
    tag = "health"
)]
pub async fn health(method: Method, consul: Extension<ConsulClient>) -> impl IntoResponse {
    let result = consul.ping().await;

    if let Err(err) = &result {
        error!("Failed to reach consul: {err}");
    }

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        consul: if result.is_ok() {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) =
        format!("{}:{}:{}", health.name, health.version, short_hash).parse::<HeaderValue>()
    {
        debug!("X-App header: {:?}", value);
        headers.insert("X-App", value);
    }

    if result.is_ok() {
        (StatusCode::OK, headers, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}
