//! HTTP surface: REST resource wiring around the token manager.

pub mod handlers;
mod openapi;

pub use openapi::openapi;

use crate::config::Config;
use crate::consul::ConsulClient;
use crate::token::Manager;
use anyhow::Result;
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer, request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

/// Routes only; the dependency layers are stacked in [`serve`].
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/0.1/token", post(handlers::token::create))
        .route(
            "/0.1/token/:token_id",
            get(handlers::token::show).delete(handlers::token::revoke),
        )
        .route("/0.1/backends", get(handlers::backends::list))
        .route("/health", get(handlers::health::health))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn serve(config: &Config, manager: Arc<Manager>, consul: ConsulClient) -> Result<()> {
    let app = router().layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(manager.clone()))
            .layer(Extension(consul)),
    );

    let app = if config.cors_enabled {
        app.layer(CorsLayer::permissive())
    } else {
        app
    };

    let listener = TcpListener::bind(format!("::0:{}", config.listen_port)).await?;

    info!("Listening on [::]:{}", config.listen_port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    manager.shutdown();

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
