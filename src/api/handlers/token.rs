//! Token endpoints: issuance, lookup, ACL check and revocation.

use super::{error_response, manager_error};
use crate::token::Manager;
use axum::{
    extract::{Extension, Path, Query},
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64ct::{Base64, Encoding};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    pub scope: Option<String>,
}

#[utoipa::path(
    post,
    path = "/0.1/token",
    responses(
        (status = 200, description = "Token issued"),
        (status = 400, description = "Invalid backend or expiration"),
        (status = 401, description = "Missing or refused credentials"),
        (status = 503, description = "Backend, store or scheduler unreachable")
    ),
    tag = "token"
)]
pub async fn create(
    manager: Extension<Arc<Manager>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let Some((login, secret)) = basic_credentials(&headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "Authentication required");
    };

    let Some(backend) = body.get("backend").and_then(Value::as_str) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid backend");
    };

    let expiration = match body.get("expiration") {
        None => None,
        Some(value) => match value.as_i64() {
            Some(seconds) if seconds > 0 => Some(seconds as u64),
            _ => return error_response(StatusCode::BAD_REQUEST, "Invalid expiration"),
        },
    };

    match manager
        .authenticate_and_issue(backend, &login, &secret, expiration, &body)
        .await
    {
        Ok(token) => (StatusCode::OK, Json(json!({"data": token.to_stored()}))).into_response(),
        Err(err) => manager_error(&err),
    }
}

#[utoipa::path(
    get,
    path = "/0.1/token/{token_id}",
    params(
        ("token_id" = String, Path, description = "Token id"),
        ("scope" = Option<String>, Query, description = "Required ACL to check the token against")
    ),
    responses(
        (status = 200, description = "Token is valid"),
        (status = 401, description = "Token expired"),
        (status = 403, description = "Token does not carry the required ACL"),
        (status = 404, description = "Unknown token"),
        (status = 503, description = "Store unreachable")
    ),
    tag = "token"
)]
pub async fn show(
    method: Method,
    Path(token_id): Path<String>,
    Query(query): Query<ScopeQuery>,
    manager: Extension<Arc<Manager>>,
) -> Response {
    if let Some(scope) = &query.scope {
        if !manager.authorize(&token_id, scope).await {
            // Distinguish a missing/expired token from an insufficient
            // grant set.
            return match manager.get(&token_id).await {
                Ok(_) => error_response(StatusCode::FORBIDDEN, "insufficient acl"),
                Err(err) => manager_error(&err),
            };
        }
    }

    match manager.get(&token_id).await {
        Ok(token) => {
            if method == Method::HEAD {
                StatusCode::NO_CONTENT.into_response()
            } else {
                (StatusCode::OK, Json(json!({"data": token.to_stored()}))).into_response()
            }
        }
        Err(err) => manager_error(&err),
    }
}

#[utoipa::path(
    delete,
    path = "/0.1/token/{token_id}",
    params(("token_id" = String, Path, description = "Token id")),
    responses(
        (status = 200, description = "Token revoked (idempotent)"),
        (status = 503, description = "Store unreachable")
    ),
    tag = "token"
)]
pub async fn revoke(Path(token_id): Path<String>, manager: Extension<Arc<Manager>>) -> Response {
    match manager.revoke(&token_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"data": {"message": "success"}})),
        )
            .into_response(),
        Err(err) => manager_error(&err),
    }
}

/// Decode `Authorization: Basic <base64(login:secret)>`.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = Base64::decode_vec(encoded.trim()).ok()?;
    let pair = String::from_utf8(decoded).ok()?;
    let (login, secret) = pair.split_once(':')?;

    Some((login.to_string(), secret.to_string()))
}
