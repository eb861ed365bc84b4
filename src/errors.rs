//! Error taxonomy shared by the token manager and the HTTP layer.

use thiserror::Error;

/// Failures surfaced by token manager operations.
///
/// Transport failures keep their source so startup/CLI code can log the
/// full chain; the HTTP layer only maps the variant to a status code.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials or token")]
    Unauthorized,
    #[error("no such token {0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("authentication backend unreachable")]
    BackendUnavailable(anyhow::Error),
    #[error("connection to consul failed")]
    StoreUnavailable(anyhow::Error),
    #[error("connection to the task scheduler failed")]
    SchedulerUnavailable(anyhow::Error),
}

/// Failures raised by a [`crate::token::store::TokenStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no such token {0}")]
    NotFound(String),
    #[error("stored token {0} is not valid JSON")]
    Corrupt(String),
    #[error("connection to consul failed")]
    Unavailable(anyhow::Error),
}

/// Failures raised by an authentication backend.
///
/// Expected failures (bad credentials, unknown login) are not errors:
/// `verify_credentials` fails closed by returning `false` instead.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend transport failure")]
    Unavailable(anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AuthError::NotFound(id),
            // A single malformed record is indistinguishable from a missing
            // one for callers; it is never retried here.
            StoreError::Corrupt(id) => AuthError::NotFound(id),
            StoreError::Unavailable(source) => AuthError::StoreUnavailable(source),
        }
    }
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable(source) => AuthError::BackendUnavailable(source),
        }
    }
}
