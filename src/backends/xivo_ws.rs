//! External web-service backend: credentials are checked against a remote
//! HTTP credential service.
//!
//! Wire contract: `POST <url>/0.1/credentials/check` with a JSON
//! `{login, password}` body answers 2xx when the pair is valid and
//! 401/403/404 when it is not; `GET <url>/0.1/credentials/<login>` returns
//! `{"id": ..., "user_uuid": ...}` for a known login.

use super::{AuthenticationBackend, Identity};
use crate::config::WsConfig;
use crate::consul::base_url;
use crate::errors::BackendError;
use crate::APP_USER_AGENT;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

pub struct XivoWsBackend {
    http: Client,
    service_url: String,
}

#[derive(Debug, Deserialize)]
struct CredentialsBody {
    id: Value,
    #[serde(default)]
    user_uuid: Option<String>,
}

impl XivoWsBackend {
    /// # Errors
    /// Returns an error when the service URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &WsConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            service_url: base_url(&config.url)?,
        })
    }
}

#[async_trait]
impl AuthenticationBackend for XivoWsBackend {
    async fn verify_credentials(
        &self,
        login: &str,
        secret: &str,
        _args: &Value,
    ) -> Result<bool, BackendError> {
        let url = format!("{}/0.1/credentials/check", self.service_url);

        let response = self
            .http
            .post(&url)
            .json(&json!({"login": login, "password": secret}))
            .send()
            .await
            .map_err(|err| BackendError::Unavailable(err.into()))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                debug!("credential check refused for {login}");
                Ok(false)
            }
            status => Err(BackendError::Unavailable(anyhow!(
                "credential service answered {status}"
            ))),
        }
    }

    async fn resolve_identity(&self, login: &str, _args: &Value) -> Result<Identity, BackendError> {
        let url = format!("{}/0.1/credentials/{login}", self.service_url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| BackendError::Unavailable(err.into()))?;

        if !response.status().is_success() {
            return Err(BackendError::Unavailable(anyhow!(
                "credential service answered {}",
                response.status()
            )));
        }

        let body: CredentialsBody = response
            .json()
            .await
            .map_err(|err| BackendError::Unavailable(err.into()))?;

        let auth_id = match body.id {
            Value::String(id) => id,
            Value::Number(id) => id.to_string(),
            other => {
                return Err(BackendError::Unavailable(anyhow!(
                    "credential service returned an unusable id: {other}"
                )))
            }
        };

        Ok(Identity {
            auth_id,
            xivo_user_uuid: body.user_uuid,
        })
    }

    async fn derive_acls(&self, _login: &str, _args: &Value) -> Result<Vec<String>, BackendError> {
        Ok(vec!["confd.#".to_string()])
    }
}
