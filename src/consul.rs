//! Minimal Consul HTTP client.
//!
//! Only the surface the token store needs: key/value get, recursive get,
//! put, recursive delete, and a leader ping for the health endpoint. Every
//! request goes through one [`reqwest::Client`] built with an explicit
//! timeout so a dead Consul agent surfaces as an error instead of a hang.

use crate::APP_USER_AGENT;
use anyhow::{anyhow, Context, Result};
use base64ct::{Base64, Encoding};
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

const CONSUL_TOKEN_HEADER: &str = "X-Consul-Token";

/// One entry of a `GET /v1/kv/..` response; `Value` is base64 encoded and
/// may be null for directory placeholders.
#[derive(Debug, Deserialize)]
struct KvEntry {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value")]
    value: Option<String>,
}

#[derive(Clone)]
pub struct ConsulClient {
    http: Client,
    base_url: String,
    token: Option<SecretString>,
}

impl ConsulClient {
    /// # Errors
    /// Returns an error if the URL cannot be parsed or the HTTP client
    /// cannot be built.
    pub fn new(url: &str, token: Option<SecretString>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url(url)?,
            token,
        })
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn with_token(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(CONSUL_TOKEN_HEADER, token.expose_secret()),
            None => request,
        }
    }

    /// Read a single key. `Ok(None)` when the key does not exist.
    ///
    /// # Errors
    /// Returns an error on connection failure or an unexpected status.
    pub async fn kv_get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let url = self.endpoint_url(&format!("/v1/kv/{key}"));

        let response = self
            .with_token(self.http.get(&url))
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("consul kv get failed: {status} {body}"));
        }

        let entries: Vec<KvEntry> = response.json().await.context("consul kv get body")?;

        entries
            .into_iter()
            .next()
            .map(|entry| decode_value(&entry))
            .transpose()
    }

    /// Read every key under a prefix, decoded values included.
    ///
    /// # Errors
    /// Returns an error on connection failure or an unexpected status.
    pub async fn kv_get_recurse(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let url = self.endpoint_url(&format!("/v1/kv/{prefix}"));

        let response = self
            .with_token(self.http.get(&url).query(&[("recurse", "true")]))
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("consul kv recurse failed: {status} {body}"));
        }

        let entries: Vec<KvEntry> = response.json().await.context("consul kv recurse body")?;

        let mut values = Vec::with_capacity(entries.len());
        for entry in entries {
            let key = entry.key.clone();
            values.push((key, decode_value(&entry)?));
        }

        Ok(values)
    }

    /// # Errors
    /// Returns an error on connection failure or an unexpected status.
    pub async fn kv_put(&self, key: &str, value: &[u8]) -> Result<()> {
        let url = self.endpoint_url(&format!("/v1/kv/{key}"));

        let response = self
            .with_token(self.http.put(&url).body(value.to_vec()))
            .send()
            .await
            .with_context(|| format!("PUT {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("consul kv put failed: {status} {body}"));
        }

        debug!("kv put {}", key);

        Ok(())
    }

    /// Recursive delete; succeeds silently when the key is already gone.
    ///
    /// # Errors
    /// Returns an error on connection failure or an unexpected status.
    pub async fn kv_delete_recurse(&self, key: &str) -> Result<()> {
        let url = self.endpoint_url(&format!("/v1/kv/{key}"));

        let response = self
            .with_token(self.http.delete(&url).query(&[("recurse", "true")]))
            .send()
            .await
            .with_context(|| format!("DELETE {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("consul kv delete failed: {status} {body}"));
        }

        debug!("kv delete {}", key);

        Ok(())
    }

    /// Cheap reachability check used by `/health`.
    ///
    /// # Errors
    /// Returns an error when the agent does not answer.
    pub async fn ping(&self) -> Result<()> {
        let url = self.endpoint_url("/v1/status/leader");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        if !response.status().is_success() {
            return Err(anyhow!("consul status failed: {}", response.status()));
        }

        Ok(())
    }
}

fn decode_value(entry: &KvEntry) -> Result<Vec<u8>> {
    let encoded = entry
        .value
        .as_deref()
        .ok_or_else(|| anyhow!("consul key {} has no value", entry.key))?;

    Base64::decode_vec(encoded).with_context(|| format!("consul key {} is not base64", entry.key))
}

/// Normalize a Consul address into `scheme://host:port`.
///
/// # Errors
/// Returns an error when the URL has no host or an unsupported scheme.
pub fn base_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw)?;

    let scheme = url.scheme();

    let host = url
        .host()
        .ok_or_else(|| anyhow!("Error parsing URL: no host specified"))?
        .to_owned();

    let port = match url.port() {
        Some(p) => p,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => return Err(anyhow!("Error parsing URL: unsupported scheme {}", scheme)),
        },
    };

    Ok(format!("{scheme}://{host}:{port}"))
}
