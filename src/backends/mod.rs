//! Pluggable authentication backends.
//!
//! A backend verifies credentials, resolves the authenticated identity and
//! derives the ACL patterns granted to it. The token manager is agnostic to
//! which backend answers; the caller names one on each authentication
//! request and the registry, populated once at startup from the
//! configuration, dispatches to it.

pub mod ldap_user;
pub mod mock;
pub mod xivo_user;
pub mod xivo_ws;

use crate::config::Config;
use crate::errors::BackendError;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Identity produced by a successful authentication, consumed immediately
/// to build the token payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub auth_id: String,
    pub xivo_user_uuid: Option<String>,
}

/// Capability interface every backend variant implements.
///
/// `verify_credentials` fails closed: expected failures (bad credentials,
/// unknown login) return `false`, never an error. Only transport failures
/// reach the caller, as [`BackendError::Unavailable`].
#[async_trait]
pub trait AuthenticationBackend: Send + Sync {
    async fn verify_credentials(
        &self,
        login: &str,
        secret: &str,
        args: &Value,
    ) -> Result<bool, BackendError>;

    async fn resolve_identity(&self, login: &str, args: &Value) -> Result<Identity, BackendError>;

    async fn derive_acls(&self, login: &str, args: &Value) -> Result<Vec<String>, BackendError>;
}

/// Name → backend mapping, read-only after startup.
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn AuthenticationBackend>>,
}

impl BackendRegistry {
    pub fn register(&mut self, name: &str, backend: Arc<dyn AuthenticationBackend>) {
        self.backends.insert(name.to_string(), backend);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn AuthenticationBackend>> {
        self.backends.get(name).cloned()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the registry from the enabled-backend list.
    ///
    /// # Errors
    /// Fails on an unknown backend name or when a variant's configuration
    /// section is missing; [`Config::validate`] catches the latter first.
    pub fn from_config(config: &Config, pool: Option<PgPool>) -> Result<Self> {
        let mut registry = Self::default();

        for name in &config.enabled_backends {
            match name.as_str() {
                "mock" => registry.register(name, Arc::new(mock::MockBackend)),
                "xivo_user" => {
                    let pool = pool
                        .clone()
                        .ok_or_else(|| anyhow!("backend xivo_user needs a database pool"))?;
                    registry.register(name, Arc::new(xivo_user::XivoUserBackend::new(pool)));
                }
                "ldap_user" => {
                    let ldap = config
                        .ldap
                        .clone()
                        .ok_or_else(|| anyhow!("backend ldap_user needs an LDAP configuration"))?;
                    registry.register(name, Arc::new(ldap_user::LdapUserBackend::new(ldap)));
                }
                "xivo_ws" => {
                    let ws = config.ws.clone().ok_or_else(|| {
                        anyhow!("backend xivo_ws needs a web service configuration")
                    })?;
                    registry.register(name, Arc::new(xivo_ws::XivoWsBackend::new(&ws)?));
                }
                other => return Err(anyhow!("unknown backend {other}")),
            }

            info!("backend {} enabled", name);
        }

        Ok(registry)
    }
}
