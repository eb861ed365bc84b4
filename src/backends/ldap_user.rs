//! Directory-service backend: credentials checked with an LDAP simple bind.

use super::{AuthenticationBackend, Identity};
use crate::config::LdapConfig;
use crate::errors::BackendError;
use async_trait::async_trait;
use ldap3::{drive, LdapConnAsync, LdapConnSettings};
use serde_json::Value;
use tracing::{debug, warn};

const LDAP_SUCCESS: u32 = 0;

pub struct LdapUserBackend {
    config: LdapConfig,
}

impl LdapUserBackend {
    #[must_use]
    pub fn new(config: LdapConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AuthenticationBackend for LdapUserBackend {
    async fn verify_credentials(
        &self,
        login: &str,
        secret: &str,
        _args: &Value,
    ) -> Result<bool, BackendError> {
        let bind_dn = self.config.bind_dn(login);
        let settings = LdapConnSettings::new().set_conn_timeout(self.config.timeout);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.config.uri)
            .await
            .map_err(|err| BackendError::Unavailable(err.into()))?;
        drive!(conn);

        let verified = match ldap.simple_bind(&bind_dn, secret).await {
            Ok(result) if result.rc == LDAP_SUCCESS => {
                debug!("simple bind done on {}", self.config.uri);
                true
            }
            Ok(result) => {
                debug!(
                    "simple bind failed on {}: rc={} {}",
                    self.config.uri, result.rc, result.text
                );
                false
            }
            Err(err) => {
                // Bind-level failures fail closed; only the initial
                // connection counts as the directory being unreachable.
                warn!("simple bind errored on {}: {err}", self.config.uri);
                false
            }
        };

        let _ = ldap.unbind().await;

        Ok(verified)
    }

    async fn resolve_identity(&self, login: &str, _args: &Value) -> Result<Identity, BackendError> {
        // The directory owns no user record of ours; the login itself is
        // the identity the token is bound to.
        Ok(Identity {
            auth_id: login.to_string(),
            xivo_user_uuid: None,
        })
    }

    async fn derive_acls(&self, _login: &str, _args: &Value) -> Result<Vec<String>, BackendError> {
        Ok(vec!["dird.#".to_string()])
    }
}
