//! Local-database backend: users stored in PostgreSQL, passwords verified
//! against their Argon2 hash.

use super::{AuthenticationBackend, Identity};
use crate::errors::BackendError;
use anyhow::anyhow;
use argon2::{password_hash::PasswordHash, Argon2, PasswordVerifier};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};
use tracing::{info_span, warn, Instrument};

pub struct XivoUserBackend {
    pool: PgPool,
}

impl XivoUserBackend {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthenticationBackend for XivoUserBackend {
    async fn verify_credentials(
        &self,
        login: &str,
        secret: &str,
        _args: &Value,
    ) -> Result<bool, BackendError> {
        let query = "SELECT password_hash FROM users WHERE username = $1 AND client_enabled";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(login)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| BackendError::Unavailable(err.into()))?;

        let Some(row) = row else {
            return Ok(false);
        };

        let hash: String = row.get("password_hash");
        match PasswordHash::new(&hash) {
            Ok(parsed) => Ok(Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok()),
            Err(err) => {
                // Unreadable hash fails closed instead of locking out the
                // whole backend.
                warn!("unreadable password hash for {login}: {err}");
                Ok(false)
            }
        }
    }

    async fn resolve_identity(&self, login: &str, _args: &Value) -> Result<Identity, BackendError> {
        let query = "SELECT uuid::text AS uuid FROM users WHERE username = $1 AND client_enabled";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(login)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| BackendError::Unavailable(err.into()))?
            .ok_or_else(|| {
                BackendError::Unavailable(anyhow!("login {login} vanished during authentication"))
            })?;

        let uuid: String = row.get("uuid");

        Ok(Identity {
            auth_id: uuid.clone(),
            xivo_user_uuid: Some(uuid),
        })
    }

    async fn derive_acls(&self, _login: &str, _args: &Value) -> Result<Vec<String>, BackendError> {
        Ok(vec![
            "dird.#".to_string(),
            "confd.users.me.#".to_string(),
        ])
    }
}
