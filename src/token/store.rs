//! Durable token storage.
//!
//! Tokens live in the Consul key/value store, one JSON blob per token at
//! `xivo/xivo-auth/tokens/<token_id>`. The layout is shared with other
//! services reading the raw store, so both the key shape and the field
//! names are fixed. Deletion is recursive under the token's namespace.

use crate::consul::ConsulClient;
use crate::errors::StoreError;
use crate::token::{StoredToken, Token, TokenPayload};
use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

const TOKEN_KEY_ROOT: &str = "xivo/xivo-auth/tokens";

pub(crate) fn token_key(token_id: &str) -> String {
    format!("{TOKEN_KEY_ROOT}/{token_id}")
}

/// Persistence capability for tokens. One implementation talks to Consul;
/// tests use an in-memory map.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Mint a fresh id, persist the token, return it.
    async fn create(&self, payload: TokenPayload) -> Result<Token, StoreError>;

    /// Read one token back.
    async fn get(&self, token_id: &str) -> Result<Token, StoreError>;

    /// Idempotent recursive delete; succeeds when already absent.
    async fn remove(&self, token_id: &str) -> Result<(), StoreError>;

    /// Every persisted token, skipping unreadable records.
    async fn list(&self) -> Result<Vec<Token>, StoreError>;
}

pub struct ConsulTokenStore {
    consul: ConsulClient,
}

impl ConsulTokenStore {
    #[must_use]
    pub fn new(consul: ConsulClient) -> Self {
        Self { consul }
    }
}

#[async_trait]
impl TokenStore for ConsulTokenStore {
    async fn create(&self, payload: TokenPayload) -> Result<Token, StoreError> {
        let token = Token::from_payload(Uuid::new_v4().to_string(), payload);

        let blob = serde_json::to_vec(&token.to_stored())
            .map_err(|err| StoreError::Unavailable(err.into()))?;

        self.consul
            .kv_put(&token_key(&token.token), &blob)
            .await
            .map_err(StoreError::Unavailable)?;

        debug!("token {} created for {}", token.token, token.auth_id);

        Ok(token)
    }

    async fn get(&self, token_id: &str) -> Result<Token, StoreError> {
        let blob = self
            .consul
            .kv_get(&token_key(token_id))
            .await
            .map_err(StoreError::Unavailable)?
            .ok_or_else(|| StoreError::NotFound(token_id.to_string()))?;

        let stored: StoredToken = serde_json::from_slice(&blob)
            .map_err(|_| StoreError::Corrupt(token_id.to_string()))?;

        Ok(Token::from(stored))
    }

    async fn remove(&self, token_id: &str) -> Result<(), StoreError> {
        self.consul
            .kv_delete_recurse(&token_key(token_id))
            .await
            .map_err(StoreError::Unavailable)
    }

    async fn list(&self) -> Result<Vec<Token>, StoreError> {
        let entries = self
            .consul
            .kv_get_recurse(TOKEN_KEY_ROOT)
            .await
            .map_err(StoreError::Unavailable)?;

        let mut tokens = Vec::with_capacity(entries.len());
        for (key, blob) in entries {
            // A single unreadable record must not block the sweep.
            match serde_json::from_slice::<StoredToken>(&blob) {
                Ok(stored) => tokens.push(Token::from(stored)),
                Err(err) => warn!("skipping unreadable token record {key}: {err}"),
            }
        }

        Ok(tokens)
    }
}
