//! Token manager: orchestrates backends, store and scheduler.

use crate::backends::BackendRegistry;
use crate::errors::AuthError;
use crate::token::scheduler::ExpirationScheduler;
use crate::token::store::TokenStore;
use crate::token::{now, Token, TokenPayload};
use anyhow::anyhow;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Manager {
    backends: BackendRegistry,
    store: Arc<dyn TokenStore>,
    scheduler: ExpirationScheduler,
    default_expiration: u64,
    xivo_uuid: Option<String>,
}

impl Manager {
    #[must_use]
    pub fn new(
        backends: BackendRegistry,
        store: Arc<dyn TokenStore>,
        scheduler: ExpirationScheduler,
        default_expiration: u64,
        xivo_uuid: Option<String>,
    ) -> Self {
        Self {
            backends,
            store,
            scheduler,
            default_expiration,
            xivo_uuid,
        }
    }

    #[must_use]
    pub fn backend_names(&self) -> Vec<String> {
        self.backends.names()
    }

    /// Authenticate against the named backend and issue a token.
    ///
    /// Issuance is atomic: the token is stored and its expiration armed, or
    /// the caller gets an error and no token is left behind.
    ///
    /// # Errors
    /// `Unauthorized` on unknown backend or bad credentials,
    /// `InvalidArgument` on a non-positive expiration, and the transport
    /// taxonomy for backend/store/scheduler failures.
    pub async fn authenticate_and_issue(
        &self,
        backend_name: &str,
        login: &str,
        secret: &str,
        expiration: Option<u64>,
        args: &Value,
    ) -> Result<Token, AuthError> {
        if expiration == Some(0) {
            return Err(AuthError::InvalidArgument("Invalid expiration".to_string()));
        }

        let Some(backend) = self.backends.get(backend_name) else {
            // An unknown backend reads the same as bad credentials, so
            // callers cannot probe which backends exist.
            debug!("authentication refused: no backend {backend_name}");
            return Err(AuthError::Unauthorized);
        };

        if !backend.verify_credentials(login, secret, args).await? {
            return Err(AuthError::Unauthorized);
        }

        let identity = backend.resolve_identity(login, args).await?;
        let acls = backend.derive_acls(login, args).await?;

        let expiration = expiration.unwrap_or(self.default_expiration);
        let issued_t = now();
        let payload = TokenPayload {
            auth_id: identity.auth_id,
            xivo_user_uuid: identity.xivo_user_uuid,
            xivo_uuid: self.xivo_uuid.clone(),
            issued_t,
            expire_t: Some(issued_t + expiration as f64),
            acls,
        };

        let token = self.store.create(payload).await?;

        if let Err(err) = self.scheduler.schedule(&token.token, expiration as f64) {
            // No token may outlive its expiration guarantee: roll the
            // store write back before surfacing the failure.
            if let Err(remove_err) = self.store.remove(&token.token).await {
                warn!(
                    "failed to roll back unscheduled token {}: {remove_err}",
                    token.token
                );
            }
            return Err(AuthError::SchedulerUnavailable(anyhow!(err)));
        }

        debug!("token {} issued via backend {}", token.token, backend_name);

        Ok(token)
    }

    /// Fetch a live token.
    ///
    /// # Errors
    /// `NotFound` when the id is unknown, `Unauthorized` when the token
    /// expired but its deferred delete has not fired yet.
    pub async fn get(&self, token_id: &str) -> Result<Token, AuthError> {
        let token = self.store.get(token_id).await?;

        if token.is_expired() {
            return Err(AuthError::Unauthorized);
        }

        Ok(token)
    }

    /// Cancel the pending expiration and delete the token. Idempotent.
    ///
    /// # Errors
    /// Only transport failures; revoking an absent token succeeds.
    pub async fn revoke(&self, token_id: &str) -> Result<(), AuthError> {
        self.scheduler.cancel(token_id);
        self.store.remove(token_id).await?;

        Ok(())
    }

    /// ACL check against a token's grant set.
    ///
    /// Never fails: an unknown, expired or unreadable token refuses the
    /// required ACL.
    pub async fn authorize(&self, token_id: &str, required_acl: &str) -> bool {
        match self.get(token_id).await {
            Ok(token) => token.matches_required_acl(required_acl),
            Err(err) => {
                debug!("authorization refused: {err}");
                false
            }
        }
    }

    /// Stop arming expirations; called once on daemon shutdown.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::MockBackend;
    use crate::token::store::memory::MemoryTokenStore;

    fn new_manager() -> (Manager, Arc<MemoryTokenStore>) {
        let store = Arc::new(MemoryTokenStore::default());
        let scheduler = ExpirationScheduler::new(store.clone());
        let mut backends = BackendRegistry::default();
        backends.register("mock", Arc::new(MockBackend));

        let manager = Manager::new(
            backends,
            store.clone(),
            scheduler,
            7200,
            Some("the-xivo-uuid".to_string()),
        );

        (manager, store)
    }

    async fn issue(manager: &Manager) -> Token {
        manager
            .authenticate_and_issue("mock", "foo", "bar", None, &Value::Null)
            .await
            .expect("issue")
    }

    #[tokio::test]
    async fn issued_token_carries_the_backend_grants() {
        let (manager, _store) = new_manager();

        let token = issue(&manager).await;

        assert_eq!(token.auth_id, "a-mocked-uuid");
        assert_eq!(token.xivo_uuid, Some("the-xivo-uuid".to_string()));
        assert_eq!(token.acls, vec!["foo", "bar", "auth.#"]);
        assert!(token.expire_t.is_some_and(|t| t > token.issued_t));

        assert!(manager.authorize(&token.token, "auth.users.read").await);
        assert!(!manager.authorize(&token.token, "other.read").await);
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized() {
        let (manager, _store) = new_manager();

        let err = manager
            .authenticate_and_issue("mock", "foo", "wrong", None, &Value::Null)
            .await
            .expect_err("refused");

        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn unknown_backend_is_unauthorized() {
        let (manager, _store) = new_manager();

        let err = manager
            .authenticate_and_issue("no-such-backend", "foo", "bar", None, &Value::Null)
            .await
            .expect_err("refused");

        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn zero_expiration_is_invalid() {
        let (manager, _store) = new_manager();

        let err = manager
            .authenticate_and_issue("mock", "foo", "bar", Some(0), &Value::Null)
            .await
            .expect_err("refused");

        assert!(matches!(err, AuthError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn get_unknown_token_is_not_found() {
        let (manager, _store) = new_manager();

        let err = manager.get("no-such-token").await.expect_err("missing");

        assert!(matches!(err, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn expired_token_reads_as_unauthorized_before_deletion() {
        let (manager, store) = new_manager();

        let token = store
            .create(TokenPayload {
                auth_id: "the-auth-id".to_string(),
                xivo_user_uuid: None,
                xivo_uuid: None,
                issued_t: now() - 120.0,
                expire_t: Some(now() - 60.0),
                acls: vec!["auth.#".to_string()],
            })
            .await
            .expect("create");

        let err = manager.get(&token.token).await.expect_err("expired");
        assert!(matches!(err, AuthError::Unauthorized));
        assert!(!manager.authorize(&token.token, "auth.users.read").await);
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let (manager, _store) = new_manager();

        let token = issue(&manager).await;

        manager.revoke(&token.token).await.expect("first revoke");
        manager.revoke(&token.token).await.expect("second revoke");

        assert!(manager.get(&token.token).await.is_err());
    }

    #[tokio::test]
    async fn authorize_never_fails_even_with_the_store_down() {
        let (manager, store) = new_manager();

        let token = issue(&manager).await;
        store.set_unavailable(true);

        assert!(!manager.authorize(&token.token, "auth.users.read").await);
    }

    #[tokio::test]
    async fn concurrent_logins_issue_independent_tokens() {
        let (manager, _store) = new_manager();

        let (first, second) = tokio::join!(
            manager.authenticate_and_issue("mock", "foo", "bar", None, &Value::Null),
            manager.authenticate_and_issue("mock", "foo", "bar", None, &Value::Null),
        );
        let first = first.expect("first token");
        let second = second.expect("second token");

        assert_ne!(first.token, second.token);

        manager.revoke(&first.token).await.expect("revoke first");

        assert!(manager.get(&first.token).await.is_err());
        assert!(manager.get(&second.token).await.is_ok());
    }

    #[tokio::test]
    async fn issuance_rolls_back_when_scheduling_fails() {
        let (manager, store) = new_manager();

        manager.shutdown();

        let err = manager
            .authenticate_and_issue("mock", "foo", "bar", None, &Value::Null)
            .await
            .expect_err("scheduling down");

        assert!(matches!(err, AuthError::SchedulerUnavailable(_)));
        assert!(store.list().await.expect("list").is_empty());
    }
}
