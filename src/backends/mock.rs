//! Fixed-credential backend used by the test suite and local development.

use super::{AuthenticationBackend, Identity};
use crate::errors::BackendError;
use async_trait::async_trait;
use serde_json::Value;

pub struct MockBackend;

#[async_trait]
impl AuthenticationBackend for MockBackend {
    async fn verify_credentials(
        &self,
        login: &str,
        secret: &str,
        _args: &Value,
    ) -> Result<bool, BackendError> {
        Ok(login == "foo" && secret == "bar")
    }

    async fn resolve_identity(&self, _login: &str, _args: &Value) -> Result<Identity, BackendError> {
        Ok(Identity {
            auth_id: "a-mocked-uuid".to_string(),
            xivo_user_uuid: None,
        })
    }

    async fn derive_acls(&self, _login: &str, _args: &Value) -> Result<Vec<String>, BackendError> {
        Ok(vec![
            "foo".to_string(),
            "bar".to_string(),
            "auth.#".to_string(),
        ])
    }
}
