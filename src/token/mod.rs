//! Token entity and lifecycle.
//!
//! A token binds an authenticated identity to a set of granted ACL
//! patterns and a validity window. Tokens are immutable after creation:
//! the only mutation the system knows is deletion, by explicit revocation
//! or when the expiration deadline passes.

pub mod manager;
pub mod scheduler;
pub mod store;

pub use manager::Manager;

use crate::acl;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as fractional epoch seconds.
#[must_use]
pub fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |elapsed| elapsed.as_secs_f64())
}

/// A bearer token and everything needed to authorize with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token: String,
    pub auth_id: String,
    pub xivo_user_uuid: Option<String>,
    pub xivo_uuid: Option<String>,
    pub issued_t: f64,
    pub expire_t: Option<f64>,
    pub acls: Vec<String>,
}

/// Everything the store needs to mint a new token, minus the id.
#[derive(Debug, Clone)]
pub struct TokenPayload {
    pub auth_id: String,
    pub xivo_user_uuid: Option<String>,
    pub xivo_uuid: Option<String>,
    pub issued_t: f64,
    pub expire_t: Option<f64>,
    pub acls: Vec<String>,
}

/// Durable representation, field names fixed by the key/value layout
/// shared with other services reading the raw store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    pub auth_id: String,
    pub xivo_uuid: Option<String>,
    pub xivo_user_uuid: Option<String>,
    pub issued_at: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<f64>,
    pub utc_issued_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_expires_at: Option<String>,
    pub acls: Vec<String>,
}

impl Token {
    pub(crate) fn from_payload(id: String, payload: TokenPayload) -> Self {
        Self {
            token: id,
            auth_id: payload.auth_id,
            xivo_user_uuid: payload.xivo_user_uuid,
            xivo_uuid: payload.xivo_uuid,
            issued_t: payload.issued_t,
            expire_t: payload.expire_t,
            acls: payload.acls,
        }
    }

    /// Strictly past its deadline; a token without one never expires.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expire_t.is_some_and(|deadline| now() > deadline)
    }

    /// True iff any granted pattern matches the required ACL.
    #[must_use]
    pub fn matches_required_acl(&self, required_acl: &str) -> bool {
        self.acls
            .iter()
            .any(|pattern| acl::matches(pattern, required_acl, &self.auth_id))
    }

    #[must_use]
    pub fn to_stored(&self) -> StoredToken {
        StoredToken {
            token: self.token.clone(),
            auth_id: self.auth_id.clone(),
            xivo_uuid: self.xivo_uuid.clone(),
            xivo_user_uuid: self.xivo_user_uuid.clone(),
            issued_at: self.issued_t,
            expires_at: self.expire_t,
            utc_issued_at: format_utc(self.issued_t),
            utc_expires_at: self.expire_t.map(format_utc),
            acls: self.acls.clone(),
        }
    }
}

impl From<StoredToken> for Token {
    fn from(stored: StoredToken) -> Self {
        Self {
            token: stored.token,
            auth_id: stored.auth_id,
            xivo_user_uuid: stored.xivo_user_uuid,
            xivo_uuid: stored.xivo_uuid,
            issued_t: stored.issued_at,
            expire_t: stored.expires_at,
            acls: stored.acls,
        }
    }
}

/// Render fractional epoch seconds as an ISO-8601 UTC timestamp with
/// microsecond precision, e.g. `2016-11-24T18:17:51.535370`.
fn format_utc(epoch: f64) -> String {
    let secs = epoch.div_euclid(1.0) as i64;
    let micros = ((epoch - secs as f64) * 1_000_000.0).round() as u32;
    let micros = micros.min(999_999);

    DateTime::from_timestamp(secs, micros * 1_000)
        .map_or_else(|| epoch.to_string(), |instant| {
            instant.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_token() -> Token {
        Token {
            token: "the-token-id".to_string(),
            auth_id: "the-auth-id".to_string(),
            xivo_user_uuid: Some("the-user-uuid".to_string()),
            xivo_uuid: Some("the-xivo-uuid".to_string()),
            issued_t: 1_480_011_471.535_37,
            expire_t: Some(1_480_011_513.535_37),
            acls: vec!["confd".to_string()],
        }
    }

    #[test]
    fn to_stored_uses_the_durable_field_names() {
        let stored = new_token().to_stored();

        let value = serde_json::to_value(&stored).expect("stored token json");
        assert_eq!(value["token"], "the-token-id");
        assert_eq!(value["auth_id"], "the-auth-id");
        assert_eq!(value["xivo_uuid"], "the-xivo-uuid");
        assert_eq!(value["xivo_user_uuid"], "the-user-uuid");
        assert_eq!(value["utc_issued_at"], "2016-11-24T18:17:51.535370");
        assert_eq!(value["utc_expires_at"], "2016-11-24T18:18:33.535370");
        assert_eq!(value["acls"], serde_json::json!(["confd"]));
    }

    #[test]
    fn stored_round_trip_preserves_the_token() {
        let token = new_token();

        let stored = token.to_stored();
        let raw = serde_json::to_vec(&stored).expect("serialize");
        let parsed: StoredToken = serde_json::from_slice(&raw).expect("deserialize");

        assert_eq!(Token::from(parsed), token);
    }

    #[test]
    fn expires_at_is_absent_when_the_token_never_expires() {
        let mut token = new_token();
        token.expire_t = None;

        let value = serde_json::to_value(token.to_stored()).expect("stored token json");
        assert!(value.get("expires_at").is_none());
        assert!(value.get("utc_expires_at").is_none());
    }

    #[test]
    fn is_expired_when_time_is_in_the_future() {
        let mut token = new_token();
        token.expire_t = Some(now() + 60.0);

        assert!(!token.is_expired());
    }

    #[test]
    fn is_expired_when_time_is_in_the_past() {
        let mut token = new_token();
        token.expire_t = Some(now() - 60.0);

        assert!(token.is_expired());
    }

    #[test]
    fn is_expired_when_no_expiration() {
        let mut token = new_token();
        token.expire_t = None;

        assert!(!token.is_expired());
    }

    #[test]
    fn matches_required_acl_with_multiple_acls() {
        let mut token = new_token();
        token.acls = vec![
            "foo".to_string(),
            "foo.bar.toto".to_string(),
            "other.#".to_string(),
        ];

        assert!(token.matches_required_acl("foo"));
        assert!(!token.matches_required_acl("foo.bar"));
        assert!(token.matches_required_acl("foo.bar.toto"));
        assert!(!token.matches_required_acl("foo.bar.toto.tata"));
        assert!(token.matches_required_acl("other.bar.toto"));
    }

    #[test]
    fn matches_required_acl_uses_the_auth_id_for_me() {
        let mut token = new_token();
        token.auth_id = "123".to_string();
        token.acls = vec!["foo.#.me".to_string()];

        assert!(token.matches_required_acl("foo.bar.123"));
        assert!(token.matches_required_acl("foo.bar.me"));
        assert!(!token.matches_required_acl("foo.bar.456"));
    }
}
