//! # xivo-auth (Authentication & Token Authority)
//!
//! `xivo-auth` authenticates principals against pluggable backends and hands
//! out bearer tokens carrying a set of granted ACL patterns.
//!
//! ## Tokens & ACLs
//!
//! - **Tokens** bind an identity (`auth_id`, optional user UUID) to a grant
//!   set and a validity window. They are immutable after creation; the only
//!   mutation is deletion, either by explicit revocation or when the
//!   expiration scheduler fires.
//! - **ACLs** are dot-segmented permission strings. Granted patterns may use
//!   `*` (exactly one segment), `#` (any number of segments) and `me` (the
//!   token's own `auth_id`). Every protected call is checked against the
//!   token's grant set with [`acl::matches`].
//!
//! ## Backends
//!
//! Credential verification and identity resolution are delegated to a
//! backend selected by name on each authentication request: a local
//! PostgreSQL table, an LDAP directory, an external web service, or a mock
//! used by the test suite. Backends are registered at startup from the
//! configuration; there is no runtime plugin discovery.
//!
//! ## Durability
//!
//! Tokens are persisted in the Consul key/value store under
//! `xivo/xivo-auth/tokens/<token_id>` so that any process sharing the store
//! can validate them. A deferred deletion task is armed for every token
//! with an expiration, and a periodic sweep removes records whose deadline
//! passed while the daemon was down.

pub mod acl;
pub mod api;
pub mod backends;
pub mod cli;
pub mod config;
pub mod consul;
pub mod errors;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
