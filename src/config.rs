//! Runtime configuration.
//!
//! Everything is read once at startup from CLI flags and environment
//! variables and validated into this struct; a missing requirement aborts
//! the daemon with the full list of offending fields instead of failing
//! later on a lookup.

use anyhow::{anyhow, Result};
use clap::ArgMatches;
use secrecy::SecretString;
use std::time::Duration;

pub const TWO_HOURS: u64 = 60 * 60 * 2;
pub const DEFAULT_CONSUL_TIMEOUT: u64 = 4;

const KNOWN_BACKENDS: &[&str] = &["mock", "xivo_user", "ldap_user", "xivo_ws"];

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_port: u16,
    pub consul: ConsulConfig,
    pub default_token_lifetime: u64,
    pub enabled_backends: Vec<String>,
    pub cors_enabled: bool,
    pub xivo_uuid: Option<String>,
    pub db_dsn: Option<String>,
    pub ldap: Option<LdapConfig>,
    pub ws: Option<WsConfig>,
}

#[derive(Debug, Clone)]
pub struct ConsulConfig {
    pub url: String,
    pub token: Option<SecretString>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LdapConfig {
    pub uri: String,
    pub user_base_dn: String,
    pub timeout: Duration,
}

impl LdapConfig {
    #[must_use]
    pub fn bind_dn(&self, login: &str) -> String {
        format!("uid={login},{}", self.user_base_dn)
    }
}

#[derive(Debug, Clone)]
pub struct WsConfig {
    pub url: String,
    pub timeout: Duration,
}

impl Config {
    /// Build and validate the configuration from parsed CLI matches.
    ///
    /// # Errors
    /// Returns an error naming every missing or unusable field at once.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let ldap = match (
            matches.get_one::<String>("ldap-uri"),
            matches.get_one::<String>("ldap-user-base-dn"),
        ) {
            (Some(uri), Some(base_dn)) => Some(LdapConfig {
                uri: uri.to_string(),
                user_base_dn: base_dn.to_string(),
                timeout: Duration::from_secs(2),
            }),
            _ => None,
        };

        let ws = matches.get_one::<String>("ws-url").map(|url| WsConfig {
            url: url.to_string(),
            timeout: Duration::from_secs(2),
        });

        let config = Self {
            listen_port: matches.get_one::<u16>("port").copied().unwrap_or(9497),
            consul: ConsulConfig {
                url: matches
                    .get_one::<String>("consul-url")
                    .map_or_else(|| "http://127.0.0.1:8500".to_string(), ToString::to_string),
                token: matches
                    .get_one::<String>("consul-token")
                    .map(|token| SecretString::from(token.to_string())),
                timeout: Duration::from_secs(
                    matches
                        .get_one::<u64>("consul-timeout")
                        .copied()
                        .unwrap_or(DEFAULT_CONSUL_TIMEOUT),
                ),
            },
            default_token_lifetime: matches
                .get_one::<u64>("token-lifetime")
                .copied()
                .unwrap_or(TWO_HOURS),
            enabled_backends: matches
                .get_many::<String>("backends")
                .map_or_else(Vec::new, |names| names.cloned().collect()),
            cors_enabled: matches.get_flag("cors"),
            xivo_uuid: matches.get_one::<String>("xivo-uuid").cloned(),
            db_dsn: matches.get_one::<String>("db-dsn").cloned(),
            ldap,
            ws,
        };

        config.validate()?;

        Ok(config)
    }

    /// Check every enabled backend has its configuration section.
    ///
    /// # Errors
    /// Returns one error enumerating everything missing.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();

        for name in &self.enabled_backends {
            match name.as_str() {
                "mock" => {}
                "xivo_user" => {
                    if self.db_dsn.is_none() {
                        missing.push("db-dsn (required by backend xivo_user)");
                    }
                }
                "ldap_user" => {
                    if self.ldap.is_none() {
                        missing.push("ldap-uri and ldap-user-base-dn (required by backend ldap_user)");
                    }
                }
                "xivo_ws" => {
                    if self.ws.is_none() {
                        missing.push("ws-url (required by backend xivo_ws)");
                    }
                }
                _ => {}
            }
        }

        let unknown: Vec<&str> = self
            .enabled_backends
            .iter()
            .filter(|name| !KNOWN_BACKENDS.contains(&name.as_str()))
            .map(String::as_str)
            .collect();

        if !unknown.is_empty() {
            return Err(anyhow!("unknown backends: {}", unknown.join(", ")));
        }

        if self.default_token_lifetime == 0 {
            missing.push("token-lifetime (must be positive)");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(anyhow!(
                "Missing configuration to start the application: {}",
                missing.join(", ")
            ))
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            listen_port: 9497,
            consul: ConsulConfig {
                url: "http://127.0.0.1:8500".to_string(),
                token: None,
                timeout: Duration::from_secs(DEFAULT_CONSUL_TIMEOUT),
            },
            default_token_lifetime: TWO_HOURS,
            enabled_backends: vec!["mock".to_string()],
            cors_enabled: false,
            xivo_uuid: Some("the-xivo-uuid".to_string()),
            db_dsn: None,
            ldap: None,
            ws: None,
        }
    }
}
