//! Client configuration.

use crate::error::{CatalogError, CatalogResult};
use crate::secure_string::{basic_authorization_header, encode_basic_auth, SecureString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Configuration for a catalog client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Client name, used in logs.
    #[serde(default = "default_name")]
    pub name: String,
    /// Base URL of the catalog host, e.g. `https://infosvr.example.com:9446`.
    pub base_url: String,
    /// Authentication used until the server hands out a session cookie.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Whether to verify TLS certificates.
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    /// Additional headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Optional client-side request throttling.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

fn default_name() -> String {
    "catalog".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl ClientConfig {
    /// Creates a configuration with basic credentials and defaults elsewhere.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: SecureString,
    ) -> Self {
        Self {
            name: default_name(),
            base_url: base_url.into(),
            auth: AuthConfig::Basic {
                username: username.into(),
                password,
            },
            timeout_secs: default_timeout(),
            verify_tls: true,
            headers: HashMap::new(),
            rate_limit: None,
        }
    }

    /// Checks the configuration before any request is made.
    pub fn validate(&self) -> CatalogResult<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(CatalogError::Config("base_url cannot be empty".to_string()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(CatalogError::Config(format!(
                "base_url '{}' must start with http:// or https://",
                base
            )));
        }
        if self.timeout_secs == 0 {
            return Err(CatalogError::Config(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        if let Some(rate_limit) = &self.rate_limit {
            rate_limit.validate()?;
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn normalized_base_url(&self) -> String {
        self.base_url.trim().trim_end_matches('/').to_string()
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No credentials; only useful against a server that already trusts the caller.
    #[default]
    None,
    /// Username and password, encoded on use.
    Basic {
        username: String,
        password: SecureString,
    },
    /// An already base64-encoded `username:password` token.
    Encoded { token: SecureString },
}

impl AuthConfig {
    /// Returns the `Authorization` header value, if any credentials are configured.
    pub fn authorization_header(&self) -> Option<SecureString> {
        match self {
            AuthConfig::None => None,
            AuthConfig::Basic { username, password } => Some(basic_authorization_header(
                &encode_basic_auth(username, password),
            )),
            AuthConfig::Encoded { token } => Some(basic_authorization_header(token)),
        }
    }
}

/// Client-side rate limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per period.
    pub max_requests: u32,
    /// Period length in seconds.
    pub period_secs: u64,
    /// Maximum burst size.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            period_secs: 60,
            burst_size: 10,
        }
    }
}

impl RateLimitConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    fn validate(&self) -> CatalogResult<()> {
        if self.max_requests == 0 || self.period_secs == 0 {
            return Err(CatalogError::Config(
                "rate_limit requires non-zero max_requests and period_secs".to_string(),
            ));
        }
        Ok(())
    }
}
