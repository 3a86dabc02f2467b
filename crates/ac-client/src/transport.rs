//! HTTP transport for the catalog client.
//!
//! The [`Transport`] trait is the boundary between the client and the wire.
//! [`HttpTransport`] sends requests with reqwest; tests substitute
//! [`crate::mock::MockTransport`].

use crate::config::ClientConfig;
use crate::error::{CatalogError, CatalogResult};
use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

type RateLimiterType = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// A fully prepared request: absolute URL, headers and optional JSON body.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl TransportRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns a header value as text, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A raw response. Status handling is left to the caller.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TransportResponse {
    /// All `Set-Cookie` values, in the order received.
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// Parses the body as JSON.
    pub fn json(&self, context: &str) -> CatalogResult<Value> {
        serde_json::from_str(&self.body).map_err(|e| {
            CatalogError::decode(
                context,
                format!(
                    "invalid JSON (status {}): {} - Body: {}",
                    self.status,
                    e,
                    self.body.chars().take(500).collect::<String>()
                ),
            )
        })
    }
}

/// Sends one request and returns the raw response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> CatalogResult<TransportResponse>;
}

/// reqwest-backed transport with optional rate limiting. Requests are sent once; there are no retries.
pub struct HttpTransport {
    client: Client,
    rate_limiter: Option<Arc<RateLimiterType>>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> CatalogResult<Self> {
        let verify_tls = effective_verify_tls(config);

        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            match (
                HeaderName::try_from(key.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                (Ok(name), Ok(val)) => {
                    headers.insert(name, val);
                }
                _ => warn!(header = %key, "Skipping invalid default header"),
            }
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!verify_tls)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .default_headers(headers)
            .build()
            .map_err(|e| CatalogError::Config(e.to_string()))?;

        let rate_limiter = match &config.rate_limit {
            Some(rl) => {
                let max_requests = rl.max_requests.max(1);
                let quota = Quota::with_period(rl.period() / max_requests)
                    .ok_or_else(|| CatalogError::Config("Invalid rate limit period".to_string()))?
                    .allow_burst(NonZeroU32::new(rl.burst_size).unwrap_or(NonZeroU32::MIN));
                Some(Arc::new(GovernorRateLimiter::direct(quota)))
            }
            None => None,
        };

        Ok(Self {
            client,
            rate_limiter,
        })
    }

    pub fn is_rate_limited(&self) -> bool {
        self.rate_limiter.is_some()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: TransportRequest) -> CatalogResult<TransportResponse> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        debug!(method = %request.method, url = %request.url, "Sending request");

        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                CatalogError::Timeout(e.to_string())
            } else if e.is_connect() {
                CatalogError::ConnectionFailed(e.to_string())
            } else {
                CatalogError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        debug!(status = %status, bytes = body.len(), "Received response");

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// TLS verification can only be switched off in debug builds.
fn effective_verify_tls(config: &ClientConfig) -> bool {
    if config.verify_tls {
        return true;
    }

    #[cfg(debug_assertions)]
    {
        warn!(
            base_url = %config.base_url,
            client_name = %config.name,
            "TLS certificate verification DISABLED in development mode - connection is vulnerable to MITM attacks"
        );
        false
    }
    #[cfg(not(debug_assertions))]
    {
        warn!(
            base_url = %config.base_url,
            client_name = %config.name,
            "Attempted to disable TLS verification in production - request IGNORED"
        );
        true
    }
}
