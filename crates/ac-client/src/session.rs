//! Session state shared by every request of one client.

use crate::error::{CatalogError, CatalogResult};
use crate::secure_string::SecureString;
use crate::transport::{Transport, TransportRequest, TransportResponse};
use reqwest::header::{HeaderValue, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, COOKIE};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// Credentials, the server-issued session cookie and the workflow flag.
///
/// The cookie lock is held for the whole exchange so that concurrent callers
/// see request/response pairs in a consistent order and never send a cookie
/// that is about to be replaced.
pub struct Session {
    authorization: Option<SecureString>,
    cookie: Mutex<Option<String>>,
    workflow_draft_mode: AtomicBool,
}

impl Session {
    /// `authorization` is the full `Basic ...` header value, if any.
    pub fn new(authorization: Option<SecureString>) -> Self {
        Self {
            authorization,
            cookie: Mutex::new(None),
            workflow_draft_mode: AtomicBool::new(false),
        }
    }

    /// Sends a request with session headers and records any new session cookie.
    ///
    /// The cookie is sent when held, otherwise basic credentials. Cookies are
    /// only taken from successful responses, and replace the held value.
    pub async fn exchange(
        &self,
        transport: &dyn Transport,
        mut request: TransportRequest,
    ) -> CatalogResult<TransportResponse> {
        let mut cookie = self.cookie.lock().await;

        request
            .headers
            .insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(value) = cookie.as_deref() {
            let value = HeaderValue::try_from(value)
                .map_err(|e| CatalogError::Config(format!("invalid session cookie: {}", e)))?;
            request.headers.insert(COOKIE, value);
        } else if let Some(authorization) = &self.authorization {
            let mut value = HeaderValue::try_from(authorization.expose_secret())
                .map_err(|_| CatalogError::Config("invalid credentials header".to_string()))?;
            value.set_sensitive(true);
            request.headers.insert(AUTHORIZATION, value);
        }

        let response = transport.execute(request).await?;

        if response.status.is_success() {
            let pairs: Vec<String> = response
                .set_cookies()
                .iter()
                .filter_map(|c| c.split(';').next())
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            if !pairs.is_empty() {
                debug!(count = pairs.len(), "Session cookie replaced");
                *cookie = Some(pairs.join("; "));
            }
        }

        Ok(response)
    }

    pub async fn has_session_cookie(&self) -> bool {
        self.cookie.lock().await.is_some()
    }

    pub fn workflow_draft_mode(&self) -> bool {
        self.workflow_draft_mode.load(Ordering::Relaxed)
    }

    pub fn set_workflow_draft_mode(&self, on: bool) {
        self.workflow_draft_mode.store(on, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authorization", &self.authorization.as_ref().map(|_| "[REDACTED]"))
            .field("workflow_draft_mode", &self.workflow_draft_mode())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockResponse, MockTransport};
    use reqwest::Method;
    use serde_json::json;

    const URL: &str = "https://infosvr/ibm/iis/igc-rest/v1/types";

    fn session() -> Session {
        Session::new(Some(SecureString::from("Basic aXNhZG1pbjppc2FkbWlu")))
    }

    #[tokio::test]
    async fn test_credentials_until_cookie_then_cookie() {
        let mock = MockTransport::new();
        mock.on_get(
            URL,
            MockResponse::json(json!([]))
                .with_cookie("JSESSIONID=abc; Path=/; Secure")
                .with_cookie("LtpaToken2=xyz; HttpOnly"),
        )
        .await;

        let session = session();
        session
            .exchange(&mock, TransportRequest::new(Method::GET, URL))
            .await
            .unwrap();
        assert!(session.has_session_cookie().await);
        session
            .exchange(&mock, TransportRequest::new(Method::GET, URL))
            .await
            .unwrap();

        let requests = mock.requests().await;
        assert_eq!(
            requests[0].header("Authorization"),
            Some("Basic aXNhZG1pbjppc2FkbWlu")
        );
        assert_eq!(requests[0].header("Cookie"), None);
        assert_eq!(requests[0].header("Cache-Control"), Some("no-cache"));
        assert_eq!(requests[0].header("Content-Type"), Some("application/json"));

        assert_eq!(requests[1].header("Cookie"), Some("JSESSIONID=abc; LtpaToken2=xyz"));
        assert_eq!(requests[1].header("Authorization"), None);
    }

    #[tokio::test]
    async fn test_cookie_ignored_on_failure() {
        let mock = MockTransport::new();
        mock.on_get(URL, MockResponse::status(500).with_cookie("JSESSIONID=bad"))
            .await;

        let session = session();
        session
            .exchange(&mock, TransportRequest::new(Method::GET, URL))
            .await
            .unwrap();
        assert!(!session.has_session_cookie().await);
    }

    #[tokio::test]
    async fn test_newer_cookie_replaces_held_cookie() {
        let mock = MockTransport::new();
        mock.on_get(URL, MockResponse::json(json!([])).with_cookie("JSESSIONID=one"))
            .await;
        mock.on_get(URL, MockResponse::json(json!([])).with_cookie("JSESSIONID=two"))
            .await;

        let session = session();
        for _ in 0..3 {
            session
                .exchange(&mock, TransportRequest::new(Method::GET, URL))
                .await
                .unwrap();
        }

        let requests = mock.requests().await;
        assert_eq!(requests[1].header("Cookie"), Some("JSESSIONID=one"));
        assert_eq!(requests[2].header("Cookie"), Some("JSESSIONID=two"));
    }

    #[test]
    fn test_workflow_flag() {
        let session = Session::new(None);
        assert!(!session.workflow_draft_mode());
        session.set_workflow_draft_mode(true);
        assert!(session.workflow_draft_mode());
        assert!(!format!("{:?}", session).contains("Basic"));
    }
}
