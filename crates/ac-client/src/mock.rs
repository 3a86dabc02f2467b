//! Scripted transport for testing.

use crate::error::{CatalogError, CatalogResult};
use crate::transport::{Transport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A canned response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    body: String,
    cookies: Vec<String>,
}

impl MockResponse {
    /// A 200 response with a JSON body.
    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            cookies: Vec::new(),
        }
    }

    /// An empty response with the given status.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            cookies: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// Adds a `Set-Cookie` header.
    pub fn with_cookie(mut self, cookie: &str) -> Self {
        self.cookies.push(cookie.to_string());
        self
    }

    fn to_response(&self) -> TransportResponse {
        let mut headers = HeaderMap::new();
        for cookie in &self.cookies {
            if let Ok(value) = HeaderValue::try_from(cookie.as_str()) {
                headers.append(SET_COOKIE, value);
            }
        }
        TransportResponse {
            status: StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            headers,
            body: self.body.clone(),
        }
    }
}

#[derive(Debug, Clone)]
enum MockOutcome {
    Respond(MockResponse),
    Fail(CatalogError),
}

#[derive(Debug, Default)]
struct Route {
    queue: VecDeque<MockOutcome>,
    last: Option<MockOutcome>,
}

/// Transport that replays scripted outcomes per `(method, url)`.
///
/// Outcomes queued for a route are served in order; once the queue is empty
/// the last served outcome repeats. Unscripted routes answer 404. Every
/// request is recorded.
#[derive(Default)]
pub struct MockTransport {
    routes: Arc<RwLock<HashMap<(Method, String), Route>>>,
    requests: Arc<RwLock<Vec<TransportRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for `method url`.
    pub async fn on(&self, method: Method, url: &str, response: MockResponse) {
        self.push(method, url, MockOutcome::Respond(response)).await;
    }

    pub async fn on_get(&self, url: &str, response: MockResponse) {
        self.on(Method::GET, url, response).await;
    }

    pub async fn on_post(&self, url: &str, response: MockResponse) {
        self.on(Method::POST, url, response).await;
    }

    pub async fn on_put(&self, url: &str, response: MockResponse) {
        self.on(Method::PUT, url, response).await;
    }

    /// Queues a transport failure for `method url`.
    pub async fn fail(&self, method: Method, url: &str, error: CatalogError) {
        self.push(method, url, MockOutcome::Fail(error)).await;
    }

    async fn push(&self, method: Method, url: &str, outcome: MockOutcome) {
        self.routes
            .write()
            .await
            .entry((method, url.to_string()))
            .or_default()
            .queue
            .push_back(outcome);
    }

    /// All requests received so far.
    pub async fn requests(&self) -> Vec<TransportRequest> {
        self.requests.read().await.clone()
    }

    /// Number of requests received for `method url`.
    pub async fn request_count(&self, method: Method, url: &str) -> usize {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    pub async fn clear_requests(&self) {
        self.requests.write().await.clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: TransportRequest) -> CatalogResult<TransportResponse> {
        let key = (request.method.clone(), request.url.clone());
        self.requests.write().await.push(request);

        let outcome = {
            let mut routes = self.routes.write().await;
            routes.get_mut(&key).and_then(|route| match route.queue.pop_front() {
                Some(next) => {
                    route.last = Some(next.clone());
                    Some(next)
                }
                None => route.last.clone(),
            })
        };

        match outcome {
            Some(MockOutcome::Respond(response)) => Ok(response.to_response()),
            Some(MockOutcome::Fail(error)) => Err(error),
            None => Ok(MockResponse::status(404)
                .with_body("no route scripted")
                .to_response()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_outcomes_served_in_order_last_repeats() {
        let mock = MockTransport::new();
        mock.on_get("https://h/a", MockResponse::json(json!({"n": 1})))
            .await;
        mock.on_get("https://h/a", MockResponse::json(json!({"n": 2})))
            .await;

        let get = || TransportRequest::new(Method::GET, "https://h/a");
        assert_eq!(mock.execute(get()).await.unwrap().body, r#"{"n":1}"#);
        assert_eq!(mock.execute(get()).await.unwrap().body, r#"{"n":2}"#);
        assert_eq!(mock.execute(get()).await.unwrap().body, r#"{"n":2}"#);
        assert_eq!(mock.request_count(Method::GET, "https://h/a").await, 3);
    }

    #[tokio::test]
    async fn test_unscripted_route_is_not_found() {
        let mock = MockTransport::new();
        let response = mock
            .execute(TransportRequest::new(Method::POST, "https://h/missing"))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(mock.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_and_cookies() {
        let mock = MockTransport::new();
        mock.fail(
            Method::GET,
            "https://h/down",
            CatalogError::ConnectionFailed("refused".to_string()),
        )
        .await;
        mock.on_get(
            "https://h/login",
            MockResponse::json(json!({})).with_cookie("JSESSIONID=1; Path=/"),
        )
        .await;

        let err = mock
            .execute(TransportRequest::new(Method::GET, "https://h/down"))
            .await
            .unwrap_err();
        assert!(err.is_transport_failure());

        let response = mock
            .execute(TransportRequest::new(Method::GET, "https://h/login"))
            .await
            .unwrap();
        assert_eq!(response.set_cookies(), vec!["JSESSIONID=1; Path=/"]);
    }
}
