//! Helpers for testing code built on the catalog client.

use crate::client::{CatalogClient, ASSET_PATH, SEARCH_PATH};
use crate::config::{AuthConfig, ClientConfig};
use crate::error::{CatalogError, CatalogResult};
use crate::mock::{MockResponse, MockTransport};
use crate::secure_string::SecureString;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Base URL used by the helpers below.
pub const TEST_BASE_URL: &str = "https://infosvr.example.com:9446";

/// Creates a test client config with basic credentials.
pub fn test_client_config(base_url: &str) -> ClientConfig {
    ClientConfig {
        name: "test".to_string(),
        base_url: base_url.to_string(),
        auth: AuthConfig::Basic {
            username: "isadmin".to_string(),
            password: SecureString::from("isadmin"),
        },
        timeout_secs: 30,
        verify_tls: true,
        headers: HashMap::new(),
        rate_limit: None,
    }
}

pub fn search_url() -> String {
    format!("{}{}", TEST_BASE_URL, SEARCH_PATH)
}

pub fn asset_url(id: &str) -> String {
    format!("{}{}/{}", TEST_BASE_URL, ASSET_PATH, id)
}

/// A minimal `{_id, _type, _name, _url}` payload.
pub fn reference_json(id: &str, asset_type: &str, name: &str) -> Value {
    json!({
        "_id": id,
        "_type": asset_type,
        "_name": name,
        "_url": asset_url(id)
    })
}

/// An `{items, paging}` page.
pub fn page_json(
    items: Vec<Value>,
    num_total: u64,
    begin: u64,
    end: u64,
    next: Option<&str>,
) -> Value {
    let mut paging = json!({
        "numTotal": num_total,
        "pageSize": end.saturating_sub(begin),
        "begin": begin,
        "end": end
    });
    if let Some(next) = next {
        paging["next"] = json!(next);
    }
    json!({"items": items, "paging": paging})
}

/// Scripts the connect-time probe and connects a client through `mock`.
///
/// `drafts` is the probe's `numTotal`; anything above zero enables the workflow.
pub async fn connect_mock_client(
    mock: Arc<MockTransport>,
    drafts: u64,
) -> CatalogResult<CatalogClient> {
    mock.on_post(
        &search_url(),
        MockResponse::json(page_json(Vec::new(), drafts, 0, 0, None)),
    )
    .await;
    CatalogClient::connect_with_transport(test_client_config(TEST_BASE_URL), mock).await
}

/// Asserts that a result is a decode error.
pub fn assert_decode_error<T: std::fmt::Debug>(result: &CatalogResult<T>) {
    match result {
        Err(CatalogError::Decode { .. }) => {}
        other => panic!("Expected Decode error, got {:?}", other),
    }
}

/// Asserts that a drain was aborted after `pages` merged pages.
pub fn assert_drain_aborted<T: std::fmt::Debug>(result: &CatalogResult<T>, pages: usize) {
    match result {
        Err(CatalogError::DrainAborted { pages_merged, .. }) => assert_eq!(*pages_merged, pages),
        other => panic!("Expected DrainAborted, got {:?}", other),
    }
}
