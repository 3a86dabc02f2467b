//! Catalog client facade.
//!
//! One [`CatalogClient`] is one logical session: it owns the transport, the
//! session cookie, the workflow flag and the type registry.

use crate::config::ClientConfig;
use crate::error::{CatalogError, CatalogResult};
use crate::model::{
    Asset, CatalogObject, Identity, Paging, ReferenceList, ShapeDescriptor, TypeRegistry,
};
use crate::pagination::{self, PageSource};
use crate::search::{Condition, SearchQuery};
use crate::session::Session;
use crate::transport::{HttpTransport, Transport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use tracing::{debug, info, instrument};

pub const TYPES_PATH: &str = "/ibm/iis/igc-rest/v1/types";
pub const ASSET_PATH: &str = "/ibm/iis/igc-rest/v1/assets";
pub const SEARCH_PATH: &str = "/ibm/iis/igc-rest/v1/search";
pub const LOGOUT_PATH: &str = "/ibm/iis/igc-rest/v1/logout";

/// Types probed at connect time to detect an enabled workflow.
const WORKFLOW_PROBE_TYPES: [&str; 4] = [
    "category",
    "term",
    "information_governance_policy",
    "information_governance_rule",
];

/// One entry of the types listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_name", default)]
    pub name: String,
    #[serde(rename = "_url", default)]
    pub url: String,
}

struct Endpoint {
    base_url: String,
    transport: Arc<dyn Transport>,
}

/// Client for the catalog REST API.
pub struct CatalogClient {
    name: String,
    endpoint: Option<Endpoint>,
    session: Session,
    registry: RwLock<TypeRegistry>,
}

impl CatalogClient {
    /// A client with no endpoint. It can decode payloads but every network
    /// operation fails with [`CatalogError::NotConnected`].
    pub fn inert() -> Self {
        Self {
            name: "catalog".to_string(),
            endpoint: None,
            session: Session::new(None),
            registry: RwLock::new(TypeRegistry::with_builtin_shapes()),
        }
    }

    /// Connects over HTTP and runs the bootstrap probe.
    pub async fn connect(config: ClientConfig) -> CatalogResult<Self> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::connect_with_transport(config, transport).await
    }

    /// Connects through the given transport and runs the bootstrap probe.
    ///
    /// The probe searches the glossary types with draft visibility; any hit
    /// means the workflow is enabled and continuation pages must ask for drafts.
    pub async fn connect_with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> CatalogResult<Self> {
        config.validate()?;
        let client = Self {
            name: config.name.clone(),
            endpoint: Some(Endpoint {
                base_url: config.normalized_base_url(),
                transport,
            }),
            session: Session::new(config.auth.authorization_header()),
            registry: RwLock::new(TypeRegistry::with_builtin_shapes()),
        };
        client.bootstrap().await?;
        Ok(client)
    }

    #[instrument(skip(self), fields(client = %self.name))]
    async fn bootstrap(&self) -> CatalogResult<()> {
        let mut probe = SearchQuery::new(WORKFLOW_PROBE_TYPES[0]);
        for asset_type in &WORKFLOW_PROBE_TYPES[1..] {
            probe.add_type(asset_type);
        }
        probe.set_page_size(1);
        probe.set_dev_glossary(true);

        let response = self.search_json(&probe).await?;
        let drafts = response
            .get("paging")
            .and_then(|p| p.get("numTotal"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        self.session.set_workflow_draft_mode(drafts > 0);

        info!(
            workflow_enabled = drafts > 0,
            session = self.session.has_session_cookie().await,
            "Connected to catalog"
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|e| e.base_url.as_str())
    }

    pub fn is_connected(&self) -> bool {
        self.endpoint.is_some()
    }

    /// True when the bootstrap probe found draft glossary assets.
    pub fn is_workflow_enabled(&self) -> bool {
        self.session.workflow_draft_mode()
    }

    /// True once the server has handed out a session cookie.
    pub async fn has_session(&self) -> bool {
        self.session.has_session_cookie().await
    }

    /// Registers or replaces a shape. Values decoded earlier are unaffected.
    pub fn register_shape(&self, shape: ShapeDescriptor) {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(shape);
    }

    /// Read access to the registry.
    pub fn registry(&self) -> RwLockReadGuard<'_, TypeRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decodes a payload through the registry.
    pub fn decode(&self, value: &Value) -> CatalogResult<CatalogObject> {
        self.registry().decode(value)
    }

    /// Raw types listing.
    #[instrument(skip(self), fields(client = %self.name))]
    pub async fn get_types(&self) -> CatalogResult<Value> {
        let url = self.url(TYPES_PATH)?;
        self.request(Method::GET, &url, None).await
    }

    /// Types listing as typed summaries.
    pub async fn list_types(&self) -> CatalogResult<Vec<TypeSummary>> {
        let types = self.get_types().await?;
        Vec::<TypeSummary>::deserialize(&types).map_err(|e| CatalogError::decode(TYPES_PATH, e))
    }

    #[instrument(skip(self), fields(client = %self.name))]
    pub async fn get_asset_json_by_id(&self, id: &str) -> CatalogResult<Value> {
        let url = self.asset_url(id)?;
        self.request(Method::GET, &url, None).await
    }

    /// Fetches an asset and decodes it through the registry.
    pub async fn get_asset_by_id(&self, id: &str) -> CatalogResult<CatalogObject> {
        let value = self.get_asset_json_by_id(id).await?;
        self.registry().decode_in(&value, &self.asset_url(id)?)
    }

    /// Fetches an asset and deserializes it into any serde type.
    pub async fn get_asset_as<T: DeserializeOwned>(&self, id: &str) -> CatalogResult<T> {
        let value = self.get_asset_json_by_id(id).await?;
        T::deserialize(&value).map_err(|e| CatalogError::decode(format!("asset {}", id), e))
    }

    /// Submits a search and returns the raw first page.
    #[instrument(skip(self, query), fields(client = %self.name, query = %query.describe()))]
    pub async fn search_json(&self, query: &SearchQuery) -> CatalogResult<Value> {
        let url = self.url(SEARCH_PATH)?;
        self.request(Method::POST, &url, Some(query.to_document()))
            .await
    }

    /// Submits a search and decodes the first page.
    pub async fn search(&self, query: &SearchQuery) -> CatalogResult<ReferenceList> {
        let page = self.search_json(query).await?;
        self.registry()
            .decode_list(&page, &format!("search {}", query.describe()))
    }

    /// Submits a search and drains every page.
    pub async fn search_all(&self, query: &SearchQuery) -> CatalogResult<ReferenceList> {
        let first = self.search(query).await?;
        self.drain_all(first).await
    }

    /// Applies `changes` to an asset; returns the server's echo of the update.
    #[instrument(skip(self, changes), fields(client = %self.name))]
    pub async fn update_asset(&self, id: &str, changes: &Value) -> CatalogResult<Value> {
        let url = self.asset_url(id)?;
        self.request(Method::PUT, &url, Some(changes.clone())).await
    }

    /// Fetches the single page after `paging`, or `None` if it is exhausted.
    pub async fn next_page(&self, paging: &Paging) -> CatalogResult<Option<ReferenceList>> {
        pagination::fetch_next_page(self, paging).await
    }

    /// Drains every remaining page of a collection.
    pub async fn drain_all(&self, collection: ReferenceList) -> CatalogResult<ReferenceList> {
        pagination::drain_all(self, collection).await
    }

    /// Fetches an asset and drains every relationship collection it carries.
    ///
    /// Unregistered types decode to a bare reference, which is returned as-is.
    #[instrument(skip(self), fields(client = %self.name))]
    pub async fn get_full_asset_details(&self, id: &str) -> CatalogResult<CatalogObject> {
        let mut object = self.get_asset_by_id(id).await?;
        if let Some(asset) = object.as_asset_mut() {
            for name in asset.relationship_names() {
                let Some(list) = asset.take_relationship(&name) else {
                    continue;
                };
                let drained = self.drain_all(list).await?;
                debug!(relationship = %name, items = drained.len(), "Relationship drained");
                asset.set_relationship(&name, drained);
            }
        }
        Ok(object)
    }

    /// Looks an asset up by id with an explicit property projection.
    ///
    /// `Ok(None)` when nothing matches; several matches are
    /// [`CatalogError::UnexpectedMultiMatch`].
    #[instrument(skip(self, properties), fields(client = %self.name))]
    pub async fn get_asset_with_properties(
        &self,
        asset_type: &str,
        id: &str,
        properties: &[&str],
    ) -> CatalogResult<Option<CatalogObject>> {
        let mut query = SearchQuery::with_properties(
            asset_type,
            properties,
            Condition::equals("_id", id).into(),
        );
        query.set_page_size(2);
        let description = query.describe();

        let response = self.search_json(&query).await?;
        match at_most_one(&response, &description)? {
            Some(item) => self.registry().decode_in(item, &description).map(Some),
            None => Ok(None),
        }
    }

    /// Fills in an asset's `name` and ancestry chain by looking it up by id.
    ///
    /// Returns `Ok(false)` when the context was already resolved and nothing
    /// was fetched. Only `name` and the context are changed.
    #[instrument(skip(self, asset), fields(client = %self.name, id = %asset.id()))]
    pub async fn populate_context(&self, asset: &mut Asset) -> CatalogResult<bool> {
        if asset.context_slot().is_resolved() {
            return Ok(false);
        }

        let mut query =
            SearchQuery::with_condition(asset.asset_type(), Condition::equals("_id", asset.id()));
        query.set_page_size(2);
        let description = query.describe();

        let response = self.search_json(&query).await?;
        let matched = at_most_one(&response, &description)?
            .ok_or_else(|| CatalogError::NoMatch(description.clone()))?;

        let matched = self.registry().decode_asset(matched, &description)?;
        let chain = matched.context().map(<[_]>::to_vec).unwrap_or_default();
        asset.resolve_context(matched.display_name().to_string(), chain);
        Ok(true)
    }

    /// The asset's identity, populating its context first if needed.
    pub async fn identity_of(&self, asset: &mut Asset) -> CatalogResult<Identity> {
        if let Some(identity) = asset.cached_identity() {
            return Ok(identity.clone());
        }
        self.populate_context(asset).await?;
        asset.identity().ok_or_else(|| {
            CatalogError::decode(
                format!("asset {}", asset.id()),
                "context still unresolved after lookup",
            )
        })
    }

    /// Invalidates the session on the server. The held cookie is kept.
    #[instrument(skip(self), fields(client = %self.name))]
    pub async fn logout(&self) -> CatalogResult<()> {
        let url = self.url(LOGOUT_PATH)?;
        self.request(Method::GET, &url, None).await?;
        info!("Logged out");
        Ok(())
    }

    fn endpoint(&self) -> CatalogResult<&Endpoint> {
        self.endpoint.as_ref().ok_or(CatalogError::NotConnected)
    }

    fn url(&self, path: &str) -> CatalogResult<String> {
        Ok(format!("{}{}", self.endpoint()?.base_url, path))
    }

    fn asset_url(&self, id: &str) -> CatalogResult<String> {
        Ok(format!(
            "{}{}/{}",
            self.endpoint()?.base_url,
            ASSET_PATH,
            urlencoding::encode(id)
        ))
    }

    async fn request(&self, method: Method, url: &str, body: Option<Value>) -> CatalogResult<Value> {
        let endpoint = self.endpoint()?;
        let mut request = TransportRequest::new(method, url);
        if let Some(body) = body {
            request = request.with_body(body);
        }

        let response = self
            .session
            .exchange(endpoint.transport.as_ref(), request)
            .await?;
        check_status(&response, url)?;

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        response.json(url)
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("name", &self.name)
            .field("base_url", &self.base_url())
            .field("session", &self.session)
            .finish()
    }
}

#[async_trait]
impl PageSource for CatalogClient {
    async fn fetch_raw(&self, url: &str) -> CatalogResult<Value> {
        self.request(Method::GET, url, None).await
    }

    fn decode_page(&self, page: &Value, url: &str) -> CatalogResult<ReferenceList> {
        self.registry().decode_list(page, url)
    }

    fn workflow_draft_mode(&self) -> bool {
        self.session.workflow_draft_mode()
    }
}

/// The only item of a search page, for lookups expecting at most one asset.
fn at_most_one<'a>(response: &'a Value, description: &str) -> CatalogResult<Option<&'a Value>> {
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| CatalogError::decode(description, "missing 'items' array"))?;

    match items.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(only)),
        several => {
            let count = response
                .get("paging")
                .and_then(|p| p.get("numTotal"))
                .and_then(Value::as_u64)
                .unwrap_or(several.len() as u64);
            Err(CatalogError::UnexpectedMultiMatch {
                query: description.to_string(),
                count,
            })
        }
    }
}

fn check_status(response: &TransportResponse, url: &str) -> CatalogResult<()> {
    let status = response.status;
    if status.is_success() {
        return Ok(());
    }
    Err(match status {
        StatusCode::UNAUTHORIZED => {
            CatalogError::AuthenticationFailed(format!("Unauthorized: {}", url))
        }
        StatusCode::FORBIDDEN => CatalogError::AuthorizationDenied(format!("Forbidden: {}", url)),
        StatusCode::NOT_FOUND => CatalogError::NotFound(url.to_string()),
        other => CatalogError::RequestFailed {
            status: other.as_u16(),
            message: response.body.chars().take(500).collect(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::reference_json;
    use reqwest::header::HeaderMap;
    use serde_json::json;

    fn response(status: u16, body: &str) -> TransportResponse {
        TransportResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert!(check_status(&response(200, ""), "u").is_ok());
        assert!(matches!(
            check_status(&response(401, ""), "u"),
            Err(CatalogError::AuthenticationFailed(_))
        ));
        assert!(matches!(
            check_status(&response(403, ""), "u"),
            Err(CatalogError::AuthorizationDenied(_))
        ));
        assert!(matches!(
            check_status(&response(404, ""), "u"),
            Err(CatalogError::NotFound(_))
        ));
        match check_status(&response(500, "boom"), "u") {
            Err(CatalogError::RequestFailed { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("Expected RequestFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_at_most_one_match() {
        let none = json!({"items": [], "paging": {"numTotal": 0}});
        assert!(at_most_one(&none, "q").unwrap().is_none());

        let one = json!({"items": [reference_json("t1", "term", "A")], "paging": {"numTotal": 1}});
        assert_eq!(at_most_one(&one, "q").unwrap().unwrap()["_id"], "t1");

        let several = json!({
            "items": [reference_json("t1", "term", "A"), reference_json("t1", "term", "B")],
            "paging": {"numTotal": 3}
        });
        match at_most_one(&several, "q") {
            Err(CatalogError::UnexpectedMultiMatch { query, count }) => {
                assert_eq!(query, "q");
                assert_eq!(count, 3);
            }
            other => panic!("Expected UnexpectedMultiMatch, got {:?}", other),
        }

        assert!(matches!(
            at_most_one(&json!({"paging": {"numTotal": 0}}), "q"),
            Err(CatalogError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_inert_client_decodes_but_cannot_fetch() {
        let client = CatalogClient::inert();
        assert!(!client.is_connected());
        assert!(!client.is_workflow_enabled());

        let decoded = client
            .decode(&reference_json("t1", "term", "Customer"))
            .unwrap();
        assert!(decoded.is_asset());

        assert!(matches!(
            client.get_asset_by_id("t1").await,
            Err(CatalogError::NotConnected)
        ));
        assert!(matches!(
            client.search(&SearchQuery::new("term")).await,
            Err(CatalogError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_populate_context_skips_resolved_assets() {
        let client = CatalogClient::inert();
        let mut payload = reference_json("c1", "category", "Finance");
        payload["name"] = json!("Finance");
        payload["_context"] = json!([]);
        let mut asset = client.decode(&payload).unwrap().into_asset();

        // no endpoint, so any lookup would fail
        assert!(!client.populate_context(&mut asset).await.unwrap());
        assert_eq!(
            client.identity_of(&mut asset).await.unwrap().as_str(),
            "(category)=Finance"
        );
    }

    #[test]
    fn test_register_shape_on_shared_client() {
        let client = CatalogClient::inert();
        client.register_shape(
            ShapeDescriptor::main_object("database_column").with_property("data_type"),
        );
        assert!(client.registry().is_registered("database_column"));

        let decoded = client
            .decode(&reference_json("d1", "database_column", "SALARY"))
            .unwrap();
        assert!(decoded.is_asset());
    }

    #[test]
    fn test_type_summary_parses() {
        let types: Vec<TypeSummary> = serde_json::from_value(json!([
            {"_id": "term", "_name": "Term", "_url": "https://infosvr/ibm/iis/igc-rest/v1/types/term"},
            {"_id": "category"}
        ]))
        .unwrap();
        assert_eq!(types[0].name, "Term");
        assert_eq!(types[1].id, "category");
    }
}
