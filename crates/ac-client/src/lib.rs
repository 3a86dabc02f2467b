//! # ac-client
//!
//! Typed client for an asset catalog REST API.
//!
//! Payloads are decoded through a per-client [`TypeRegistry`] keyed on the
//! `_type` discriminator, searches are built from [`SearchQuery`] and
//! [`ConditionSet`] values, and paged collections are drained with
//! [`CatalogClient::drain_all`].
//!
//! ```no_run
//! use ac_client::{CatalogClient, ClientConfig, Condition, SearchQuery, SecureString};
//!
//! # async fn run() -> ac_client::CatalogResult<()> {
//! let config = ClientConfig::new(
//!     "https://infosvr.example.com:9446",
//!     "isadmin",
//!     SecureString::from("isadmin"),
//! );
//! let client = CatalogClient::connect(config).await?;
//!
//! let mut query = SearchQuery::with_condition("term", Condition::equals("name", "Customer"));
//! query.set_page_size(100);
//! let terms = client.search_all(&query).await?;
//! println!("{} terms", terms.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod mock;
pub mod model;
pub mod pagination;
pub mod search;
pub mod secure_string;
pub mod session;
pub mod testing;
pub mod transport;

pub use client::{CatalogClient, TypeSummary};
pub use config::{AuthConfig, ClientConfig, RateLimitConfig};
pub use error::{CatalogError, CatalogResult};
pub use mock::{MockResponse, MockTransport};
pub use model::{
    Asset, CatalogObject, ContextSlot, FieldKind, Identity, PageState, Paging, PropertyValue,
    Reference, ReferenceList, ShapeDescriptor, TypeRegistry,
};
pub use pagination::PageSource;
pub use search::{Condition, ConditionSet, JoinOperator, SearchQuery};
pub use secure_string::{encode_basic_auth, SecureString};
pub use transport::{HttpTransport, Transport, TransportRequest, TransportResponse};
