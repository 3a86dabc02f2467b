//! Minimal references, paging cursors and reference collections.

use super::CatalogObject;
use serde::{Deserialize, Deserializer, Serialize};

/// Minimal handle to any catalog asset.
///
/// Several `Reference` values may describe the same asset; nothing is interned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_id")]
    pub id: String,
    /// Discriminator naming the asset type.
    #[serde(rename = "_type")]
    pub asset_type: String,
    #[serde(rename = "_name", default)]
    pub name: String,
    #[serde(rename = "_url", default)]
    pub url: String,
}

impl Reference {
    pub fn new(id: &str, asset_type: &str, name: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            asset_type: asset_type.to_string(),
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// Whether a cursor still points at unfetched pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    HasMore,
    Exhausted,
}

/// Server-issued paging cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    /// Total number of items across all pages.
    #[serde(deserialize_with = "non_negative")]
    pub num_total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    #[serde(default, deserialize_with = "non_negative")]
    pub page_size: u64,
    #[serde(default, deserialize_with = "non_negative")]
    pub begin: u64,
    /// End of the range covered so far. Empty collections report `-1`, read as 0.
    #[serde(default, deserialize_with = "non_negative")]
    pub end: u64,
}

fn non_negative<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = i64::deserialize(deserializer)?;
    Ok(value.max(0) as u64)
}

impl Paging {
    /// A cursor for a collection that is already complete: no next or previous page.
    pub fn full(num_total: u64) -> Self {
        Self {
            num_total,
            next: None,
            previous: None,
            page_size: num_total,
            begin: 0,
            end: num_total,
        }
    }

    /// True iff the server reports more items than the range covered so far.
    pub fn has_more(&self) -> bool {
        self.num_total > self.end
    }

    /// `HasMore` needs both an unreached total and a next-page link.
    pub fn state(&self) -> PageState {
        match &self.next {
            Some(next) if self.has_more() && !next.is_empty() => PageState::HasMore,
            _ => PageState::Exhausted,
        }
    }
}

/// One page of a relationship or search result, or a fully drained collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReferenceList {
    pub items: Vec<CatalogObject>,
    pub paging: Paging,
}

impl ReferenceList {
    pub fn new(items: Vec<CatalogObject>, paging: Paging) -> Self {
        Self { items, paging }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when the cursor says there are pages left to fetch.
    pub fn has_more_pages(&self) -> bool {
        self.paging.state() == PageState::HasMore
    }

    /// Iterates over the minimal reference of every item.
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.items.iter().map(CatalogObject::reference)
    }
}
