//! Draining paged collections.
//!
//! A [`ReferenceList`] carries one page plus the server's cursor.
//! [`drain_all`] walks the cursor until it is exhausted and returns the
//! whole collection with a synthetic full cursor.

use crate::client::ASSET_PATH;
use crate::error::{CatalogError, CatalogResult};
use crate::model::{PageState, Paging, ReferenceList};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Query parameter that keeps draft-workflow assets visible.
pub const WORKFLOW_MARKER: &str = "workflowMode=draft";

/// Where continuation pages come from.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches the raw JSON at an absolute URL.
    async fn fetch_raw(&self, url: &str) -> CatalogResult<Value>;

    /// Decodes an `{items, paging}` document fetched from `url`.
    fn decode_page(&self, page: &Value, url: &str) -> CatalogResult<ReferenceList>;

    /// Whether continuation URLs must carry [`WORKFLOW_MARKER`].
    fn workflow_draft_mode(&self) -> bool;
}

/// Appends the draft-workflow marker when enabled and not already present.
pub fn with_workflow_marker(url: &str, enabled: bool) -> String {
    if !enabled || url.contains(WORKFLOW_MARKER) {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, separator, WORKFLOW_MARKER)
}

/// Returns the relationship attribute addressed by a single-asset URL.
///
/// `.../assets/<id>/assigned_terms?pageSize=2&begin=2` yields `assigned_terms`;
/// search URLs and plain asset URLs yield `None`.
pub fn relationship_attribute(url: &str) -> Option<&str> {
    let path = url.split(|c: char| c == '?' || c == '#').next()?;
    let start = path.find(ASSET_PATH)? + ASSET_PATH.len();
    let rest = path[start..].strip_prefix('/')?;

    let mut segments = rest.split('/');
    segments.next().filter(|id| !id.is_empty())?;
    segments.next().filter(|attribute| !attribute.is_empty())
}

/// Fetches and decodes the page after `paging`, or `None` when exhausted.
pub async fn fetch_next_page<S>(source: &S, paging: &Paging) -> CatalogResult<Option<ReferenceList>>
where
    S: PageSource + ?Sized,
{
    match (paging.state(), paging.next.as_deref()) {
        (PageState::HasMore, Some(next)) => {
            let url = with_workflow_marker(next, source.workflow_draft_mode());
            fetch_page(source, &url).await.map(Some)
        }
        _ => Ok(None),
    }
}

/// Drains every remaining page of `collection`.
///
/// Items keep the server's global order. On success the cursor is replaced
/// by [`Paging::full`]; an exhausted input is returned as-is without fetching.
/// Any failure aborts with [`CatalogError::DrainAborted`].
///
/// An empty continuation page also ends the drain with a full cursor over the
/// items collected so far, even when the previous cursor reported a larger
/// `num_total`. A warning is logged in that case.
pub async fn drain_all<S>(source: &S, collection: ReferenceList) -> CatalogResult<ReferenceList>
where
    S: PageSource + ?Sized,
{
    if collection.paging.state() == PageState::Exhausted {
        return Ok(collection);
    }

    let ReferenceList { mut items, mut paging } = collection;
    let mut fetched = HashSet::new();
    let mut pages_merged = 0usize;

    while paging.state() == PageState::HasMore {
        let Some(next) = paging.next.as_deref() else {
            break;
        };
        let url = with_workflow_marker(next, source.workflow_draft_mode());

        if !fetched.insert(url.clone()) {
            let source_error = CatalogError::decode(&url, "next-page link repeats a fetched page");
            return Err(aborted(url, pages_merged, source_error));
        }

        let page = match fetch_page(source, &url).await {
            Ok(page) => page,
            Err(e) => return Err(aborted(url, pages_merged, e)),
        };

        if page.is_empty() {
            warn!(
                url = %url,
                num_total = paging.num_total,
                collected = items.len(),
                "Empty continuation page; treating collection as complete"
            );
            break;
        }

        pages_merged += 1;
        debug!(url = %url, page_items = page.len(), pages_merged, "Merged page");
        items.extend(page.items);
        paging = page.paging;
    }

    let total = items.len() as u64;
    Ok(ReferenceList::new(items, Paging::full(total)))
}

async fn fetch_page<S>(source: &S, url: &str) -> CatalogResult<ReferenceList>
where
    S: PageSource + ?Sized,
{
    let raw = source.fetch_raw(url).await?;
    match relationship_attribute(url) {
        Some(attribute) => {
            let page = raw.get(attribute).ok_or_else(|| {
                CatalogError::decode(url, format!("response has no '{}' collection", attribute))
            })?;
            source.decode_page(page, url)
        }
        None => source.decode_page(&raw, url),
    }
}

fn aborted(url: String, pages_merged: usize, source: CatalogError) -> CatalogError {
    warn!(url = %url, pages_merged, error = %source, "Drain aborted");
    CatalogError::DrainAborted {
        url,
        pages_merged,
        source: Box::new(source),
    }
}
