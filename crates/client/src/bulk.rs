//! Whole-collection fetches that follow `next` links, for exports.

use std::collections::HashSet;

use url::form_urlencoded;

use gudang_inventory::{MovementKind, StockMovement, StockRecord};

use crate::error::{ApiError, ClientError};
use crate::gateway::InventoryGateway;
use crate::resource::Resource;
use crate::wire::FromWire;

/// Collect every item reachable from `start` by following `next` links.
///
/// A `next` link that was already visited ends the walk with a decode error
/// instead of looping forever.
pub async fn fetch_all<T: FromWire>(
    gateway: &dyn InventoryGateway,
    start: &str,
) -> Result<Vec<T>, ClientError> {
    let mut all = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(start.to_string());

    while let Some(url) = next.take() {
        if !seen.insert(url.clone()) {
            return Err(ApiError::decode(format!("pagination loops back to {url}")).into());
        }
        let page = gateway.fetch_page_url(&url).await?.decode::<T>()?;
        all.extend(page.items);
        next = page.next;
    }

    tracing::debug!(start, pages = seen.len(), items = all.len(), "bulk fetch complete");
    Ok(all)
}

pub async fn fetch_all_stock(
    gateway: &dyn InventoryGateway,
) -> Result<Vec<StockRecord>, ClientError> {
    fetch_all(gateway, Resource::Stock.collection_path()).await
}

/// Every movement, optionally only those of one kind (`?tipe=OUT`).
pub async fn fetch_all_movements(
    gateway: &dyn InventoryGateway,
    kind: Option<MovementKind>,
) -> Result<Vec<StockMovement>, ClientError> {
    let path = Resource::Movement.collection_path();
    let start = match kind {
        Some(kind) => {
            let qs = form_urlencoded::Serializer::new(String::new())
                .append_pair("tipe", kind.as_str())
                .finish();
            format!("{path}?{qs}")
        }
        None => path.to_string(),
    };
    fetch_all(gateway, &start).await
}
