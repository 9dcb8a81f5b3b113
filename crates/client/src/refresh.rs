//! List loading: re-issue the active query, fall back a page when the
//! current one emptied out, and drop results that a newer load superseded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value as JsonValue;

use crate::error::{ApiError, ClientError};
use crate::gateway::InventoryGateway;
use crate::pagination::Pagination;
use crate::query::ListQuery;
use crate::resource::Resource;
use crate::wire::{FromWire, PageResult};

/// Hands out increasing generation numbers; only the latest one is current.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding every earlier ticket.
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    pub fn has_issued(&self) -> bool {
        self.latest.load(Ordering::SeqCst) > 0
    }
}

/// Result of one refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct Refreshed<T> {
    /// The query that produced `page`; differs from the input after a fallback.
    pub query: ListQuery,
    pub page: PageResult<T>,
    pub fell_back: bool,
}

impl<T> Refreshed<T> {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page.total_count, self.query.page())
    }
}

fn page_vanished(result: &Result<PageResult<JsonValue>, ApiError>) -> bool {
    match result {
        Ok(page) => page.is_empty(),
        // DRF answers "Invalid page." with 404 once a page no longer exists.
        Err(err) => err.status_code() == Some(404),
    }
}

/// Fetch `query` again. An empty page above the first is retried once on
/// the previous page, as happens after deleting the last row of a page.
pub async fn refresh<T: FromWire>(
    gateway: &dyn InventoryGateway,
    resource: Resource,
    query: &ListQuery,
) -> Result<Refreshed<T>, ClientError> {
    let first = gateway.list_page(resource, query).await;
    if query.page() <= 1 || !page_vanished(&first) {
        return Ok(Refreshed {
            query: query.clone(),
            page: first?.decode()?,
            fell_back: false,
        });
    }

    let previous = query.with_page(query.page() - 1);
    tracing::debug!(
        resource = resource.display_name(),
        from = query.page(),
        to = previous.page(),
        "page emptied, falling back"
    );
    let page = gateway.list_page(resource, &previous).await?.decode()?;
    Ok(Refreshed {
        query: previous,
        page,
        fell_back: true,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer load was issued while this one was in flight; its result was dropped.
    Superseded,
}

/// What a list view currently shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ListState<T> {
    pub query: ListQuery,
    pub items: Vec<T>,
    pub pagination: Pagination,
    pub fell_back: bool,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            query: ListQuery::first_page(),
            items: Vec::new(),
            pagination: Pagination::new(0, 1),
            fell_back: false,
        }
    }
}

/// A list of one resource, kept in step with its active query.
pub struct ListView<T> {
    gateway: Arc<dyn InventoryGateway>,
    resource: Resource,
    tracker: RequestTracker,
    state: Mutex<ListState<T>>,
}

impl<T: FromWire + Clone> ListView<T> {
    pub fn new(gateway: Arc<dyn InventoryGateway>, resource: Resource) -> Self {
        Self {
            gateway,
            resource,
            tracker: RequestTracker::new(),
            state: Mutex::new(ListState::default()),
        }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ListState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether any load was ever started on this view.
    pub fn is_loaded(&self) -> bool {
        self.tracker.has_issued()
    }

    pub fn active_query(&self) -> ListQuery {
        self.lock().query.clone()
    }

    pub fn snapshot(&self) -> ListState<T> {
        self.lock().clone()
    }

    /// Load `query` and make it the active one, unless a newer load started meanwhile.
    pub async fn load(&self, query: ListQuery) -> Result<LoadOutcome, ClientError> {
        let ticket = self.tracker.issue();
        let result = refresh::<T>(self.gateway.as_ref(), self.resource, &query).await;

        // Checked under the state lock so a newer load cannot apply in between.
        let mut state = self.lock();
        if !self.tracker.is_current(ticket) {
            tracing::debug!(
                resource = self.resource.display_name(),
                page = query.page(),
                search = query.search(),
                "discarding superseded list response"
            );
            return Ok(LoadOutcome::Superseded);
        }

        let refreshed = result?;
        let pagination = refreshed.pagination();
        *state = ListState {
            query: refreshed.query,
            items: refreshed.page.items,
            pagination,
            fell_back: refreshed.fell_back,
        };
        Ok(LoadOutcome::Applied)
    }

    /// Re-issue the active query.
    pub async fn refresh(&self) -> Result<LoadOutcome, ClientError> {
        self.load(self.active_query()).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{InMemoryGateway, stock};
    use gudang_inventory::StockRecord;

    fn gateway_with(count: i64) -> Arc<InMemoryGateway> {
        let fake = Arc::new(InMemoryGateway::new());
        for id in 1..=count {
            fake.insert_stock(stock(id, 5, 10));
        }
        fake
    }

    #[test]
    fn only_the_latest_ticket_is_current() {
        let tracker = RequestTracker::new();
        let a = tracker.issue();
        assert!(tracker.is_current(a));
        let b = tracker.issue();
        assert!(!tracker.is_current(a));
        assert!(tracker.is_current(b));
        assert!(b > a);
    }

    #[tokio::test]
    async fn refresh_keeps_the_page_when_it_has_rows() {
        let fake = gateway_with(11);
        let query = ListQuery::first_page().with_page(2);
        let refreshed = refresh::<StockRecord>(fake.as_ref(), Resource::Stock, &query)
            .await
            .unwrap();
        assert!(!refreshed.fell_back);
        assert_eq!(refreshed.query.page(), 2);
        assert_eq!(refreshed.page.items.len(), 1);
        assert_eq!(refreshed.page.total_count, 11);
    }

    #[tokio::test]
    async fn deleting_the_last_row_of_a_page_falls_back() {
        let fake = gateway_with(11);
        let view: ListView<StockRecord> = ListView::new(fake.clone(), Resource::Stock);
        view.load(ListQuery::first_page().with_page(2)).await.unwrap();
        assert_eq!(view.snapshot().items.len(), 1);

        fake.delete(Resource::Stock, 11).await.unwrap();
        assert_eq!(view.refresh().await.unwrap(), LoadOutcome::Applied);

        let state = view.snapshot();
        assert!(state.fell_back);
        assert_eq!(state.query.page(), 1);
        assert_eq!(state.items.len(), 10);
        assert_eq!(state.pagination.total_pages, 1);
        assert!(!state.pagination.is_visible());
    }

    #[tokio::test]
    async fn empty_first_page_is_not_retried() {
        let fake = gateway_with(0);
        let refreshed =
            refresh::<StockRecord>(fake.as_ref(), Resource::Stock, &ListQuery::first_page())
                .await
                .unwrap();
        assert!(refreshed.page.is_empty());
        assert!(!refreshed.fell_back);
        assert_eq!(fake.calls().list, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_stale_response_never_overwrites_newer_state() {
        let fake = gateway_with(3);
        fake.delay_search("Barang", Duration::from_millis(200));
        let view: ListView<StockRecord> = ListView::new(fake.clone(), Resource::Stock);

        let (stale, fresh) = tokio::join!(
            view.load(ListQuery::first_page().with_search("Barang")),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                view.load(ListQuery::first_page().with_search("Barang 2")).await
            }
        );

        assert_eq!(stale.unwrap(), LoadOutcome::Superseded);
        assert_eq!(fresh.unwrap(), LoadOutcome::Applied);

        let state = view.snapshot();
        assert_eq!(state.query.search(), "Barang 2");
        assert_eq!(state.items.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn latest_load_wins_across_threads() {
        let fake = gateway_with(8);
        let view: Arc<ListView<StockRecord>> = Arc::new(ListView::new(fake.clone(), Resource::Stock));

        let mut handles = Vec::new();
        for i in 1..=8usize {
            let view = view.clone();
            let query = ListQuery::first_page().with_search(format!("Barang {i}"));
            handles.push(tokio::spawn(async move { view.load(query).await }));
            while fake.calls().list < i {
                tokio::task::yield_now().await;
            }
        }

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(outcomes.last(), Some(&LoadOutcome::Applied));
        let state = view.snapshot();
        assert_eq!(state.query.search(), "Barang 8");
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].item_name, "Barang 8");
    }
}
