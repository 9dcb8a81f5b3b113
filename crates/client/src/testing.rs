//! In-memory `InventoryGateway` for unit tests.
//!
//! Mirrors the server's behaviour closely enough for the client logic: the
//! transaction endpoint validates and writes under one lock, list endpoints
//! paginate by 10, and 401 is returned for protected calls without a token.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use tokio::sync::Barrier;

use gudang_core::{ItemId, MovementId, StockId, WarehouseId};
use gudang_inventory::{MovementKind, StockMovement, StockRecord};

use crate::error::ApiError;
use crate::gateway::InventoryGateway;
use crate::pagination::PAGE_SIZE;
use crate::query::ListQuery;
use crate::resource::Resource;
use crate::session::{CurrentUser, Session};
use crate::wire::{Credentials, PageResult, Registration, StockTransaction, TransactionReceipt};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub fetch_stock: usize,
    pub commit: usize,
    pub record_movement: usize,
    pub list: usize,
    pub save: usize,
    pub delete: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.fetch_stock + self.commit + self.record_movement + self.list + self.save + self.delete
    }

    pub fn writes(&self) -> usize {
        self.commit + self.record_movement + self.save + self.delete
    }
}

#[derive(Default)]
struct State {
    stocks: BTreeMap<i64, StockRecord>,
    movements: Vec<StockMovement>,
    rows: HashMap<Resource, Vec<JsonValue>>,
    calls: CallCounts,
    fail_movement_log: bool,
    server_logs_movements: bool,
    unreadable_receipts: bool,
    fetch_gate: Option<(Arc<Barrier>, usize)>,
    list_delays: HashMap<String, Duration>,
    user: Option<CurrentUser>,
    password: Option<(String, String)>,
}

pub struct InMemoryGateway {
    state: Mutex<State>,
    session: Session,
}

pub fn stock(id: i64, quantity: u32, reorder_level: u32) -> StockRecord {
    StockRecord {
        id: StockId::new(id),
        item_id: ItemId::new(100 + id),
        warehouse_id: WarehouseId::new(1),
        quantity,
        reorder_level,
        updated_at: None,
        item_name: format!("Barang {id}"),
        item_sku: format!("SKU-{id}"),
        item_unit: "pcs".to_string(),
        image_url: None,
        warehouse_name: "Gudang Utama".to_string(),
    }
}

pub fn stock_row(record: &StockRecord) -> JsonValue {
    json!({
        "id": record.id.get(),
        "barang": record.item_id.get(),
        "barang_nama": record.item_name,
        "barang_sku": record.item_sku,
        "gudang": record.warehouse_id.get(),
        "gudang_nama": record.warehouse_name,
        "jumlah": record.quantity,
        "level_reorder": record.reorder_level,
    })
}

impl InMemoryGateway {
    /// Gateway whose session already holds a token.
    pub fn new() -> Self {
        Self::with_session(Session::with_token("test-token"))
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            state: Mutex::new(State::default()),
            session,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn insert_stock(&self, record: StockRecord) {
        self.lock().stocks.insert(record.id.get(), record);
    }

    pub fn stock_quantity(&self, id: i64) -> Option<u32> {
        self.lock().stocks.get(&id).map(|r| r.quantity)
    }

    pub fn movements(&self) -> Vec<StockMovement> {
        self.lock().movements.clone()
    }

    /// Rows served by list endpoints for resources other than stock.
    pub fn set_rows(&self, resource: Resource, rows: Vec<JsonValue>) {
        self.lock().rows.insert(resource, rows);
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    pub fn fail_movement_log(&self) {
        self.lock().fail_movement_log = true;
    }

    /// Commits still apply, but the response body cannot be decoded.
    pub fn unreadable_receipts(&self) {
        self.lock().unreadable_receipts = true;
    }

    /// Make the transaction endpoint return the movement it wrote.
    pub fn server_logs_movements(&self) {
        self.lock().server_logs_movements = true;
    }

    /// Hold the next `count` stock fetches until all of them have arrived.
    pub fn gate_fetches(&self, count: usize) {
        self.lock().fetch_gate = Some((Arc::new(Barrier::new(count)), count));
    }

    /// Delay list responses whose search term equals `search`.
    pub fn delay_search(&self, search: &str, delay: Duration) {
        self.lock().list_delays.insert(search.to_string(), delay);
    }

    pub fn set_user(&self, user: CurrentUser) {
        self.lock().user = Some(user);
    }

    pub fn set_password(&self, username: &str, password: &str) {
        self.lock().password = Some((username.to_string(), password.to_string()));
    }

    fn require_token(&self) -> Result<(), ApiError> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(ApiError::from_status(
                401,
                Some(json!({"detail": "Authentication credentials were not provided."})),
            ))
        }
    }

    fn log_movement(state: &mut State, tx: &StockTransaction) -> StockMovement {
        let movement = StockMovement {
            id: MovementId::new(state.movements.len() as i64 + 1),
            stock_id: tx.stock_id,
            kind: tx.kind,
            quantity: tx.quantity,
            note: tx.note.clone(),
            created_at: None,
            created_by: None,
            item_name: String::new(),
            warehouse_name: String::new(),
            created_by_name: String::new(),
        };
        state.movements.push(movement.clone());
        movement
    }

    fn parse_list_url(url: &str) -> (Resource, ListQuery, Option<String>) {
        let (path, qs) = url.split_once('?').unwrap_or((url, ""));
        let resource = path
            .rsplit("/api/")
            .next()
            .unwrap_or(path)
            .parse::<Resource>()
            .unwrap_or(Resource::Stock);
        let mut query = ListQuery::first_page();
        let mut page = 1;
        let mut kind = None;
        for (k, v) in url::form_urlencoded::parse(qs.as_bytes()) {
            match k.as_ref() {
                "page" => page = v.parse().unwrap_or(1),
                "search" => query = query.with_search(v.into_owned()),
                "tipe" => kind = Some(v.into_owned()),
                _ => {}
            }
        }
        (resource, query.with_page(page), kind)
    }
}

#[async_trait]
impl InventoryGateway for InMemoryGateway {
    async fn fetch_stock(&self, id: StockId) -> Result<StockRecord, ApiError> {
        let (found, gate) = {
            let mut state = self.lock();
            state.calls.fetch_stock += 1;
            let gate = match state.fetch_gate.as_mut() {
                Some((barrier, remaining)) if *remaining > 0 => {
                    *remaining -= 1;
                    Some(barrier.clone())
                }
                _ => None,
            };
            (state.stocks.get(&id.get()).cloned(), gate)
        };
        if let Some(barrier) = gate {
            barrier.wait().await;
        }
        found.ok_or_else(|| ApiError::from_status(404, Some(json!({"detail": "Not found."}))))
    }

    async fn commit_stock_transaction(
        &self,
        tx: &StockTransaction,
    ) -> Result<TransactionReceipt, ApiError> {
        self.require_token()?;
        let mut state = self.lock();
        state.calls.commit += 1;
        let Some(current) = state.stocks.get(&tx.stock_id.get()).cloned() else {
            return Err(ApiError::from_status(404, Some(json!({"detail": "Not found."}))));
        };
        let updated_quantity = match tx.kind {
            MovementKind::In => current.quantity + tx.quantity,
            MovementKind::Out => match current.quantity.checked_sub(tx.quantity) {
                Some(q) => q,
                None => {
                    return Err(ApiError::from_status(
                        400,
                        Some(json!({"detail": "Stok tidak mencukupi"})),
                    ));
                }
            },
        };
        let updated = current.with_quantity(updated_quantity);
        state.stocks.insert(updated.id.get(), updated.clone());
        let movement = if state.server_logs_movements {
            Some(Self::log_movement(&mut state, tx))
        } else {
            None
        };
        if state.unreadable_receipts {
            return Err(ApiError::decode("transaction response: missing 'stok'"));
        }
        Ok(TransactionReceipt {
            stock: updated,
            movement,
        })
    }

    async fn record_movement(&self, tx: &StockTransaction) -> Result<StockMovement, ApiError> {
        self.require_token()?;
        let mut state = self.lock();
        state.calls.record_movement += 1;
        if state.fail_movement_log {
            return Err(ApiError::from_status(
                403,
                Some(json!({"detail": "You do not have permission to perform this action."})),
            ));
        }
        Ok(Self::log_movement(&mut state, tx))
    }

    async fn fetch_page_url(&self, url: &str) -> Result<PageResult<JsonValue>, ApiError> {
        let (resource, query, kind) = Self::parse_list_url(url);
        let delay = {
            let mut state = self.lock();
            state.calls.list += 1;
            state.list_delays.get(query.search()).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.lock();
        let rows: Vec<JsonValue> = match resource {
            Resource::Stock => state
                .stocks
                .values()
                .filter(|r| query.search().is_empty() || r.item_name.contains(query.search()))
                .map(stock_row)
                .collect(),
            other => state
                .rows
                .get(&other)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .filter(|row| kind.as_deref().is_none_or(|k| row["tipe"] == k))
                .collect(),
        };

        let total = rows.len();
        let size = PAGE_SIZE.get() as usize;
        let start = (query.page() as usize - 1) * size;
        let items: Vec<JsonValue> = rows.into_iter().skip(start).take(size).collect();
        let next = (start + size < total).then(|| {
            let kind = kind.map(|k| format!("&tipe={k}")).unwrap_or_default();
            format!(
                "http://test/api/{}?page={}{kind}",
                resource.collection_path(),
                query.page() + 1
            )
        });
        Ok(PageResult {
            items,
            total_count: total as u64,
            next,
        })
    }

    async fn fetch_one(&self, resource: Resource, id: i64) -> Result<JsonValue, ApiError> {
        let state = self.lock();
        let found = match resource {
            Resource::Stock => state.stocks.get(&id).map(stock_row),
            other => state
                .rows
                .get(&other)
                .and_then(|rows| rows.iter().find(|r| r["id"] == json!(id)).cloned()),
        };
        found.ok_or_else(|| ApiError::from_status(404, None))
    }

    async fn save(
        &self,
        resource: Resource,
        id: Option<i64>,
        body: &JsonValue,
    ) -> Result<JsonValue, ApiError> {
        self.require_token()?;
        let mut state = self.lock();
        state.calls.save += 1;
        let rows = state.rows.entry(resource).or_default();
        let id = id.unwrap_or(rows.len() as i64 + 1);
        let mut row = body.clone();
        row["id"] = json!(id);
        rows.retain(|r| r["id"] != json!(id));
        rows.push(row.clone());
        Ok(row)
    }

    async fn delete(&self, resource: Resource, id: i64) -> Result<(), ApiError> {
        self.require_token()?;
        let mut state = self.lock();
        state.calls.delete += 1;
        let removed = match resource {
            Resource::Stock => state.stocks.remove(&id).is_some(),
            other => {
                let rows = state.rows.entry(other).or_default();
                let before = rows.len();
                rows.retain(|r| r["id"] != json!(id));
                rows.len() != before
            }
        };
        if removed {
            Ok(())
        } else {
            Err(ApiError::from_status(404, None))
        }
    }

    async fn obtain_token(&self, credentials: &Credentials) -> Result<String, ApiError> {
        let state = self.lock();
        match &state.password {
            Some((u, p)) if *u == credentials.username && *p == credentials.password => {
                Ok(format!("token-for-{u}"))
            }
            _ => Err(ApiError::from_status(
                400,
                Some(json!({"non_field_errors": ["Unable to log in with provided credentials."]})),
            )),
        }
    }

    async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let mut state = self.lock();
        if let Some((existing, _)) = &state.password {
            if *existing == registration.username {
                return Err(ApiError::from_status(
                    400,
                    Some(json!({"username": ["A user with that username already exists."]})),
                ));
            }
        }
        state.password = Some((registration.username.clone(), registration.password.clone()));
        Ok(())
    }

    async fn current_user(&self) -> Result<CurrentUser, ApiError> {
        self.require_token()?;
        Ok(self.lock().user.clone().unwrap_or_else(CurrentUser::anonymous))
    }
}
