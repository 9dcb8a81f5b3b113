//! The API boundary as a trait.
//!
//! Operations (stock-out, list refresh, CRUD, accounts) talk to the server
//! only through `InventoryGateway`. `ApiClient` is the HTTP implementation;
//! tests plug in an in-memory one.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use gudang_core::StockId;
use gudang_inventory::{StockMovement, StockRecord};

use crate::error::ApiError;
use crate::query::{ListQuery, build_list_url};
use crate::resource::Resource;
use crate::session::CurrentUser;
use crate::wire::{Credentials, PageResult, Registration, StockTransaction, TransactionReceipt};

#[async_trait]
pub trait InventoryGateway: Send + Sync {
    /// `GET /stok/{id}/`.
    async fn fetch_stock(&self, id: StockId) -> Result<StockRecord, ApiError>;

    /// `POST /stok/transaction/`: read-validate-write performed atomically by the server.
    async fn commit_stock_transaction(
        &self,
        tx: &StockTransaction,
    ) -> Result<TransactionReceipt, ApiError>;

    /// `POST /riwayat-stok/`: append a movement log entry.
    async fn record_movement(&self, tx: &StockTransaction) -> Result<StockMovement, ApiError>;

    /// Fetch one list page by URL (relative to the API root, or an absolute `next` link).
    async fn fetch_page_url(&self, url: &str) -> Result<PageResult<JsonValue>, ApiError>;

    /// Fetch one page of `resource` for `query`.
    async fn list_page(
        &self,
        resource: Resource,
        query: &ListQuery,
    ) -> Result<PageResult<JsonValue>, ApiError> {
        self.fetch_page_url(&build_list_url(resource, query)).await
    }

    /// `GET /{resource}/{id}/`.
    async fn fetch_one(&self, resource: Resource, id: i64) -> Result<JsonValue, ApiError>;

    /// `PUT /{resource}/{id}/` when `id` is set, otherwise `POST /{resource}/`.
    async fn save(
        &self,
        resource: Resource,
        id: Option<i64>,
        body: &JsonValue,
    ) -> Result<JsonValue, ApiError>;

    /// `DELETE /{resource}/{id}/`.
    async fn delete(&self, resource: Resource, id: i64) -> Result<(), ApiError>;

    /// `POST /auth/token/`; returns the issued token.
    async fn obtain_token(&self, credentials: &Credentials) -> Result<String, ApiError>;

    /// `POST /register/`.
    async fn register(&self, registration: &Registration) -> Result<(), ApiError>;

    /// `GET /me/`.
    async fn current_user(&self) -> Result<CurrentUser, ApiError>;
}
