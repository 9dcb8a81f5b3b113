//! HTTP client for the inventory API.

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::AUTHORIZATION;
use serde_json::Value as JsonValue;
use url::Url;
use uuid::Uuid;

use gudang_core::StockId;
use gudang_inventory::{StockMovement, StockRecord};

use crate::config::{AuthScheme, ClientConfig};
use crate::error::ApiError;
use crate::gateway::InventoryGateway;
use crate::resource::{Resource, endpoints};
use crate::session::{CurrentUser, Session};
use crate::wire::{
    Credentials, FromWire, PageResult, Registration, StockTransaction, TokenResponse,
    TransactionReceipt, decode_page,
};

/// Header carrying a per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Thin JSON client over `reqwest`.
///
/// Cheap to clone; clones share the connection pool and the session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    auth_scheme: AuthScheme,
    session: Session,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Session) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.http_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::network(format!("failed to build HTTP client: {e}")))?;

        if let Some(token) = &config.token {
            session.issue(token.clone());
        }

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            auth_scheme: config.auth_scheme,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URLs (pagination `next` links) are used as-is; anything else
    /// is resolved below the API root.
    pub fn resolve(&self, path: &str) -> Result<Url, ApiError> {
        if let Ok(absolute) = Url::parse(path) {
            return Ok(absolute);
        }
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::network(format!("invalid request path '{path}': {e}")))
    }

    /// Issue one request and return the parsed JSON body.
    ///
    /// The session token is attached only when `authenticated` is set and a
    /// token exists. Non-2xx statuses become `ApiError` (401 as
    /// `AuthRequired`); an empty 2xx body yields `null`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
        authenticated: bool,
    ) -> Result<JsonValue, ApiError> {
        let url = self.resolve(path)?;
        let request_id = Uuid::now_v7();

        let mut req = self
            .http
            .request(method.clone(), url)
            .header(REQUEST_ID_HEADER, request_id.to_string());

        if let Some(body) = body {
            req = req.json(body);
        }

        if authenticated {
            if let Some(token) = self.session.token() {
                req = req.header(AUTHORIZATION, self.auth_scheme.header_value(&token));
            }
        }

        let resp = req.send().await.map_err(|e| {
            tracing::debug!(%method, path, %request_id, error = %e, "api request failed");
            ApiError::network(e.to_string())
        })?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ApiError::network(format!("failed to read response body: {e}")))?;

        tracing::debug!(
            %method,
            path,
            status = status.as_u16(),
            %request_id,
            "api request"
        );

        if !status.is_success() {
            let body = serde_json::from_slice::<JsonValue>(&bytes).ok();
            return Err(ApiError::from_status(status.as_u16(), body));
        }

        if bytes.is_empty() {
            return Ok(JsonValue::Null);
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::decode(format!("{method} {path}: {e}")))
    }

    pub async fn get(&self, path: &str) -> Result<JsonValue, ApiError> {
        self.request(Method::GET, path, None, true).await
    }

    pub async fn post(&self, path: &str, body: &JsonValue) -> Result<JsonValue, ApiError> {
        self.request(Method::POST, path, Some(body), true).await
    }

    async fn get_as<T: FromWire>(&self, path: &str) -> Result<T, ApiError> {
        T::from_wire(self.get(path).await?)
    }

    async fn post_as<T: FromWire>(&self, path: &str, body: &JsonValue) -> Result<T, ApiError> {
        T::from_wire(self.post(path, body).await?)
    }
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<JsonValue, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::encode(e.to_string()))
}

#[async_trait]
impl InventoryGateway for ApiClient {
    async fn fetch_stock(&self, id: StockId) -> Result<StockRecord, ApiError> {
        self.get_as(&Resource::Stock.detail_path(id)).await
    }

    async fn commit_stock_transaction(
        &self,
        tx: &StockTransaction,
    ) -> Result<TransactionReceipt, ApiError> {
        self.post_as(endpoints::STOCK_TRANSACTION, &to_body(tx)?)
            .await
    }

    async fn record_movement(&self, tx: &StockTransaction) -> Result<StockMovement, ApiError> {
        self.post_as(Resource::Movement.collection_path(), &to_body(tx)?)
            .await
    }

    async fn fetch_page_url(&self, url: &str) -> Result<PageResult<JsonValue>, ApiError> {
        decode_page(self.get(url).await?)
    }

    async fn fetch_one(&self, resource: Resource, id: i64) -> Result<JsonValue, ApiError> {
        self.get(&resource.detail_path(id)).await
    }

    async fn save(
        &self,
        resource: Resource,
        id: Option<i64>,
        body: &JsonValue,
    ) -> Result<JsonValue, ApiError> {
        match id {
            Some(id) => {
                self.request(Method::PUT, &resource.detail_path(id), Some(body), true)
                    .await
            }
            None => self.post(resource.collection_path(), body).await,
        }
    }

    async fn delete(&self, resource: Resource, id: i64) -> Result<(), ApiError> {
        self.request(Method::DELETE, &resource.detail_path(id), None, true)
            .await
            .map(|_| ())
    }

    async fn obtain_token(&self, credentials: &Credentials) -> Result<String, ApiError> {
        let body = to_body(credentials)?;
        let value = self
            .request(Method::POST, endpoints::AUTH_TOKEN, Some(&body), false)
            .await?;
        Ok(TokenResponse::from_wire(value)?.token)
    }

    async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let body = to_body(registration)?;
        self.request(Method::POST, endpoints::REGISTER, Some(&body), false)
            .await
            .map(|_| ())
    }

    async fn current_user(&self) -> Result<CurrentUser, ApiError> {
        self.get_as(endpoints::CURRENT_USER).await
    }
}
