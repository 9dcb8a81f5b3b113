//! Client for the Gudang inventory API: HTTP access, list state, stock-out
//! and the command layer on top.

pub mod accounts;
pub mod api;
pub mod bulk;
pub mod commands;
pub mod config;
pub mod crud;
pub mod debounce;
pub mod error;
pub mod gateway;
pub mod pagination;
pub mod query;
pub mod refresh;
pub mod resource;
pub mod session;
pub mod stock_out;
pub mod storefront;
pub mod wire;

#[cfg(test)]
pub(crate) mod testing;

pub use api::ApiClient;
pub use commands::{Command, Dispatcher, Notice};
pub use config::{AuthScheme, ClientConfig, ConfigError};
pub use error::{ApiError, ClientError};
pub use gateway::InventoryGateway;
pub use pagination::{PAGE_SIZE, Pagination, compute_pages};
pub use query::{ListQuery, build_list_url};
pub use refresh::{ListView, LoadOutcome, refresh};
pub use resource::Resource;
pub use session::{CurrentUser, Session};
pub use stock_out::{StockOut, StockOutError, StockOutOutcome, StockOutRequest, stock_out};
pub use wire::PageResult;
