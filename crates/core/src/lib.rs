//! `gudang-core`: shared building blocks for the warehouse inventory client.
//!
//! This crate contains **pure domain** primitives (no IO, no HTTP).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CategoryId, ItemId, MovementId, StockId, SupplierId, UserId, WarehouseId};
