//! Inventory domain module.
//!
//! This crate contains the warehouse entities and stock rules, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod catalog;
pub mod stock;

pub use catalog::{Category, Item, Supplier, Warehouse};
pub use stock::{
    DEFAULT_REORDER_LEVEL, DEFAULT_STOCK_OUT_REASON, MovementKind, StockMovement, StockRecord,
    movement_note, validate_requested_quantity,
};
