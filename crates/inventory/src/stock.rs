use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gudang_core::{DomainError, DomainResult, Entity, ItemId, MovementId, StockId, UserId, WarehouseId};

/// Reorder threshold applied when the server omits one.
pub const DEFAULT_REORDER_LEVEL: u32 = 10;

/// Reason used for a stock-out when the operator leaves it blank.
pub const DEFAULT_STOCK_OUT_REASON: &str = "Penjualan";

/// Quantity of one item held in one warehouse (stok).
///
/// `quantity` is unsigned: a record can never hold negative stock. The
/// display fields are denormalized copies the API returns alongside the
/// foreign keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub id: StockId,
    pub item_id: ItemId,
    pub warehouse_id: WarehouseId,
    pub quantity: u32,
    pub reorder_level: u32,
    pub updated_at: Option<DateTime<Utc>>,

    pub item_name: String,
    pub item_sku: String,
    pub item_unit: String,
    pub image_url: Option<String>,
    pub warehouse_name: String,
}

impl StockRecord {
    /// Display-only restock flag; nothing enforces it.
    pub fn needs_reorder(&self) -> bool {
        self.quantity <= self.reorder_level
    }

    /// Check that `requested` units can leave this record and return what would remain.
    pub fn plan_stock_out(&self, requested: u32) -> DomainResult<u32> {
        if requested == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        self.quantity
            .checked_sub(requested)
            .ok_or_else(|| DomainError::insufficient_stock(self.quantity, requested))
    }

    /// Copy of this record with only the quantity changed.
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }
}

impl Entity for StockRecord {
    type Id = StockId;

    fn id(&self) -> StockId {
        self.id
    }

    fn label(&self) -> String {
        format!(
            "{} - {}: {} {}",
            self.item_name, self.warehouse_name, self.quantity, self.item_unit
        )
    }
}

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::In => "IN",
            MovementKind::Out => "OUT",
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(MovementKind::In),
            "OUT" => Ok(MovementKind::Out),
            other => Err(DomainError::validation(format!(
                "movement kind must be IN or OUT, got '{other}'"
            ))),
        }
    }
}

/// Append-only movement log entry (riwayat-stok).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub stock_id: StockId,
    pub kind: MovementKind,
    pub quantity: u32,
    pub note: String,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<UserId>,

    pub item_name: String,
    pub warehouse_name: String,
    pub created_by_name: String,
}

impl Entity for StockMovement {
    type Id = MovementId;

    fn id(&self) -> MovementId {
        self.id
    }

    fn label(&self) -> String {
        format!("{} - {} ({})", self.kind, self.item_name, self.quantity)
    }
}

/// Turn operator input into a positive quantity.
///
/// Input arrives signed because forms can submit zero or negative numbers;
/// those are rejected before anything talks to the network.
pub fn validate_requested_quantity(requested: i64) -> DomainResult<u32> {
    if requested <= 0 {
        return Err(DomainError::validation(format!(
            "quantity must be positive, got {requested}"
        )));
    }
    u32::try_from(requested)
        .map_err(|_| DomainError::validation(format!("quantity {requested} is too large")))
}

/// Compose the note stored on a movement: `"<reason> - <note>"`, or just the reason.
pub fn movement_note(reason: &str, note: &str) -> String {
    let reason = reason.trim();
    let reason = if reason.is_empty() {
        DEFAULT_STOCK_OUT_REASON
    } else {
        reason
    };
    let note = note.trim();
    if note.is_empty() {
        reason.to_string()
    } else {
        format!("{reason} - {note}")
    }
}
