//! Master data: categories, suppliers, items and warehouses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gudang_core::{CategoryId, Entity, ItemId, SupplierId, WarehouseId};

/// Item category (kategori).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Supplier of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Item master record (barang).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub supplier_id: Option<SupplierId>,
    pub supplier_name: Option<String>,
    /// Unit of measure (pcs/kg/liter).
    pub unit: String,
    pub image_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Storage location (gudang).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
    pub location: String,
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> CategoryId {
        self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> SupplierId {
        self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }

    fn label(&self) -> String {
        let sku = if self.sku.trim().is_empty() {
            "N/A"
        } else {
            self.sku.as_str()
        };
        format!("{} ({})", self.name, sku)
    }
}

impl Entity for Warehouse {
    type Id = WarehouseId;

    fn id(&self) -> WarehouseId {
        self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}
