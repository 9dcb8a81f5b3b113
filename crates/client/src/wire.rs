//! Wire format of the inventory API and its normalization.
//!
//! The server has grown several shapes for the same data: list endpoints
//! answer either `{results, count, next}` or a bare array, and stock rows
//! carry item/warehouse details under a handful of alternative keys
//! (`barang_nama`, `barang_detail.nama`, a nested `barang` object, ...).
//! Everything in this module maps those shapes onto the canonical entities
//! of `gudang-inventory`, so no other module ever looks at raw keys.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;

use gudang_core::{CategoryId, ItemId, MovementId, StockId, SupplierId, UserId, WarehouseId};
use gudang_inventory::{
    Category, DEFAULT_REORDER_LEVEL, Item, MovementKind, StockMovement, StockRecord, Supplier,
    Warehouse,
};

use crate::error::ApiError;
use crate::session::CurrentUser;

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    /// Absolute URL of the following page, when the server paginates.
    pub next: Option<String>,
}

impl<T> PageResult<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            next: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl PageResult<JsonValue> {
    /// Decode every item into a canonical entity.
    pub fn decode<T: FromWire>(self) -> Result<PageResult<T>, ApiError> {
        let items = self
            .items
            .into_iter()
            .map(T::from_wire)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PageResult {
            items,
            total_count: self.total_count,
            next: self.next,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPage {
    Paged {
        results: Vec<JsonValue>,
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
    },
    Bare(Vec<JsonValue>),
}

/// Accept both the paginated envelope and a bare array.
pub fn decode_page(value: JsonValue) -> Result<PageResult<JsonValue>, ApiError> {
    let raw: RawPage = serde_json::from_value(value)
        .map_err(|e| ApiError::decode(format!("list response: {e}")))?;
    Ok(match raw {
        RawPage::Paged {
            results,
            count,
            next,
        } => {
            let total_count = count.unwrap_or(results.len() as u64);
            PageResult {
                items: results,
                total_count,
                next: next.filter(|n| !n.is_empty()),
            }
        }
        RawPage::Bare(items) => PageResult {
            total_count: items.len() as u64,
            items,
            next: None,
        },
    })
}

/// Conversion from a raw JSON object into a canonical entity.
pub trait FromWire: Sized {
    fn from_wire(value: JsonValue) -> Result<Self, ApiError>;
}

fn parse_raw<R: DeserializeOwned>(what: &str, value: JsonValue) -> Result<R, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::decode(format!("{what}: {e}")))
}

/// A foreign key the server sends either as an id or as an embedded object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Relation {
    Id(i64),
    Text(String),
    Object(RawRef),
}

impl Relation {
    fn id(&self) -> Option<i64> {
        match self {
            Relation::Id(id) => Some(*id),
            Relation::Text(s) => s.trim().parse().ok(),
            Relation::Object(r) => r.id,
        }
    }

    fn object(&self) -> Option<&RawRef> {
        match self {
            Relation::Object(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawRef {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    nama: Option<String>,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    satuan: Option<String>,
    #[serde(default)]
    gambar_url: Option<String>,
    #[serde(default)]
    gambar: Option<String>,
}

fn first_non_empty<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Django emits RFC 3339 when time zones are on and naive ISO timestamps when off.
fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn require_id(what: &str, field: &str, id: Option<i64>) -> Result<i64, ApiError> {
    id.ok_or_else(|| ApiError::decode(format!("{what}: missing or malformed '{field}'")))
}

#[derive(Debug, Deserialize)]
struct RawStock {
    id: i64,
    #[serde(default)]
    barang: Option<Relation>,
    #[serde(default)]
    barang_detail: Option<RawRef>,
    #[serde(default)]
    barang_nama: Option<String>,
    #[serde(default)]
    barang_sku: Option<String>,
    #[serde(default)]
    barang_satuan: Option<String>,
    #[serde(default)]
    barang_gambar: Option<String>,
    #[serde(default)]
    barang_image: Option<String>,
    #[serde(default)]
    gudang: Option<Relation>,
    #[serde(default)]
    gudang_detail: Option<RawRef>,
    #[serde(default)]
    gudang_nama: Option<String>,
    jumlah: u32,
    #[serde(default)]
    level_reorder: Option<u32>,
    #[serde(default)]
    diperbarui_pada: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl FromWire for StockRecord {
    fn from_wire(value: JsonValue) -> Result<Self, ApiError> {
        let raw: RawStock = parse_raw("stock record", value)?;

        let item_obj = raw.barang.as_ref().and_then(Relation::object);
        let detail = raw.barang_detail.as_ref();
        let warehouse_obj = raw.gudang.as_ref().and_then(Relation::object);

        let item_id = require_id(
            "stock record",
            "barang",
            raw.barang
                .as_ref()
                .and_then(Relation::id)
                .or_else(|| detail.and_then(|d| d.id)),
        )?;
        let warehouse_id = require_id(
            "stock record",
            "gudang",
            raw.gudang
                .as_ref()
                .and_then(Relation::id)
                .or_else(|| raw.gudang_detail.as_ref().and_then(|d| d.id)),
        )?;

        let item_name = first_non_empty([
            raw.barang_nama.as_deref(),
            detail.and_then(|d| d.nama.as_deref()),
            item_obj.and_then(|o| o.nama.as_deref()),
        ]);
        let item_sku = first_non_empty([
            raw.barang_sku.as_deref(),
            detail.and_then(|d| d.sku.as_deref()),
            item_obj.and_then(|o| o.sku.as_deref()),
        ]);
        let item_unit = first_non_empty([
            raw.barang_satuan.as_deref(),
            detail.and_then(|d| d.satuan.as_deref()),
            item_obj.and_then(|o| o.satuan.as_deref()),
        ]);
        let image_url = first_non_empty([
            detail.and_then(|d| d.gambar_url.as_deref()),
            item_obj.and_then(|o| o.gambar_url.as_deref()),
            raw.barang_gambar.as_deref(),
            item_obj.and_then(|o| o.gambar.as_deref()),
            raw.barang_image.as_deref(),
        ]);
        let warehouse_name = first_non_empty([
            raw.gudang_nama.as_deref(),
            raw.gudang_detail.as_ref().and_then(|d| d.nama.as_deref()),
            warehouse_obj.and_then(|o| o.nama.as_deref()),
        ]);

        Ok(StockRecord {
            id: StockId::new(raw.id),
            item_id: ItemId::new(item_id),
            warehouse_id: WarehouseId::new(warehouse_id),
            quantity: raw.jumlah,
            reorder_level: raw.level_reorder.unwrap_or(DEFAULT_REORDER_LEVEL),
            updated_at: parse_timestamp(
                raw.diperbarui_pada.as_deref().or(raw.updated_at.as_deref()),
            ),
            item_name: item_name.unwrap_or_default(),
            item_sku: item_sku.unwrap_or_default(),
            item_unit: item_unit.unwrap_or_default(),
            image_url,
            warehouse_name: warehouse_name.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawMovement {
    id: i64,
    stok: Relation,
    tipe: String,
    jumlah: u32,
    #[serde(default)]
    catatan: Option<String>,
    #[serde(default)]
    dibuat_oleh: Option<Relation>,
    #[serde(default)]
    dibuat_oleh_nama: Option<String>,
    #[serde(default)]
    stok_barang: Option<String>,
    #[serde(default)]
    stok_nama: Option<String>,
    #[serde(default)]
    barang_nama: Option<String>,
    #[serde(default)]
    stok_gudang: Option<String>,
    #[serde(default)]
    dibuat_pada: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl FromWire for StockMovement {
    fn from_wire(value: JsonValue) -> Result<Self, ApiError> {
        let raw: RawMovement = parse_raw("stock movement", value)?;
        let stock_id = require_id("stock movement", "stok", raw.stok.id())?;
        let kind: MovementKind = raw
            .tipe
            .parse()
            .map_err(|e| ApiError::decode(format!("stock movement: {e}")))?;

        let created_by_name = first_non_empty([
            raw.dibuat_oleh_nama.as_deref(),
            raw.dibuat_oleh
                .as_ref()
                .and_then(Relation::object)
                .and_then(|o| o.nama.as_deref()),
        ]);

        Ok(StockMovement {
            id: MovementId::new(raw.id),
            stock_id: StockId::new(stock_id),
            kind,
            quantity: raw.jumlah,
            note: raw.catatan.unwrap_or_default(),
            created_at: parse_timestamp(raw.dibuat_pada.as_deref().or(raw.created_at.as_deref())),
            created_by: raw.dibuat_oleh.as_ref().and_then(Relation::id).map(UserId::new),
            item_name: first_non_empty([
                raw.stok_barang.as_deref(),
                raw.stok_nama.as_deref(),
                raw.barang_nama.as_deref(),
            ])
            .unwrap_or_default(),
            warehouse_name: raw.stok_gudang.unwrap_or_default(),
            created_by_name: created_by_name.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    id: i64,
    nama: String,
    #[serde(default)]
    deskripsi: Option<String>,
    #[serde(default)]
    dibuat_pada: Option<String>,
}

impl FromWire for Category {
    fn from_wire(value: JsonValue) -> Result<Self, ApiError> {
        let raw: RawCategory = parse_raw("category", value)?;
        Ok(Category {
            id: CategoryId::new(raw.id),
            name: raw.nama,
            description: raw.deskripsi.unwrap_or_default(),
            created_at: parse_timestamp(raw.dibuat_pada.as_deref()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawSupplier {
    id: i64,
    nama: String,
    #[serde(default)]
    kontak: Option<String>,
    #[serde(default)]
    telepon: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    alamat: Option<String>,
    #[serde(default)]
    dibuat_pada: Option<String>,
}

impl FromWire for Supplier {
    fn from_wire(value: JsonValue) -> Result<Self, ApiError> {
        let raw: RawSupplier = parse_raw("supplier", value)?;
        Ok(Supplier {
            id: SupplierId::new(raw.id),
            name: raw.nama,
            contact: raw.kontak.unwrap_or_default(),
            phone: raw.telepon.unwrap_or_default(),
            email: raw.email.unwrap_or_default(),
            address: raw.alamat.unwrap_or_default(),
            created_at: parse_timestamp(raw.dibuat_pada.as_deref()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawItem {
    id: i64,
    #[serde(default)]
    sku: Option<String>,
    nama: String,
    #[serde(default)]
    deskripsi: Option<String>,
    kategori: Relation,
    #[serde(default)]
    kategori_nama: Option<String>,
    #[serde(default)]
    supplier: Option<Relation>,
    #[serde(default)]
    supplier_nama: Option<String>,
    #[serde(default)]
    satuan: Option<String>,
    #[serde(default)]
    gambar_url: Option<String>,
    #[serde(default)]
    gambar: Option<String>,
    #[serde(default)]
    dibuat_pada: Option<String>,
    #[serde(default)]
    diperbarui_pada: Option<String>,
}

impl FromWire for Item {
    fn from_wire(value: JsonValue) -> Result<Self, ApiError> {
        let raw: RawItem = parse_raw("item", value)?;
        let category_id = require_id("item", "kategori", raw.kategori.id())?;
        let category_name = first_non_empty([
            raw.kategori_nama.as_deref(),
            raw.kategori.object().and_then(|o| o.nama.as_deref()),
        ]);
        let supplier_name = first_non_empty([
            raw.supplier_nama.as_deref(),
            raw.supplier
                .as_ref()
                .and_then(Relation::object)
                .and_then(|o| o.nama.as_deref()),
        ]);

        Ok(Item {
            id: ItemId::new(raw.id),
            sku: raw.sku.unwrap_or_default(),
            name: raw.nama,
            description: raw.deskripsi.unwrap_or_default(),
            category_id: CategoryId::new(category_id),
            category_name: category_name.unwrap_or_default(),
            supplier_id: raw
                .supplier
                .as_ref()
                .and_then(Relation::id)
                .map(SupplierId::new),
            supplier_name,
            unit: raw.satuan.unwrap_or_default(),
            image_url: first_non_empty([raw.gambar_url.as_deref(), raw.gambar.as_deref()]),
            created_at: parse_timestamp(raw.dibuat_pada.as_deref()),
            updated_at: parse_timestamp(raw.diperbarui_pada.as_deref()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawWarehouse {
    id: i64,
    nama: String,
    #[serde(default)]
    lokasi: Option<String>,
    #[serde(default)]
    deskripsi: Option<String>,
    #[serde(default)]
    dibuat_pada: Option<String>,
}

impl FromWire for Warehouse {
    fn from_wire(value: JsonValue) -> Result<Self, ApiError> {
        let raw: RawWarehouse = parse_raw("warehouse", value)?;
        Ok(Warehouse {
            id: WarehouseId::new(raw.id),
            name: raw.nama,
            location: raw.lokasi.unwrap_or_default(),
            description: raw.deskripsi.unwrap_or_default(),
            created_at: parse_timestamp(raw.dibuat_pada.as_deref()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    nama: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    is_staff: bool,
    #[serde(default)]
    is_superuser: bool,
}

impl FromWire for CurrentUser {
    fn from_wire(value: JsonValue) -> Result<Self, ApiError> {
        let raw: RawUser = parse_raw("current user", value)?;
        Ok(CurrentUser {
            id: raw.id.map(UserId::new),
            username: first_non_empty([
                raw.username.as_deref(),
                raw.nama.as_deref(),
                raw.email.as_deref(),
            ])
            .unwrap_or_default(),
            is_staff: raw.is_staff,
            is_superuser: raw.is_superuser,
        })
    }
}

/// What the atomic transaction endpoint answers after a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub stock: StockRecord,
    /// Present when the server wrote the movement log entry itself.
    pub movement: Option<StockMovement>,
}

impl FromWire for TransactionReceipt {
    /// `{"stok": {...}, "riwayat": {...}}`, or just the updated stock row.
    ///
    /// A bare movement row (`stok` holding an id) carries no stock quantity
    /// and is rejected as a decode failure.
    fn from_wire(value: JsonValue) -> Result<Self, ApiError> {
        let JsonValue::Object(mut map) = value else {
            return Err(ApiError::decode("transaction response: expected an object"));
        };

        match map.remove("stok") {
            Some(stock @ JsonValue::Object(_)) => {
                let movement = match map.remove("riwayat").or_else(|| map.remove("movement")) {
                    Some(m @ JsonValue::Object(_)) => Some(StockMovement::from_wire(m)?),
                    _ => None,
                };
                Ok(TransactionReceipt {
                    stock: StockRecord::from_wire(stock)?,
                    movement,
                })
            }
            Some(_) => Err(ApiError::decode(
                "transaction response: movement row without the updated stock",
            )),
            None if map.contains_key("jumlah") => Ok(TransactionReceipt {
                stock: StockRecord::from_wire(JsonValue::Object(map))?,
                movement: None,
            }),
            None => Err(ApiError::decode("transaction response: missing 'stok'")),
        }
    }
}

/// Issued token from `/auth/token/`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

impl FromWire for TokenResponse {
    fn from_wire(value: JsonValue) -> Result<Self, ApiError> {
        parse_raw("token response", value)
    }
}

/// Body of `POST /stok/transaction/` and of the `/riwayat-stok/` fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockTransaction {
    #[serde(rename = "stok")]
    pub stock_id: StockId,
    #[serde(rename = "tipe")]
    pub kind: MovementKind,
    #[serde(rename = "jumlah")]
    pub quantity: u32,
    #[serde(rename = "catatan")]
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Create/update payload for one of the editable resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Draft {
    Category {
        nama: String,
        deskripsi: String,
    },
    Supplier {
        nama: String,
        kontak: String,
        telepon: String,
        email: String,
        alamat: String,
    },
    Item {
        sku: String,
        nama: String,
        deskripsi: String,
        kategori: CategoryId,
        supplier: Option<SupplierId>,
        satuan: String,
        gambar_url: String,
    },
    Warehouse {
        nama: String,
        lokasi: String,
        deskripsi: String,
    },
    Stock {
        barang: ItemId,
        gudang: WarehouseId,
        jumlah: u32,
        level_reorder: u32,
    },
}

impl Draft {
    pub fn resource(&self) -> crate::resource::Resource {
        use crate::resource::Resource;
        match self {
            Draft::Category { .. } => Resource::Category,
            Draft::Supplier { .. } => Resource::Supplier,
            Draft::Item { .. } => Resource::Item,
            Draft::Warehouse { .. } => Resource::Warehouse,
            Draft::Stock { .. } => Resource::Stock,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

/// Resolve an image reference against the API origin.
///
/// Absolute and protocol-relative URLs pass through; paths are resolved
/// against the server the API lives on. Unparseable input yields `None`.
pub fn resolve_image_url(base: &Url, raw: Option<&str>) -> Option<String> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    base.join(raw).ok().map(String::from)
}
