//! REST resources exposed by the inventory API.

/// A list/detail resource under the API root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Category,
    Supplier,
    Item,
    Warehouse,
    Stock,
    Movement,
}

impl Resource {
    pub const ALL: [Resource; 6] = [
        Resource::Category,
        Resource::Supplier,
        Resource::Item,
        Resource::Warehouse,
        Resource::Stock,
        Resource::Movement,
    ];

    /// Collection path relative to the API root, with trailing slash.
    pub fn collection_path(&self) -> &'static str {
        match self {
            Resource::Category => "kategori/",
            Resource::Supplier => "supplier/",
            Resource::Item => "barang/",
            Resource::Warehouse => "gudang/",
            Resource::Stock => "stok/",
            Resource::Movement => "riwayat-stok/",
        }
    }

    pub fn detail_path(&self, id: impl core::fmt::Display) -> String {
        format!("{}{}/", self.collection_path(), id)
    }

    /// Query key the server uses to filter this resource by item category.
    ///
    /// Stock rows reach the category through their item (`barang__kategori`);
    /// items carry it directly. Other resources have no category filter.
    pub fn category_filter_key(&self) -> Option<&'static str> {
        match self {
            Resource::Stock => Some("barang__kategori"),
            Resource::Item => Some("kategori"),
            _ => None,
        }
    }

    /// Human name used in notices.
    pub fn display_name(&self) -> &'static str {
        match self {
            Resource::Category => "category",
            Resource::Supplier => "supplier",
            Resource::Item => "item",
            Resource::Warehouse => "warehouse",
            Resource::Stock => "stock record",
            Resource::Movement => "stock movement",
        }
    }
}

impl core::str::FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().trim_matches('/').to_ascii_lowercase();
        Resource::ALL
            .into_iter()
            .find(|r| r.collection_path().trim_end_matches('/') == needle)
            .ok_or_else(|| format!("unknown resource '{s}'"))
    }
}

/// Endpoints that are not plain resources.
pub mod endpoints {
    /// Atomic stock transaction (read-validate-write on the server).
    pub const STOCK_TRANSACTION: &str = "stok/transaction/";
    pub const AUTH_TOKEN: &str = "auth/token/";
    pub const REGISTER: &str = "register/";
    pub const CURRENT_USER: &str = "me/";
}
