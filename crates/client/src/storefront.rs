//! Public product browser over stock records.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use url::Url;

use gudang_core::{ItemId, StockId};
use gudang_inventory::{Category, Item, StockRecord};

use crate::crud::Catalog;
use crate::error::ClientError;
use crate::gateway::InventoryGateway;
use crate::pagination::Pagination;
use crate::query::ListQuery;
use crate::refresh::{ListView, LoadOutcome};
use crate::resource::Resource;
use crate::wire::resolve_image_url;

/// Shown when a product has no usable image.
pub const NO_IMAGE_PLACEHOLDER: &str = "https://via.placeholder.com/300x200?text=No+Image";

const UNNAMED_PRODUCT: &str = "Produk";

/// One product tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductCard {
    pub stock_id: StockId,
    pub name: String,
    pub quantity: u32,
    pub unit: String,
    pub location: String,
    pub image_url: String,
    pub needs_reorder: bool,
}

impl ProductCard {
    pub fn from_record(record: &StockRecord, base: &Url) -> Self {
        let name = if record.item_name.trim().is_empty() {
            UNNAMED_PRODUCT.to_string()
        } else {
            record.item_name.clone()
        };
        Self {
            stock_id: record.id,
            name,
            quantity: record.quantity,
            unit: record.item_unit.clone(),
            location: record.warehouse_name.clone(),
            image_url: resolve_image_url(base, record.image_url.as_deref())
                .unwrap_or_else(|| NO_IMAGE_PLACEHOLDER.to_string()),
            needs_reorder: record.needs_reorder(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontPage {
    pub query: ListQuery,
    pub cards: Vec<ProductCard>,
    pub pagination: Pagination,
}

impl StorefrontPage {
    /// "Produk tidak ditemukan." state.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

pub struct Storefront {
    gateway: Arc<dyn InventoryGateway>,
    catalog: Catalog,
    /// Origin that relative image paths are resolved against.
    media_base: Url,
    view: ListView<StockRecord>,
}

impl Storefront {
    pub fn new(gateway: Arc<dyn InventoryGateway>, media_base: Url) -> Self {
        Self {
            view: ListView::new(gateway.clone(), Resource::Stock),
            catalog: Catalog::new(gateway.clone()),
            gateway,
            media_base,
        }
    }

    pub async fn browse(&self, query: ListQuery) -> Result<LoadOutcome, ClientError> {
        self.view.load(query).await
    }

    pub fn page(&self) -> StorefrontPage {
        let state = self.view.snapshot();
        StorefrontPage {
            cards: state
                .items
                .iter()
                .map(|record| ProductCard::from_record(record, &self.media_base))
                .collect(),
            query: state.query,
            pagination: state.pagination,
        }
    }

    /// Like [`Storefront::page`], but a card whose stock row carries no image
    /// takes the image of its item record. Lookups that fail keep the placeholder.
    pub async fn page_with_item_images(&self) -> StorefrontPage {
        let state = self.view.snapshot();
        let mut item_images: HashMap<ItemId, Option<String>> = HashMap::new();
        let mut cards = Vec::with_capacity(state.items.len());

        for record in &state.items {
            let mut card = ProductCard::from_record(record, &self.media_base);
            if resolve_image_url(&self.media_base, record.image_url.as_deref()).is_none() {
                if !item_images.contains_key(&record.item_id) {
                    let image = self.item_image(record.item_id).await;
                    item_images.insert(record.item_id, image);
                }
                if let Some(Some(url)) = item_images.get(&record.item_id) {
                    card.image_url = url.clone();
                }
            }
            cards.push(card);
        }

        StorefrontPage {
            cards,
            query: state.query,
            pagination: state.pagination,
        }
    }

    async fn item_image(&self, item_id: ItemId) -> Option<String> {
        match self.catalog.fetch::<Item>(Resource::Item, item_id.get()).await {
            Ok(item) => resolve_image_url(&self.media_base, item.image_url.as_deref()),
            Err(err) => {
                tracing::debug!(item_id = %item_id, error = %err, "item image lookup failed");
                None
            }
        }
    }

    /// Options for the category filter.
    pub async fn categories(&self) -> Result<Vec<Category>, ClientError> {
        let page = self
            .gateway
            .list_page(Resource::Category, &ListQuery::first_page())
            .await?;
        Ok(page.decode::<Category>()?.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryGateway, stock};
    use serde_json::json;

    fn base() -> Url {
        Url::parse("http://127.0.0.1:8000/api/").unwrap()
    }

    #[test]
    fn card_resolves_relative_images_and_flags_reorder() {
        let mut record = stock(1, 4, 10);
        record.image_url = Some("/media/barang/beras.jpg".to_string());
        let card = ProductCard::from_record(&record, &base());
        assert_eq!(card.image_url, "http://127.0.0.1:8000/media/barang/beras.jpg");
        assert!(card.needs_reorder);
        assert_eq!(card.location, "Gudang Utama");
    }

    #[test]
    fn card_falls_back_to_placeholder_and_default_name() {
        let mut record = stock(1, 40, 10);
        record.item_name = "  ".to_string();
        let card = ProductCard::from_record(&record, &base());
        assert_eq!(card.image_url, NO_IMAGE_PLACEHOLDER);
        assert_eq!(card.name, "Produk");
        assert!(!card.needs_reorder);
    }

    #[tokio::test]
    async fn browse_pages_through_products() {
        let fake = Arc::new(InMemoryGateway::with_session(Default::default()));
        for id in 1..=12 {
            fake.insert_stock(stock(id, 20, 10));
        }
        let shop = Storefront::new(fake, base());

        shop.browse(ListQuery::first_page()).await.unwrap();
        let page = shop.page();
        assert_eq!(page.cards.len(), 10);
        assert!(page.pagination.is_visible());
        assert_eq!(page.pagination.next(), Some(2));

        shop.browse(page.query.with_page(2)).await.unwrap();
        assert_eq!(shop.page().cards.len(), 2);
    }

    #[tokio::test]
    async fn missing_stock_image_falls_back_to_the_item_image() {
        let fake = Arc::new(InMemoryGateway::new());
        let mut with_image = stock(1, 20, 10);
        with_image.image_url = Some("/media/barang/teh.jpg".to_string());
        fake.insert_stock(with_image);
        fake.insert_stock(stock(2, 20, 10));
        fake.insert_stock(stock(3, 20, 10));
        fake.set_rows(
            Resource::Item,
            vec![json!({
                "id": 102, "sku": "SKU-2", "nama": "Barang 2", "kategori": 1,
                "satuan": "pcs", "gambar_url": "/media/barang/beras.jpg"
            })],
        );
        let shop = Storefront::new(fake, base());
        shop.browse(ListQuery::first_page()).await.unwrap();

        let images: Vec<String> = shop
            .page_with_item_images()
            .await
            .cards
            .into_iter()
            .map(|c| c.image_url)
            .collect();
        assert_eq!(
            images,
            [
                "http://127.0.0.1:8000/media/barang/teh.jpg",
                "http://127.0.0.1:8000/media/barang/beras.jpg",
                NO_IMAGE_PLACEHOLDER,
            ]
        );
        assert_eq!(shop.page().cards[1].image_url, NO_IMAGE_PLACEHOLDER);
    }

    #[tokio::test]
    async fn categories_come_from_the_first_page() {
        let fake = Arc::new(InMemoryGateway::new());
        fake.set_rows(
            Resource::Category,
            vec![json!({"id": 1, "nama": "Pangan"}), json!({"id": 2, "nama": "Minuman"})],
        );
        let shop = Storefront::new(fake, base());
        let names: Vec<String> = shop
            .categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["Pangan", "Minuman"]);
    }
}
