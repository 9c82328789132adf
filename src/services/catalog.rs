//! Products, categories and suppliers

use serde::Serialize;
use serde_json::json;
use uuid::Uuid;
use crate::domain::aggregates::{filter_products, Category, Product, ProductFilter, StockState, Supplier};
use crate::domain::events::{CatalogEvent, DomainEvent};
use crate::import::{parse_products, SkippedRow};
use crate::store::{fetch_typed, to_row, Direction, Query, Table};
use super::{ensure_found, parse_optional_ref, supplier_names, EventBus, Store};
use crate::Result;

#[derive(Clone, Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub supplier_name: Option<String>,
    pub stock_state: StockState,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProductListing {
    pub products: Vec<ProductView>,
    pub total: usize,
    pub out_of_stock: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub inserted: usize,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Store,
    events: EventBus,
}

impl CatalogService {
    pub fn new(store: Store, events: EventBus) -> Self { Self { store, events } }

    async fn products(&self) -> Result<Vec<Product>> {
        let query = Query::from(Table::Products).order_by("created_at", Direction::Desc);
        Ok(fetch_typed(self.store.as_ref(), &query).await?)
    }

    /// Admin listing: every product, active or not.
    pub async fn list(&self, filter: &ProductFilter) -> Result<ProductListing> {
        let products = self.products().await?;
        let names = supplier_names(self.store.as_ref()).await?;
        let views: Vec<ProductView> = filter_products(&products, filter)
            .map(|p| ProductView {
                supplier_name: p.supplier_id.and_then(|id| names.get(&id).map(str::to_string)),
                stock_state: p.stock_state(),
                product: p.clone(),
            })
            .collect();
        let out_of_stock = views.iter().filter(|v| v.stock_state == StockState::OutOfStock).count();
        Ok(ProductListing { total: views.len(), out_of_stock, products: views })
    }

    /// Shopper listing: like [`Self::list`] but hides inactive products.
    pub async fn storefront_view(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let products = self.products().await?;
        Ok(filter_products(&products, filter).filter(|p| p.is_listed()).cloned().collect())
    }

    pub async fn import_csv(&self, text: &str, default_supplier: Option<&str>) -> Result<ImportReport> {
        let default_supplier = parse_optional_ref("supplier_id", default_supplier)?;
        let outcome = parse_products(text, default_supplier)?;
        let inserted = outcome.rows.len();
        if inserted > 0 {
            let mut rows = Vec::with_capacity(inserted);
            for row in &outcome.rows {
                rows.push((Table::Products, to_row(row)?));
            }
            self.store.insert_batch(rows).await?;
        }
        tracing::info!(inserted, skipped = outcome.skipped.len(), "imported products");
        let event = CatalogEvent::Imported { inserted, skipped: outcome.skipped.len() };
        self.events.publish(vec![DomainEvent::Catalog(event)]).await;
        Ok(ImportReport { inserted, skipped: outcome.skipped })
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<()> {
        let fields = to_row(&json!({ "active": active }))?;
        ensure_found(self.store.update_row(Table::Products, id, fields).await?, "product", id)?;
        tracing::info!(%id, active, "product visibility changed");
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.store.delete_row(Table::Products, id).await?;
        tracing::info!(%id, "product deleted");
        Ok(())
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        let query = Query::from(Table::Categories).order_by("sort_order", Direction::Asc);
        Ok(fetch_typed(self.store.as_ref(), &query).await?)
    }

    pub async fn suppliers(&self) -> Result<Vec<Supplier>> {
        let query = Query::from(Table::Suppliers).order_by("name_ar", Direction::Asc);
        Ok(fetch_typed(self.store.as_ref(), &query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Selection;
    use crate::store::{MemoryStore, StoreError};
    use crate::CommerceError;
    use std::sync::Arc;

    async fn seeded() -> (Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let supplier = Uuid::new_v4();
        store.seed(Table::Suppliers, &json!({"id": supplier, "name_ar": "مياه نوفا"})).await;
        store.seed(Table::Products, &json!({"name_ar": "جالون مياه 19 لتر", "sku": "WTR-19L", "price": 15, "stock": 240, "supplier_id": supplier})).await;
        store.seed(Table::Products, &json!({"name_ar": "مياه 500 مل", "sku": "WTR-500ML", "price": 1.5, "stock": 0, "supplier_id": supplier})).await;
        store.seed(Table::Products, &json!({"name_ar": "برادة مياه", "sku": "DSP-001", "price": 349, "stock": 15, "active": false})).await;
        (store, supplier)
    }

    #[tokio::test]
    async fn test_admin_listing_joins_supplier_and_counts_out_of_stock() {
        let (store, supplier) = seeded().await;
        let svc = CatalogService::new(store, EventBus::disabled());
        let listing = svc.list(&ProductFilter::default()).await.unwrap();
        assert_eq!(listing.total, 3);
        assert_eq!(listing.out_of_stock, 1);

        let filter = ProductFilter { supplier: Selection::Only(supplier), ..ProductFilter::default() };
        let listing = svc.list(&filter).await.unwrap();
        assert_eq!(listing.total, 2);
        assert!(listing.products.iter().all(|p| p.supplier_name.as_deref() == Some("مياه نوفا")));
    }

    #[tokio::test]
    async fn test_storefront_hides_inactive() {
        let (store, _) = seeded().await;
        let svc = CatalogService::new(store, EventBus::disabled());
        let filter = ProductFilter { search_term: "مياه".into(), ..ProductFilter::default() };
        let names: Vec<_> = svc.storefront_view(&filter).await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names.len(), 2);
        assert!(!names.contains(&"برادة مياه".to_string()));
    }

    #[tokio::test]
    async fn test_import_inserts_only_named_rows() {
        let store = Arc::new(MemoryStore::new());
        let svc = CatalogService::new(store.clone(), EventBus::disabled());
        let report = svc.import_csv("name_ar,price,stock\nجالون,15,10\n,20,5", None).await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped.len(), 1);
        let rows = store.rows(Table::Products).await;
        assert_eq!(rows.len(), 1);
        let product: Product = crate::store::decode(Table::Products, rows[0].clone()).unwrap();
        assert_eq!(product.name, "جالون");
        assert_eq!(product.stock, 10);
        assert!(product.active);
    }

    #[tokio::test]
    async fn test_import_failure_inserts_nothing() {
        let store = Arc::new(MemoryStore::new().failing_writes_to(Table::Products));
        let svc = CatalogService::new(store.clone(), EventBus::disabled());
        let err = svc.import_csv("name\nأ\nب", None).await.unwrap_err();
        assert!(matches!(err, CommerceError::Backend(StoreError::Backend(_))));
        assert!(store.rows(Table::Products).await.is_empty());

        let err = svc.import_csv("sku\nA", None).await.unwrap_err();
        assert!(matches!(err, CommerceError::Import(_)));
    }

    #[tokio::test]
    async fn test_toggle_and_delete() {
        let (store, _) = seeded().await;
        let svc = CatalogService::new(store.clone(), EventBus::disabled());
        let first = svc.list(&ProductFilter::default()).await.unwrap().products[0].product.id;

        svc.set_active(first, false).await.unwrap();
        assert!(matches!(svc.set_active(Uuid::new_v4(), true).await, Err(CommerceError::NotFound(_))));

        svc.delete(first).await.unwrap();
        assert_eq!(store.rows(Table::Products).await.len(), 2);
    }
}
