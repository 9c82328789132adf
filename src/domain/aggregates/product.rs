//! Product Aggregate and catalog filtering

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::cart::NewCartItem;
use crate::domain::nullable;
use crate::domain::value_objects::{Money, Sku};

/// Sentinel the admin and storefront filters use for "no restriction".
pub const ALL: &str = "all";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    #[serde(rename = "name_ar")]
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub sku: Option<Sku>,
    pub price: Money,
    #[serde(default)]
    pub original_price: Option<Money>,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub stock: i32,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub supplier_id: Option<Uuid>,
    #[serde(default = "nullable::default_true", deserialize_with = "nullable::or_true")]
    pub active: bool,
    #[serde(rename = "min_qty", default = "nullable::default_one", deserialize_with = "nullable::at_least_one")]
    pub min_order_qty: u32,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockState { InStock, OutOfStock }

impl Product {
    pub fn stock_state(&self) -> StockState {
        if self.stock <= 0 { StockState::OutOfStock } else { StockState::InStock }
    }

    /// Inactive products stay editable in the admin but are hidden from shoppers.
    pub fn is_listed(&self) -> bool { self.active }

    /// Cart request for this product, honouring its minimum order quantity.
    pub fn to_cart_item(&self, quantity: Option<i64>) -> NewCartItem {
        NewCartItem {
            product_id: self.id.to_string(),
            name: self.name.clone(),
            unit_price: self.price,
            quantity,
            min_order_qty: Some(self.min_order_qty),
            image_ref: self.image_url.clone(),
        }
    }
}

/// Either no restriction or one concrete value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self { Self::All }
}

impl<T: PartialEq> Selection<T> {
    pub fn admits(&self, value: Option<&T>) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => value == Some(wanted),
        }
    }
}

impl Selection<Uuid> {
    /// Parses a query parameter; absent, blank and `all` mean no restriction.
    pub fn parse(raw: Option<&str>) -> Result<Self, uuid::Error> {
        match raw.map(str::trim) {
            None | Some("") | Some(ALL) => Ok(Self::All),
            Some(v) => Uuid::parse_str(v).map(Self::Only),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub search_term: String,
    pub category: Selection<Uuid>,
    pub supplier: Selection<Uuid>,
}

impl ProductFilter {
    /// Case-sensitive substring on name or SKU, AND category, AND supplier.
    pub fn matches(&self, product: &Product) -> bool {
        let term = self.search_term.as_str();
        let text = product.name.contains(term)
            || product.sku.as_ref().is_some_and(|s| s.as_str().contains(term));
        text && self.category.admits(product.category_id.as_ref())
            && self.supplier.admits(product.supplier_id.as_ref())
    }
}

/// Lazily yields the products matching `filter`, in their original order.
pub fn filter_products<'a>(
    products: &'a [Product],
    filter: &'a ProductFilter,
) -> impl Iterator<Item = &'a Product> + 'a {
    products.iter().filter(move |p| filter.matches(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn product(name: &str, sku: Option<&str>, category: Option<Uuid>, supplier: Option<Uuid>) -> Product {
        Product {
            id: Uuid::new_v4(), name: name.into(), name_en: None, sku: sku.map(|s| Sku::new(s).unwrap()),
            price: Money::new(Decimal::new(15, 0)), original_price: None, stock: 3, category_id: category,
            supplier_id: supplier, active: true, min_order_qty: 1, unit: None, image_url: None, created_at: None,
        }
    }

    #[test]
    fn test_decodes_sparse_row() {
        let p: Product = serde_json::from_value(json!({
            "id": "5f0c1a8e-57a4-4b43-9f4a-0d0f5d2b9a11", "name_ar": "جالون مياه 19 لتر", "price": 15,
            "stock": null, "active": null, "min_qty": null, "sku": null, "category_id": null,
        })).unwrap();
        assert_eq!(p.stock_state(), StockState::OutOfStock);
        assert!(p.is_listed());
        assert_eq!(p.min_order_qty, 1);
        assert_eq!(p.price.amount(), Decimal::new(15, 0));
    }

    #[test]
    fn test_filter_is_conjunctive_and_ordered() {
        let water = Uuid::new_v4();
        let coolers = Uuid::new_v4();
        let riyadh = Uuid::new_v4();
        let products = vec![
            product("جالون مياه 19 لتر", Some("GAL-19"), Some(water), Some(riyadh)),
            product("برادة مياه", Some("COOL-1"), Some(coolers), Some(riyadh)),
            product("مياه 1.5 لتر", Some("BOT-15"), Some(water), None),
        ];

        let filter = ProductFilter { search_term: "مياه".into(), category: Selection::Only(water), supplier: Selection::All };
        let names: Vec<_> = filter_products(&products, &filter).map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["جالون مياه 19 لتر", "مياه 1.5 لتر"]);

        let filter = ProductFilter { search_term: String::new(), category: Selection::Only(water), supplier: Selection::Only(riyadh) };
        assert_eq!(filter_products(&products, &filter).count(), 1);

        let filter = ProductFilter { search_term: "nothing".into(), ..ProductFilter::default() };
        assert_eq!(filter_products(&products, &filter).count(), 0);
    }

    #[test]
    fn test_sku_search_is_case_sensitive() {
        let products = vec![product("x", Some("GAL-19"), None, None)];
        let upper = ProductFilter { search_term: "GAL".into(), ..ProductFilter::default() };
        let lower = ProductFilter { search_term: "gal".into(), ..ProductFilter::default() };
        assert_eq!(filter_products(&products, &upper).count(), 1);
        assert_eq!(filter_products(&products, &lower).count(), 0);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let cat = Uuid::new_v4();
        let products = vec![
            product("جالون", Some("A1"), Some(cat), None),
            product("قارورة", Some("A2"), None, None),
            product("جالون كبير", None, Some(cat), None),
        ];
        let filter = ProductFilter { search_term: "جالون".into(), category: Selection::Only(cat), supplier: Selection::All };
        let once: Vec<Product> = filter_products(&products, &filter).cloned().collect();
        let twice: Vec<Product> = filter_products(&once, &filter).cloned().collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_selection_parse() {
        assert_eq!(Selection::parse(Some("all")).unwrap(), Selection::All);
        assert_eq!(Selection::parse(None).unwrap(), Selection::All);
        let id = Uuid::new_v4();
        assert_eq!(Selection::parse(Some(&id.to_string())).unwrap(), Selection::Only(id));
        assert!(Selection::parse(Some("riyadh")).is_err());
    }

    #[test]
    fn test_to_cart_item_uses_min_qty() {
        let mut p = product("مياه 500 مل", None, None, None);
        p.min_order_qty = 12;
        assert_eq!(p.to_cart_item(Some(0)).effective_quantity(), 12);
    }
}
