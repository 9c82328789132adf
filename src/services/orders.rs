//! Cart quotes, checkout and admin order management
//!
//! Checkout re-prices every line from the catalog; prices sent by the client
//! are only used for quotes.

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;
use crate::domain::aggregates::{
    Cart, CartItem, CartTotals, CheckoutDetails, NewCartItem, Order, OrderFilter, OrderRecord, OrderStatus,
    PaymentMethod, Product, ShopperSession,
};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Money, CURRENCY_CODE};
use crate::store::{fetch_one, fetch_typed, to_row, Direction, Query, Table};
use super::{ensure_found, parse_ref, EventBus, Store};
use crate::{CommerceError, Result};

#[derive(Clone, Debug, Serialize)]
pub struct CartQuote {
    pub items: Vec<CartItem>,
    #[serde(flatten)]
    pub totals: CartTotals,
    pub unit_count: u64,
    pub line_count: usize,
    pub currency: &'static str,
    /// Grand total as shown to the shopper.
    pub display_total: String,
}

impl CartQuote {
    fn of(cart: &Cart) -> Self {
        Self {
            items: cart.items().to_vec(),
            totals: *cart.totals(),
            unit_count: cart.unit_count(),
            line_count: cart.line_count(),
            currency: CURRENCY_CODE,
            display_total: cart.totals().grand_total.display(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuantityChange {
    pub product_id: String,
    pub delta: i64,
}

/// The shopper's current lines plus the edit to apply to them.
#[derive(Debug, Clone, Deserialize)]
pub struct CartAdjustment {
    pub items: Vec<NewCartItem>,
    #[serde(default)]
    pub change: Option<QuantityChange>,
    /// Line to drop; a product that is not in the cart is ignored.
    #[serde(default)]
    pub remove: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutLine {
    pub product_id: String,
    #[serde(default)]
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "region_id is required"))]
    pub region_id: String,
    #[validate(length(min = 1, message = "cart is empty"))]
    pub items: Vec<CheckoutLine>,
    #[serde(flatten)]
    pub details: CheckoutDetails,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderReceipt {
    pub id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub region_id: String,
    pub payment_method: PaymentMethod,
    pub buy_now_pay_later: bool,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

#[derive(Clone)]
pub struct OrderService {
    store: Store,
    events: EventBus,
}

impl OrderService {
    pub fn new(store: Store, events: EventBus) -> Self { Self { store, events } }

    /// Prices a cart without touching the store.
    pub fn quote(items: Vec<NewCartItem>) -> Result<CartQuote> {
        Ok(CartQuote::of(&Self::build_cart(items)?))
    }

    /// Rebuilds the cart, applies a quantity change and/or a removal, and
    /// prices the result.
    pub fn adjust(req: CartAdjustment) -> Result<CartQuote> {
        let mut cart = Self::build_cart(req.items)?;
        if let Some(change) = req.change {
            cart.change_quantity(&change.product_id, change.delta)?;
        }
        if let Some(product_id) = req.remove {
            cart.remove_item(&product_id);
        }
        Ok(CartQuote::of(&cart))
    }

    fn build_cart(items: Vec<NewCartItem>) -> Result<Cart> {
        let mut cart = Cart::new();
        for item in items {
            cart.add_item(item)?;
        }
        Ok(cart)
    }

    pub async fn checkout(&self, req: CheckoutRequest) -> Result<OrderReceipt> {
        req.validate()?;
        let mut session = ShopperSession::new();
        session.select_region(req.region_id.trim())?;
        for line in &req.items {
            let id = parse_ref("product_id", &line.product_id)?;
            let product: Product = fetch_one(self.store.as_ref(), Table::Products, id)
                .await?
                .ok_or_else(|| CommerceError::NotFound(format!("product {id}")))?;
            if !product.is_listed() {
                return Err(CommerceError::validation(format!("{} is not available", product.name)));
            }
            session.cart.add_item(product.to_cart_item(line.quantity))?;
        }

        let mut order = Order::place(&session, req.details)?;
        let mut batch = vec![(Table::Orders, to_row(&order.to_record())?)];
        for item in order.items() {
            batch.push((Table::OrderItems, to_row(item)?));
        }
        self.store.insert_batch(batch).await?;
        tracing::info!(id = %order.id(), number = order.order_number(), total = %order.total(), "order placed");
        self.events.publish(order.take_events()).await;

        Ok(OrderReceipt {
            id: order.id(),
            order_number: order.order_number().to_string(),
            status: order.status(),
            region_id: order.region_id().to_string(),
            payment_method: order.payment_method(),
            buy_now_pay_later: order.payment_method().is_bnpl(),
            subtotal: order.subtotal(),
            tax: order.tax(),
            total: order.total(),
        })
    }

    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<OrderRecord>> {
        let query = Query::from(Table::Orders).order_by("created_at", Direction::Desc);
        let orders: Vec<OrderRecord> = fetch_typed(self.store.as_ref(), &query).await?;
        Ok(orders.into_iter().filter(|o| filter.admits(o)).collect())
    }

    pub async fn set_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderStatus> {
        let order: OrderRecord = fetch_one(self.store.as_ref(), Table::Orders, id)
            .await?
            .ok_or_else(|| CommerceError::NotFound(format!("order {id}")))?;
        let items = self.store.fetch_rows(&Query::from(Table::OrderItems).eq("order_id", id)).await?;
        let next = order
            .status
            .transition(status, items.len())
            .map_err(|e| CommerceError::InvalidTransition(e.to_string()))?;

        let fields = to_row(&json!({ "status": next }))?;
        ensure_found(self.store.update_row(Table::Orders, id, fields).await?, "order", id)?;
        tracing::info!(%id, from = order.status.as_str(), to = next.as_str(), "order status changed");
        let event = OrderEvent::StatusChanged { order_id: id, status: next.as_str().to_string() };
        self.events.publish(vec![DomainEvent::Order(event)]).await;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use rust_decimal::Decimal;
    use std::sync::Arc;

    async fn setup(store: MemoryStore) -> (Arc<MemoryStore>, OrderService, Uuid, Uuid) {
        let store = Arc::new(store);
        let gallon = Uuid::new_v4();
        let carton = Uuid::new_v4();
        store.seed(Table::Products, &json!({"id": gallon, "name_ar": "جالون مياه 19 لتر", "price": 15, "stock": 240})).await;
        store.seed(Table::Products, &json!({"id": carton, "name_ar": "كرتون 6 جالون", "price": 80, "stock": 50})).await;
        let svc = OrderService::new(store.clone(), EventBus::disabled());
        (store, svc, gallon, carton)
    }

    fn checkout(region: &str, lines: &[(Uuid, Option<i64>)], method: PaymentMethod) -> CheckoutRequest {
        CheckoutRequest {
            region_id: region.into(),
            items: lines.iter().map(|(id, q)| CheckoutLine { product_id: id.to_string(), quantity: *q }).collect(),
            details: CheckoutDetails { payment_method: method, shipping_address: Some("حي الملقا".into()), notes: None },
        }
    }

    fn line(id: &str, price: i64, qty: i64) -> NewCartItem {
        NewCartItem {
            product_id: id.into(), name: id.into(), unit_price: Money::new(Decimal::from(price)),
            quantity: Some(qty), min_order_qty: None, image_ref: None,
        }
    }

    #[test]
    fn test_quote() {
        let quote = OrderService::quote(vec![line("gallon", 15, 2), line("carton", 80, 1)]).unwrap();
        assert_eq!(quote.totals.subtotal.amount(), Decimal::from(110));
        assert_eq!(quote.totals.tax.amount(), Decimal::new(165, 1));
        assert_eq!(quote.totals.grand_total.amount(), Decimal::new(1265, 1));
        assert_eq!(quote.unit_count, 3);
        assert_eq!(quote.line_count, 2);
        assert_eq!(quote.display_total, "126.50 ر.س");
        assert_eq!(quote.currency, "SAR");
    }

    #[test]
    fn test_quote_rejects_overflowing_price() {
        let mut huge = line("gallon", 0, 2);
        huge.unit_price = Money::new(Decimal::MAX);
        assert!(matches!(OrderService::quote(vec![huge]), Err(CommerceError::Validation(_))));
        let bulk = line("gallon", 15, i64::MAX);
        assert!(matches!(OrderService::quote(vec![bulk]), Err(CommerceError::Validation(_))));
    }

    #[test]
    fn test_adjust_changes_and_removes_lines() {
        let items = vec![line("gallon", 15, 2), line("carton", 80, 1)];
        let more = CartAdjustment {
            items: items.clone(),
            change: Some(QuantityChange { product_id: "gallon".into(), delta: 3 }),
            remove: None,
        };
        let quote = OrderService::adjust(more).unwrap();
        assert_eq!(quote.unit_count, 6);
        assert_eq!(quote.totals.subtotal.amount(), Decimal::from(155));

        let drop_gallon = CartAdjustment {
            items: items.clone(),
            change: Some(QuantityChange { product_id: "gallon".into(), delta: -2 }),
            remove: Some("carton".into()),
        };
        let quote = OrderService::adjust(drop_gallon).unwrap();
        assert!(quote.items.is_empty());
        assert!(quote.totals.grand_total.is_zero());

        let missing = CartAdjustment {
            items,
            change: Some(QuantityChange { product_id: "bottle".into(), delta: 1 }),
            remove: None,
        };
        assert!(matches!(OrderService::adjust(missing), Err(CommerceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_checkout_writes_order_and_items() {
        let (store, svc, gallon, carton) = setup(MemoryStore::new()).await;
        let receipt = svc.checkout(checkout("riyadh", &[(gallon, Some(2)), (carton, None)], PaymentMethod::Tamara)).await.unwrap();
        assert_eq!(receipt.total.amount(), Decimal::new(1265, 1));
        assert!(receipt.buy_now_pay_later);
        assert_eq!(receipt.status, OrderStatus::Pending);

        let orders = store.rows(Table::Orders).await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0]["payment_status"], "pending");
        assert_eq!(orders[0]["region_id"], "riyadh");
        assert_eq!(store.rows(Table::OrderItems).await.len(), 2);
    }

    #[tokio::test]
    async fn test_checkout_rejections() {
        let (store, svc, gallon, _) = setup(MemoryStore::new()).await;
        let tabuk = svc.checkout(checkout("tabuk", &[(gallon, None)], PaymentMethod::Mada)).await;
        assert!(matches!(tabuk, Err(CommerceError::Validation(_))));
        let empty = svc.checkout(checkout("riyadh", &[], PaymentMethod::Mada)).await;
        assert!(matches!(empty, Err(CommerceError::Validation(_))));
        let unknown = svc.checkout(checkout("riyadh", &[(Uuid::new_v4(), None)], PaymentMethod::Mada)).await;
        assert!(matches!(unknown, Err(CommerceError::NotFound(_))));
        assert!(store.rows(Table::Orders).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_item_insert_leaves_no_order() {
        let (store, svc, gallon, _) = setup(MemoryStore::new().failing_writes_to(Table::OrderItems)).await;
        let err = svc.checkout(checkout("jeddah", &[(gallon, Some(1))], PaymentMethod::CashOnDelivery)).await.unwrap_err();
        assert!(matches!(err, CommerceError::Backend(StoreError::Backend(_))));
        assert!(store.rows(Table::Orders).await.is_empty());
    }

    #[tokio::test]
    async fn test_status_rules() {
        let (store, svc, gallon, _) = setup(MemoryStore::new()).await;
        let receipt = svc.checkout(checkout("dammam", &[(gallon, Some(1))], PaymentMethod::Visa)).await.unwrap();

        assert_eq!(svc.set_status(receipt.id, OrderStatus::Confirmed).await.unwrap(), OrderStatus::Confirmed);
        assert_eq!(svc.set_status(receipt.id, OrderStatus::Delivered).await.unwrap(), OrderStatus::Delivered);
        assert!(matches!(svc.set_status(receipt.id, OrderStatus::Cancelled).await, Err(CommerceError::InvalidTransition(_))));

        let empty = store.seed(Table::Orders, &json!({"order_number": "TR-EMPTY001", "status": "pending"})).await;
        let empty_id = Uuid::parse_str(empty["id"].as_str().unwrap()).unwrap();
        assert!(matches!(svc.set_status(empty_id, OrderStatus::Confirmed).await, Err(CommerceError::InvalidTransition(_))));

        let delivered = svc.list(&OrderFilter { status: Some(OrderStatus::Delivered), ..OrderFilter::default() }).await.unwrap();
        assert_eq!(delivered.len(), 1);
        let search = svc.list(&OrderFilter { search_term: "EMPTY".into(), status: None }).await.unwrap();
        assert_eq!(search.len(), 1);
        assert!(matches!(svc.set_status(Uuid::new_v4(), OrderStatus::Shipped).await, Err(CommerceError::NotFound(_))));
    }
}
