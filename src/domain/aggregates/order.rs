//! Order Aggregate
//!
//! Orders are placed from a shopper's cart at checkout. Payment itself is
//! taken by an external provider; the order only records which method the
//! shopper picked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::aggregates::cart::CartItem;
use crate::domain::aggregates::session::ShopperSession;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::nullable;
use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { Mada, Visa, ApplePay, StcPay, Tabby, Tamara, BankTransfer, CashOnDelivery }

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 8] = [
        Self::Mada, Self::Visa, Self::ApplePay, Self::StcPay,
        Self::Tabby, Self::Tamara, Self::BankTransfer, Self::CashOnDelivery,
    ];

    /// Buy-now-pay-later providers.
    pub fn is_bnpl(&self) -> bool { matches!(self, Self::Tabby | Self::Tamara) }

    pub fn label_ar(&self) -> &'static str {
        match self {
            Self::Mada => "مدى",
            Self::Visa => "فيزا / ماستر",
            Self::ApplePay => "Apple Pay",
            Self::StcPay => "STC Pay",
            Self::Tabby => "تابي",
            Self::Tamara => "تمارا",
            Self::BankTransfer => "تحويل بنكي",
            Self::CashOnDelivery => "الدفع عند الاستلام",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "Option<String>")]
pub enum OrderStatus { #[default] Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Refunded }

impl From<Option<String>> for OrderStatus {
    fn from(raw: Option<String>) -> Self {
        match raw.as_deref() {
            Some("confirmed") => Self::Confirmed,
            Some("processing") => Self::Processing,
            Some("shipped") => Self::Shipped,
            Some("delivered") => Self::Delivered,
            Some("cancelled") => Self::Cancelled,
            Some("refunded") => Self::Refunded,
            _ => Self::Pending,
        }
    }
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Checks an admin status change for an order holding `item_count`
    /// line items. Cancelled and refunded orders are closed, and a delivered
    /// order can be refunded but not cancelled.
    pub fn transition(self, to: OrderStatus, item_count: usize) -> Result<OrderStatus, OrderError> {
        match (self, to) {
            (Self::Cancelled | Self::Refunded, _) => Err(OrderError::Closed(self)),
            (Self::Delivered, Self::Cancelled) => Err(OrderError::CannotCancel),
            (_, Self::Confirmed) if item_count == 0 => Err(OrderError::NoItems),
            _ => Ok(to),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "Option<String>")]
pub enum PaymentStatus { #[default] Pending, Paid, Refunded }

impl From<Option<String>> for PaymentStatus {
    fn from(raw: Option<String>) -> Self {
        match raw.as_deref() {
            Some("paid") => Self::Paid,
            Some("refunded") => Self::Refunded,
            _ => Self::Pending,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
}

impl LineItem {
    fn from_cart(order_id: Uuid, item: &CartItem) -> Self {
        Self {
            id: Uuid::now_v7(), order_id,
            product_id: Uuid::parse_str(&item.product_id).ok(),
            product_name: item.name.clone(), quantity: item.quantity,
            unit_price: item.unit_price, total_price: item.line_total(),
        }
    }
}

/// Row written to the `orders` table and read back by the admin list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: Uuid,
    #[serde(default)]
    pub order_number: Option<String>,
    pub status: OrderStatus,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub payment_status: PaymentStatus,
    #[serde(default, deserialize_with = "nullable::lenient")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub subtotal: Money,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub total: Money,
    #[serde(default)]
    pub region_id: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Shopper-supplied checkout details.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CheckoutDetails {
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Order {
    id: Uuid,
    order_number: String,
    status: OrderStatus,
    payment: PaymentStatus,
    payment_method: PaymentMethod,
    items: Vec<LineItem>,
    subtotal: Money,
    tax: Money,
    total: Money,
    region_id: &'static str,
    shipping_address: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

impl Order {
    /// Turns the session's cart into a pending order priced exactly as the
    /// cart shows it, delivered to the session's region.
    pub fn place(session: &ShopperSession, details: CheckoutDetails) -> Result<Self, OrderError> {
        let cart = &session.cart;
        if cart.is_empty() { return Err(OrderError::NoItems); }
        let region = session.region().ok_or(OrderError::NoRegion)?;
        let id = Uuid::now_v7();
        let totals = cart.totals();
        let mut order = Self {
            id, order_number: order_number_for(id), status: OrderStatus::Pending, payment: PaymentStatus::Pending,
            payment_method: details.payment_method, items: cart.items().iter().map(|i| LineItem::from_cart(id, i)).collect(),
            subtotal: totals.subtotal, tax: totals.tax, total: totals.grand_total, region_id: region.id,
            shipping_address: details.shipping_address, notes: details.notes, created_at: Utc::now(), events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_id: id, order_number: order.order_number.clone(), total: order.total.amount(),
        }));
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &str { &self.order_number }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn subtotal(&self) -> Money { self.subtotal }
    pub fn tax(&self) -> Money { self.tax }
    pub fn total(&self) -> Money { self.total }
    pub fn region_id(&self) -> &'static str { self.region_id }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn to_record(&self) -> OrderRecord {
        OrderRecord {
            id: self.id, order_number: Some(self.order_number.clone()), status: self.status,
            payment_status: self.payment, payment_method: Some(self.payment_method),
            subtotal: self.subtotal, total: self.total, region_id: Some(self.region_id.to_string()),
            shipping_address: self.shipping_address.clone(),
            notes: self.notes.clone(), created_at: Some(self.created_at),
        }
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

fn order_number_for(id: Uuid) -> String {
    let simple = id.simple().to_string().to_uppercase();
    // v7 ids share their leading timestamp bits, so take the random tail.
    format!("TR-{}", &simple[simple.len() - 8..])
}

/// Admin order list filter: status plus a substring on the order number.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub search_term: String,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn admits(&self, order: &OrderRecord) -> bool {
        let text = order.order_number.as_deref().unwrap_or_default().contains(&self.search_term);
        text && self.status.map_or(true, |s| order.status == s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("order has no items")]
    NoItems,
    #[error("choose a delivery region first")]
    NoRegion,
    #[error("a delivered order cannot be cancelled")]
    CannotCancel,
    #[error("order is {} and can no longer change", .0.as_str())]
    Closed(OrderStatus),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::cart::NewCartItem;
    use rust_decimal::Decimal;

    fn session() -> ShopperSession {
        let mut session = ShopperSession::new();
        session.select_region("riyadh").unwrap();
        session.cart.add_item(NewCartItem {
            product_id: Uuid::new_v4().to_string(), name: "جالون مياه 19 لتر".into(),
            unit_price: Money::new(Decimal::from(15)), quantity: Some(2), min_order_qty: None, image_ref: None,
        }).unwrap();
        session.cart.add_item(NewCartItem {
            product_id: "package-gallon-6".into(), name: "كرتون 6 جالون".into(),
            unit_price: Money::new(Decimal::from(80)), quantity: None, min_order_qty: None, image_ref: None,
        }).unwrap();
        session
    }

    fn details(payment_method: PaymentMethod) -> CheckoutDetails {
        CheckoutDetails { payment_method, shipping_address: Some("الرياض، حي النرجس".into()), notes: None }
    }

    #[test]
    fn test_place_order_from_cart() {
        let mut order = Order::place(&session(), details(PaymentMethod::Tabby)).unwrap();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.subtotal().amount(), Decimal::from(110));
        assert_eq!(order.tax().amount(), Decimal::new(165, 1));
        assert_eq!(order.total().amount(), Decimal::new(1265, 1));
        assert_eq!(order.region_id(), "riyadh");
        assert_eq!(order.items().len(), 2);
        assert!(order.items()[0].product_id.is_some());
        assert!(order.items()[1].product_id.is_none());
        assert!(order.order_number().starts_with("TR-"));
        assert_eq!(order.order_number().len(), 11);
        assert_eq!(order.take_events().len(), 1);
    }

    #[test]
    fn test_checkout_preconditions() {
        let mut empty = ShopperSession::new();
        empty.select_region("jeddah").unwrap();
        assert_eq!(Order::place(&empty, details(PaymentMethod::Mada)).unwrap_err(), OrderError::NoItems);

        let mut no_region = ShopperSession::new();
        no_region.cart = session().cart;
        assert_eq!(Order::place(&no_region, details(PaymentMethod::Mada)).unwrap_err(), OrderError::NoRegion);
    }

    #[test]
    fn test_status_transitions() {
        assert_eq!(OrderStatus::Pending.transition(OrderStatus::Shipped, 1), Ok(OrderStatus::Shipped));
        assert_eq!(OrderStatus::Delivered.transition(OrderStatus::Cancelled, 1), Err(OrderError::CannotCancel));
        assert_eq!(OrderStatus::Delivered.transition(OrderStatus::Refunded, 1), Ok(OrderStatus::Refunded));
        assert_eq!(OrderStatus::Cancelled.transition(OrderStatus::Pending, 1), Err(OrderError::Closed(OrderStatus::Cancelled)));
        assert_eq!(OrderStatus::Pending.transition(OrderStatus::Confirmed, 0), Err(OrderError::NoItems));
        assert_eq!(OrderStatus::Pending.transition(OrderStatus::Confirmed, 2), Ok(OrderStatus::Confirmed));
    }

    #[test]
    fn test_payment_methods() {
        assert_eq!(PaymentMethod::ALL.iter().filter(|m| m.is_bnpl()).count(), 2);
        assert_eq!(serde_json::to_value(PaymentMethod::CashOnDelivery).unwrap(), "cash_on_delivery");
    }

    #[test]
    fn test_filter() {
        let order = Order::place(&session(), details(PaymentMethod::Mada)).unwrap().to_record();
        let number = order.order_number.clone().unwrap();
        assert!(OrderFilter { search_term: number[3..].to_string(), status: Some(OrderStatus::Pending) }.admits(&order));
        assert!(!OrderFilter { search_term: String::new(), status: Some(OrderStatus::Shipped) }.admits(&order));
    }
}
