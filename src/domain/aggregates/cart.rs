//! Cart Aggregate
//!
//! A cart lives for one shopper session and is never persisted. Every
//! mutation recomputes the derived totals, so `totals()` is always in step
//! with `items()`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::domain::value_objects::Money;

/// Saudi VAT, applied to the whole cart subtotal.
pub const VAT_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// Highest unit price a line may carry, the ceiling of a `NUMERIC(12, 2)` column.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Most units a single line may hold.
pub const MAX_LINE_QUANTITY: u32 = 100_000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    #[serde(default)]
    pub image_ref: Option<String>,
}

impl CartItem {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

/// What the storefront sends when a shopper presses "add to cart".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    /// Requested units; `None` means one.
    #[serde(default)]
    pub quantity: Option<i64>,
    /// The product's minimum order quantity, when the caller knows it.
    #[serde(default)]
    pub min_order_qty: Option<u32>,
    #[serde(default)]
    pub image_ref: Option<String>,
}

impl NewCartItem {
    /// Units actually added. Non-positive requests fall back to the minimum
    /// order quantity (or one) so no empty row is ever created.
    pub fn effective_quantity(&self) -> u32 {
        match self.quantity {
            None => 1,
            Some(q) if q >= 1 => u32::try_from(q).unwrap_or(u32::MAX),
            Some(_) => self.min_order_qty.filter(|m| *m >= 1).unwrap_or(1),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub grand_total: Money,
}

/// Subtotal, VAT and grand total for a list of lines. Nothing is rounded.
pub fn compute_totals(items: &[CartItem]) -> CartTotals {
    let subtotal: Money = items.iter().map(CartItem::line_total).sum();
    let tax = subtotal.scale(VAT_RATE);
    CartTotals { subtotal, tax, grand_total: subtotal + tax }
}

#[derive(Clone, Debug)]
pub struct Cart {
    items: Vec<CartItem>,
    totals: CartTotals,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self { Self::new() }
}

impl Cart {
    pub fn new() -> Self {
        let now = Utc::now();
        Self { items: vec![], totals: CartTotals::default(), created_at: now, updated_at: now }
    }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn totals(&self) -> &CartTotals { &self.totals }
    pub fn line_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Units across all lines, as shown on the cart badge.
    pub fn unit_count(&self) -> u64 { self.items.iter().map(|i| u64::from(i.quantity)).sum() }

    /// Adds units of a product, merging with an existing line. The cart is
    /// left untouched when the price or the resulting quantity is out of range.
    pub fn add_item(&mut self, item: NewCartItem) -> Result<(), CartError> {
        let price = item.unit_price.amount();
        if price < Decimal::ZERO || price > MAX_UNIT_PRICE {
            return Err(CartError::PriceOutOfRange(item.product_id));
        }
        let quantity = item.effective_quantity();
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.quantity = checked_quantity(&item.product_id, u64::from(existing.quantity) + u64::from(quantity))?;
        } else {
            let quantity = checked_quantity(&item.product_id, u64::from(quantity))?;
            self.items.push(CartItem {
                product_id: item.product_id,
                name: item.name,
                unit_price: item.unit_price,
                quantity,
                image_ref: item.image_ref,
            });
        }
        self.recalculate();
        Ok(())
    }

    /// Applies `delta` to a line. Returns the new quantity, or `None` when the
    /// line dropped to zero and was removed.
    pub fn change_quantity(&mut self, product_id: &str, delta: i64) -> Result<Option<u32>, CartError> {
        let pos = self.items.iter().position(|i| i.product_id == product_id)
            .ok_or_else(|| CartError::ItemNotFound(product_id.to_string()))?;
        let next = i64::from(self.items[pos].quantity).saturating_add(delta);
        let kept = if next <= 0 {
            self.items.remove(pos);
            None
        } else {
            let q = checked_quantity(product_id, u64::try_from(next).unwrap_or(u64::MAX))?;
            self.items[pos].quantity = q;
            Some(q)
        };
        self.recalculate();
        Ok(kept)
    }

    pub fn remove_item(&mut self, product_id: &str) -> Option<CartItem> {
        let pos = self.items.iter().position(|i| i.product_id == product_id)?;
        let removed = self.items.remove(pos);
        self.recalculate();
        Some(removed)
    }

    fn recalculate(&mut self) {
        self.totals = compute_totals(&self.items);
        self.updated_at = Utc::now();
    }
}

fn checked_quantity(product_id: &str, quantity: u64) -> Result<u32, CartError> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q <= MAX_LINE_QUANTITY)
        .ok_or_else(|| CartError::QuantityOutOfRange(product_id.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Item {0} is not in the cart")]
    ItemNotFound(String),
    #[error("Unit price of {0} must be between 0 and {MAX_UNIT_PRICE}")]
    PriceOutOfRange(String),
    #[error("Quantity of {0} may not exceed {MAX_LINE_QUANTITY}")]
    QuantityOutOfRange(String),
}
