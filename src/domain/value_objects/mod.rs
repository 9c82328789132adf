//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use thiserror::Error;

/// ISO 4217 code of the only currency the storefront trades in.
pub const CURRENCY_CODE: &str = "SAR";
/// Suffix shown after every rendered amount.
pub const CURRENCY_SYMBOL: &str = "ر.س";

const MAX_SKU_LEN: usize = 64;

/// SKU (Stock Keeping Unit) value object.
///
/// Kept exactly as the supplier typed it (apart from surrounding whitespace)
/// because catalog search matches SKUs case-sensitively.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    pub fn new(value: impl Into<String>) -> Result<Self, SkuError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(SkuError::Empty); }
        if value.chars().count() > MAX_SKU_LEN { return Err(SkuError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkuError {
    #[error("SKU empty")]
    Empty,
    #[error("SKU longer than {MAX_SKU_LEN} characters")]
    TooLong,
}

/// An exact SAR amount.
///
/// Arithmetic never rounds; [`Money::rounded`] and [`Money::display`] are the
/// only places a value is cut to two decimals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn multiply(&self, qty: u32) -> Money { Money(self.0 * Decimal::from(qty)) }
    pub fn scale(&self, rate: Decimal) -> Money { Money(self.0 * rate) }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }

    /// Two-decimal value for presentation, half away from zero.
    pub fn rounded(&self) -> Decimal {
        self.0.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Human readable amount, e.g. `126.50 ر.س`.
    pub fn display(&self) -> String { format!("{:.2} {}", self.rounded(), CURRENCY_SYMBOL) }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self { Self(amount) }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money(self.0 + rhs.0) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::ZERO, Add::add) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.display()) }
}
