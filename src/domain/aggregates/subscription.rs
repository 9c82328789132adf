//! Supplier subscriptions, plans and the permissions they grant

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::events::{DomainEvent, SubscriptionEvent};
use crate::domain::nullable;
use crate::domain::value_objects::Money;

/// Billing months are a flat thirty days, not calendar months. Existing end
/// dates in the store were computed this way.
pub const DAYS_PER_BILLING_MONTH: u64 = 30;

/// A plan quota where `-1` in the store means unlimited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<i64>", into = "i64")]
pub enum PlanLimit {
    Unlimited,
    Max(u32),
}

impl From<Option<i64>> for PlanLimit {
    fn from(raw: Option<i64>) -> Self {
        match raw {
            Some(v) if v < 0 => Self::Unlimited,
            Some(v) => Self::Max(u32::try_from(v).unwrap_or(u32::MAX)),
            None => Self::Max(0),
        }
    }
}

impl From<PlanLimit> for i64 {
    fn from(limit: PlanLimit) -> i64 {
        match limit {
            PlanLimit::Unlimited => -1,
            PlanLimit::Max(n) => i64::from(n),
        }
    }
}

impl PlanLimit {
    pub fn allows(&self, count: u32) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Max(n) => count <= *n,
        }
    }
}

/// Feature switches a plan unlocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFeatures {
    #[serde(rename = "has_custom_domain", default, deserialize_with = "nullable::or_default")]
    pub custom_domain: bool,
    #[serde(rename = "has_dedicated_page", default, deserialize_with = "nullable::or_default")]
    pub dedicated_page: bool,
    #[serde(rename = "has_driver_radar", default, deserialize_with = "nullable::or_default")]
    pub driver_radar: bool,
    #[serde(rename = "has_cash_van", default, deserialize_with = "nullable::or_default")]
    pub cash_van: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub name_ar: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub description_ar: Option<String>,
    pub price_monthly: Money,
    #[serde(default)]
    pub price_yearly: Option<Money>,
    pub max_products: PlanLimit,
    pub max_orders: PlanLimit,
    #[serde(flatten)]
    pub features: PlanFeatures,
    /// Marketing bullet points.
    #[serde(rename = "features", default, deserialize_with = "nullable::or_default")]
    pub highlights: Vec<String>,
    #[serde(default = "nullable::default_true", deserialize_with = "nullable::or_true")]
    pub active: bool,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub sort_order: i32,
}

impl SubscriptionPlan {
    /// Whole-percent saving of paying yearly over twelve monthly payments.
    pub fn yearly_savings_percent(&self) -> Option<Decimal> {
        let yearly = self.price_yearly?.amount();
        let twelve_months = self.price_monthly.amount() * Decimal::from(12);
        if twelve_months.is_zero() { return None; }
        let pct = (Decimal::ONE - yearly / twelve_months) * Decimal::ONE_HUNDRED;
        Some(pct.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "Option<String>")]
pub enum SubscriptionStatus { Pending, Active, Expired, Cancelled }

impl From<Option<String>> for SubscriptionStatus {
    fn from(raw: Option<String>) -> Self {
        match raw.as_deref() {
            Some("active") => Self::Active,
            Some("expired") => Self::Expired,
            Some("cancelled") => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplierSubscription {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Amount charged when the subscription was created. Never re-derived.
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub total_paid: Money,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub auto_renew: bool,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
}

impl SupplierSubscription {
    /// Starts an active subscription today for `months` flat billing months,
    /// charging `plan.price_monthly × months` up front.
    pub fn start(supplier_id: Uuid, plan: &SubscriptionPlan, months: u32, today: NaiveDate) -> Result<(Self, DomainEvent), SubscriptionError> {
        if months == 0 { return Err(SubscriptionError::InvalidTerm); }
        let end_date = today
            .checked_add_days(Days::new(DAYS_PER_BILLING_MONTH * u64::from(months)))
            .ok_or(SubscriptionError::InvalidTerm)?;
        let total_paid = plan.price_monthly.multiply(months);
        let sub = Self {
            id: Uuid::now_v7(), supplier_id, plan_id: plan.id, status: SubscriptionStatus::Active,
            start_date: Some(today), end_date: Some(end_date), total_paid, auto_renew: false,
            payment_method: None, notes: None, created_at: None,
        };
        let event = DomainEvent::Subscription(SubscriptionEvent::Created {
            subscription_id: sub.id, supplier_id, plan_id: plan.id, total_paid: total_paid.amount(),
        });
        Ok((sub, event))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("subscription term must be at least one month")]
    InvalidTerm,
}

/// What an actively subscribed supplier is allowed to use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SupplierPermissions {
    pub subscription_id: Uuid,
    pub supplier_name: Option<String>,
    pub plan_name: Option<String>,
    pub status: SubscriptionStatus,
    #[serde(flatten)]
    pub features: PlanFeatures,
    pub max_products: PlanLimit,
    pub max_orders: PlanLimit,
}

impl SupplierPermissions {
    /// Without a plan nothing is granted.
    pub fn project(sub: &SupplierSubscription, plan: Option<&SubscriptionPlan>, supplier_name: Option<&str>) -> Self {
        Self {
            subscription_id: sub.id,
            supplier_name: supplier_name.map(str::to_string),
            plan_name: plan.map(|p| p.name_ar.clone()),
            status: sub.status,
            features: plan.map(|p| p.features).unwrap_or_default(),
            max_products: plan.map_or(PlanLimit::Max(0), |p| p.max_products),
            max_orders: plan.map_or(PlanLimit::Max(0), |p| p.max_orders),
        }
    }
}
