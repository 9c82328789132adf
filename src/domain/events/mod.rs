//! Domain events
//!
//! Raised by aggregates and services, drained with `take_events`, and
//! published on the `toprest.<aggregate>.<event>` subjects when a message bus
//! is configured.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Storefront(StorefrontEvent),
    Subscription(SubscriptionEvent),
    Catalog(CatalogEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StorefrontEvent {
    Created { storefront_id: Uuid, supplier_id: Uuid, status: String },
    DnsTicketOpened { storefront_id: Uuid, ticket_id: Uuid, domain: String },
    Activated { storefront_id: Uuid, activated_at: DateTime<Utc> },
    Suspended { storefront_id: Uuid },
    Deleted { storefront_id: Uuid },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SubscriptionEvent {
    Created { subscription_id: Uuid, supplier_id: Uuid, plan_id: Uuid, total_paid: Decimal },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CatalogEvent {
    Imported { inserted: usize, skipped: usize },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, order_number: String, total: Decimal },
    StatusChanged { order_id: Uuid, status: String },
}

impl DomainEvent {
    /// Message bus subject for this event.
    pub fn subject(&self) -> String {
        let (aggregate, event) = match self {
            Self::Storefront(e) => ("storefront", match e {
                StorefrontEvent::Created { .. } => "created",
                StorefrontEvent::DnsTicketOpened { .. } => "dns_ticket_opened",
                StorefrontEvent::Activated { .. } => "activated",
                StorefrontEvent::Suspended { .. } => "suspended",
                StorefrontEvent::Deleted { .. } => "deleted",
            }),
            Self::Subscription(SubscriptionEvent::Created { .. }) => ("subscription", "created"),
            Self::Catalog(CatalogEvent::Imported { .. }) => ("catalog", "imported"),
            Self::Order(e) => ("order", match e {
                OrderEvent::Placed { .. } => "placed",
                OrderEvent::StatusChanged { .. } => "status_changed",
            }),
        };
        format!("toprest.{aggregate}.{event}")
    }
}
