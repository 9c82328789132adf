//! Application services
//!
//! One service per admin or storefront screen. Each call is an independent
//! round trip to the [`DataService`]: fetch, derive, mutate. Nothing is cached
//! between calls.

use std::sync::Arc;
use uuid::Uuid;
use crate::domain::aggregates::{Supplier, SupplierNames};
use crate::domain::events::DomainEvent;
use crate::store::{fetch_typed, DataService, Query, Table};
use crate::{CommerceError, Result};

pub mod billing;
pub mod catalog;
pub mod orders;
pub mod storefronts;
pub mod subscriptions;

pub use billing::BillingService;
pub use catalog::CatalogService;
pub use orders::OrderService;
pub use storefronts::StorefrontService;
pub use subscriptions::SubscriptionService;

pub type Store = Arc<dyn DataService>;

/// Best-effort publisher for domain events.
#[derive(Clone, Default)]
pub struct EventBus {
    nats: Option<async_nats::Client>,
}

impl EventBus {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn disabled() -> Self { Self::default() }

    /// Failures are logged and never reach the caller.
    pub async fn publish(&self, events: Vec<DomainEvent>) {
        let Some(client) = &self.nats else { return };
        for event in events {
            let subject = event.subject();
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(%subject, error = %e, "failed to encode event");
                    continue;
                }
            };
            if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                tracing::warn!(%subject, error = %e, "failed to publish event");
            }
        }
    }
}

/// Parses a required id field from a request.
pub(crate) fn parse_ref(field: &str, raw: &str) -> Result<Uuid> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CommerceError::validation(format!("{field} is required")));
    }
    Uuid::parse_str(raw).map_err(|_| CommerceError::validation(format!("{field} is not a valid id")))
}

pub(crate) fn parse_optional_ref(field: &str, raw: Option<&str>) -> Result<Option<Uuid>> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => parse_ref(field, r).map(Some),
        None => Ok(None),
    }
}

pub(crate) async fn supplier_names(store: &dyn DataService) -> Result<SupplierNames> {
    let suppliers: Vec<Supplier> = fetch_typed(store, &Query::from(Table::Suppliers)).await?;
    Ok(suppliers.into_iter().collect())
}

/// Maps "no row matched" to `NotFound`.
pub(crate) fn ensure_found(changed: u64, what: &str, id: Uuid) -> Result<()> {
    if changed == 0 {
        return Err(CommerceError::NotFound(format!("{what} {id}")));
    }
    Ok(())
}
