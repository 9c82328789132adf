//! Supplier storefront provisioning and lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;
use crate::domain::aggregates::storefront::{StorefrontType, Theme};
use crate::domain::aggregates::{Storefront, StorefrontDraft, StorefrontRecord, StorefrontStats, StorefrontStatus, Supplier, SupplierNames};
use crate::domain::events::{DomainEvent, StorefrontEvent};
use crate::store::{fetch_one, fetch_typed, to_row, Direction, Query, Table};
use super::{ensure_found, parse_ref, supplier_names, EventBus, Store};
use crate::{CommerceError, Result};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStorefrontRequest {
    #[validate(length(min = 1, message = "supplier_id is required"))]
    pub supplier_id: String,
    #[serde(default)]
    pub storefront_type: StorefrontType,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub secondary_color: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StorefrontView {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub supplier_name: Option<String>,
    pub storefront_type: StorefrontType,
    pub host: String,
    pub url: String,
    pub theme: Theme,
    pub primary_color: String,
    pub secondary_color: String,
    pub logo_url: Option<String>,
    pub status: StorefrontStatus,
    pub activated_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct StorefrontService {
    store: Store,
    events: EventBus,
    base_domain: String,
}

impl StorefrontService {
    pub fn new(store: Store, events: EventBus, base_domain: impl Into<String>) -> Self {
        Self { store, events, base_domain: base_domain.into() }
    }

    fn view(&self, sf: &Storefront, names: &SupplierNames) -> StorefrontView {
        let (primary, secondary) = sf.colors();
        StorefrontView {
            id: sf.id(),
            supplier_id: sf.supplier_id(),
            supplier_name: names.get(&sf.supplier_id()).map(str::to_string),
            storefront_type: sf.address().kind(),
            host: sf.address().host(&self.base_domain),
            url: sf.address().url(&self.base_domain),
            theme: sf.theme(),
            primary_color: primary.to_string(),
            secondary_color: secondary.to_string(),
            logo_url: sf.logo_url().map(str::to_string),
            status: sf.status(),
            activated_at: sf.activated_at(),
            created_at: sf.created_at(),
        }
    }

    async fn records(&self) -> Result<Vec<StorefrontRecord>> {
        let query = Query::from(Table::Storefronts).order_by("created_at", Direction::Desc);
        Ok(fetch_typed(self.store.as_ref(), &query).await?)
    }

    pub async fn list(&self) -> Result<Vec<StorefrontView>> {
        let names = supplier_names(self.store.as_ref()).await?;
        let mut views = vec![];
        for record in self.records().await? {
            match Storefront::try_from(record) {
                Ok(sf) => views.push(self.view(&sf, &names)),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable storefront"),
            }
        }
        Ok(views)
    }

    pub async fn stats(&self) -> Result<StorefrontStats> {
        let records = self.records().await?;
        Ok(StorefrontStats::tally(records.iter().map(|r| &r.status)))
    }

    /// Creates the storefront and, for custom domains, its DNS activation
    /// ticket in one atomic write.
    pub async fn create(&self, req: CreateStorefrontRequest) -> Result<StorefrontView> {
        req.validate()?;
        let supplier_id = parse_ref("supplier_id", &req.supplier_id)?;
        let supplier: Supplier = fetch_one(self.store.as_ref(), Table::Suppliers, supplier_id)
            .await?
            .ok_or_else(|| CommerceError::NotFound(format!("supplier {supplier_id}")))?;
        let existing = self.store.fetch_rows(&Query::from(Table::Storefronts).eq("supplier_id", supplier_id)).await?;
        if !existing.is_empty() {
            return Err(CommerceError::validation(format!("supplier {supplier_id} already has a storefront")));
        }

        let draft = StorefrontDraft {
            supplier_id,
            storefront_type: req.storefront_type,
            subdomain: req.subdomain,
            custom_domain: req.custom_domain,
            theme: req.theme,
            primary_color: req.primary_color,
            secondary_color: req.secondary_color,
        };
        let provisioned = Storefront::provision(&draft, &supplier.name_ar)?;
        let mut storefront = provisioned.storefront;

        let mut batch = vec![(Table::Storefronts, to_row(&storefront.to_record())?)];
        if let Some(ticket) = &provisioned.dns_ticket {
            batch.push((Table::SupportTickets, to_row(ticket)?));
        }
        self.store.insert_batch(batch).await?;
        tracing::info!(id = %storefront.id(), status = %storefront.status(), "storefront created");

        self.events.publish(storefront.take_events()).await;
        let names: SupplierNames = std::iter::once(supplier).collect();
        Ok(self.view(&storefront, &names))
    }

    async fn load(&self, id: Uuid) -> Result<Storefront> {
        let record: StorefrontRecord = fetch_one(self.store.as_ref(), Table::Storefronts, id)
            .await?
            .ok_or_else(|| CommerceError::NotFound(format!("storefront {id}")))?;
        Ok(Storefront::try_from(record)?)
    }

    async fn save_status(&self, mut storefront: Storefront) -> Result<StorefrontStatus> {
        let fields = to_row(&json!({ "status": storefront.status(), "activated_at": storefront.activated_at() }))?;
        let id = storefront.id();
        ensure_found(self.store.update_row(Table::Storefronts, id, fields).await?, "storefront", id)?;
        tracing::info!(%id, status = %storefront.status(), "storefront status changed");
        self.events.publish(storefront.take_events()).await;
        Ok(storefront.status())
    }

    pub async fn activate(&self, id: Uuid) -> Result<StorefrontStatus> {
        let mut storefront = self.load(id).await?;
        storefront.activate(Utc::now())?;
        self.save_status(storefront).await
    }

    pub async fn suspend(&self, id: Uuid) -> Result<StorefrontStatus> {
        let mut storefront = self.load(id).await?;
        storefront.suspend()?;
        self.save_status(storefront).await
    }

    /// Removes the storefront whatever its state.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.store.delete_row(Table::Storefronts, id).await?;
        tracing::info!(%id, "storefront deleted");
        self.events.publish(vec![DomainEvent::Storefront(StorefrontEvent::Deleted { storefront_id: id })]).await;
        Ok(())
    }
}
