//! Storefront Aggregate
//!
//! A supplier-branded front end reachable either on a platform subdomain or
//! on the supplier's own domain. Subdomain storefronts wait for an admin in
//! `pending`; custom-domain storefronts wait for the DNS cutover in
//! `dns_pending` and come with a support ticket for the operator who does it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::events::{DomainEvent, StorefrontEvent};

pub const DEFAULT_PRIMARY_COLOR: &str = "#0ea5e9";
pub const DEFAULT_SECONDARY_COLOR: &str = "#1e293b";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "Option<String>")]
pub enum StorefrontStatus { Pending, DnsPending, Active, Suspended }

impl From<Option<String>> for StorefrontStatus {
    fn from(raw: Option<String>) -> Self {
        match raw.as_deref() {
            Some("dns_pending") => Self::DnsPending,
            Some("active") => Self::Active,
            Some("suspended") => Self::Suspended,
            _ => Self::Pending,
        }
    }
}

impl StorefrontStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::DnsPending => "dns_pending",
            Self::Active => "active",
            Self::Suspended => "suspended",
        }
    }
}

impl std::fmt::Display for StorefrontStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorefrontType {
    #[default]
    Subdomain,
    CustomDomain,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Fast,
    Wholesale,
    Luxury,
}

/// Where the storefront is served. Exactly one address exists per storefront.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorefrontAddress {
    Subdomain(String),
    CustomDomain(String),
}

impl StorefrontAddress {
    pub fn kind(&self) -> StorefrontType {
        match self {
            Self::Subdomain(_) => StorefrontType::Subdomain,
            Self::CustomDomain(_) => StorefrontType::CustomDomain,
        }
    }

    pub fn host(&self, base_domain: &str) -> String {
        match self {
            Self::Subdomain(sub) => format!("{sub}.{base_domain}"),
            Self::CustomDomain(domain) => domain.clone(),
        }
    }

    pub fn url(&self, base_domain: &str) -> String { format!("https://{}", self.host(base_domain)) }
}

/// Lower-cases and keeps only `[a-z0-9-]`.
pub fn normalize_subdomain(raw: &str) -> String {
    raw.to_lowercase().chars().filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-').collect()
}

fn is_hex_color(raw: &str) -> bool {
    raw.len() == 7 && raw.starts_with('#') && raw.chars().skip(1).all(|c| c.is_ascii_hexdigit())
}

/// Admin input for a new storefront.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct StorefrontDraft {
    pub supplier_id: Uuid,
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

impl StorefrontDraft {
    fn address(&self) -> Result<StorefrontAddress, StorefrontError> {
        match self.storefront_type {
            StorefrontType::Subdomain => {
                let sub = normalize_subdomain(self.subdomain.as_deref().unwrap_or_default());
                if sub.is_empty() { return Err(StorefrontError::MissingSubdomain); }
                Ok(StorefrontAddress::Subdomain(sub))
            }
            StorefrontType::CustomDomain => {
                let domain = self.custom_domain.as_deref().unwrap_or_default().trim().to_lowercase();
                if domain.is_empty() { return Err(StorefrontError::MissingCustomDomain); }
                Ok(StorefrontAddress::CustomDomain(domain))
            }
        }
    }
}

fn color_or(raw: Option<&str>, fallback: &str) -> Result<String, StorefrontError> {
    match raw.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(fallback.to_string()),
        Some(c) if is_hex_color(c) => Ok(c.to_lowercase()),
        Some(c) => Err(StorefrontError::InvalidColor(c.to_string())),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketType { DnsActivation }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority { Low, Normal, High }

/// Manual work item for the platform operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub title: String,
    pub description: String,
    pub ticket_type: TicketType,
    pub priority: TicketPriority,
}

impl SupportTicket {
    pub fn dns_activation(supplier_id: Uuid, supplier_name: &str, domain: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            supplier_id,
            title: format!("طلب تفعيل DNS للشريك: {supplier_name}"),
            description: format!("النطاق المطلوب: {domain}\nيرجى إعداد سجلات DNS وتوجيهها."),
            ticket_type: TicketType::DnsActivation,
            priority: TicketPriority::High,
        }
    }
}

/// Database shape of a storefront row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorefrontRecord {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub storefront_type: StorefrontType,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub custom_domain: Option<String>,
    #[serde(default, deserialize_with = "crate::domain::nullable::or_default")]
    pub theme: Theme,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub secondary_color: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    pub status: StorefrontStatus,
    #[serde(default)]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct Storefront {
    id: Uuid,
    supplier_id: Uuid,
    address: StorefrontAddress,
    theme: Theme,
    primary_color: String,
    secondary_color: String,
    logo_url: Option<String>,
    status: StorefrontStatus,
    activated_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    events: Vec<DomainEvent>,
}

/// A freshly created storefront plus the ticket that must be stored with it.
#[derive(Clone, Debug)]
pub struct ProvisionedStorefront {
    pub storefront: Storefront,
    pub dns_ticket: Option<SupportTicket>,
}

impl Storefront {
    pub fn provision(draft: &StorefrontDraft, supplier_name: &str) -> Result<ProvisionedStorefront, StorefrontError> {
        let address = draft.address()?;
        let primary_color = color_or(draft.primary_color.as_deref(), DEFAULT_PRIMARY_COLOR)?;
        let secondary_color = color_or(draft.secondary_color.as_deref(), DEFAULT_SECONDARY_COLOR)?;
        let status = match address.kind() {
            StorefrontType::Subdomain => StorefrontStatus::Pending,
            StorefrontType::CustomDomain => StorefrontStatus::DnsPending,
        };
        let mut storefront = Self {
            id: Uuid::now_v7(), supplier_id: draft.supplier_id, address, theme: draft.theme,
            primary_color, secondary_color, logo_url: None, status, activated_at: None,
            created_at: Some(Utc::now()), events: vec![],
        };
        storefront.raise_event(DomainEvent::Storefront(StorefrontEvent::Created {
            storefront_id: storefront.id, supplier_id: storefront.supplier_id, status: status.as_str().to_string(),
        }));

        let dns_ticket = match &storefront.address {
            StorefrontAddress::CustomDomain(domain) => {
                let ticket = SupportTicket::dns_activation(storefront.supplier_id, supplier_name, domain);
                let event = StorefrontEvent::DnsTicketOpened { storefront_id: storefront.id, ticket_id: ticket.id, domain: domain.clone() };
                storefront.raise_event(DomainEvent::Storefront(event));
                Some(ticket)
            }
            StorefrontAddress::Subdomain(_) => None,
        };
        Ok(ProvisionedStorefront { storefront, dns_ticket })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn supplier_id(&self) -> Uuid { self.supplier_id }
    pub fn address(&self) -> &StorefrontAddress { &self.address }
    pub fn theme(&self) -> Theme { self.theme }
    pub fn colors(&self) -> (&str, &str) { (&self.primary_color, &self.secondary_color) }
    pub fn logo_url(&self) -> Option<&str> { self.logo_url.as_deref() }
    pub fn status(&self) -> StorefrontStatus { self.status }
    pub fn activated_at(&self) -> Option<DateTime<Utc>> { self.activated_at }
    pub fn created_at(&self) -> Option<DateTime<Utc>> { self.created_at }

    /// `pending`, `dns_pending` or `suspended` to `active`.
    pub fn activate(&mut self, now: DateTime<Utc>) -> Result<(), StorefrontError> {
        if self.status == StorefrontStatus::Active {
            return Err(StorefrontError::InvalidTransition { from: self.status, action: "activate" });
        }
        self.status = StorefrontStatus::Active;
        self.activated_at = Some(now);
        self.raise_event(DomainEvent::Storefront(StorefrontEvent::Activated { storefront_id: self.id, activated_at: now }));
        Ok(())
    }

    pub fn suspend(&mut self) -> Result<(), StorefrontError> {
        if self.status != StorefrontStatus::Active {
            return Err(StorefrontError::InvalidTransition { from: self.status, action: "suspend" });
        }
        self.status = StorefrontStatus::Suspended;
        self.raise_event(DomainEvent::Storefront(StorefrontEvent::Suspended { storefront_id: self.id }));
        Ok(())
    }

    pub fn to_record(&self) -> StorefrontRecord {
        let (subdomain, custom_domain) = match &self.address {
            StorefrontAddress::Subdomain(s) => (Some(s.clone()), None),
            StorefrontAddress::CustomDomain(d) => (None, Some(d.clone())),
        };
        StorefrontRecord {
            id: self.id, supplier_id: self.supplier_id, storefront_type: self.address.kind(), subdomain, custom_domain,
            theme: self.theme, primary_color: Some(self.primary_color.clone()),
            secondary_color: Some(self.secondary_color.clone()), logo_url: self.logo_url.clone(),
            status: self.status, activated_at: self.activated_at, created_at: self.created_at,
        }
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

impl TryFrom<StorefrontRecord> for Storefront {
    type Error = StorefrontError;

    fn try_from(r: StorefrontRecord) -> Result<Self, Self::Error> {
        let address = match (r.storefront_type, r.subdomain, r.custom_domain) {
            (StorefrontType::Subdomain, Some(s), None) if !s.is_empty() => StorefrontAddress::Subdomain(s),
            (StorefrontType::CustomDomain, None, Some(d)) if !d.is_empty() => StorefrontAddress::CustomDomain(d),
            _ => return Err(StorefrontError::InconsistentAddress(r.id)),
        };
        Ok(Self {
            id: r.id, supplier_id: r.supplier_id, address, theme: r.theme,
            primary_color: r.primary_color.unwrap_or_else(|| DEFAULT_PRIMARY_COLOR.to_string()),
            secondary_color: r.secondary_color.unwrap_or_else(|| DEFAULT_SECONDARY_COLOR.to_string()),
            logo_url: r.logo_url, status: r.status, activated_at: r.activated_at, created_at: r.created_at, events: vec![],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorefrontError {
    #[error("subdomain is required")]
    MissingSubdomain,
    #[error("custom domain is required")]
    MissingCustomDomain,
    #[error("invalid colour {0}, expected #rrggbb")]
    InvalidColor(String),
    #[error("cannot {action} a storefront in state {from}")]
    InvalidTransition { from: StorefrontStatus, action: &'static str },
    #[error("storefront {0} must have exactly one address matching its type")]
    InconsistentAddress(Uuid),
}

/// Counters shown above the storefront grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StorefrontStats {
    pub total: usize,
    pub active: usize,
    pub pending: usize,
    pub suspended: usize,
}

impl StorefrontStats {
    pub fn tally<'a>(statuses: impl IntoIterator<Item = &'a StorefrontStatus>) -> Self {
        statuses.into_iter().fold(Self::default(), |mut s, status| {
            s.total += 1;
            match status {
                StorefrontStatus::Active => s.active += 1,
                StorefrontStatus::Pending | StorefrontStatus::DnsPending => s.pending += 1,
                StorefrontStatus::Suspended => s.suspended += 1,
            }
            s
        })
    }
}
