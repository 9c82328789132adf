//! TopRest Commerce
//!
//! Back office and storefront API for a bottled-water marketplace.
//!
//! ## Features
//! - Cart pricing with 15% VAT
//! - Product catalog filtering and CSV import
//! - Supplier subscriptions and plan permissions
//! - Supplier storefront lifecycle with DNS activation tickets
//! - Checkout order placement and admin order management
//! - Subscription invoices and supplier contracts

pub mod config;
pub mod domain;
pub mod http;
pub mod import;
pub mod services;
pub mod store;

use thiserror::Error;
use crate::domain::aggregates::{CartError, OrderError, SessionError, StorefrontError, SubscriptionError};
use crate::import::ImportError;
use crate::store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CommerceError {
    /// Raised before any write is attempted.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Backend(#[from] StoreError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error(transparent)]
    Import(#[from] ImportError),
}

impl CommerceError {
    pub fn validation(message: impl Into<String>) -> Self { Self::Validation(message.into()) }
}

impl From<StorefrontError> for CommerceError {
    fn from(e: StorefrontError) -> Self {
        match e {
            StorefrontError::InvalidTransition { .. } => Self::InvalidTransition(e.to_string()),
            StorefrontError::InconsistentAddress(_) => Self::Backend(StoreError::Backend(e.to_string())),
            _ => Self::Validation(e.to_string()),
        }
    }
}

impl From<CartError> for CommerceError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ItemNotFound(id) => Self::NotFound(format!("cart item {id}")),
            _ => Self::Validation(e.to_string()),
        }
    }
}

impl From<OrderError> for CommerceError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::NoItems => Self::Validation(e.to_string()),
            _ => Self::InvalidTransition(e.to_string()),
        }
    }
}

impl From<SubscriptionError> for CommerceError {
    fn from(e: SubscriptionError) -> Self { Self::Validation(e.to_string()) }
}

impl From<SessionError> for CommerceError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::UnknownRegion(id) => Self::NotFound(format!("region {id}")),
            SessionError::RegionUnavailable(_) => Self::Validation(e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for CommerceError {
    fn from(e: validator::ValidationErrors) -> Self { Self::Validation(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, CommerceError>;
