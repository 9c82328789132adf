//! Suppliers and product categories (reference data maintained in the admin)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use crate::domain::nullable;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    pub name_ar: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "nullable::default_true", deserialize_with = "nullable::or_true")]
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name_ar: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub description_ar: Option<String>,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub sort_order: i32,
    #[serde(default = "nullable::default_true", deserialize_with = "nullable::or_true")]
    pub active: bool,
}

/// Supplier display names keyed by id, used to label joined listings.
#[derive(Clone, Debug, Default)]
pub struct SupplierNames(HashMap<Uuid, String>);

impl SupplierNames {
    pub fn get(&self, id: &Uuid) -> Option<&str> { self.0.get(id).map(String::as_str) }
}

impl FromIterator<Supplier> for SupplierNames {
    fn from_iter<I: IntoIterator<Item = Supplier>>(iter: I) -> Self {
        Self(iter.into_iter().map(|s| (s.id, s.name_ar)).collect())
    }
}
