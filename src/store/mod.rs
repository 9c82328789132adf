//! Data access seam
//!
//! Every read and write goes through [`DataService`]. Rows travel as JSON
//! objects and are decoded into typed structs right at this boundary, so
//! services never touch raw columns.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type Row = serde_json::Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Table {
    Products,
    Categories,
    Suppliers,
    Storefronts,
    SupportTickets,
    SubscriptionPlans,
    SupplierSubscriptions,
    SubscriptionInvoices,
    Contracts,
    Orders,
    OrderItems,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Categories => "categories",
            Self::Suppliers => "suppliers",
            Self::Storefronts => "storefronts",
            Self::SupportTickets => "support_tickets",
            Self::SubscriptionPlans => "subscription_plans",
            Self::SupplierSubscriptions => "supplier_subscriptions",
            Self::SubscriptionInvoices => "subscription_invoices",
            Self::Contracts => "contracts",
            Self::Orders => "orders",
            Self::OrderItems => "order_items",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction { Asc, Desc }

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

/// Equality filters plus an optional sort over one table.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub table: Table,
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn from(table: Table) -> Self {
        Self { table, filters: vec![], order_by: None }
    }

    pub fn eq(mut self, column: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.filters.push((column.to_string(), value));
        self
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy { column: column.to_string(), direction });
        self
    }

    /// Every column name the query refers to.
    pub(crate) fn columns(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|(c, _)| c.as_str()).chain(self.order_by.iter().map(|o| o.column.as_str()))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Message from the backend, passed through untouched.
    #[error("{0}")]
    Backend(String),
    #[error("invalid column name: {0}")]
    InvalidColumn(String),
    #[error("row is not a JSON object")]
    NotAnObject,
    #[error("cannot decode {table} row: {source}")]
    Decode { table: Table, #[source] source: serde_json::Error },
    #[error("cannot encode row: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) => Self::Backend(db.message().to_string()),
            other => Self::Backend(other.to_string()),
        }
    }
}

#[async_trait]
pub trait DataService: Send + Sync {
    async fn fetch_rows(&self, query: &Query) -> Result<Vec<Row>, StoreError>;

    /// Inserts one row and returns it as stored, with generated columns.
    async fn insert_row(&self, table: Table, fields: Row) -> Result<Row, StoreError>;

    /// Returns the number of rows changed.
    async fn update_row(&self, table: Table, id: Uuid, fields: Row) -> Result<u64, StoreError>;

    async fn delete_row(&self, table: Table, id: Uuid) -> Result<u64, StoreError>;

    /// Inserts every row or none of them.
    async fn insert_batch(&self, rows: Vec<(Table, Row)>) -> Result<(), StoreError>;
}

pub fn decode<T: DeserializeOwned>(table: Table, row: Row) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(row)).map_err(|source| StoreError::Decode { table, source })
}

pub async fn fetch_typed<T: DeserializeOwned>(store: &dyn DataService, query: &Query) -> Result<Vec<T>, StoreError> {
    store.fetch_rows(query).await?.into_iter().map(|row| decode(query.table, row)).collect()
}

pub async fn fetch_one<T: DeserializeOwned>(store: &dyn DataService, table: Table, id: Uuid) -> Result<Option<T>, StoreError> {
    let query = Query::from(table).eq("id", id);
    Ok(fetch_typed(store, &query).await?.into_iter().next())
}

pub fn to_row<T: Serialize>(value: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

/// Plain snake_case identifiers only; column names end up inside SQL text.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

pub(crate) fn check_columns<'a>(columns: impl IntoIterator<Item = &'a str>) -> Result<(), StoreError> {
    match columns.into_iter().find(|c| !is_identifier(c)) {
        Some(bad) => Err(StoreError::InvalidColumn(bad.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("supplier_id"));
        assert!(is_identifier("has_cash_van"));
        assert!(!is_identifier("1col"));
        assert!(!is_identifier("name; drop table products"));
        assert!(!is_identifier("Name"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_query_builder() {
        let id = Uuid::nil();
        let q = Query::from(Table::Products).eq("supplier_id", id).eq("active", true).order_by("created_at", Direction::Desc);
        assert_eq!(q.filters[0].1, json!("00000000-0000-0000-0000-000000000000"));
        assert_eq!(q.columns().collect::<Vec<_>>(), vec!["supplier_id", "active", "created_at"]);
    }

    #[test]
    fn test_to_row_rejects_scalars() {
        assert!(matches!(to_row(&5), Err(StoreError::NotAnObject)));
        assert_eq!(to_row(&json!({"a": 1})).unwrap().len(), 1);
    }
}
