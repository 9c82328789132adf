//! In-process [`DataService`] used by tests and local demos.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;
use super::{check_columns, to_row, DataService, Direction, Query, Row, StoreError, Table};

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, Vec<Row>>>,
    failing: HashSet<Table>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Every write touching `table` fails with a backend error.
    pub fn failing_writes_to(mut self, table: Table) -> Self {
        self.failing.insert(table);
        self
    }

    /// Stores `value` as-is (plus generated columns) and returns the row.
    pub async fn seed<T: Serialize>(&self, table: Table, value: &T) -> Row {
        let row = complete(to_row(value).unwrap_or_default());
        self.tables.write().await.entry(table).or_default().push(row.clone());
        row
    }

    pub async fn rows(&self, table: Table) -> Vec<Row> {
        self.tables.read().await.get(&table).cloned().unwrap_or_default()
    }

    fn check_writable(&self, table: Table) -> Result<(), StoreError> {
        if self.failing.contains(&table) {
            return Err(StoreError::Backend(format!("permission denied for table {table}")));
        }
        Ok(())
    }
}

fn complete(mut row: Row) -> Row {
    if !row.get("id").is_some_and(|v| !v.is_null()) {
        row.insert("id".into(), Value::String(Uuid::now_v7().to_string()));
    }
    if !row.get("created_at").is_some_and(|v| !v.is_null()) {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        row.insert("created_at".into(), Value::String(now));
    }
    row
}

fn matches_id(row: &Row, id: Uuid) -> bool {
    row.get("id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok()) == Some(id)
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        // nulls sort last, as in Postgres ascending order
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl DataService for MemoryStore {
    async fn fetch_rows(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        check_columns(query.columns())?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|(col, want)| row.get(col).unwrap_or(&Value::Null) == want))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Some(order) = &query.order_by {
            rows.sort_by(|a, b| {
                let ord = compare(a.get(&order.column), b.get(&order.column));
                match order.direction { Direction::Asc => ord, Direction::Desc => ord.reverse() }
            });
        }
        Ok(rows)
    }

    async fn insert_row(&self, table: Table, fields: Row) -> Result<Row, StoreError> {
        self.check_writable(table)?;
        check_columns(fields.keys().map(String::as_str))?;
        let row = complete(fields);
        self.tables.write().await.entry(table).or_default().push(row.clone());
        Ok(row)
    }

    async fn update_row(&self, table: Table, id: Uuid, fields: Row) -> Result<u64, StoreError> {
        self.check_writable(table)?;
        check_columns(fields.keys().map(String::as_str))?;
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for row in tables.entry(table).or_default().iter_mut().filter(|r| matches_id(r, id)) {
            row.extend(fields.clone());
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete_row(&self, table: Table, id: Uuid) -> Result<u64, StoreError> {
        self.check_writable(table)?;
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|r| !matches_id(r, id));
        Ok((before - rows.len()) as u64)
    }

    async fn insert_batch(&self, rows: Vec<(Table, Row)>) -> Result<(), StoreError> {
        for (table, fields) in &rows {
            self.check_writable(*table)?;
            check_columns(fields.keys().map(String::as_str))?;
        }
        let mut tables = self.tables.write().await;
        for (table, fields) in rows {
            tables.entry(table).or_default().push(complete(fields));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row { v.as_object().cloned().unwrap() }

    #[tokio::test]
    async fn test_fetch_filters_and_sorts() {
        let store = MemoryStore::new();
        store.seed(Table::SubscriptionPlans, &json!({"name_ar": "ب", "sort_order": 2, "active": true})).await;
        store.seed(Table::SubscriptionPlans, &json!({"name_ar": "أ", "sort_order": 1, "active": true})).await;
        store.seed(Table::SubscriptionPlans, &json!({"name_ar": "ج", "sort_order": 0, "active": false})).await;

        let q = Query::from(Table::SubscriptionPlans).eq("active", true).order_by("sort_order", Direction::Asc);
        let rows = store.fetch_rows(&q).await.unwrap();
        let names: Vec<_> = rows.iter().map(|r| r["name_ar"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["أ", "ب"]);
        assert!(rows.iter().all(|r| r.contains_key("id") && r.contains_key("created_at")));
    }

    #[tokio::test]
    async fn test_update_and_delete_by_id() {
        let store = MemoryStore::new();
        let inserted = store.insert_row(Table::Products, row(json!({"name_ar": "جالون", "active": true}))).await.unwrap();
        let id = Uuid::parse_str(inserted["id"].as_str().unwrap()).unwrap();

        assert_eq!(store.update_row(Table::Products, id, row(json!({"active": false}))).await.unwrap(), 1);
        assert_eq!(store.rows(Table::Products).await[0]["active"], json!(false));
        assert_eq!(store.update_row(Table::Products, Uuid::new_v4(), row(json!({"active": true}))).await.unwrap(), 0);

        assert_eq!(store.delete_row(Table::Products, id).await.unwrap(), 1);
        assert!(store.rows(Table::Products).await.is_empty());
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let store = MemoryStore::new().failing_writes_to(Table::SupportTickets);
        let batch = vec![
            (Table::Storefronts, row(json!({"status": "dns_pending"}))),
            (Table::SupportTickets, row(json!({"title": "x"}))),
        ];
        let err = store.insert_batch(batch).await.unwrap_err();
        assert_eq!(err.to_string(), "permission denied for table support_tickets");
        assert!(store.rows(Table::Storefronts).await.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_bad_columns() {
        let store = MemoryStore::new();
        let err = store.insert_row(Table::Products, row(json!({"bad column": 1}))).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidColumn(_)));
    }
}
