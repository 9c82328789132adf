//! Postgres-backed [`DataService`].
//!
//! Rows are read with `to_jsonb(t)` and written through
//! `jsonb_populate_record`, so one code path serves every table and Postgres
//! does the column type coercion.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;
use super::{check_columns, DataService, Direction, Query, Row, StoreError, Table};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

fn column_list(fields: &Row) -> String {
    fields.keys().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", ")
}

fn select_sql(query: &Query) -> String {
    let mut sql = format!("SELECT to_jsonb(t) FROM {} t", query.table);
    for (i, (column, _)) in query.filters.iter().enumerate() {
        sql.push_str(if i == 0 { " WHERE " } else { " AND " });
        sql.push_str(&format!("to_jsonb(t) -> '{column}' = ${}", i + 1));
    }
    if let Some(order) = &query.order_by {
        let dir = match order.direction { Direction::Asc => "ASC", Direction::Desc => "DESC" };
        sql.push_str(&format!(" ORDER BY t.\"{}\" {dir}", order.column));
    }
    sql
}

fn insert_sql(table: Table, fields: &Row) -> String {
    let cols = column_list(fields);
    format!("INSERT INTO {table} ({cols}) SELECT {cols} FROM jsonb_populate_record(NULL::{table}, $1) RETURNING to_jsonb({table}.*)")
}

fn update_sql(table: Table, fields: &Row) -> String {
    let cols = column_list(fields);
    format!("UPDATE {table} SET ({cols}) = (SELECT {cols} FROM jsonb_populate_record(NULL::{table}, $1)) WHERE id = $2")
}

fn into_row(value: Value) -> Result<Row, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

#[async_trait]
impl DataService for PgStore {
    async fn fetch_rows(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        check_columns(query.columns())?;
        let sql = select_sql(query);
        let mut q = sqlx::query_scalar::<_, Value>(&sql);
        for (_, value) in &query.filters {
            q = q.bind(value.clone());
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(into_row).collect()
    }

    async fn insert_row(&self, table: Table, fields: Row) -> Result<Row, StoreError> {
        check_columns(fields.keys().map(String::as_str))?;
        let sql = insert_sql(table, &fields);
        let row = sqlx::query_scalar::<_, Value>(&sql).bind(Value::Object(fields)).fetch_one(&self.pool).await?;
        into_row(row)
    }

    async fn update_row(&self, table: Table, id: Uuid, fields: Row) -> Result<u64, StoreError> {
        check_columns(fields.keys().map(String::as_str))?;
        if fields.is_empty() { return Ok(0); }
        let sql = update_sql(table, &fields);
        let done = sqlx::query(&sql).bind(Value::Object(fields)).bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn delete_row(&self, table: Table, id: Uuid) -> Result<u64, StoreError> {
        let sql = format!("DELETE FROM {table} WHERE id = $1");
        let done = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn insert_batch(&self, rows: Vec<(Table, Row)>) -> Result<(), StoreError> {
        for (_, fields) in &rows {
            check_columns(fields.keys().map(String::as_str))?;
        }
        let mut tx = self.pool.begin().await?;
        for (table, fields) in rows {
            let sql = insert_sql(table, &fields);
            sqlx::query(&sql).bind(Value::Object(fields)).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
