//! SQLite-backed record store via libsql. Implements RecordStore.
//!
//! One database file holds every dashboard table. Queries are built from the closed
//! `Table`/column sets in `ports::query`; values are always bound as parameters.
//! Money is stored as TEXT so decimals survive unchanged; timestamps are canonical RFC 3339 text.

use crate::domain::DomainError;
use crate::ports::{Filter, Query, RecordStore, Row, Scalar, Table, store_timestamp};
use chrono::{DateTime, Utc};
use libsql::params::Params;
use libsql::{Connection, Database, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS transactions (
    id TEXT PRIMARY KEY,
    business_id TEXT NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('sale', 'expense')),
    amount TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    date TEXT NOT NULL,
    created_at TEXT NOT NULL
)"#,
    "CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions (business_id, date DESC)",
    r#"
CREATE TABLE IF NOT EXISTS invoices (
    id TEXT PRIMARY KEY,
    business_id TEXT NOT NULL,
    customer_name TEXT NOT NULL,
    amount TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('pending', 'paid', 'overdue')),
    due_date TEXT NOT NULL,
    created_at TEXT NOT NULL
)"#,
    "CREATE INDEX IF NOT EXISTS idx_invoices_created ON invoices (business_id, created_at DESC)",
    r#"
CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    business_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    price TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
    r#"
CREATE TABLE IF NOT EXISTS inventory (
    id TEXT PRIMARY KEY,
    product_id TEXT NOT NULL REFERENCES products (id),
    quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
    reorder_threshold INTEGER NOT NULL DEFAULT 0 CHECK (reorder_threshold >= 0),
    updated_at TEXT NOT NULL
)"#,
    "CREATE INDEX IF NOT EXISTS idx_inventory_product ON inventory (product_id)",
    r#"
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    business_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    due_date TEXT,
    priority TEXT NOT NULL CHECK (priority IN ('low', 'medium', 'high')),
    status TEXT NOT NULL CHECK (status IN ('pending', 'completed')),
    created_at TEXT NOT NULL
)"#,
    r#"
CREATE TABLE IF NOT EXISTS activity_log (
    id TEXT PRIMARY KEY,
    business_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    action_type TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
)"#,
    "CREATE INDEX IF NOT EXISTS idx_activity_created ON activity_log (business_id, created_at DESC)",
];

/// Columns holding timestamps; rewritten to the canonical text form on insert.
const TIMESTAMP_COLUMNS: &[&str] = &["date", "due_date", "created_at", "updated_at"];

fn store_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::Store(e.to_string())
}

/// SQLite record store. Safe to share via Arc; each call opens its own connection.
pub struct SqliteStore {
    db: Database,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure the schema exists.
    /// Sets WAL mode so dashboard reads can overlap a write.
    pub async fn connect(db_path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(store_err)?;
        }
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(store_err)?;
        let conn = db.connect().map_err(store_err)?;

        // PRAGMA returns a row; consume it (execute fails when rows are returned).
        let mut wal_rows = conn
            .query("PRAGMA journal_mode=WAL", ())
            .await
            .map_err(|e| DomainError::Store(format!("WAL pragma failed: {}", e)))?;
        while wal_rows.next().await.map_err(store_err)?.is_some() {}

        for stmt in SCHEMA {
            conn.execute(stmt, ()).await.map_err(store_err)?;
        }

        info!(path = %db_path.display(), "record store ready");
        Ok(Self { db, db_path })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<Connection, DomainError> {
        self.db.connect().map_err(store_err)
    }

    /// Insert one row. Keys must be columns of `table`; timestamp columns are normalised.
    pub async fn insert_row(&self, table: Table, row: &Row) -> Result<(), DomainError> {
        if row.is_empty() {
            return Err(DomainError::Input(format!("empty {} row", table.name())));
        }
        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        for (column, value) in row {
            table.check_column(column)?;
            columns.push(column.as_str());
            let value = if TIMESTAMP_COLUMNS.contains(&column.as_str()) {
                canonical_timestamp(value)
            } else {
                value.clone()
            };
            values.push(json_to_value(&value));
        }
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name(),
            columns.join(", "),
            placeholders.join(", ")
        );
        self.conn()?
            .execute(&sql, Params::Positional(values))
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for SqliteStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, DomainError> {
        let (sql, params) = build_sql(query, false)?;
        debug!(sql = %sql, "select");
        let conn = self.conn()?;
        let mut rows = conn
            .query(&sql, Params::Positional(params))
            .await
            .map_err(store_err)?;

        let names: Vec<String> = (0..rows.column_count())
            .map(|i| rows.column_name(i).unwrap_or_default().to_string())
            .collect();
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            let mut obj = Row::new();
            for (i, name) in names.iter().enumerate() {
                let value = row.get_value(i as i32).map_err(store_err)?;
                // NULL columns are left out so serde falls back to defaults / None.
                if !matches!(value, Value::Null) {
                    obj.insert(name.clone(), value_to_json(value));
                }
            }
            out.push(obj);
        }
        Ok(out)
    }

    async fn count(&self, query: &Query) -> Result<u64, DomainError> {
        let (sql, params) = build_sql(query, true)?;
        debug!(sql = %sql, "count");
        let conn = self.conn()?;
        let mut rows = conn
            .query(&sql, Params::Positional(params))
            .await
            .map_err(store_err)?;
        match rows.next().await.map_err(store_err)? {
            Some(row) => {
                let n: i64 = row.get(0).map_err(store_err)?;
                Ok(n.max(0) as u64)
            }
            None => Ok(0),
        }
    }

    async fn update_by_id(
        &self,
        table: Table,
        id: &str,
        changes: &[(&'static str, Scalar)],
    ) -> Result<(), DomainError> {
        if changes.is_empty() {
            return Err(DomainError::Input("update without changes".into()));
        }
        let mut sets = Vec::with_capacity(changes.len());
        let mut params = Vec::with_capacity(changes.len() + 1);
        for (i, (column, value)) in changes.iter().enumerate() {
            table.check_column(column)?;
            if *column == "id" {
                return Err(DomainError::Input("primary key cannot be updated".into()));
            }
            sets.push(format!("{} = ?{}", column, i + 1));
            params.push(scalar_to_value(value));
        }
        params.push(Value::Text(id.to_string()));
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table.name(),
            sets.join(", "),
            params.len()
        );
        let affected = self
            .conn()?
            .execute(&sql, Params::Positional(params))
            .await
            .map_err(store_err)?;
        if affected == 0 {
            return Err(DomainError::Store(format!(
                "no {} row with id {}",
                table.name(),
                id
            )));
        }
        info!(table = table.name(), id, "row updated");
        Ok(())
    }
}

/// Build `SELECT` (or `SELECT COUNT(*)`) for a validated query.
fn build_sql(query: &Query, count: bool) -> Result<(String, Vec<Value>), DomainError> {
    query.validate()?;
    let mut sql = if count {
        format!("SELECT COUNT(*) FROM {}", query.table.name())
    } else {
        format!(
            "SELECT {} FROM {}",
            query.table.columns().join(", "),
            query.table.name()
        )
    };

    let mut params = Vec::with_capacity(query.filters.len());
    let mut clauses = Vec::with_capacity(query.filters.len());
    for filter in &query.filters {
        let n = params.len() + 1;
        match filter {
            Filter::Eq(column, Scalar::Null) => clauses.push(format!("{} IS NULL", column)),
            Filter::Eq(column, value) => {
                clauses.push(format!("{} = ?{}", column, n));
                params.push(scalar_to_value(value));
            }
            Filter::Gte(column, value) => {
                clauses.push(format!("{} >= ?{}", column, n));
                params.push(scalar_to_value(value));
            }
        }
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    if !count {
        if let Some(order) = &query.order {
            let dir = if order.ascending { "ASC" } else { "DESC" };
            // rowid keeps ties in insertion order
            sql.push_str(&format!(" ORDER BY {} {}, rowid ASC", order.column, dir));
        }
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
    }
    Ok((sql, params))
}

fn scalar_to_value(s: &Scalar) -> Value {
    match s {
        Scalar::Text(t) => Value::Text(t.clone()),
        Scalar::Integer(n) => Value::Integer(*n),
        Scalar::Null => Value::Null,
    }
}

fn json_to_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Integer(i64::from(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Text(n.to_string()),
        },
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

fn value_to_json(v: Value) -> serde_json::Value {
    match v {
        Value::Null | Value::Blob(_) => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::from(i),
        Value::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s),
    }
}

fn canonical_timestamp(v: &serde_json::Value) -> serde_json::Value {
    match v.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok()) {
        Some(ts) => serde_json::Value::String(store_timestamp(ts.with_timezone(&Utc))),
        None => v.clone(),
    }
}
