//! Store-agnostic query description handed to `RecordStore`.
//!
//! Tables and columns are closed sets so adapters never interpolate caller text into SQL.

use crate::domain::DomainError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use tracing::warn;

/// One record as returned by the store: column name -> JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Transactions,
    Invoices,
    Products,
    Inventory,
    Tasks,
    ActivityLog,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Transactions => "transactions",
            Table::Invoices => "invoices",
            Table::Products => "products",
            Table::Inventory => "inventory",
            Table::Tasks => "tasks",
            Table::ActivityLog => "activity_log",
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Table::Transactions => &[
                "id",
                "business_id",
                "type",
                "amount",
                "description",
                "date",
                "created_at",
            ],
            Table::Invoices => &[
                "id",
                "business_id",
                "customer_name",
                "amount",
                "status",
                "due_date",
                "created_at",
            ],
            Table::Products => &[
                "id",
                "business_id",
                "name",
                "description",
                "price",
                "created_at",
                "updated_at",
            ],
            Table::Inventory => &[
                "id",
                "product_id",
                "quantity",
                "reorder_threshold",
                "updated_at",
            ],
            Table::Tasks => &[
                "id",
                "business_id",
                "title",
                "description",
                "due_date",
                "priority",
                "status",
                "created_at",
            ],
            Table::ActivityLog => &[
                "id",
                "business_id",
                "user_id",
                "action_type",
                "entity_type",
                "entity_id",
                "description",
                "created_at",
            ],
        }
    }

    pub fn has_column(self, column: &str) -> bool {
        self.columns().contains(&column)
    }

    /// Fails with `DomainError::Store` when `column` is not part of this table.
    pub fn check_column(self, column: &str) -> Result<(), DomainError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(DomainError::Store(format!(
                "unknown column {}.{}",
                self.name(),
                column
            )))
        }
    }
}

/// Filter operand. Timestamps travel as RFC 3339 text.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Null,
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(ts: DateTime<Utc>) -> Self {
        Scalar::Text(store_timestamp(ts))
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Integer(n)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(&'static str, Scalar),
    Gte(&'static str, Scalar),
}

impl Filter {
    pub fn column(&self) -> &'static str {
        match self {
            Filter::Eq(c, _) | Filter::Gte(c, _) => c,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub ascending: bool,
}

/// `SELECT * FROM table WHERE filters... ORDER BY order LIMIT limit`.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<Scalar>) -> Self {
        self.filters.push(Filter::Eq(column, value.into()));
        self
    }

    pub fn gte(mut self, column: &'static str, value: impl Into<Scalar>) -> Self {
        self.filters.push(Filter::Gte(column, value.into()));
        self
    }

    /// Optional equality filter; `None` leaves the query unchanged.
    pub fn eq_opt(self, column: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    pub fn order(mut self, column: &'static str, ascending: bool) -> Self {
        self.order = Some(Order { column, ascending });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Every referenced column must exist on the table.
    pub fn validate(&self) -> Result<(), DomainError> {
        for f in &self.filters {
            self.table.check_column(f.column())?;
        }
        if let Some(o) = &self.order {
            self.table.check_column(o.column)?;
        }
        Ok(())
    }
}

/// Canonical text form of a timestamp in the store (UTC, millisecond precision).
/// Every timestamp written or compared uses it, so text ordering matches time ordering.
pub fn store_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decode store rows into typed records.
pub fn decode_rows<T: DeserializeOwned>(table: Table, rows: Vec<Row>) -> Result<Vec<T>, DomainError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(serde_json::Value::Object(row))
                .map_err(|e| DomainError::Store(format!("decode {} row: {}", table.name(), e)))
        })
        .collect()
}

/// Decode store rows, skipping (and logging) rows that do not fit `T`.
pub fn decode_rows_lossy<T: DeserializeOwned>(table: Table, rows: Vec<Row>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id").and_then(|v| v.as_str()).unwrap_or("?").to_string();
            match serde_json::from_value(serde_json::Value::Object(row)) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(table = table.name(), id = %id, error = %e, "skipping malformed row");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Invoice, InvoiceStatus};
    use serde_json::json;

    #[test]
    fn builder_collects_filters_in_order() {
        let q = Query::table(Table::Transactions)
            .eq("type", "sale")
            .gte("date", "2026-10-01T00:00:00.000Z")
            .eq_opt("business_id", None)
            .order("date", false)
            .limit(5);
        assert_eq!(q.filters.len(), 2);
        assert_eq!(q.filters[0], Filter::Eq("type", Scalar::Text("sale".into())));
        assert_eq!(q.limit, Some(5));
        assert!(q.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_columns() {
        let q = Query::table(Table::Invoices).eq("customer_name; DROP TABLE x", "a");
        assert!(matches!(q.validate(), Err(DomainError::Store(_))));
        let q = Query::table(Table::Invoices).order("secret", true);
        assert!(q.validate().is_err());
    }

    #[test]
    fn decodes_rows_with_text_decimals() {
        let row = json!({
            "id": "i1",
            "business_id": "b1",
            "customer_name": "Acme",
            "amount": "199.99",
            "status": "overdue",
            "due_date": "2026-11-01T00:00:00Z",
            "created_at": "2026-10-01T00:00:00Z",
        });
        let rows = vec![row.as_object().cloned().unwrap()];
        let out: Vec<Invoice> = decode_rows(Table::Invoices, rows).unwrap();
        assert_eq!(out[0].status, InvoiceStatus::Overdue);
        assert_eq!(out[0].amount.to_string(), "199.99");
    }

    #[test]
    fn lossy_decode_drops_only_bad_rows() {
        let good = json!({
            "id": "i1", "business_id": "b1", "customer_name": "Acme", "amount": "10",
            "status": "paid", "due_date": "2026-11-01T00:00:00Z",
            "created_at": "2026-10-01T00:00:00Z",
        });
        let mut bad = good.clone();
        bad["id"] = json!("i2");
        bad["amount"] = json!("ten");
        let rows: Vec<Row> = [good, bad]
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect();

        assert!(decode_rows::<Invoice>(Table::Invoices, rows.clone()).is_err());
        let out: Vec<Invoice> = decode_rows_lossy(Table::Invoices, rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "i1");
    }
}
