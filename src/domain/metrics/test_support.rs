//! Row builders shared by the reducer tests.

use crate::domain::{
    InventoryRecord, Invoice, InvoiceStatus, Product, Task, TaskPriority, TaskStatus, Transaction,
    TransactionKind,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

pub(crate) fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("valid RFC 3339 timestamp")
        .with_timezone(&Utc)
}

pub(crate) fn transaction(kind: TransactionKind, amount: i64, date: &str) -> Transaction {
    Transaction {
        id: format!("tx-{}-{}", kind.as_str(), date),
        business_id: "biz-1".into(),
        kind,
        amount: Decimal::from(amount),
        description: String::new(),
        date: at(date),
        created_at: at(date),
    }
}

pub(crate) fn invoice(customer: &str, amount: i64, status: InvoiceStatus, created: &str) -> Invoice {
    Invoice {
        id: format!("inv-{}-{}", customer, created),
        business_id: "biz-1".into(),
        customer_name: customer.to_string(),
        amount: Decimal::from(amount),
        status,
        due_date: at("2099-01-01T00:00:00Z"),
        created_at: at(created),
    }
}

pub(crate) fn product(id: &str, name: &str, price: i64) -> Product {
    Product {
        id: id.to_string(),
        business_id: "biz-1".into(),
        name: name.to_string(),
        description: String::new(),
        price: Decimal::from(price),
        created_at: at("2026-01-01T00:00:00Z"),
        updated_at: at("2026-01-01T00:00:00Z"),
    }
}

pub(crate) fn inventory(product_id: &str, quantity: u32, reorder_threshold: u32) -> InventoryRecord {
    InventoryRecord {
        id: format!("inv-{}", product_id),
        product_id: product_id.to_string(),
        quantity,
        reorder_threshold,
        updated_at: at("2026-01-01T00:00:00Z"),
    }
}

pub(crate) fn task(id: &str, priority: TaskPriority, status: TaskStatus) -> Task {
    Task {
        id: id.to_string(),
        business_id: "biz-1".into(),
        title: format!("Task {}", id),
        description: String::new(),
        due_date: None,
        priority,
        status,
        created_at: at("2026-01-01T00:00:00Z"),
    }
}
