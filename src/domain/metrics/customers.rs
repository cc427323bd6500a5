//! Per-customer rollup built from invoices.
//!
//! Customers are not persisted: a customer is a distinct `customer_name` (case-sensitive).
//! Output keeps the first-seen order of names in the input; nothing here sorts.

use crate::domain::Invoice;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Customer {
    pub name: String,
    pub total_spent: Decimal,
    pub invoice_count: usize,
    pub last_purchase_at: DateTime<Utc>,
}

impl Customer {
    fn absorb(&mut self, other: &Customer) {
        self.total_spent += other.total_spent;
        self.invoice_count += other.invoice_count;
        self.last_purchase_at = self.last_purchase_at.max(other.last_purchase_at);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CustomerSummary {
    pub total_customers: usize,
    pub total_revenue: Decimal,
    /// Zero when there are no customers.
    pub average_revenue: Decimal,
}

pub fn rollup_customers(invoices: &[Invoice]) -> Vec<Customer> {
    let partial: Vec<Customer> = invoices
        .iter()
        .map(|i| Customer {
            name: i.customer_name.clone(),
            total_spent: i.amount,
            invoice_count: 1,
            last_purchase_at: i.created_at,
        })
        .collect();
    merge_rollups(&[], &partial)
}

/// Combine two partial rollups: totals and counts add, `last_purchase_at` takes the max.
/// Names from `a` keep their order; names only in `b` follow in their `b` order.
pub fn merge_rollups(a: &[Customer], b: &[Customer]) -> Vec<Customer> {
    let mut out: Vec<Customer> = Vec::with_capacity(a.len() + b.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    for c in a.iter().chain(b.iter()) {
        match index.get(&c.name) {
            Some(&pos) => out[pos].absorb(c),
            None => {
                index.insert(c.name.clone(), out.len());
                out.push(c.clone());
            }
        }
    }
    out
}

pub fn summarize_customers(customers: &[Customer]) -> CustomerSummary {
    let total_customers = customers.len();
    let total_revenue: Decimal = customers.iter().map(|c| c.total_spent).sum();
    let average_revenue = if total_customers > 0 {
        total_revenue / Decimal::from(total_customers)
    } else {
        Decimal::ZERO
    };
    CustomerSummary {
        total_customers,
        total_revenue,
        average_revenue,
    }
}

/// Case-insensitive name search. An empty term keeps everyone.
pub fn search_customers<'a>(customers: &'a [Customer], term: &str) -> Vec<&'a Customer> {
    let needle = term.to_lowercase();
    customers
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InvoiceStatus;
    use crate::domain::metrics::test_support::{at, invoice};
    use chrono::Duration;
    use proptest::prelude::*;

    #[test]
    fn groups_by_name_with_latest_purchase() {
        let rows = vec![
            invoice("Acme", 200, InvoiceStatus::Paid, "2026-10-01T00:00:00Z"),
            invoice("Acme", 50, InvoiceStatus::Pending, "2026-10-05T00:00:00Z"),
        ];
        let out = rollup_customers(&rows);
        assert_eq!(
            out,
            vec![Customer {
                name: "Acme".into(),
                total_spent: Decimal::from(250),
                invoice_count: 2,
                last_purchase_at: at("2026-10-05T00:00:00Z"),
            }]
        );
    }

    #[test]
    fn keeps_first_seen_order_and_case() {
        let rows = vec![
            invoice("Zeta", 1, InvoiceStatus::Paid, "2026-10-09T00:00:00Z"),
            invoice("acme", 1, InvoiceStatus::Paid, "2026-10-08T00:00:00Z"),
            invoice("Acme", 1, InvoiceStatus::Paid, "2026-10-07T00:00:00Z"),
            invoice("Zeta", 1, InvoiceStatus::Paid, "2026-10-06T00:00:00Z"),
        ];
        let names: Vec<_> = rollup_customers(&rows).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Zeta", "acme", "Acme"]);
    }

    #[test]
    fn summary_handles_empty_and_average() {
        assert_eq!(summarize_customers(&[]), CustomerSummary::default());

        let rows = vec![
            invoice("A", 100, InvoiceStatus::Paid, "2026-10-01T00:00:00Z"),
            invoice("B", 50, InvoiceStatus::Paid, "2026-10-01T00:00:00Z"),
        ];
        let s = summarize_customers(&rollup_customers(&rows));
        assert_eq!(s.total_customers, 2);
        assert_eq!(s.total_revenue, Decimal::from(150));
        assert_eq!(s.average_revenue, Decimal::from(75));
    }

    #[test]
    fn search_matches_substring_ignoring_case() {
        let rows = vec![
            invoice("Acme Corp", 1, InvoiceStatus::Paid, "2026-10-01T00:00:00Z"),
            invoice("Globex", 1, InvoiceStatus::Paid, "2026-10-01T00:00:00Z"),
        ];
        let customers = rollup_customers(&rows);
        let hits = search_customers(&customers, "CORP");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Acme Corp");
        assert_eq!(search_customers(&customers, "").len(), 2);
    }

    proptest! {
        #[test]
        fn prop_rollup_is_associative_over_splits(
            rows in proptest::collection::vec((0usize..4, 0i64..100_000, 0i64..1000), 0..40),
            split in 0usize..41,
        ) {
            const NAMES: [&str; 4] = ["Acme", "acme", "Globex", "Initech"];
            let base = at("2026-01-01T00:00:00Z");
            let invoices: Vec<Invoice> = rows
                .iter()
                .map(|(n, cents, mins)| {
                    let mut i = invoice(NAMES[*n], 0, InvoiceStatus::Paid, "2026-01-01T00:00:00Z");
                    i.amount = Decimal::new(*cents, 2);
                    i.created_at = base + Duration::minutes(*mins);
                    i
                })
                .collect();
            let cut = split.min(invoices.len());
            let (left, right) = invoices.split_at(cut);

            let merged = merge_rollups(&rollup_customers(left), &rollup_customers(right));
            prop_assert_eq!(merged, rollup_customers(&invoices));
        }
    }
}
