//! Invoice counts and the search/status filter used by the invoices page.

use crate::domain::{DomainError, Invoice, InvoiceStatus};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Overdue classification comes from `status` alone; `due_date` is not consulted.
pub fn count_overdue(invoices: &[Invoice]) -> usize {
    invoices
        .iter()
        .filter(|i| i.status == InvoiceStatus::Overdue)
        .count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(InvoiceStatus),
}

impl StatusFilter {
    pub fn matches(self, status: InvoiceStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(s) => s == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "pending" => Ok(StatusFilter::Only(InvoiceStatus::Pending)),
            "paid" => Ok(StatusFilter::Only(InvoiceStatus::Paid)),
            "overdue" => Ok(StatusFilter::Only(InvoiceStatus::Overdue)),
            other => Err(DomainError::Input(format!("unknown invoice status: {}", other))),
        }
    }
}

/// Customer-name search (case-insensitive substring) AND status filter.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub search: String,
    pub status: StatusFilter,
}

impl InvoiceFilter {
    pub fn new(search: impl Into<String>, status: StatusFilter) -> Self {
        Self {
            search: search.into(),
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilteredInvoices {
    pub invoices: Vec<Invoice>,
    /// Sum over the filtered rows only.
    pub total_amount: Decimal,
    /// Sum of overdue rows within the filtered subset.
    pub overdue_amount: Decimal,
}

pub fn filter_invoices(invoices: &[Invoice], filter: &InvoiceFilter) -> FilteredInvoices {
    let needle = filter.search.to_lowercase();
    let selected: Vec<Invoice> = invoices
        .iter()
        .filter(|i| i.customer_name.to_lowercase().contains(&needle))
        .filter(|i| filter.status.matches(i.status))
        .cloned()
        .collect();

    let total_amount = selected.iter().map(|i| i.amount).sum();
    let overdue_amount = selected
        .iter()
        .filter(|i| i.status == InvoiceStatus::Overdue)
        .map(|i| i.amount)
        .sum();

    FilteredInvoices {
        invoices: selected,
        total_amount,
        overdue_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::test_support::invoice;
    use proptest::prelude::*;

    fn sample() -> Vec<Invoice> {
        vec![
            invoice("Acme Corp", 200, InvoiceStatus::Overdue, "2026-10-01T00:00:00Z"),
            invoice("Globex", 75, InvoiceStatus::Paid, "2026-10-02T00:00:00Z"),
            invoice("acme labs", 30, InvoiceStatus::Pending, "2026-10-03T00:00:00Z"),
            invoice("Initech", 10, InvoiceStatus::Overdue, "2026-10-04T00:00:00Z"),
        ]
    }

    #[test]
    fn overdue_count_uses_status_only() {
        // due dates in the far future do not matter
        assert_eq!(count_overdue(&sample()), 2);
        assert_eq!(count_overdue(&[]), 0);
    }

    #[test]
    fn search_is_case_insensitive_and_anded_with_status() {
        let all = sample();
        let r = filter_invoices(&all, &InvoiceFilter::new("ACME", StatusFilter::All));
        assert_eq!(r.invoices.len(), 2);
        assert_eq!(r.total_amount, Decimal::from(230));
        assert_eq!(r.overdue_amount, Decimal::from(200));

        let r = filter_invoices(
            &all,
            &InvoiceFilter::new("acme", StatusFilter::Only(InvoiceStatus::Pending)),
        );
        assert_eq!(r.invoices.len(), 1);
        assert_eq!(r.invoices[0].customer_name, "acme labs");
        assert_eq!(r.overdue_amount, Decimal::ZERO);
    }

    #[test]
    fn totals_cover_only_the_subset() {
        let r = filter_invoices(
            &sample(),
            &InvoiceFilter::new("", StatusFilter::Only(InvoiceStatus::Overdue)),
        );
        assert_eq!(r.total_amount, Decimal::from(210));
        assert_eq!(r.overdue_amount, Decimal::from(210));
    }

    #[test]
    fn parses_status_filter() {
        assert_eq!("all".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!(
            " Overdue ".parse::<StatusFilter>().unwrap(),
            StatusFilter::Only(InvoiceStatus::Overdue)
        );
        assert!("void".parse::<StatusFilter>().is_err());
    }

    proptest! {
        #[test]
        fn prop_unfiltered_is_identity(
            rows in proptest::collection::vec(("[a-zA-Z ]{0,12}", 0i64..100_000, 0usize..3), 0..32)
        ) {
            let invoices: Vec<Invoice> = rows
                .iter()
                .map(|(name, amount, s)| invoice(name, *amount, InvoiceStatus::ALL[*s], "2026-10-01T00:00:00Z"))
                .collect();
            let r = filter_invoices(&invoices, &InvoiceFilter::default());
            prop_assert_eq!(r.invoices, invoices);
        }
    }
}
