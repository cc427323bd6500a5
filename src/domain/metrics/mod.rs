//! Metric reducers. Pure functions from record collections to summary views.
//!
//! None of these fail or keep state between calls; an empty input yields the zero/empty result.

pub mod customers;
pub mod finance;
pub mod inventory;
pub mod invoices;
pub mod tasks;

#[cfg(test)]
pub(crate) mod test_support;

pub use customers::{
    Customer, CustomerSummary, merge_rollups, rollup_customers, search_customers,
    summarize_customers,
};
pub use finance::{FinancialSummary, month_start, summarize_all, summarize_month, summarize_since};
pub use inventory::{
    InventorySummary, join_inventory, low_stock_items, search_stock, summarize_inventory,
};
pub use invoices::{FilteredInvoices, InvoiceFilter, StatusFilter, count_overdue, filter_invoices};
pub use tasks::pending_by_priority;
