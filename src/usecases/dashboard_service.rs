//! Dashboard service. Loads the collections behind each dashboard section and reduces them.
//!
//! A failed fetch is logged and treated as an empty collection, so every section
//! renders its zero state instead of an error.

use crate::domain::metrics::{
    self, Customer, CustomerSummary, FilteredInvoices, FinancialSummary, InventorySummary,
    InvoiceFilter,
};
use crate::domain::{ActivityLog, InventoryRecord, Invoice, Product, StockItem, Transaction};
use crate::ports::{Query, RecordStore, Table, decode_rows_lossy};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// Landing page figures.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Overview {
    pub month: FinancialSummary,
    pub overdue_invoices: u64,
    pub top_products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinancesView {
    /// Newest first.
    pub transactions: Vec<Transaction>,
    pub all_time: FinancialSummary,
    pub month: FinancialSummary,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomersView {
    /// Customers matching the search, in first-seen order.
    pub customers: Vec<Customer>,
    /// Computed over every customer, not just the matches.
    pub summary: CustomerSummary,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InventoryView {
    pub items: Vec<StockItem>,
    pub summary: InventorySummary,
    pub low_stock: Vec<StockItem>,
}

pub struct DashboardService {
    store: Arc<dyn RecordStore>,
    business_id: Option<String>,
    top_products_limit: usize,
    recent_activity_limit: usize,
}

impl DashboardService {
    /// `business_id` scopes every business-owned table when set.
    pub fn new(
        store: Arc<dyn RecordStore>,
        business_id: Option<String>,
        top_products_limit: usize,
        recent_activity_limit: usize,
    ) -> Self {
        Self {
            store,
            business_id,
            top_products_limit,
            recent_activity_limit,
        }
    }

    fn scoped(&self, table: Table) -> Query {
        Query::table(table).eq_opt("business_id", self.business_id.as_deref())
    }

    async fn fetch_or_empty<T: DeserializeOwned>(&self, query: Query) -> Vec<T> {
        let table = query.table;
        match self.store.select(&query).await {
            Ok(rows) => {
                let records = decode_rows_lossy(table, rows);
                debug!(table = table.name(), count = records.len(), "fetched");
                records
            }
            Err(e) => {
                warn!(table = table.name(), error = %e, "fetch failed; showing empty");
                Vec::new()
            }
        }
    }

    pub async fn overview(&self) -> Overview {
        self.overview_at(Utc::now()).await
    }

    /// The month boundary is taken from `now` once and used for both the store
    /// filter and the reducer.
    pub async fn overview_at(&self, now: DateTime<Utc>) -> Overview {
        let since = metrics::month_start(now);
        let month_query = self.scoped(Table::Transactions).gte("date", since);
        let overdue_query = self.scoped(Table::Invoices).eq("status", "overdue");
        let products_query = self
            .scoped(Table::Products)
            .limit(self.top_products_limit);

        let (transactions, overdue, top_products) = tokio::join!(
            self.fetch_or_empty::<Transaction>(month_query),
            self.store.count(&overdue_query),
            self.fetch_or_empty::<Product>(products_query),
        );

        let overdue_invoices = overdue.unwrap_or_else(|e| {
            warn!(error = %e, "overdue count failed; showing 0");
            0
        });

        Overview {
            month: metrics::summarize_since(&transactions, since),
            overdue_invoices,
            top_products,
        }
    }

    pub async fn finances(&self) -> FinancesView {
        self.finances_at(Utc::now()).await
    }

    pub async fn finances_at(&self, now: DateTime<Utc>) -> FinancesView {
        let transactions: Vec<Transaction> = self
            .fetch_or_empty(self.scoped(Table::Transactions).order("date", false))
            .await;
        FinancesView {
            all_time: metrics::summarize_all(&transactions),
            month: metrics::summarize_month(&transactions, now),
            transactions,
        }
    }

    /// Newest invoices first, then narrowed by `filter`.
    pub async fn invoices(&self, filter: &InvoiceFilter) -> FilteredInvoices {
        let invoices: Vec<Invoice> = self
            .fetch_or_empty(self.scoped(Table::Invoices).order("created_at", false))
            .await;
        metrics::filter_invoices(&invoices, filter)
    }

    pub async fn customers(&self, search: &str) -> CustomersView {
        let invoices: Vec<Invoice> = self
            .fetch_or_empty(self.scoped(Table::Invoices).order("created_at", false))
            .await;
        let all = metrics::rollup_customers(&invoices);
        CustomersView {
            summary: metrics::summarize_customers(&all),
            customers: metrics::search_customers(&all, search)
                .into_iter()
                .cloned()
                .collect(),
        }
    }

    /// Products joined with their inventory rows. `search` (name or description) filters `items` only.
    pub async fn inventory(&self, search: &str) -> InventoryView {
        let (products, records) = tokio::join!(
            self.fetch_or_empty::<Product>(self.scoped(Table::Products).order("name", true)),
            self.fetch_or_empty::<InventoryRecord>(Query::table(Table::Inventory)),
        );
        let joined = metrics::join_inventory(products, records);
        // Summary and alerts cover all stock; the search only narrows the listing.
        InventoryView {
            summary: metrics::summarize_inventory(&joined),
            low_stock: metrics::low_stock_items(&joined).into_iter().cloned().collect(),
            items: metrics::search_stock(&joined, search)
                .into_iter()
                .cloned()
                .collect(),
        }
    }

    pub async fn recent_activity(&self) -> Vec<ActivityLog> {
        self.fetch_or_empty(
            self.scoped(Table::ActivityLog)
                .order("created_at", false)
                .limit(self.recent_activity_limit),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::SqliteStore;
    use crate::domain::{DomainError, InvoiceStatus};
    use crate::domain::metrics::StatusFilter;
    use crate::ports::{Row, Scalar};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn row(v: serde_json::Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    async fn seeded() -> (tempfile::TempDir, Arc<SqliteStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::connect(dir.path().join("dash.db")).await.unwrap();

        let transactions = [
            ("t1", "sale", "100", "2026-10-05T09:00:00Z"),
            ("t2", "expense", "40", "2026-10-06T09:00:00Z"),
            ("t3", "sale", "500", "2026-09-20T09:00:00Z"),
        ];
        for (id, kind, amount, date) in transactions {
            store
                .insert_row(
                    Table::Transactions,
                    &row(json!({
                        "id": id, "business_id": "b1", "type": kind, "amount": amount,
                        "description": "", "date": date, "created_at": date,
                    })),
                )
                .await
                .unwrap();
        }

        let invoices = [
            ("i1", "Acme", "200", "paid", "2026-10-01T00:00:00Z"),
            ("i2", "Acme", "50", "overdue", "2026-10-02T00:00:00Z"),
            ("i3", "Globex", "75", "overdue", "2026-10-03T00:00:00Z"),
            ("i4", "Initech", "10", "pending", "2026-10-04T00:00:00Z"),
        ];
        for (id, customer, amount, status, created) in invoices {
            store
                .insert_row(
                    Table::Invoices,
                    &row(json!({
                        "id": id, "business_id": "b1", "customer_name": customer,
                        "amount": amount, "status": status,
                        "due_date": "2026-12-01T00:00:00Z", "created_at": created,
                    })),
                )
                .await
                .unwrap();
        }

        let products = [
            ("p1", "Anvil", "Drop forged", "12.50"),
            ("p2", "Bolt", "Steel fastener", "0.25"),
            ("p3", "Crate", "Pine", "8"),
            ("p4", "Drill", "Cordless", "99"),
        ];
        for (id, name, description, price) in products {
            store
                .insert_row(
                    Table::Products,
                    &row(json!({
                        "id": id, "business_id": "b1", "name": name,
                        "description": description, "price": price,
                        "created_at": "2026-01-01T00:00:00Z",
                        "updated_at": "2026-01-01T00:00:00Z",
                    })),
                )
                .await
                .unwrap();
        }
        for (id, product, quantity, threshold) in [("v1", "p1", 4, 5), ("v2", "p2", 1000, 100), ("v3", "p3", 2, 2)] {
            store
                .insert_row(
                    Table::Inventory,
                    &row(json!({
                        "id": id, "product_id": product, "quantity": quantity,
                        "reorder_threshold": threshold, "updated_at": "2026-10-01T00:00:00Z",
                    })),
                )
                .await
                .unwrap();
        }

        for n in 0..12 {
            store
                .insert_row(
                    Table::ActivityLog,
                    &row(json!({
                        "id": format!("a{}", n), "business_id": "b1", "user_id": "u1",
                        "action_type": "update", "entity_type": "invoice", "entity_id": "i1",
                        "description": format!("change {}", n),
                        "created_at": format!("2026-10-{:02}T00:00:00Z", n + 1),
                    })),
                )
                .await
                .unwrap();
        }

        (dir, Arc::new(store))
    }

    fn now() -> DateTime<Utc> {
        "2026-10-17T12:00:00Z".parse().unwrap()
    }

    fn service(store: Arc<dyn RecordStore>) -> DashboardService {
        DashboardService::new(store, Some("b1".into()), 3, 10)
    }

    #[tokio::test]
    async fn overview_month_to_date() {
        let (_dir, store) = seeded().await;
        let overview = service(store).overview_at(now()).await;

        assert_eq!(overview.month.revenue, Decimal::from(100));
        assert_eq!(overview.month.expenses, Decimal::from(40));
        assert_eq!(overview.month.profit, Decimal::from(60));
        assert_eq!(overview.overdue_invoices, 2);
        assert_eq!(overview.top_products.len(), 3);
    }

    #[tokio::test]
    async fn other_business_sees_nothing() {
        let (_dir, store) = seeded().await;
        let svc = DashboardService::new(store, Some("b2".into()), 3, 10);
        assert_eq!(svc.overview_at(now()).await, Overview::default());
        assert!(svc.recent_activity().await.is_empty());
    }

    #[tokio::test]
    async fn finances_include_all_time_totals() {
        let (_dir, store) = seeded().await;
        let view = service(store).finances_at(now()).await;
        assert_eq!(view.transactions[0].id, "t2");
        assert_eq!(view.all_time.revenue, Decimal::from(600));
        assert_eq!(view.all_time.profit, Decimal::from(560));
        assert_eq!(view.month.profit, Decimal::from(60));
    }

    #[tokio::test]
    async fn invoices_filter_over_subset() {
        let (_dir, store) = seeded().await;
        let svc = service(store);
        let view = svc
            .invoices(&InvoiceFilter::new("acme", StatusFilter::All))
            .await;
        assert_eq!(view.invoices.len(), 2);
        assert_eq!(view.invoices[0].id, "i2");
        assert_eq!(view.total_amount, Decimal::from(250));
        assert_eq!(view.overdue_amount, Decimal::from(50));

        let view = svc
            .invoices(&InvoiceFilter::new("", StatusFilter::Only(InvoiceStatus::Overdue)))
            .await;
        assert_eq!(view.total_amount, Decimal::from(125));
    }

    #[tokio::test]
    async fn customers_rollup_and_search() {
        let (_dir, store) = seeded().await;
        let view = service(store).customers("ACME").await;
        assert_eq!(view.customers.len(), 1);
        let acme = &view.customers[0];
        assert_eq!(acme.total_spent, Decimal::from(250));
        assert_eq!(acme.invoice_count, 2);
        assert_eq!(acme.last_purchase_at, "2026-10-02T00:00:00Z".parse::<DateTime<Utc>>().unwrap());

        assert_eq!(view.summary.total_customers, 3);
        assert_eq!(view.summary.total_revenue, Decimal::from(335));
    }

    #[tokio::test]
    async fn inventory_join_and_low_stock() {
        let (_dir, store) = seeded().await;
        let svc = service(store);
        let view = svc.inventory("").await;
        assert_eq!(view.summary.product_count, 4);
        // 12.50*4 + 0.25*1000 + 8*2 + 99*0
        assert_eq!(view.summary.total_value, Decimal::new(31600, 2));
        let low: Vec<_> = view.low_stock.iter().map(|s| s.product.id.as_str()).collect();
        assert_eq!(low, vec!["p1", "p3"]);

        let view = svc.inventory("steel").await;
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].product.name, "Bolt");
    }

    #[tokio::test]
    async fn inventory_search_keeps_full_summary() {
        let (_dir, store) = seeded().await;
        let svc = service(store);
        let all = svc.inventory("").await;
        let searched = svc.inventory("steel").await;

        assert_eq!(searched.summary, all.summary);
        assert_eq!(searched.summary.low_stock_count, 2);
        assert_eq!(searched.low_stock, all.low_stock);
        assert_eq!(searched.items.len(), 1);
    }

    #[tokio::test]
    async fn malformed_row_is_skipped_not_the_section() {
        let (_dir, store) = seeded().await;
        store
            .insert_row(
                Table::Transactions,
                &row(json!({
                    "id": "bad", "business_id": "b1", "type": "sale", "amount": "twelve",
                    "description": "", "date": "2026-10-07T00:00:00Z",
                    "created_at": "2026-10-07T00:00:00Z",
                })),
            )
            .await
            .unwrap();

        let view = service(store).finances_at(now()).await;
        assert_eq!(view.transactions.len(), 3);
        assert_eq!(view.all_time.revenue, Decimal::from(600));
    }

    #[tokio::test]
    async fn recent_activity_is_newest_first_and_limited() {
        let (_dir, store) = seeded().await;
        let feed = service(store).recent_activity().await;
        assert_eq!(feed.len(), 10);
        assert_eq!(feed[0].id, "a11");
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl RecordStore for BrokenStore {
        async fn select(&self, _: &Query) -> Result<Vec<Row>, DomainError> {
            Err(DomainError::Store("connection reset".into()))
        }
        async fn count(&self, _: &Query) -> Result<u64, DomainError> {
            Err(DomainError::Store("connection reset".into()))
        }
        async fn update_by_id(&self, _: Table, _: &str, _: &[(&'static str, Scalar)]) -> Result<(), DomainError> {
            Err(DomainError::Store("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn fetch_failures_render_empty_sections() {
        let svc = service(Arc::new(BrokenStore));
        assert_eq!(svc.overview_at(now()).await, Overview::default());
        assert_eq!(svc.finances_at(now()).await, FinancesView::default());
        let inv = svc.invoices(&InvoiceFilter::default()).await;
        assert!(inv.invoices.is_empty());
        assert_eq!(inv.total_amount, Decimal::ZERO);
        assert_eq!(svc.customers("").await.summary, CustomerSummary::default());
        assert_eq!(svc.inventory("").await, InventoryView::default());
    }
}
