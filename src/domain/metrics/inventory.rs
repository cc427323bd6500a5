//! Inventory valuation and low-stock detection.

use crate::domain::{InventoryRecord, Product, StockItem};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct InventorySummary {
    pub product_count: usize,
    pub total_value: Decimal,
    pub low_stock_count: usize,
}

/// Pair every product with its inventory row (1:1 by `product_id`).
/// Product order is preserved; a product with no row gets `None`.
/// If the store holds several rows for one product, the first one wins.
pub fn join_inventory(products: Vec<Product>, records: Vec<InventoryRecord>) -> Vec<StockItem> {
    let mut by_product: HashMap<String, InventoryRecord> = HashMap::with_capacity(records.len());
    for r in records {
        by_product.entry(r.product_id.clone()).or_insert(r);
    }
    products
        .into_iter()
        .map(|product| {
            let inventory = by_product.remove(&product.id);
            StockItem { product, inventory }
        })
        .collect()
}

pub fn summarize_inventory(items: &[StockItem]) -> InventorySummary {
    InventorySummary {
        product_count: items.len(),
        total_value: items.iter().map(StockItem::line_value).sum(),
        low_stock_count: items.iter().filter(|i| i.is_low_stock()).count(),
    }
}

pub fn low_stock_items(items: &[StockItem]) -> Vec<&StockItem> {
    items.iter().filter(|i| i.is_low_stock()).collect()
}

/// Case-insensitive match on product name or description.
pub fn search_stock<'a>(items: &'a [StockItem], term: &str) -> Vec<&'a StockItem> {
    let needle = term.to_lowercase();
    items
        .iter()
        .filter(|i| {
            i.product.name.to_lowercase().contains(&needle)
                || i.product.description.to_lowercase().contains(&needle)
        })
        .collect()
}
