//! CSV export of invoice and customer views. Uses the `csv` crate for quoting.

use crate::domain::DomainError;
use crate::domain::Invoice;
use crate::domain::metrics::Customer;
use std::path::{Path, PathBuf};
use tracing::info;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn export_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::Export(e.to_string())
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, DomainError> {
    let bytes = wtr.into_inner().map_err(export_err)?;
    String::from_utf8(bytes).map_err(export_err)
}

/// One row per invoice: `Customer,Amount,Status,Due,Created`.
pub fn invoices_to_csv(invoices: &[Invoice]) -> Result<String, DomainError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["Customer", "Amount", "Status", "Due", "Created"])
        .map_err(export_err)?;
    for i in invoices {
        let amount = i.amount.to_string();
        let due = i.due_date.format(DATE_FORMAT).to_string();
        let created = i.created_at.format(DATE_FORMAT).to_string();
        wtr.write_record([
            i.customer_name.as_str(),
            amount.as_str(),
            i.status.as_str(),
            due.as_str(),
            created.as_str(),
        ])
        .map_err(export_err)?;
    }
    finish(wtr)
}

/// One row per customer: `Customer,Total Spent,Invoices,Last Purchase`.
pub fn customers_to_csv(customers: &[Customer]) -> Result<String, DomainError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["Customer", "Total Spent", "Invoices", "Last Purchase"])
        .map_err(export_err)?;
    for c in customers {
        let total = c.total_spent.to_string();
        let count = c.invoice_count.to_string();
        let last = c.last_purchase_at.format(DATE_FORMAT).to_string();
        wtr.write_record([c.name.as_str(), total.as_str(), count.as_str(), last.as_str()])
            .map_err(export_err)?;
    }
    finish(wtr)
}

/// Write `contents` to `dir/name`, creating `dir` if needed. Returns the full path.
pub async fn write_export(dir: &Path, name: &str, contents: &str) -> Result<PathBuf, DomainError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| DomainError::Export(format!("create {}: {}", dir.display(), e)))?;
    let path = dir.join(name);
    tokio::fs::write(&path, contents)
        .await
        .map_err(|e| DomainError::Export(format!("write {}: {}", path.display(), e)))?;
    info!(path = %path.display(), bytes = contents.len(), "export written");
    Ok(path)
}
