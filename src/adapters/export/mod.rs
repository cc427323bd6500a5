//! File exports of dashboard views.

pub mod csv_export;

pub use csv_export::{customers_to_csv, invoices_to_csv, write_export};
