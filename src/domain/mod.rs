//! Core domain layer. No external I/O dependencies.
//!
//! Entities, session values and the metric reducers live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod metrics;
pub mod session;

pub use entities::{
    ActivityLog, InventoryRecord, Invoice, InvoiceStatus, Product, StockItem, Task, TaskPriority,
    TaskStatus, Transaction, TransactionKind,
};
pub use errors::{AuthError, DomainError, SignOutWarning};
pub use session::{AuthUser, Session, SessionEvent, SessionEventKind, SessionState};
