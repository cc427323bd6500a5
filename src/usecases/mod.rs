//! Application use cases. Orchestrate domain logic via ports.

pub mod dashboard_service;
pub mod session_manager;
pub mod task_service;

pub use dashboard_service::{CustomersView, DashboardService, FinancesView, InventoryView, Overview};
pub use session_manager::{SessionHandle, SessionManager};
pub use task_service::TaskService;
