//! Task list: pending work ordered by priority, and status toggling.

use crate::domain::metrics;
use crate::domain::{DomainError, Task, TaskStatus};
use crate::ports::{Query, RecordStore, Table, decode_rows_lossy};
use std::sync::Arc;
use tracing::{info, warn};

pub struct TaskService {
    store: Arc<dyn RecordStore>,
    business_id: Option<String>,
}

impl TaskService {
    pub fn new(store: Arc<dyn RecordStore>, business_id: Option<String>) -> Self {
        Self { store, business_id }
    }

    /// Pending tasks, high priority first. A failed fetch yields an empty list.
    pub async fn pending_tasks(&self) -> Vec<Task> {
        let query = Query::table(Table::Tasks)
            .eq_opt("business_id", self.business_id.as_deref())
            .eq("status", TaskStatus::Pending.as_str())
            .order("created_at", true);
        match self.store.select(&query).await {
            Ok(rows) => metrics::pending_by_priority(&decode_rows_lossy::<Task>(Table::Tasks, rows)),
            Err(e) => {
                warn!(error = %e, "task fetch failed; showing empty");
                Vec::new()
            }
        }
    }

    /// Flip pending <-> completed in the store. Returns the new status.
    pub async fn toggle_task(&self, task: &Task) -> Result<TaskStatus, DomainError> {
        let next = task.status.toggled();
        self.store
            .update_by_id(Table::Tasks, &task.id, &[("status", next.as_str().into())])
            .await?;
        info!(task = %task.id, status = next.as_str(), "task status changed");
        Ok(next)
    }
}
