//! Task list ordering.

use crate::domain::{Task, TaskStatus};

/// Pending tasks, highest priority first. Stable: equal priorities keep input order.
pub fn pending_by_priority(tasks: &[Task]) -> Vec<Task> {
    let mut pending: Vec<Task> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .cloned()
        .collect();
    pending.sort_by(|a, b| b.priority.cmp(&a.priority));
    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskPriority;
    use crate::domain::metrics::test_support::task;

    #[test]
    fn orders_high_medium_low_and_drops_completed() {
        let tasks = vec![
            task("t1", TaskPriority::Low, TaskStatus::Pending),
            task("t2", TaskPriority::High, TaskStatus::Pending),
            task("t3", TaskPriority::Medium, TaskStatus::Pending),
            task("t4", TaskPriority::High, TaskStatus::Completed),
            task("t5", TaskPriority::High, TaskStatus::Pending),
        ];
        let ids: Vec<_> = pending_by_priority(&tasks)
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["t2", "t5", "t3", "t1"]);
    }
}
