//! Task-queue index: the derived, job-store-backed view of waiting jobs
//! grouped by shared `Requirements`.

use gridmatch_core::id::QueueId;
use serde::{Deserialize, Serialize};

/// Summary of one task queue as reported by the job store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskQueueSummary {
    /// Queue identifier.
    pub queue_id: QueueId,
    /// Raw `Requirements` expression text shared by every member job.
    pub requirements_text: String,
    /// Queue priority; higher is scanned first.
    pub priority: i64,
}

/// One row of the job store's aggregated report for `check_for_jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueReportEntry {
    pub queue_id: QueueId,
    pub priority: i64,
    pub waiting_jobs: u64,
}

/// True iff `queues` is sorted non-increasing by priority, the ordering the
/// job store's `list_task_queues` is required to provide. Used by tests and
/// by defensive callers that want to assert the contract rather than trust it
/// silently.
#[must_use]
pub fn is_priority_sorted(queues: &[TaskQueueSummary]) -> bool {
    queues.windows(2).all(|w| w[0].priority >= w[1].priority)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(id: u64, priority: i64) -> TaskQueueSummary {
        TaskQueueSummary {
            queue_id: QueueId(id),
            requirements_text: "(true)".to_string(),
            priority,
        }
    }

    #[test]
    fn test_priority_sorted_accepts_descending() {
        assert!(is_priority_sorted(&[q(1, 20), q(2, 10), q(3, 10), q(4, 0)]));
    }

    #[test]
    fn test_priority_sorted_rejects_ascending() {
        assert!(!is_priority_sorted(&[q(1, 0), q(2, 10)]));
    }

    #[test]
    fn test_priority_sorted_empty_and_singleton() {
        assert!(is_priority_sorted(&[]));
        assert!(is_priority_sorted(&[q(1, 5)]));
    }
}
