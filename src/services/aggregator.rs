//! Progress Aggregator
//!
//! Recomputes a parent task's progress percentage and derived status from
//! the full set of its sub-tasks. Always a read-aggregate-write cycle over
//! every sub-task, never an incremental counter, so concurrent or
//! out-of-order status updates converge on the same snapshot.

use tracing::debug;

use crate::models::task::TaskStatus;
use crate::storage::database::{Database, SubTaskStatusCounts};
use crate::utils::error::AppResult;

/// The derived snapshot written back onto the parent task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub total: usize,
    /// Resolved sub-tasks: success + failed. Cancelled sub-tasks stay
    /// unresolved and hold the task in processing.
    pub completed: usize,
    pub failed: usize,
    pub progress: u8,
    pub status: TaskStatus,
}

/// Derive the snapshot from per-status counts. Pure function.
pub fn derive_snapshot(counts: &SubTaskStatusCounts) -> ProgressSnapshot {
    let total = counts.total;
    let completed = counts.success + counts.failed;
    let failed = counts.failed;

    let progress = if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as u8
    };

    let status = if completed == 0 {
        TaskStatus::Processing
    } else if completed == total {
        if failed == total {
            TaskStatus::Failed
        } else if failed > 0 {
            TaskStatus::PartialFailed
        } else {
            TaskStatus::Completed
        }
    } else {
        TaskStatus::Processing
    };

    ProgressSnapshot {
        total,
        completed,
        failed,
        progress,
        status,
    }
}

/// Recompute and persist a task's derived progress/status pair.
///
/// Invoked after every sub-task status change. The write is last-write-wins
/// (the pair is a derived cache, not a ledger) and never overwrites a parent
/// that has been cancelled.
pub fn recompute_progress(db: &Database, task_id: &str) -> AppResult<ProgressSnapshot> {
    let counts = db.subtask_status_counts(task_id)?;
    let snapshot = derive_snapshot(&counts);
    db.update_task_progress(task_id, snapshot.progress, snapshot.status)?;
    debug!(
        task_id,
        progress = snapshot.progress,
        status = %snapshot.status,
        "recomputed task progress"
    );
    Ok(snapshot)
}
