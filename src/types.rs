//! Shared identifiers, the task model, and the per-task result record.

use std::fmt;

/// Unique identifier for a task in the queue.
pub type TaskId = u64;
/// Index of a worker thread within the pool.
pub type WorkerId = usize;

/// Unit of work handed to workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Task {
    /// Stable task identifier for logging and validation.
    pub id: TaskId,
}

impl Task {
    pub fn new(id: TaskId) -> Self {
        Self { id }
    }
}

/// Record of one completed task; displays as the output file line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskResult {
    pub worker_id: WorkerId,
    pub task_id: TaskId,
}

impl TaskResult {
    pub fn new(worker_id: WorkerId, task_id: TaskId) -> Self {
        Self { worker_id, task_id }
    }
}

impl fmt::Display for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Worker {} processed task {}",
            self.worker_id, self.task_id
        )
    }
}
