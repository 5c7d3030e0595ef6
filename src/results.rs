//! Shared, append-only collection of task results.

use std::sync::Mutex;

use crate::types::TaskResult;

/// Ordered sink that workers append to concurrently.
///
/// The raw vector is never handed out; readers get a copy via [`snapshot`](Self::snapshot).
pub struct ResultSink {
    entries: Mutex<Vec<TaskResult>>,
}

impl ResultSink {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    pub fn append(&self, result: TaskResult) {
        let mut guard = self.entries.lock().expect("result sink mutex poisoned");
        guard.push(result);
    }

    /// Copy of the results appended so far, in append order.
    pub fn snapshot(&self) -> Vec<TaskResult> {
        let guard = self.entries.lock().expect("result sink mutex poisoned");
        guard.clone()
    }

    pub fn len(&self) -> usize {
        let guard = self.entries.lock().expect("result sink mutex poisoned");
        guard.len()
    }
}

impl Default for ResultSink {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}
