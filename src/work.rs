//! Pluggable per-task work.

use std::thread;
use std::time::Duration;

use crate::types::Task;

/// The work a worker performs for each task. Runs with no queue or sink lock held.
pub trait TaskWork: Send + Sync {
    fn execute(&self, task: &Task);
}

/// Stand-in workload that sleeps for a fixed duration per task.
#[derive(Clone, Copy, Debug)]
pub struct SimulatedDelay {
    pub duration: Duration,
}

impl SimulatedDelay {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl TaskWork for SimulatedDelay {
    fn execute(&self, _task: &Task) {
        if !self.duration.is_zero() {
            thread::sleep(self.duration);
        }
    }
}

impl<F> TaskWork for F
where
    F: Fn(&Task) + Send + Sync,
{
    fn execute(&self, task: &Task) {
        self(task)
    }
}
