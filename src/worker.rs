//! Worker loop: drain the queue, run each task, record the result.

use std::sync::Arc;

use crate::error::Error;
use crate::interrupt::Interrupt;
use crate::results::ResultSink;
use crate::task_queue::{Pop, TaskQueue};
use crate::types::{TaskResult, WorkerId};
use crate::usage::{CpuTimes, thread_cpu_times};
use crate::work::TaskWork;

/// Everything a worker thread needs, moved into the thread on spawn.
pub struct WorkerContext {
    pub worker_id: WorkerId,
    pub queue: Arc<TaskQueue>,
    pub sink: Arc<ResultSink>,
    pub work: Arc<dyn TaskWork>,
    pub interrupt: Interrupt,
}

/// Why a worker stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// The queue was closed and empty.
    Drained,
    Interrupted,
}

/// Final report a worker sends back to the pool.
#[derive(Clone, Copy, Debug)]
pub struct WorkerExit {
    pub worker_id: WorkerId,
    pub reason: ExitReason,
    /// Tasks whose result made it into the sink.
    pub processed: usize,
    /// CPU time this thread consumed, where the platform reports it.
    pub cpu: Option<CpuTimes>,
}

/// Run until the queue is drained or the worker is interrupted.
///
/// Interruption is handled here and never surfaces as an error to the caller.
pub fn worker_loop(ctx: WorkerContext) -> WorkerExit {
    let WorkerContext {
        worker_id,
        queue,
        sink,
        work,
        interrupt,
    } = ctx;
    let cpu_start = thread_cpu_times();
    let mut processed = 0usize;

    tracing::trace!("worker {worker_id} started");
    let reason = loop {
        let task = match queue.pop_blocking(&interrupt) {
            Pop::Task(task) => task,
            Pop::Closed => break ExitReason::Drained,
            Pop::Interrupted => {
                tracing::warn!("{}", Error::Interrupted { worker_id });
                break ExitReason::Interrupted;
            }
        };

        tracing::info!("Worker {worker_id} processing task {}", task.id);
        work.execute(&task);

        if interrupt.is_raised() {
            tracing::warn!(
                "{}; discarding result for task {}",
                Error::Interrupted { worker_id },
                task.id
            );
            break ExitReason::Interrupted;
        }
        sink.append(TaskResult::new(worker_id, task.id));
        processed += 1;
    };
    tracing::trace!("worker {worker_id} stopped ({reason:?}) after {processed} task(s)");

    let cpu = match (cpu_start, thread_cpu_times()) {
        (Some(start), Some(end)) => Some(end.since(&start)),
        _ => None,
    };
    WorkerExit {
        worker_id,
        reason,
        processed,
        cpu,
    }
}
