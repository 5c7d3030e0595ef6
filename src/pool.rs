//! Fixed-size pool of worker threads with interrupt and bounded join.
//!
//! Each worker reports a [`WorkerExit`] over a shared channel when its loop
//! ends, which lets [`WorkerPool::join_timeout`] wait against a deadline
//! instead of blocking on `JoinHandle::join`.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::error::{Error, Result};
use crate::interrupt::Interrupt;
use crate::results::ResultSink;
use crate::task_queue::TaskQueue;
use crate::types::WorkerId;
use crate::work::TaskWork;
use crate::worker::{WorkerContext, WorkerExit, worker_loop};

struct WorkerHandle {
    worker_id: WorkerId,
    interrupt: Interrupt,
    thread: thread::JoinHandle<()>,
}

/// How the pool ended.
#[derive(Debug)]
pub enum PoolShutdown {
    /// Every worker finished within the bound.
    Completed { exits: Vec<WorkerExit> },
    /// The bound elapsed; `still_active` workers were interrupted and detached.
    TimedOut {
        exits: Vec<WorkerExit>,
        still_active: Vec<WorkerId>,
    },
}

impl PoolShutdown {
    pub fn exits(&self) -> &[WorkerExit] {
        match self {
            PoolShutdown::Completed { exits } | PoolShutdown::TimedOut { exits, .. } => exits,
        }
    }

    pub fn still_active(&self) -> &[WorkerId] {
        match self {
            PoolShutdown::Completed { .. } => &[],
            PoolShutdown::TimedOut { still_active, .. } => still_active,
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, PoolShutdown::TimedOut { .. })
    }
}

/// A started set of workers sharing one queue and one sink.
pub struct WorkerPool {
    queue: Arc<TaskQueue>,
    workers: Vec<WorkerHandle>,
    exits: Receiver<WorkerExit>,
}

impl WorkerPool {
    /// Start `worker_count` named threads (`worker-<id>`) running [`worker_loop`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if the OS refuses a thread. Workers started
    /// before the failure are interrupted and detached.
    pub fn spawn(
        worker_count: usize,
        queue: Arc<TaskQueue>,
        sink: Arc<ResultSink>,
        work: Arc<dyn TaskWork>,
    ) -> Result<Self> {
        let (exit_tx, exit_rx) = crossbeam_channel::unbounded();
        let mut pool = Self {
            queue,
            workers: Vec::with_capacity(worker_count),
            exits: exit_rx,
        };

        for worker_id in 0..worker_count {
            let interrupt = Interrupt::new();
            let ctx = WorkerContext {
                worker_id,
                queue: Arc::clone(&pool.queue),
                sink: Arc::clone(&sink),
                work: Arc::clone(&work),
                interrupt: interrupt.clone(),
            };
            let exit_tx = exit_tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("worker-{worker_id}"))
                .spawn(move || {
                    let exit = worker_loop(ctx);
                    // The pool may already have given up on us.
                    let _ = exit_tx.send(exit);
                });

            match spawned {
                Ok(thread) => pool.workers.push(WorkerHandle {
                    worker_id,
                    interrupt,
                    thread,
                }),
                Err(source) => {
                    pool.interrupt_all();
                    return Err(Error::Spawn { worker_id, source });
                }
            }
        }

        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Interrupt one worker; returns `false` for an unknown id.
    #[allow(dead_code)]
    pub fn interrupt(&self, worker_id: WorkerId) -> bool {
        let Some(handle) = self.workers.iter().find(|h| h.worker_id == worker_id) else {
            return false;
        };
        handle.interrupt.raise();
        self.queue.wake_all();
        true
    }

    pub fn interrupt_all(&self) {
        for handle in &self.workers {
            handle.interrupt.raise();
        }
        self.queue.wake_all();
    }

    /// Wait for every worker to exit, up to `timeout`.
    ///
    /// On timeout the remaining workers are interrupted and their threads
    /// detached, so the caller never waits past the bound. A worker that
    /// panicked is logged and counted as finished.
    pub fn join_timeout(self, timeout: Duration) -> PoolShutdown {
        let WorkerPool {
            queue,
            workers,
            exits: exit_rx,
        } = self;
        let deadline = Instant::now() + timeout;
        let mut exits = Vec::with_capacity(workers.len());
        let mut timed_out = false;

        while exits.len() < workers.len() {
            match exit_rx.recv_deadline(deadline) {
                Ok(exit) => exits.push(exit),
                Err(RecvTimeoutError::Timeout) => {
                    timed_out = true;
                    break;
                }
                // Every sender is gone: the missing workers panicked.
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let mut still_active = Vec::new();
        for handle in workers {
            let reported = exits.iter().any(|e| e.worker_id == handle.worker_id);
            if timed_out && !reported && !handle.thread.is_finished() {
                handle.interrupt.raise();
                still_active.push(handle.worker_id);
                continue;
            }
            if handle.thread.join().is_err() {
                tracing::error!("worker {} panicked", handle.worker_id);
            }
        }

        if still_active.is_empty() {
            return PoolShutdown::Completed { exits };
        }
        queue.wake_all();
        PoolShutdown::TimedOut {
            exits,
            still_active,
        }
    }
}
