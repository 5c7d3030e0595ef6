//! Batch lifecycle: seed the queue, run the pool, drain with a bound, report.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::output::write_results;
use crate::pool::WorkerPool;
use crate::results::ResultSink;
use crate::task_queue::TaskQueue;
use crate::types::{Task, TaskResult};
use crate::usage::{CpuTimes, cpu_times};
use crate::work::{SimulatedDelay, TaskWork};

/// Largest sink allocation made before any result arrives.
const SINK_PRESIZE_LIMIT: usize = 4096;

/// Lifecycle phases, in the only order they are entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Init,
    Seeded,
    Running,
    Draining,
    Done,
}

/// Outcome of one batch run.
#[derive(Debug)]
pub struct RunReport {
    pub worker_count: usize,
    pub tasks_seeded: u64,
    /// Snapshot of the sink taken when the run reached [`Phase::Done`].
    pub results: Vec<TaskResult>,
    /// Results recorded per worker id.
    pub per_worker: Vec<usize>,
    pub timed_out: bool,
    pub still_active: usize,
    /// Tasks never taken off the queue.
    pub leftover: usize,
    pub elapsed: Duration,
    pub cpu: Option<CpuTimes>,
    /// Where the results went, once handed to the output writer.
    pub output: Option<PathBuf>,
    pub lines_written: Option<usize>,
}

impl RunReport {
    /// Every seeded task produced a result and nothing was cut off.
    pub fn is_complete(&self) -> bool {
        !self.timed_out && self.results.len() as u64 == self.tasks_seeded
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RUN SUMMARY")?;
        writeln!(f, "workers={}", self.worker_count)?;
        writeln!(f, "tasks_total={}", self.tasks_seeded)?;
        writeln!(f, "results={}", self.results.len())?;
        writeln!(f, "per_worker={:?}", self.per_worker)?;
        writeln!(f, "timed_out={}", self.timed_out)?;
        writeln!(f, "still_active={}", self.still_active)?;
        writeln!(f, "leftover_tasks={}", self.leftover)?;
        writeln!(f, "elapsed_ms={}", self.elapsed.as_millis())?;
        if let Some(cpu) = self.cpu {
            writeln!(
                f,
                "cpu_user_s={:.4} cpu_sys_s={:.4}",
                cpu.user.as_secs_f64(),
                cpu.system.as_secs_f64()
            )?;
        }
        match (&self.output, self.lines_written) {
            (Some(path), Some(lines)) => write!(f, "output={} lines={lines}", path.display()),
            (Some(path), None) => write!(f, "output={} FAILED", path.display()),
            (None, _) => write!(f, "output=none"),
        }
    }
}

/// Owns one run of the pool from seeding to the final snapshot.
pub struct Coordinator {
    config: RunConfig,
    work: Arc<dyn TaskWork>,
    phase: Phase,
}

impl Coordinator {
    /// Coordinator using [`SimulatedDelay`] with the configured duration.
    pub fn new(config: RunConfig) -> Self {
        let work = Arc::new(SimulatedDelay::new(config.work_duration));
        Self::with_work(config, work)
    }

    pub fn with_work(config: RunConfig, work: Arc<dyn TaskWork>) -> Self {
        Self {
            config,
            work,
            phase: Phase::Init,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(next > self.phase, "phase moved backwards");
        tracing::debug!("phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    /// Run the batch and return the report. Does not touch the output file.
    ///
    /// A drain timeout is logged and reflected in the report, never returned
    /// as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRun`] if this coordinator has already started
    /// a batch, [`Error::InvalidConfig`] for a config that fails
    /// [`RunConfig::validate`], and [`Error::Spawn`] if a worker thread
    /// cannot be started.
    pub fn run(&mut self) -> Result<RunReport> {
        if self.phase != Phase::Init {
            return Err(Error::AlreadyRun { phase: self.phase });
        }
        self.config.validate()?;
        let worker_count = self.config.worker_count;
        let task_count = self.config.task_count;
        let queue = Arc::new(TaskQueue::new());
        let presize = (task_count as usize).min(SINK_PRESIZE_LIMIT);
        let sink = Arc::new(ResultSink::with_capacity(presize));

        for id in 1..=task_count {
            // Nothing closes the queue before seeding finishes.
            let _ = queue.push(Task::new(id));
        }
        queue.close();
        tracing::info!(
            "queued {} task(s) for {worker_count} worker(s)",
            queue.len()
        );
        self.advance(Phase::Seeded);

        let cpu_start = cpu_times();
        let start = Instant::now();
        let pool = WorkerPool::spawn(
            worker_count,
            Arc::clone(&queue),
            Arc::clone(&sink),
            Arc::clone(&self.work),
        )?;
        tracing::debug!("pool running with {} worker(s)", pool.len());
        self.advance(Phase::Running);

        self.advance(Phase::Draining);
        let shutdown = pool.join_timeout(self.config.shutdown_timeout);
        let still_active = shutdown.still_active().len();
        if shutdown.timed_out() {
            tracing::warn!(
                "{}; proceeding with {} of {task_count} result(s)",
                Error::ShutdownTimeout { still_active },
                sink.len()
            );
        }
        for exit in shutdown.exits() {
            tracing::debug!(
                "worker {} exited {:?} after {} task(s), cpu {:?}",
                exit.worker_id,
                exit.reason,
                exit.processed,
                exit.cpu.map(|c| c.total())
            );
        }

        // Workers still active were interrupted and no longer pop.
        let mut leftover = 0usize;
        while queue.try_pop().is_some() {
            leftover += 1;
        }

        let results = sink.snapshot();
        let elapsed = start.elapsed();
        let cpu = match (cpu_start, cpu_times()) {
            (Some(before), Some(after)) => Some(after.since(&before)),
            _ => None,
        };
        self.advance(Phase::Done);

        let mut per_worker = vec![0usize; worker_count];
        for result in &results {
            per_worker[result.worker_id] += 1;
        }

        Ok(RunReport {
            worker_count,
            tasks_seeded: task_count,
            results,
            per_worker,
            timed_out: shutdown.timed_out(),
            still_active,
            leftover,
            elapsed,
            cpu,
            output: None,
            lines_written: None,
        })
    }

    /// Run the batch, then hand the snapshot to the output writer.
    ///
    /// A write failure is logged and recorded in the report; it does not
    /// fail the run.
    pub fn run_and_write(&mut self) -> Result<RunReport> {
        let mut report = self.run()?;
        let path = self.config.output_path.clone();
        match write_results(&path, &report.results) {
            Ok(lines) => {
                tracing::info!("wrote {lines} line(s) to {}", path.display());
                report.lines_written = Some(lines);
            }
            Err(err) => tracing::error!("{err}"),
        }
        report.output = Some(path);
        Ok(report)
    }
}
