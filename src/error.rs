//! Error types for the task pool.
//!
//! ## Error Cases
//! - `Interrupted`: a worker's interrupt flag was raised while it waited on
//!   (or worked a task from) the queue. Handled inside the worker.
//! - `ShutdownTimeout`: the pool did not drain within the configured bound.
//!   Reported as a warning; the run continues with partial results.
//! - `OutputWrite`: the result file could not be created or written.
//! - `Spawn`: the OS refused a worker thread. Fatal at startup.
//! - `AlreadyRun`: `run` was called on a coordinator that is past `Init`.
//! - `InvalidConfig`: a configuration value was rejected.

use std::io;
use std::path::PathBuf;

use crate::coordinator::Phase;
use crate::types::WorkerId;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The waiting worker was cancelled.
    #[error("worker {worker_id} interrupted")]
    Interrupted { worker_id: WorkerId },

    /// Workers were still running when the shutdown bound elapsed.
    #[error("shutdown timed out with {still_active} worker(s) still active")]
    ShutdownTimeout { still_active: usize },

    /// Writing the result file failed.
    #[error("failed to write results to {}: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A worker thread could not be started.
    #[error("failed to spawn worker {worker_id}: {source}")]
    Spawn {
        worker_id: WorkerId,
        #[source]
        source: io::Error,
    },

    /// A coordinator runs exactly one batch.
    #[error("coordinator already started (phase {phase:?})")]
    AlreadyRun { phase: Phase },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}
