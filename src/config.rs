//! Run configuration, parsed from CLI flags with environment fallbacks.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::{Error, Result};

/// Upper bound on seeded tasks; every task is queued up front.
pub const MAX_TASK_COUNT: u64 = 10_000_000;

/// Settings for one batch run.
///
/// Every flag can also be supplied through the environment (or a `.env`
/// file in the working directory).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskpool",
    version,
    about = "Drain a fixed batch of tasks through a bounded worker pool"
)]
pub struct CliArgs {
    /// Number of concurrent worker threads.
    ///
    /// Environment variable: `WORKER_COUNT`
    #[arg(long, env = "WORKER_COUNT", default_value_t = 4)]
    pub worker_count: usize,

    /// Number of tasks to seed, with ids `1..=task_count`. At most 10,000,000.
    ///
    /// Environment variable: `TASK_COUNT`
    #[arg(long, env = "TASK_COUNT", default_value_t = 10)]
    pub task_count: u64,

    /// Maximum time to wait for the pool to drain before writing whatever
    /// results exist.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT_SECONDS`
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECONDS", default_value_t = 10)]
    pub shutdown_timeout_seconds: u64,

    /// Destination file; created or truncated.
    ///
    /// Environment variable: `OUTPUT_PATH`
    #[arg(long, env = "OUTPUT_PATH", default_value = "output_java.txt")]
    pub output_path: PathBuf,

    /// Simulated processing time per task, in milliseconds.
    ///
    /// Environment variable: `WORK_MS`
    #[arg(long, env = "WORK_MS", default_value_t = 500)]
    pub work_ms: u64,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub worker_count: usize,
    pub task_count: u64,
    pub shutdown_timeout: Duration,
    pub output_path: PathBuf,
    pub work_duration: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            task_count: 10,
            shutdown_timeout: Duration::from_secs(10),
            output_path: PathBuf::from("output_java.txt"),
            work_duration: Duration::from_millis(500),
        }
    }
}

impl RunConfig {
    /// Reject values that would make a run crash rather than start.
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(Error::InvalidConfig {
                reason: "WORKER_COUNT must be greater than 0".to_string(),
            });
        }
        if self.task_count > MAX_TASK_COUNT {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "TASK_COUNT ({}) exceeds the maximum of {MAX_TASK_COUNT}",
                    self.task_count
                ),
            });
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig {
                reason: "OUTPUT_PATH must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = Error;

    fn try_from(args: CliArgs) -> Result<Self> {
        let config = Self {
            worker_count: args.worker_count,
            task_count: args.task_count,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_seconds),
            output_path: args.output_path,
            work_duration: Duration::from_millis(args.work_ms),
        };
        config.validate()?;
        Ok(config)
    }
}
