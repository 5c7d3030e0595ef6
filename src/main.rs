mod config;
mod coordinator;
mod error;
mod interrupt;
mod logging;
mod output;
mod pool;
mod results;
mod task_queue;
mod types;
mod usage;
mod work;
mod worker;

use clap::Parser;

use crate::config::{CliArgs, RunConfig};
use crate::coordinator::{Coordinator, Phase};

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunConfig::try_from(args)?;

    logging::init();
    tracing::debug!("starting run with config: {config:#?}");

    let mut coordinator = Coordinator::new(config);
    let report = coordinator.run_and_write()?;
    debug_assert_eq!(coordinator.phase(), Phase::Done);
    if !report.is_complete() {
        tracing::warn!(
            "run incomplete: {} of {} task(s) produced a result",
            report.results.len(),
            report.tasks_seeded
        );
    }
    println!("{report}");
    Ok(())
}
