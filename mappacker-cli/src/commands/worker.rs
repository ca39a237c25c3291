//! Worker command - drain the spool queue until interrupted.

use clap::Args;
use mappacker::queue::{JsonStatusStore, QueueWorker, SpoolQueue};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the worker command.
#[derive(Debug, Args)]
pub struct WorkerArgs {
    /// Process the messages already queued, then exit
    #[arg(long)]
    pub once: bool,

    /// Seconds to wait when the queue is empty (overrides config.ini)
    #[arg(long)]
    pub poll_interval: Option<u64>,
}

/// Run the worker command.
pub fn run(args: WorkerArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(true)?;
    runner.log_startup("worker");
    let config = runner.config();

    let mut queue = SpoolQueue::new(config.queue.spool_dir.clone());
    if let Some(dir) = &config.queue.destination_dir {
        queue = queue.with_completion_dir(dir.clone());
    }
    let status = JsonStatusStore::new(config.queue.status_dir.clone());
    let poll_interval = args.poll_interval.unwrap_or(config.queue.poll_interval);

    let worker = QueueWorker::new(
        queue,
        status,
        runner.job_runner()?,
        config.output.directory.clone(),
    )
    .with_provider_settings(config.provider.clone())
    .with_poll_interval(Duration::from_secs(poll_interval));

    println!("Watching {}", config.queue.spool_dir.display());
    println!("Status records in {}", config.queue.status_dir.display());

    let runtime = runner.runtime()?;
    runtime.block_on(async {
        if args.once {
            let mut processed = 0usize;
            while worker.process_one().await {
                processed += 1;
            }
            info!(processed, "Queue drained");
            println!("Processed {} message(s)", processed);
            return;
        }

        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping after the current job");
                signal_token.cancel();
            }
        });

        println!("Press Ctrl-C to stop");
        worker.run(shutdown).await;
    });

    Ok(())
}
