use anyhow::Context;
use log::{info, warn};
use orchestrator::{configs::PipelineConfig, logging::init_logging};
use tokio::signal;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = PipelineConfig::from_env().context("failed to load the pipeline config")?;
    init_logging(config.logging.clone());

    let mut orchestrator =
        orchestrator::build(&config).context("failed to build the orchestrator")?;

    tokio::select! {
        res = orchestrator.run() => res.context("training loop failed")?,
        res = signal::ctrl_c() => {
            res.context("failed to listen for ctrl-c")?;
            warn!("interrupted, stopping");
        }
    }

    let metrics = orchestrator.metrics();
    info!(
        "cycles={} episodes={} failed_episodes={} diverged_cycles={} generating={:?} training={:?} waiting={:?}",
        metrics.cycles,
        metrics.episodes,
        metrics.failed_episodes,
        metrics.diverged_cycles,
        metrics.generating_time,
        metrics.training_time,
        metrics.waiting_time,
    );

    Ok(())
}
