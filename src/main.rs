use anyhow::{Context, Result, anyhow};
use surroundscope::config::{PipelineConfig, available_preset_names};
use surroundscope::pipeline::{LogRenderer, Pipeline};
use surroundscope::source::{BlockSource, SyntheticSurround};
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_EVERY_FRAMES: u64 = 30;

fn main() -> Result<()> {
    init_tracing()?;

    let config = PipelineConfig::load_or_default();
    info!(
        "[main] presets available: {}",
        available_preset_names().collect::<Vec<_>>().join(", ")
    );

    let mut source = SyntheticSurround::new(config.sample_rate, config.block_size);
    info!(
        "[main] synthetic source: {} Hz, {} frames per block",
        source.sample_rate(),
        source.block_size()
    );

    let mut pipeline = Pipeline::new(config);
    let mut renderer = LogRenderer::new(LOG_EVERY_FRAMES);
    let summary = pipeline.run(&mut source, &mut renderer);

    info!(
        "[main] stopped after {} cycle(s), {} dropped",
        summary.cycles, summary.dropped
    );
    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .map_err(|err| anyhow!("{err}"))
        .context("failed to install tracing subscriber")
}
