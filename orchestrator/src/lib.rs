pub mod clock;
pub mod configs;
pub mod error;
pub mod label;
pub mod logging;
pub mod metrics;
mod orchestrator;
pub mod spec;

use log::info;
use machine_learning::training::ConvRegressor;
use rand::{SeedableRng, rngs::StdRng};
use scene::{RasterSurface, Scene};

pub use error::OrchestratorError;
pub use orchestrator::{CycleOutcome, CycleReport, Orchestrator, Phase};

use crate::{
    clock::TokioClock,
    configs::{Adapter, PipelineConfig},
};

/// The orchestrator `build` returns.
pub type RasterOrchestrator =
    Orchestrator<RasterSurface, ConvRegressor<StdRng>, TokioClock, StdRng>;

/// Validates `config` and wires up two raster scenes, a convolutional regressor for their bitmaps
/// and a tokio clock.
///
/// Every random generator is derived from a single one, seeded by `config.seed` when present.
///
/// # Errors
/// Returns an `OrchestratorError` if the config is invalid or the model can't be set up.
pub fn build(config: &PipelineConfig) -> Result<RasterOrchestrator, OrchestratorError> {
    let spec = Adapter::new().adapt(config)?;
    let mut rng = generate_rng(spec.seed);

    let target = Scene::new(
        "target",
        RasterSurface::new(spec.width, spec.height)?,
        StdRng::from_rng(&mut rng),
    )?;
    let current = Scene::new(
        "current",
        RasterSurface::new(spec.width, spec.height)?,
        StdRng::from_rng(&mut rng),
    )?;

    let [width, height, channels] = target.bitmap_shape();
    let input_shape = [width, height, 2 * channels];
    let model = ConvRegressor::setup(
        &spec.regressor,
        input_shape,
        [1],
        StdRng::from_rng(&mut rng),
    )?;

    info!(
        "built orchestrator for {width}x{height} scenes, {} parameters, {} blocks",
        model.params().len(),
        spec.regressor.blocks.len()
    );

    Orchestrator::new(target, current, model, TokioClock::new(), spec.training)
}

fn generate_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
