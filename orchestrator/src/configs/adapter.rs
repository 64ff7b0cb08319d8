use std::{num::NonZeroUsize, time::Duration};

use machine_learning::spec::{ActFnSpec, ConvBlockSpec, Padding, PoolSpec, RegressorSpec};

use super::{
    ActFnConfig, CadenceConfig, ConvBlockConfig, ModelConfig, PaddingConfig, PipelineConfig,
    PoolConfig, TrainingConfig,
};
use crate::{
    error::OrchestratorError,
    spec::{Cadence, PipelineSpec, TrainingSpec},
};

/// Turns a user facing `PipelineConfig` into the `PipelineSpec` the orchestrator runs, rejecting
/// anything that couldn't run.
#[derive(Debug, Default)]
pub struct Adapter;

impl Adapter {
    pub fn new() -> Self {
        Self
    }

    pub fn adapt(&self, config: &PipelineConfig) -> Result<PipelineSpec, OrchestratorError> {
        let PipelineConfig {
            surface,
            model,
            training,
            cadence,
            seed,
            max_cycles,
            ..
        } = config;

        if surface.width == 0 || surface.height == 0 {
            return Err(invalid(format!(
                "surface must have positive dimensions, got {}x{}",
                surface.width, surface.height
            )));
        }

        Ok(PipelineSpec {
            width: surface.width,
            height: surface.height,
            regressor: self.adapt_model(model, training)?,
            training: self.adapt_training(training, cadence, *max_cycles)?,
            seed: *seed,
        })
    }

    // -------------------------------------------------------------------------
    // Model
    // -------------------------------------------------------------------------

    fn adapt_model(
        &self,
        model: &ModelConfig,
        training: &TrainingConfig,
    ) -> Result<RegressorSpec, OrchestratorError> {
        if model.blocks.is_empty() {
            return Err(invalid("model must have at least one convolution block"));
        }

        if model.dense.last() != Some(&1) {
            return Err(invalid(format!(
                "the last dense layer must have width 1, got {:?}",
                model.dense.last()
            )));
        }

        let blocks = model
            .blocks
            .iter()
            .enumerate()
            .map(|(i, block)| self.adapt_block(i, block))
            .collect::<Result<_, _>>()?;

        let dense = model
            .dense
            .iter()
            .enumerate()
            .map(|(i, &width)| non_zero(width, &format!("dense layer {i} width")))
            .collect::<Result<_, _>>()?;

        Ok(RegressorSpec {
            blocks,
            dense,
            act_fn: self.adapt_act_fn(model.act_fn)?,
            minibatch_size: non_zero(training.minibatch_size, "minibatch size")?,
        })
    }

    fn adapt_block(
        &self,
        i: usize,
        block: &ConvBlockConfig,
    ) -> Result<ConvBlockSpec, OrchestratorError> {
        let pool = match block.pool {
            Some(pool) if pool.enabled => Some(self.adapt_pool(i, pool)?),
            _ => None,
        };

        Ok(ConvBlockSpec {
            filters: non_zero(block.filters, &format!("block {i} filters"))?,
            kernel: non_zero(block.kernel, &format!("block {i} kernel"))?,
            act_fn: self.adapt_act_fn(block.act_fn)?,
            pool,
        })
    }

    fn adapt_pool(&self, i: usize, pool: PoolConfig) -> Result<PoolSpec, OrchestratorError> {
        let padding = match pool.padding {
            PaddingConfig::Valid => Padding::Valid,
            PaddingConfig::Same => Padding::Same,
        };

        Ok(PoolSpec {
            window: non_zero(pool.window, &format!("block {i} pool window"))?,
            stride: non_zero(pool.stride, &format!("block {i} pool stride"))?,
            padding,
        })
    }

    fn adapt_act_fn(&self, act_fn: ActFnConfig) -> Result<ActFnSpec, OrchestratorError> {
        match act_fn {
            ActFnConfig::Relu => Ok(ActFnSpec::Relu),
            ActFnConfig::Sigmoid { amp } if amp.is_finite() && amp > 0. => {
                Ok(ActFnSpec::Sigmoid { amp })
            }
            ActFnConfig::Sigmoid { amp } => Err(invalid(format!(
                "sigmoid amplitude must be finite and positive, got {amp}"
            ))),
        }
    }

    // -------------------------------------------------------------------------
    // Training
    // -------------------------------------------------------------------------

    fn adapt_training(
        &self,
        training: &TrainingConfig,
        cadence: &CadenceConfig,
        max_cycles: Option<usize>,
    ) -> Result<TrainingSpec, OrchestratorError> {
        let lr = training.learning_rate;
        if !lr.is_finite() || lr <= 0. {
            return Err(invalid(format!(
                "learning rate must be finite and positive, got {lr}"
            )));
        }

        let cadence = match *cadence {
            CadenceConfig::FixedInterval { interval_ms } => {
                Cadence::FixedInterval(Duration::from_millis(interval_ms))
            }
            CadenceConfig::BackToBack { pause_ms } => {
                Cadence::BackToBack(Duration::from_millis(pause_ms))
            }
        };

        Ok(TrainingSpec {
            batch_size: non_zero(training.batch_size, "batch size")?,
            steps: non_zero(training.steps, "steps")?,
            learning_rate: lr,
            settle: Duration::from_millis(training.settle_ms),
            cadence,
            max_episode_retries: training.max_episode_retries,
            max_cycles,
        })
    }
}

fn invalid(msg: impl Into<String>) -> OrchestratorError {
    OrchestratorError::InvalidConfig(msg.into())
}

fn non_zero(n: usize, what: &str) -> Result<NonZeroUsize, OrchestratorError> {
    NonZeroUsize::new(n).ok_or_else(|| invalid(format!("{what} must be positive")))
}
