//! Validated, ready to run descriptions of a pipeline, produced by the
//! [`Adapter`](crate::configs::Adapter).

use std::{num::NonZeroUsize, time::Duration};

use machine_learning::spec::RegressorSpec;

/// What happens after a training call before the next batch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Waits a fixed interval after every training call.
    FixedInterval(Duration),
    /// Starts the next batch right away, after a short pause that lets other work through.
    BackToBack(Duration),
}

impl Cadence {
    /// The time to wait once a training call returned.
    pub fn wait(&self) -> Duration {
        match *self {
            Self::FixedInterval(interval) => interval,
            Self::BackToBack(pause) => pause,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSpec {
    pub batch_size: NonZeroUsize,
    pub steps: NonZeroUsize,
    pub learning_rate: f32,
    pub settle: Duration,
    pub cadence: Cadence,
    pub max_episode_retries: usize,
    pub max_cycles: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSpec {
    pub width: usize,
    pub height: usize,
    pub regressor: RegressorSpec,
    pub training: TrainingSpec,
    pub seed: Option<u64>,
}
