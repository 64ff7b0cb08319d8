use std::fmt;

use log::{debug, error, info, warn};
use machine_learning::{dataset::TrainingExample, training::Regressor};
use rand::Rng;
use scene::{NormalizedBitmap, Scene, Surface};

use crate::{
    clock::Clock, error::OrchestratorError, label::label, metrics::PipelineMetrics,
    spec::TrainingSpec,
};

/// What the orchestrator is doing right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    GeneratingBatch,
    Training,
    Waiting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::GeneratingBatch => "generating batch",
            Self::Training => "training",
            Self::Waiting => "waiting",
        };

        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    Trained { cost: f32 },
    /// The training call returned a non-finite cost.
    Diverged { cost: f32 },
}

/// The result of a single `run_cycle`.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Zero based index of the cycle.
    pub cycle: u64,
    pub outcome: CycleOutcome,
    /// Examples the model was trained on.
    pub examples: usize,
    /// Episodes skipped while generating the batch.
    pub failed_episodes: usize,
}

/// Drives the online training loop: generates a batch of labeled scene pairs, trains the model
/// on it, waits for the cadence and starts over.
///
/// The orchestrator owns both scenes, the model and the clock for its whole life; the weights
/// keep improving across cycles.
pub struct Orchestrator<S, M, C, R>
where
    S: Surface,
    M: Regressor,
    C: Clock,
    R: Rng,
{
    target: Scene<S, R>,
    current: Scene<S, R>,
    model: M,
    clock: C,
    spec: TrainingSpec,
    phase: Phase,
    metrics: PipelineMetrics,
}

impl<S, M, C, R> Orchestrator<S, M, C, R>
where
    S: Surface,
    M: Regressor,
    C: Clock,
    R: Rng,
{
    /// Creates a new `Orchestrator`.
    ///
    /// # Arguments
    /// * `target` - The scene the model compares against.
    /// * `current` - The scene compared to the target.
    /// * `model` - The regressor, already set up for the scenes' bitmaps.
    /// * `clock` - The source of every wait.
    /// * `spec` - How batches are generated and trained on.
    ///
    /// # Returns
    /// A new idle `Orchestrator` or an error if the scenes produce bitmaps of different shapes.
    pub fn new(
        target: Scene<S, R>,
        current: Scene<S, R>,
        model: M,
        clock: C,
        spec: TrainingSpec,
    ) -> Result<Self, OrchestratorError> {
        let (t, c) = (target.bitmap_shape(), current.bitmap_shape());
        if t != c {
            return Err(OrchestratorError::InvalidConfig(format!(
                "scenes {} and {} produce bitmaps shaped {t:?} and {c:?}",
                target.name(),
                current.name()
            )));
        }

        Ok(Self {
            target,
            current,
            model,
            clock,
            spec,
            phase: Phase::Idle,
            metrics: PipelineMetrics::default(),
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn target(&self) -> &Scene<S, R> {
        &self.target
    }

    pub fn current(&self) -> &Scene<S, R> {
        &self.current
    }

    /// Runs cycles until `max_cycles` of them completed, forever if there is no limit.
    ///
    /// # Returns
    /// The first error a cycle couldn't recover from.
    pub async fn run(&mut self) -> Result<(), OrchestratorError> {
        let limit = self.spec.max_cycles;

        while limit.is_none_or(|max| self.metrics.cycles < max as u64) {
            if let Err(e) = self.run_cycle().await {
                self.set_phase(Phase::Idle);
                return Err(e);
            }
        }

        self.set_phase(Phase::Idle);
        Ok(())
    }

    /// Generates a batch, trains on it and waits for the cadence.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, OrchestratorError> {
        let cycle = self.metrics.cycles;

        self.set_phase(Phase::GeneratingBatch);
        let start = self.clock.now();
        let (batch, failed_episodes) = self.generate_batch().await?;
        self.metrics.generating_time += self.clock.now().saturating_sub(start);

        self.set_phase(Phase::Training);
        let start = self.clock.now();
        let cost = self
            .model
            .train(&batch, self.spec.steps, self.spec.learning_rate)?;
        self.metrics.training_time += self.clock.now().saturating_sub(start);

        let examples = batch.len();
        drop(batch);

        let outcome = if cost.is_finite() {
            CycleOutcome::Trained { cost }
        } else {
            self.metrics.bump_diverged_cycle();
            error!(cycle = cycle, cost = cost; "training diverged");
            CycleOutcome::Diverged { cost }
        };
        self.metrics.bump_cycle();

        info!(
            "cycle={cycle} cost={cost} examples={examples} failed_episodes={failed_episodes} \
             episodes={} generating={:?} training={:?} waiting={:?}",
            self.metrics.episodes,
            self.metrics.generating_time,
            self.metrics.training_time,
            self.metrics.waiting_time,
        );

        self.set_phase(Phase::Waiting);
        let wait = self.spec.cadence.wait();
        let start = self.clock.now();
        self.clock.sleep(wait).await;
        self.metrics.waiting_time += self.clock.now().saturating_sub(start);

        Ok(CycleReport {
            cycle,
            outcome,
            examples,
            failed_episodes,
        })
    }

    /// Predicts the distance between two bitmaps with the current weights.
    pub fn predict(
        &mut self,
        target: &NormalizedBitmap,
        current: &NormalizedBitmap,
    ) -> Result<f32, OrchestratorError> {
        Ok(self.model.predict(target.view(), current.view())?)
    }

    /// Runs episodes until the batch is full, skipping failed ones.
    ///
    /// # Returns
    /// The batch and how many episodes failed, or an error once more than `max_episode_retries`
    /// episodes failed in a row.
    async fn generate_batch(&mut self) -> Result<(Vec<TrainingExample>, usize), OrchestratorError> {
        let batch_size = self.spec.batch_size.get();
        let mut batch = Vec::with_capacity(batch_size);
        let mut failed = 0;
        let mut consecutive = 0;

        while batch.len() < batch_size {
            match self.episode().await {
                Ok(example) => {
                    consecutive = 0;
                    self.metrics.bump_episode();
                    batch.push(example);
                }
                Err(e) => {
                    failed += 1;
                    consecutive += 1;
                    self.metrics.bump_failed_episode();

                    if consecutive > self.spec.max_episode_retries {
                        return Err(OrchestratorError::EpisodeRetriesExhausted {
                            attempts: consecutive,
                            last: Box::new(e),
                        });
                    }

                    warn!("skipping failed episode, attempt={consecutive}: {e}");
                }
            }
        }

        Ok((batch, failed))
    }

    /// Renders a fresh pair of random scenes and labels their distance.
    async fn episode(&mut self) -> Result<TrainingExample, OrchestratorError> {
        for scene in [&mut self.target, &mut self.current] {
            scene.clear()?;
            scene.randomize();
        }

        self.target.draw()?;
        self.current.draw()?;
        self.clock.sleep(self.spec.settle).await;

        let target = self.target.bitmap()?.normalize();
        let current = self.current.bitmap()?.normalize();
        let distance = label(&target, &current)?;

        Ok(TrainingExample::new(
            target.into_array(),
            current.into_array(),
            distance,
        )?)
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!("phase {} -> {phase}", self.phase);
            self.phase = phase;
        }
    }
}
