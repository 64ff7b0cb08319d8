use std::{cell::Cell, num::NonZeroUsize, rc::Rc, time::Duration};

use machine_learning::{
    dataset::TrainingExample,
    spec::{ActFnSpec, ConvBlockSpec, Padding, PoolSpec, RegressorSpec},
    training::{ConvRegressor, Regressor},
};
use ndarray::ArrayView3;
use orchestrator::{
    CycleOutcome, Orchestrator, OrchestratorError, Phase,
    clock::{Clock, ManualClock},
    configs::PipelineConfig,
    label::label,
    spec::{Cadence, TrainingSpec},
};
use rand::{SeedableRng, rngs::StdRng};
use scene::{Color, RasterSurface, Rect, Scene, Surface, SurfaceErr};

const WIDTH: usize = 64;
const HEIGHT: usize = 32;

fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

/// Records every training call instead of training.
struct RecordingRegressor {
    clock: ManualClock,
    cost: f32,
    calls: Vec<(Duration, Vec<f32>)>,
    examples: Vec<TrainingExample>,
}

impl RecordingRegressor {
    fn new(clock: ManualClock, cost: f32) -> Self {
        Self {
            clock,
            cost,
            calls: Vec::new(),
            examples: Vec::new(),
        }
    }
}

impl Regressor for RecordingRegressor {
    fn train(
        &mut self,
        batch: &[TrainingExample],
        _steps: NonZeroUsize,
        _learning_rate: f32,
    ) -> machine_learning::Result<f32> {
        let labels = batch.iter().map(TrainingExample::label).collect();
        self.calls.push((self.clock.now(), labels));
        self.examples.extend_from_slice(batch);
        Ok(self.cost)
    }

    fn predict(
        &mut self,
        _first: ArrayView3<f32>,
        _second: ArrayView3<f32>,
    ) -> machine_learning::Result<f32> {
        Ok(0.5)
    }
}

/// A raster surface whose readback fails a given amount of times.
struct FlakySurface {
    inner: RasterSurface,
    failures: Rc<Cell<usize>>,
}

impl FlakySurface {
    fn new(failures: usize) -> (Self, Rc<Cell<usize>>) {
        let failures = Rc::new(Cell::new(failures));
        let surface = Self {
            inner: RasterSurface::new(WIDTH, HEIGHT).unwrap(),
            failures: Rc::clone(&failures),
        };

        (surface, failures)
    }
}

impl Surface for FlakySurface {
    fn width(&self) -> usize {
        self.inner.width()
    }

    fn height(&self) -> usize {
        self.inner.height()
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) -> scene::Result<()> {
        self.inner.fill_rect(rect, color)
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f32) -> scene::Result<()> {
        self.inner.stroke_rect(rect, color, line_width)
    }

    fn clear(&mut self) -> scene::Result<()> {
        self.inner.clear()
    }

    fn read_alpha(&self) -> scene::Result<Vec<u8>> {
        let left = self.failures.get();
        if left > 0 {
            self.failures.set(left - 1);
            return Err(SurfaceErr::Unavailable {
                name: "flaky".into(),
            });
        }

        self.inner.read_alpha()
    }
}

fn training_spec(batch_size: usize, cadence: Cadence) -> TrainingSpec {
    TrainingSpec {
        batch_size: nz(batch_size),
        steps: nz(2),
        learning_rate: 0.01,
        settle: Duration::from_millis(10),
        cadence,
        max_episode_retries: 3,
        max_cycles: None,
    }
}

fn scene<S: Surface>(name: &str, surface: S, seed: u64) -> Scene<S, StdRng> {
    Scene::new(name, surface, StdRng::seed_from_u64(seed)).unwrap()
}

fn recording(
    spec: TrainingSpec,
    cost: f32,
) -> (
    Orchestrator<RasterSurface, RecordingRegressor, ManualClock, StdRng>,
    ManualClock,
) {
    let clock = ManualClock::new();
    let orchestrator = Orchestrator::new(
        scene("target", RasterSurface::new(WIDTH, HEIGHT).unwrap(), 1),
        scene("current", RasterSurface::new(WIDTH, HEIGHT).unwrap(), 2),
        RecordingRegressor::new(clock.clone(), cost),
        clock.clone(),
        spec,
    )
    .unwrap();

    (orchestrator, clock)
}

fn flaky(
    spec: TrainingSpec,
    failures: usize,
) -> Orchestrator<FlakySurface, RecordingRegressor, ManualClock, StdRng> {
    let clock = ManualClock::new();
    let (target, _) = FlakySurface::new(failures);
    let (current, _) = FlakySurface::new(0);

    Orchestrator::new(
        scene("target", target, 1),
        scene("current", current, 2),
        RecordingRegressor::new(clock.clone(), 0.1),
        clock,
        spec,
    )
    .unwrap()
}

#[tokio::test]
async fn fixed_interval_trains_once_per_batch() {
    let interval = Duration::from_secs(45);
    let (mut orchestrator, clock) = recording(training_spec(4, Cadence::FixedInterval(interval)), 0.1);

    for cycle in 0..2 {
        let report = orchestrator.run_cycle().await.unwrap();
        assert_eq!(report.cycle, cycle);
        assert_eq!(report.examples, 4);
        assert_eq!(report.failed_episodes, 0);
        assert_eq!(report.outcome, CycleOutcome::Trained { cost: 0.1 });
    }

    let calls = &orchestrator.model().calls;
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|(_, labels)| labels.len() == 4));
    assert!(
        calls
            .iter()
            .flat_map(|(_, labels)| labels)
            .all(|l| (0. ..=1.).contains(l))
    );
    assert!(calls[1].0 - calls[0].0 >= interval);

    let settle = Duration::from_millis(10);
    let mut expected = vec![settle; 4];
    expected.push(interval);
    expected.extend([settle; 4]);
    expected.push(interval);
    assert_eq!(clock.sleeps(), expected);

    let metrics = orchestrator.metrics();
    assert_eq!(metrics.cycles, 2);
    assert_eq!(metrics.episodes, 8);
    assert_eq!(metrics.waiting_time, interval * 2);
    assert_eq!(metrics.generating_time, settle * 8);
}

#[tokio::test]
async fn examples_hold_the_rendered_scenes_and_their_distance() {
    let (mut orchestrator, _) = recording(training_spec(1, Cadence::BackToBack(Duration::ZERO)), 0.1);

    for _ in 0..3 {
        orchestrator.run_cycle().await.unwrap();

        let target = orchestrator.target().bitmap().unwrap().normalize();
        let current = orchestrator.current().bitmap().unwrap().normalize();
        let example = orchestrator.model().examples.last().unwrap();

        assert!(!orchestrator.target().is_empty());
        assert!(!orchestrator.current().is_empty());
        assert_eq!(example.target(), target.view());
        assert_eq!(example.current(), current.view());
        assert_eq!(example.label(), label(&target, &current).unwrap());
    }

    let labels: Vec<f32> = orchestrator
        .model()
        .examples
        .iter()
        .map(TrainingExample::label)
        .collect();
    assert!(labels.iter().any(|&l| l > 0.), "labels {labels:?}");
}

#[tokio::test]
async fn back_to_back_pauses_briefly() {
    let pause = Duration::from_millis(10);
    let (mut orchestrator, clock) = recording(training_spec(2, Cadence::BackToBack(pause)), 0.1);

    orchestrator.run_cycle().await.unwrap();

    assert_eq!(clock.sleeps().last(), Some(&pause));
    assert_eq!(orchestrator.phase(), Phase::Waiting);
}

#[tokio::test]
async fn run_stops_after_max_cycles() {
    let mut spec = training_spec(2, Cadence::BackToBack(Duration::ZERO));
    spec.max_cycles = Some(3);
    let (mut orchestrator, _) = recording(spec, 0.1);

    orchestrator.run().await.unwrap();

    assert_eq!(orchestrator.phase(), Phase::Idle);
    assert_eq!(orchestrator.metrics().cycles, 3);
    assert_eq!(orchestrator.model().calls.len(), 3);
}

#[tokio::test]
async fn divergence_is_reported_and_the_loop_goes_on() {
    let mut spec = training_spec(2, Cadence::BackToBack(Duration::ZERO));
    spec.max_cycles = Some(2);
    let (mut orchestrator, _) = recording(spec, f32::NAN);

    let report = orchestrator.run_cycle().await.unwrap();
    assert!(matches!(report.outcome, CycleOutcome::Diverged { cost } if cost.is_nan()));

    orchestrator.run().await.unwrap();
    assert_eq!(orchestrator.metrics().cycles, 2);
    assert_eq!(orchestrator.metrics().diverged_cycles, 2);
}

#[tokio::test]
async fn failed_episodes_are_skipped() {
    let mut orchestrator = flaky(training_spec(3, Cadence::BackToBack(Duration::ZERO)), 2);

    let report = orchestrator.run_cycle().await.unwrap();

    assert_eq!(report.examples, 3);
    assert_eq!(report.failed_episodes, 2);
    assert_eq!(orchestrator.metrics().failed_episodes, 2);
    assert_eq!(orchestrator.metrics().episodes, 3);
}

#[tokio::test]
async fn too_many_failures_abort_the_cycle() {
    let mut orchestrator = flaky(
        training_spec(3, Cadence::BackToBack(Duration::ZERO)),
        usize::MAX,
    );

    let err = orchestrator.run().await.unwrap_err();

    match err {
        OrchestratorError::EpisodeRetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 4);
            assert!(matches!(*last, OrchestratorError::Surface(_)));
        }
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(orchestrator.phase(), Phase::Idle);
    assert!(orchestrator.model().calls.is_empty());
}

#[tokio::test]
async fn scenes_must_match() {
    let res = Orchestrator::new(
        scene("target", RasterSurface::new(WIDTH, HEIGHT).unwrap(), 1),
        scene("current", RasterSurface::new(HEIGHT, WIDTH).unwrap(), 2),
        RecordingRegressor::new(ManualClock::new(), 0.),
        ManualClock::new(),
        training_spec(1, Cadence::BackToBack(Duration::ZERO)),
    );

    assert!(matches!(res, Err(OrchestratorError::InvalidConfig(_))));
}

#[tokio::test]
async fn trains_a_real_regressor() {
    let regressor_spec = RegressorSpec {
        blocks: vec![ConvBlockSpec {
            filters: nz(2),
            kernel: nz(3),
            act_fn: ActFnSpec::Relu,
            pool: Some(PoolSpec {
                window: nz(2),
                stride: nz(2),
                padding: Padding::Same,
            }),
        }],
        dense: vec![nz(8), nz(1)],
        act_fn: ActFnSpec::Relu,
        minibatch_size: nz(2),
    };
    let model = ConvRegressor::setup(
        &regressor_spec,
        [WIDTH, HEIGHT, 2],
        [1],
        StdRng::seed_from_u64(3),
    )
    .unwrap();
    let before = model.params().to_vec();

    let mut spec = training_spec(3, Cadence::FixedInterval(Duration::from_secs(45)));
    spec.max_cycles = Some(2);
    let clock = ManualClock::new();
    let mut orchestrator = Orchestrator::new(
        scene("target", RasterSurface::new(WIDTH, HEIGHT).unwrap(), 1),
        scene("current", RasterSurface::new(WIDTH, HEIGHT).unwrap(), 2),
        model,
        clock.clone(),
        spec,
    )
    .unwrap();

    orchestrator.run().await.unwrap();

    assert_eq!(orchestrator.metrics().cycles, 2);
    assert_eq!(orchestrator.metrics().diverged_cycles, 0);
    assert_ne!(orchestrator.model().params(), before);
    assert!(clock.now() >= Duration::from_secs(90));

    let target = orchestrator.target().bitmap().unwrap().normalize();
    let current = orchestrator.current().bitmap().unwrap().normalize();
    assert!(orchestrator.predict(&target, &current).unwrap().is_finite());
}

fn small_config(seed: u64) -> PipelineConfig {
    let json = format!(
        r#"{{
            "surface": {{ "width": {WIDTH}, "height": {HEIGHT} }},
            "model": {{
                "blocks": [
                    {{
                        "filters": 2,
                        "kernel": 3,
                        "act_fn": {{ "kind": "relu" }},
                        "pool": {{ "window": 2, "stride": 2 }}
                    }}
                ],
                "dense": [4, 1],
                "act_fn": {{ "kind": "relu" }}
            }},
            "training": {{
                "batch_size": 2,
                "steps": 2,
                "learning_rate": 0.01,
                "minibatch_size": 2,
                "settle_ms": 1
            }},
            "cadence": {{ "policy": "back_to_back", "pause_ms": 10 }},
            "seed": {seed},
            "max_cycles": 1
        }}"#
    );

    PipelineConfig::from_json(&json).unwrap()
}

#[tokio::test(start_paused = true)]
async fn built_pipelines_are_reproducible() {
    let run = || async {
        let mut orchestrator = orchestrator::build(&small_config(42)).unwrap();
        orchestrator.run().await.unwrap();
        orchestrator.model().params().to_vec()
    };

    let first = run().await;
    let second = run().await;

    assert_eq!(first, second);
}

#[test]
fn build_rejects_invalid_configs() {
    let mut config = small_config(0);
    config.model.dense = vec![4, 3];

    assert!(matches!(
        orchestrator::build(&config),
        Err(OrchestratorError::InvalidConfig(_))
    ));
}
