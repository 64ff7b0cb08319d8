use std::{env, fmt, fs, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{ActFnConfig, ConvBlockConfig, ModelConfig, PaddingConfig, PoolConfig};
use crate::{error::OrchestratorError, logging::LoggingConfig};

/// Names a JSON file holding a `PipelineConfig`.
pub const CONFIG_VAR: &str = "ORCHESTRATOR_CONFIG";
/// Names a preset, used when `CONFIG_VAR` isn't set.
pub const PRESET_VAR: &str = "ORCHESTRATOR_PRESET";

const DEFAULT_MINIBATCH_SIZE: usize = 10;
const DEFAULT_MAX_EPISODE_RETRIES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Examples generated per cycle.
    pub batch_size: usize,
    /// Optimization steps per cycle.
    pub steps: usize,
    pub learning_rate: f32,
    #[serde(default = "default_minibatch_size")]
    pub minibatch_size: usize,
    /// Delay between drawing the scenes and reading them back.
    pub settle_ms: u64,
    /// Consecutive failed episodes tolerated before a cycle gives up.
    #[serde(default = "default_max_episode_retries")]
    pub max_episode_retries: usize,
}

fn default_minibatch_size() -> usize {
    DEFAULT_MINIBATCH_SIZE
}

fn default_max_episode_retries() -> usize {
    DEFAULT_MAX_EPISODE_RETRIES
}

/// What happens between the end of a training call and the next batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum CadenceConfig {
    FixedInterval { interval_ms: u64 },
    BackToBack { pause_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub surface: SurfaceConfig,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub cadence: CadenceConfig,
    #[serde(default)]
    pub seed: Option<u64>,
    /// `None` runs until interrupted.
    #[serde(default)]
    pub max_cycles: Option<usize>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The two pipelines the system ships with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Preset {
    /// One convolution block whose pool is built but bypassed, long training calls on a slow
    /// fixed cadence.
    Shallow,
    /// Three pooled convolution blocks, short training calls back to back.
    #[default]
    Deep,
}

impl FromStr for Preset {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shallow" => Ok(Self::Shallow),
            "deep" => Ok(Self::Deep),
            other => Err(OrchestratorError::InvalidConfig(format!(
                "unknown preset {other:?}, expected \"shallow\" or \"deep\""
            ))),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shallow => write!(f, "shallow"),
            Self::Deep => write!(f, "deep"),
        }
    }
}

impl PipelineConfig {
    pub fn preset(preset: Preset) -> Self {
        let block = |filters, enabled| ConvBlockConfig {
            filters,
            kernel: 5,
            act_fn: ActFnConfig::Relu,
            pool: Some(PoolConfig {
                window: 2,
                stride: 2,
                padding: PaddingConfig::Valid,
                enabled,
            }),
        };

        let (blocks, training, cadence) = match preset {
            Preset::Shallow => (
                vec![block(32, false)],
                TrainingConfig {
                    batch_size: 100,
                    steps: 100,
                    learning_rate: 0.01,
                    minibatch_size: DEFAULT_MINIBATCH_SIZE,
                    settle_ms: 10,
                    max_episode_retries: DEFAULT_MAX_EPISODE_RETRIES,
                },
                CadenceConfig::FixedInterval {
                    interval_ms: 45_000,
                },
            ),
            Preset::Deep => (
                vec![block(16, true), block(32, true), block(32, true)],
                TrainingConfig {
                    batch_size: 100,
                    steps: 10,
                    learning_rate: 0.01,
                    minibatch_size: DEFAULT_MINIBATCH_SIZE,
                    settle_ms: 1,
                    max_episode_retries: DEFAULT_MAX_EPISODE_RETRIES,
                },
                CadenceConfig::BackToBack { pause_ms: 10 },
            ),
        };

        Self {
            surface: SurfaceConfig {
                width: 400,
                height: 200,
            },
            model: ModelConfig {
                blocks,
                dense: vec![128, 64, 32, 16, 1],
                act_fn: ActFnConfig::Relu,
            },
            training,
            cadence,
            seed: None,
            max_cycles: None,
            logging: LoggingConfig::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, OrchestratorError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, OrchestratorError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Loads the file named by `ORCHESTRATOR_CONFIG` if set, otherwise the preset named by
    /// `ORCHESTRATOR_PRESET`, otherwise the deep preset.
    pub fn from_env() -> Result<Self, OrchestratorError> {
        if let Ok(path) = env::var(CONFIG_VAR) {
            return Self::from_path(path);
        }

        let preset = match env::var(PRESET_VAR) {
            Ok(name) => name.parse()?,
            Err(_) => Preset::default(),
        };

        Ok(Self::preset(preset))
    }
}
