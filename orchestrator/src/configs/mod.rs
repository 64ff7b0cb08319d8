mod adapter;
mod model;
mod pipeline;

pub use adapter::Adapter;
pub use model::{ActFnConfig, ConvBlockConfig, ModelConfig, PaddingConfig, PoolConfig};
pub use pipeline::{
    CONFIG_VAR, CadenceConfig, PRESET_VAR, PipelineConfig, Preset, SurfaceConfig, TrainingConfig,
};
