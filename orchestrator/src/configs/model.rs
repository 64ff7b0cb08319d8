use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActFnConfig {
    Relu,
    Sigmoid { amp: f32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingConfig {
    Valid,
    #[default]
    Same,
}

/// A max-pool after a convolution. A disabled pool is still part of the config but its output
/// isn't used, the block feeds the convolution's activation forward instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub window: usize,
    pub stride: usize,
    #[serde(default)]
    pub padding: PaddingConfig,
    #[serde(default = "enabled")]
    pub enabled: bool,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvBlockConfig {
    pub filters: usize,
    pub kernel: usize,
    pub act_fn: ActFnConfig,
    #[serde(default)]
    pub pool: Option<PoolConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub blocks: Vec<ConvBlockConfig>,
    /// Widths of the dense layers after flattening, the last one being the scalar output.
    pub dense: Vec<usize>,
    /// Activation of the hidden dense layers.
    pub act_fn: ActFnConfig,
}
