//! Plain descriptions of a regressor's topology, resolved into layers by the
//! [`RegressorBuilder`](crate::training::RegressorBuilder).

use std::num::NonZeroUsize;

/// Nonlinearity applied after a convolution or a hidden dense layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActFnSpec {
    Relu,
    Sigmoid { amp: f32 },
}

/// How a pooling window treats the borders of its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// Only windows that fit entirely in the input are pooled.
    Valid,
    /// The input is padded so the output length is `ceil(len / stride)`.
    Same,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSpec {
    pub window: NonZeroUsize,
    pub stride: NonZeroUsize,
    pub padding: Padding,
}

/// A convolution (stride 1, spatial size preserved) followed by its activation and an optional
/// max-pool.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvBlockSpec {
    pub filters: NonZeroUsize,
    pub kernel: NonZeroUsize,
    pub act_fn: ActFnSpec,
    pub pool: Option<PoolSpec>,
}

/// The full topology of a [`ConvRegressor`](crate::training::ConvRegressor).
#[derive(Debug, Clone, PartialEq)]
pub struct RegressorSpec {
    pub blocks: Vec<ConvBlockSpec>,
    /// Widths of the dense stack after flattening; the last one is the output and must be 1.
    pub dense: Vec<NonZeroUsize>,
    /// Activation of every dense layer but the last, which stays linear.
    pub act_fn: ActFnSpec,
    pub minibatch_size: NonZeroUsize,
}
