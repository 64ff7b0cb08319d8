use ndarray::{ArrayD, Ix2, Ix4};

use super::{Conv2d, Dense, Flatten, MaxPool2d};
use crate::{MlErr, Result, arch::activations::ActFn, spec::Padding};

/// A layer of a `Sequential`, forwarding dynamically shaped arrays whose first axis is the batch.
#[derive(Clone)]
pub enum Layer {
    Conv2d(Conv2d),
    MaxPool2d(MaxPool2d),
    Flatten(Flatten),
    Dense(Dense),
}

impl Layer {
    pub fn max_pool2d(window: usize, stride: usize, padding: Padding) -> Self {
        Self::MaxPool2d(MaxPool2d::new(window, stride, padding))
    }

    pub fn flatten() -> Self {
        Self::Flatten(Flatten::new())
    }

    pub fn dense(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self::Dense(Dense::new(dim, act_fn))
    }

    /// Returns the amount of parameters of this layer.
    pub fn size(&self) -> usize {
        match self {
            Self::Conv2d(l) => l.size(),
            Self::Dense(l) => l.size(),
            Self::MaxPool2d(_) | Self::Flatten(_) => 0,
        }
    }

    /// Computes the shape of a single output sample from the shape of a single input sample.
    ///
    /// # Returns
    /// An error if this layer can't take inputs of that shape.
    pub fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        let mismatch = |expected: Vec<usize>| MlErr::ShapeMismatch {
            what: "layer input",
            got: input.to_vec(),
            expected,
        };

        match (self, input) {
            (Self::Conv2d(l), &[c, w, h]) if c == l.in_channels() => Ok(vec![l.filters(), w, h]),
            (Self::Conv2d(l), _) => Err(mismatch(vec![l.in_channels(), 0, 0])),
            (Self::MaxPool2d(l), &[c, w, h]) => {
                let (ow, _) = l.output_len(w)?;
                let (oh, _) = l.output_len(h)?;
                Ok(vec![c, ow, oh])
            }
            (Self::MaxPool2d(_), _) => Err(mismatch(vec![0, 0, 0])),
            (Self::Flatten(_), &[c, w, h]) => Ok(vec![c * w * h]),
            (Self::Flatten(_), _) => Err(mismatch(vec![0, 0, 0])),
            (Self::Dense(l), &[n]) if n == l.dim().0 => Ok(vec![l.dim().1]),
            (Self::Dense(l), _) => Err(mismatch(vec![l.dim().0])),
        }
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let y = match self {
            Self::Conv2d(l) => l.forward(params, x.into_dimensionality::<Ix4>()?)?.into_dyn(),
            Self::MaxPool2d(l) => l.forward(x.into_dimensionality::<Ix4>()?)?.into_dyn(),
            Self::Flatten(l) => l.forward(x.into_dimensionality::<Ix4>()?)?.into_dyn(),
            Self::Dense(l) => l.forward(params, x.into_dimensionality::<Ix2>()?)?.into_dyn(),
        };

        Ok(y)
    }

    /// Writes the layer's gradient into `grad` and returns the delta of its input.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        let dx = match self {
            Self::Conv2d(l) => l
                .backward(params, grad, d.into_dimensionality::<Ix4>()?)?
                .into_dyn(),
            Self::MaxPool2d(l) => l.backward(d.into_dimensionality::<Ix4>()?)?.into_dyn(),
            Self::Flatten(l) => l.backward(d.into_dimensionality::<Ix2>()?)?.into_dyn(),
            Self::Dense(l) => l
                .backward(params, grad, d.into_dimensionality::<Ix2>()?)?
                .into_dyn(),
        };

        Ok(dx)
    }
}
