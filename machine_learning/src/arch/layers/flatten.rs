use ndarray::{Array2, Array4};

use crate::{MlErr, Result};

/// Collapses `(batch, channels, width, height)` into `(batch, channels · width · height)`.
#[derive(Clone, Default)]
pub struct Flatten {
    input_dim: (usize, usize, usize, usize),
}

impl Flatten {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward(&mut self, x: Array4<f32>) -> Result<Array2<f32>> {
        let (n, c, w, h) = x.dim();
        self.input_dim = (n, c, w, h);

        let x = if x.is_standard_layout() {
            x
        } else {
            x.as_standard_layout().into_owned()
        };

        Ok(x.into_shape_with_order((n, c * w * h))?)
    }

    pub fn backward(&mut self, d: Array2<f32>) -> Result<Array4<f32>> {
        let (n, c, w, h) = self.input_dim;
        if d.dim() != (n, c * w * h) {
            return Err(MlErr::ShapeMismatch {
                what: "flatten delta",
                got: d.shape().to_vec(),
                expected: vec![n, c * w * h],
            });
        }

        Ok(d.to_shape(self.input_dim)?.into_owned())
    }
}
