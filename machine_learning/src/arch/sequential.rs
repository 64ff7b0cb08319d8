use ndarray::{Array2, ArrayD, Ix2};

use super::{Model, layers::Layer, loss::LossFn};
use crate::{MlErr, Result, optimization::Optimizer};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// The model owns no parameters; each call receives the whole flat parameter buffer and hands
/// every layer its own contiguous slice, in order.
#[derive(Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `params` - The parameters of every layer, concatenated.
    /// * `x` - The input minibatch, its first axis being the batch.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    pub fn forward(&mut self, params: &[f32], mut x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        self.check_size("parameters", params.len())?;

        let mut offset = 0;
        for layer in &mut self.layers {
            let size = layer.size();
            x = layer.forward(&params[offset..offset + size], x)?;
            offset += size;
        }

        Ok(x)
    }

    fn check_size(&self, what: &'static str, got: usize) -> Result<()> {
        let expected = self.size();
        if got != expected {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected,
            });
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(Layer::size).sum()
    }

    fn backprop<O, L, I>(
        &mut self,
        params: &mut [f32],
        grad: &mut [f32],
        optimizer: &mut O,
        loss_fn: &L,
        batches: I,
    ) -> Result<f32>
    where
        O: Optimizer,
        L: LossFn,
        I: IntoIterator<Item = (ArrayD<f32>, Array2<f32>)>,
    {
        self.check_size("gradient", grad.len())?;
        let mut last_loss = None;

        for (x, y) in batches {
            grad.fill(0.);

            let y_pred = self.forward(params, x)?.into_dimensionality::<Ix2>()?;
            if y_pred.dim() != y.dim() {
                return Err(MlErr::ShapeMismatch {
                    what: "prediction",
                    got: y_pred.shape().to_vec(),
                    expected: y.shape().to_vec(),
                });
            }

            last_loss = Some(loss_fn.loss(y_pred.view(), y.view()));
            let mut d = loss_fn.loss_prime(y_pred.view(), y.view()).into_dyn();

            let mut end = params.len();
            for layer in self.layers.iter_mut().rev() {
                let start = end - layer.size();
                d = layer.backward(&params[start..end], &mut grad[start..end], d)?;
                end = start;
            }

            optimizer.update_params(params, grad);
        }

        last_loss.ok_or(MlErr::EmptyBatch)
    }
}
