use ndarray::{Array2, ArrayD};

use super::loss::LossFn;
use crate::{Result, optimization::Optimizer};

pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Runs one optimization step per minibatch yielded by `batches`. **`params` gets updated**
    /// after each minibatch according to `optimizer`.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `grad` - A buffer the size of `params` where each step's gradient is written.
    /// * `optimizer` - Dictates how to update the parameters from the gradient.
    /// * `loss_fn` - The cost being minimized.
    /// * `batches` - Pairs of inputs and targets, one per step.
    ///
    /// # Returns
    /// The cost of the last minibatch, measured before its update, or an error if there were no
    /// minibatches at all.
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
        I: IntoIterator<Item = (ArrayD<f32>, Array2<f32>)>;
}
