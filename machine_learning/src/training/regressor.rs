use std::num::NonZeroUsize;

use ndarray::ArrayView3;

use crate::{Result, dataset::TrainingExample};

/// A model that learns a scalar from a pair of same-shaped images.
pub trait Regressor {
    /// Trains over `batch` for `steps` minibatch updates. The weights are kept between calls, so
    /// training can be resumed with new batches indefinitely.
    ///
    /// # Arguments
    /// * `batch` - Labeled image pairs, each image shaped `[width, height, channels]`.
    /// * `steps` - The amount of optimization steps.
    /// * `learning_rate` - The step length of the optimizer.
    ///
    /// # Returns
    /// The cost of the last step or an error if the batch doesn't fit the model.
    fn train(
        &mut self,
        batch: &[TrainingExample],
        steps: NonZeroUsize,
        learning_rate: f32,
    ) -> Result<f32>;

    /// Predicts the scalar for a single pair without modifying the model.
    fn predict(&mut self, first: ArrayView3<f32>, second: ArrayView3<f32>) -> Result<f32>;
}
