use std::{cell::RefCell, iter, num::NonZeroUsize, rc::Rc};

use log::debug;
use ndarray::{ArrayView3, Axis};
use rand::Rng;

use super::{RegressorBuilder, Regressor};
use crate::{
    MlErr, Result,
    arch::{Model, Sequential, loss::Mse},
    dataset::{ShuffledProvider, TrainingExample, stack_pair},
    optimization::GradientDescent,
    spec::RegressorSpec,
};

/// A convolutional network regressing a scalar from a pair of images stacked along their channels.
///
/// The topology is fixed when the regressor is set up and its weights live as long as it does;
/// every call to `train` keeps optimizing the same weights.
pub struct ConvRegressor<R: Rng> {
    model: Sequential,
    params: Vec<f32>,
    grad: Vec<f32>,
    loss_fn: Mse,
    minibatch_size: NonZeroUsize,
    input_shape: [usize; 3],
    rng: Rc<RefCell<R>>,
}

impl<R: Rng> ConvRegressor<R> {
    /// Builds the network described by `spec`, see [`RegressorBuilder::build`].
    pub fn setup(
        spec: &RegressorSpec,
        input_shape: [usize; 3],
        output_shape: [usize; 1],
        rng: R,
    ) -> Result<Self> {
        RegressorBuilder::new().build(spec, input_shape, output_shape, rng)
    }

    pub(super) fn new(
        model: Sequential,
        params: Vec<f32>,
        minibatch_size: NonZeroUsize,
        input_shape: [usize; 3],
        rng: Rc<RefCell<R>>,
    ) -> Self {
        Self {
            grad: vec![0.; params.len()],
            model,
            params,
            loss_fn: Mse::new(),
            minibatch_size,
            input_shape,
            rng,
        }
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub fn model(&self) -> &Sequential {
        &self.model
    }

    fn check_image(&self, image: ArrayView3<f32>) -> Result<()> {
        let [width, height, channels] = self.input_shape;
        let expected = [width, height, channels / 2];

        if image.shape() != expected {
            return Err(MlErr::ShapeMismatch {
                what: "regressor image",
                got: image.shape().to_vec(),
                expected: expected.to_vec(),
            });
        }

        Ok(())
    }
}

impl<R: Rng> Regressor for ConvRegressor<R> {
    fn train(
        &mut self,
        batch: &[TrainingExample],
        steps: NonZeroUsize,
        learning_rate: f32,
    ) -> Result<f32> {
        for example in batch {
            self.check_image(example.target())?;
            self.check_image(example.current())?;
        }

        let mut provider = ShuffledProvider::new(batch, self.minibatch_size)?;
        let mut optimizer = GradientDescent::new(learning_rate);

        let Self {
            model,
            params,
            grad,
            loss_fn,
            rng,
            ..
        } = self;

        let mut rng = rng.borrow_mut();
        let minibatches = iter::repeat_with(|| provider.next_batch(&mut *rng))
            .take(steps.get())
            .map(|(x, y)| (x.into_dyn(), y));

        let cost = model.backprop(params, grad, &mut optimizer, &*loss_fn, minibatches)?;

        debug!(
            examples = batch.len(),
            steps = steps.get(),
            cost = cost;
            "trained regressor"
        );

        Ok(cost)
    }

    fn predict(&mut self, first: ArrayView3<f32>, second: ArrayView3<f32>) -> Result<f32> {
        self.check_image(first)?;
        self.check_image(second)?;

        let x = stack_pair(first, second)?.insert_axis(Axis(0)).into_dyn();
        let y = self.model.forward(&self.params, x)?;
        y.iter().next().copied().ok_or(MlErr::EmptyBatch)
    }
}
