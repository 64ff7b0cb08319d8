use std::num::NonZeroUsize;

use ndarray::{Array2, Array3, Array4, ArrayView3, Axis, concatenate};
use rand::{Rng, seq::SliceRandom};

use crate::{MlErr, Result};

/// A labeled pair of images, each shaped `[width, height, channels]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    target: Array3<f32>,
    current: Array3<f32>,
    label: f32,
}

impl TrainingExample {
    /// # Returns
    /// An error if both images don't have the same shape.
    pub fn new(target: Array3<f32>, current: Array3<f32>, label: f32) -> Result<Self> {
        if target.dim() != current.dim() {
            return Err(MlErr::ShapeMismatch {
                what: "example images",
                got: current.shape().to_vec(),
                expected: target.shape().to_vec(),
            });
        }

        Ok(Self {
            target,
            current,
            label,
        })
    }

    pub fn target(&self) -> ArrayView3<'_, f32> {
        self.target.view()
    }

    pub fn current(&self) -> ArrayView3<'_, f32> {
        self.current.view()
    }

    pub fn label(&self) -> f32 {
        self.label
    }

    /// The model input for this example, see [`stack_pair`].
    pub fn stacked(&self) -> Result<Array3<f32>> {
        stack_pair(self.target(), self.current())
    }
}

/// Stacks two `[width, height, channels]` images along their channel axis and moves the channels
/// first, giving the `[2 · channels, width, height]` layout the convolutions read.
///
/// # Returns
/// An error if the images don't have the same shape.
pub fn stack_pair(first: ArrayView3<f32>, second: ArrayView3<f32>) -> Result<Array3<f32>> {
    if first.dim() != second.dim() {
        return Err(MlErr::ShapeMismatch {
            what: "image pair",
            got: second.shape().to_vec(),
            expected: first.shape().to_vec(),
        });
    }

    let stacked = concatenate(Axis(2), &[first, second])?;
    Ok(stacked
        .permuted_axes([2, 0, 1])
        .as_standard_layout()
        .into_owned())
}

/// Serves minibatches drawn from a fixed set of examples.
///
/// Every example is served once per epoch, in an order reshuffled at the start of each epoch, so
/// no example repeats before all the others were seen.
pub struct ShuffledProvider {
    inputs: Array4<f32>,
    labels: Array2<f32>,
    order: Vec<usize>,
    cursor: usize,
    minibatch_size: usize,
}

impl ShuffledProvider {
    /// Creates a new `ShuffledProvider`.
    ///
    /// # Arguments
    /// * `examples` - The examples to serve, stacked once here.
    /// * `minibatch_size` - The amount of examples per minibatch, capped at `examples.len()`.
    ///
    /// # Returns
    /// An error if there are no examples or their shapes differ.
    pub fn new(examples: &[TrainingExample], minibatch_size: NonZeroUsize) -> Result<Self> {
        let first = examples.first().ok_or(MlErr::EmptyBatch)?.stacked()?;
        let (c, w, h) = first.dim();

        let mut inputs = Array4::zeros((examples.len(), c, w, h));
        inputs.index_axis_mut(Axis(0), 0).assign(&first);

        for (i, example) in examples.iter().enumerate().skip(1) {
            let stacked = example.stacked()?;
            if stacked.dim() != (c, w, h) {
                return Err(MlErr::ShapeMismatch {
                    what: "batch example",
                    got: stacked.shape().to_vec(),
                    expected: vec![c, w, h],
                });
            }

            inputs.index_axis_mut(Axis(0), i).assign(&stacked);
        }

        let labels = Array2::from_shape_fn((examples.len(), 1), |(i, _)| examples[i].label());
        let order: Vec<usize> = (0..examples.len()).collect();

        Ok(Self {
            inputs,
            labels,
            cursor: order.len(),
            order,
            minibatch_size: minibatch_size.get().min(examples.len()),
        })
    }

    /// Returns the inputs `(batch, channels, width, height)` and labels `(batch, 1)` of the next
    /// minibatch.
    pub fn next_batch<R: Rng + ?Sized>(&mut self, rng: &mut R) -> (Array4<f32>, Array2<f32>) {
        let indices: Vec<usize> = (0..self.minibatch_size)
            .map(|_| self.next_index(rng))
            .collect();

        (
            self.inputs.select(Axis(0), &indices),
            self.labels.select(Axis(0), &indices),
        )
    }

    fn next_index<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        if self.cursor == self.order.len() {
            self.order.shuffle(rng);
            self.cursor = 0;
        }

        let i = self.order[self.cursor];
        self.cursor += 1;
        i
    }
}
