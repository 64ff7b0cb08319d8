use std::{cell::RefCell, rc::Rc};

use log::debug;
use rand::Rng;

use super::ConvRegressor;
use crate::{
    MlErr, Result,
    arch::{
        Model, Sequential,
        activations::ActFn,
        layers::{Conv2d, Dense, Layer},
    },
    initialization::{ChainedParamGen, ConstParamGen, ParamGen, RandParamGen},
    spec::{ConvBlockSpec, RegressorSpec},
};

const KERNEL_MEAN: f32 = 0.;
const KERNEL_STD_DEV: f32 = 0.1;

/// Layers under construction together with the generators of their initial parameters.
struct Stack<'a> {
    layers: Vec<Layer>,
    param_gens: Vec<Box<dyn ParamGen + 'a>>,
    /// The shape of a single sample leaving the last layer.
    shape: Vec<usize>,
}

impl Stack<'_> {
    fn push(&mut self, layer: Layer) -> Result<()> {
        let shape = layer.output_shape(&self.shape)?;
        if shape.contains(&0) {
            return Err(MlErr::InvalidSpec(format!(
                "the input collapses from {:?} to {shape:?} at layer {}",
                self.shape,
                self.layers.len()
            )));
        }

        self.shape = shape;
        self.layers.push(layer);
        Ok(())
    }
}

/// Builds `ConvRegressor`s given a specification.
#[derive(Default)]
pub struct RegressorBuilder;

impl RegressorBuilder {
    /// Creates a new `RegressorBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new `ConvRegressor` following a spec.
    ///
    /// # Arguments
    /// * `spec` - The topology of the regressor.
    /// * `input_shape` - `[width, height, channels]` of the stacked pair, that is, twice the
    ///   channels of each image.
    /// * `output_shape` - Must be `[1]`.
    /// * `rng` - The source of the initial weights and of the minibatch shuffling.
    ///
    /// # Returns
    /// The regressor or an error if the shapes or the spec are invalid.
    pub fn build<R: Rng>(
        &self,
        spec: &RegressorSpec,
        input_shape: [usize; 3],
        output_shape: [usize; 1],
        rng: R,
    ) -> Result<ConvRegressor<R>> {
        self.validate(spec, input_shape, output_shape)?;

        let [width, height, channels] = input_shape;
        let rng = Rc::new(RefCell::new(rng));
        let mut stack = Stack {
            layers: Vec::new(),
            param_gens: Vec::new(),
            shape: vec![channels, width, height],
        };

        for block in &spec.blocks {
            self.resolve_block(block, &rng, &mut stack)?;
        }

        stack.push(Layer::flatten())?;
        self.resolve_dense(spec, &rng, &mut stack)?;

        let Stack {
            layers, param_gens, ..
        } = stack;

        let model = Sequential::new(layers);
        let size = model.size();
        let params = ChainedParamGen::new(param_gens)
            .sample(size)
            .filter(|params| params.len() == size)
            .ok_or_else(|| {
                MlErr::InvalidSpec("the initializers don't cover every parameter".into())
            })?;

        debug!(
            blocks = spec.blocks.len(),
            layers = model.layers().len(),
            num_params = size;
            "built convolutional regressor"
        );

        Ok(ConvRegressor::new(
            model,
            params,
            spec.minibatch_size,
            input_shape,
            rng,
        ))
    }

    fn validate(
        &self,
        spec: &RegressorSpec,
        input_shape: [usize; 3],
        output_shape: [usize; 1],
    ) -> Result<()> {
        let [width, height, channels] = input_shape;

        if width == 0 || height == 0 || channels == 0 || channels % 2 != 0 {
            return Err(MlErr::InvalidSpec(format!(
                "the input shape {input_shape:?} doesn't hold a pair of same-shaped images"
            )));
        }

        if output_shape != [1] {
            return Err(MlErr::ShapeMismatch {
                what: "output shape",
                got: output_shape.to_vec(),
                expected: vec![1],
            });
        }

        if spec.blocks.is_empty() {
            return Err(MlErr::InvalidSpec(
                "at least one convolution block is required".into(),
            ));
        }

        match spec.dense.last() {
            Some(last) if last.get() == 1 => Ok(()),
            Some(last) => Err(MlErr::InvalidSpec(format!(
                "the last dense layer must have a single unit, got {last}"
            ))),
            None => Err(MlErr::InvalidSpec(
                "at least one dense layer is required".into(),
            )),
        }
    }

    fn resolve_block<'a, R: Rng + 'a>(
        &self,
        spec: &ConvBlockSpec,
        rng: &Rc<RefCell<R>>,
        stack: &mut Stack<'a>,
    ) -> Result<()> {
        let conv = Conv2d::new(
            stack.shape[0],
            spec.filters.get(),
            spec.kernel.get(),
            Some(ActFn::from(spec.act_fn)),
        );

        let kernels = RandParamGen::truncated_normal(
            Rc::clone(rng),
            conv.weights_size(),
            KERNEL_MEAN,
            KERNEL_STD_DEV,
        )?;
        stack.param_gens.push(Box::new(kernels));
        stack
            .param_gens
            .push(Box::new(ConstParamGen::zeros(conv.filters())));
        stack.push(Layer::Conv2d(conv))?;

        if let Some(pool) = spec.pool {
            stack.push(Layer::max_pool2d(
                pool.window.get(),
                pool.stride.get(),
                pool.padding,
            ))?;
        }

        Ok(())
    }

    fn resolve_dense<'a, R: Rng + 'a>(
        &self,
        spec: &RegressorSpec,
        rng: &Rc<RefCell<R>>,
        stack: &mut Stack<'a>,
    ) -> Result<()> {
        let last = spec.dense.len() - 1;

        for (i, units) in spec.dense.iter().enumerate() {
            let fan_in = stack.shape[0];
            let fan_out = units.get();
            let act_fn = (i != last).then(|| ActFn::from(spec.act_fn));
            let dense = Dense::new((fan_in, fan_out), act_fn);

            let weights =
                RandParamGen::xavier_uniform(Rc::clone(rng), fan_in * fan_out, fan_in, fan_out)?;
            stack.param_gens.push(Box::new(weights));
            stack.param_gens.push(Box::new(ConstParamGen::zeros(fan_out)));
            stack.push(Layer::Dense(dense))?;
        }

        Ok(())
    }
}
