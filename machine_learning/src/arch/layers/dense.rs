use ndarray::{linalg, prelude::*};

use crate::{MlErr, Result, arch::activations::ActFn};

/// A fully connected layer, `x · w + b`, optionally followed by an activation.
///
/// Its parameters are laid out as the row-major `(inputs, outputs)` weight matrix followed by the
/// `outputs` biases.
#[derive(Clone)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata
    x: Array2<f32>,
    z: Array2<f32>,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The amount of inputs and outputs.
    /// * `act_fn` - The activation applied to the outputs, `None` for a linear layer.
    ///
    /// # Returns
    /// A new `Dense` instance.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self {
            dim,
            act_fn,
            size: (dim.0 + 1) * dim.1,
            x: Array2::zeros((0, dim.0)),
            z: Array2::zeros((0, dim.1)),
        }
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Computes the activations for a minibatch `x` shaped `(batch, inputs)`.
    pub fn forward(&mut self, params: &[f32], x: Array2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.dim.0 {
            return Err(MlErr::SizeMismatch {
                what: "dense input",
                got: x.ncols(),
                expected: self.dim.0,
            });
        }

        let (w, b) = self.view_params(params)?;
        let mut z = Array2::zeros((x.nrows(), self.dim.1));
        linalg::general_mat_mul(1., &x, &w, 0., &mut z);
        z += &b;

        let a = match &self.act_fn {
            Some(act_fn) => z.mapv(|z| act_fn.f(z)),
            None => z.clone(),
        };

        self.x = x;
        self.z = z;
        Ok(a)
    }

    /// Writes this layer's gradient into `grad` and returns the delta of its input.
    ///
    /// # Arguments
    /// * `params` - The same parameters used in the last `forward` call.
    /// * `grad` - This layer's slice of the gradient buffer.
    /// * `d` - The delta of the outputs, shaped like the last `forward` result.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        mut d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        if d.dim() != self.z.dim() {
            return Err(MlErr::ShapeMismatch {
                what: "dense delta",
                got: d.shape().to_vec(),
                expected: self.z.shape().to_vec(),
            });
        }

        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let (mut dw, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(1., &self.x.t(), &d, 0., &mut dw);
        db.assign(&d.sum_axis(Axis(0)));

        let (w, _) = self.view_params(params)?;
        Ok(d.dot(&w.t()).as_standard_layout().into_owned())
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        if grad.len() != self.size {
            return Err(MlErr::SizeMismatch {
                what: "dense gradient",
                got: grad.len(),
                expected: self.size,
            });
        }

        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw)?;
        Ok((dw, ArrayViewMut1::from(db_raw)))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(&self, params: &'a [f32]) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        if params.len() != self.size {
            return Err(MlErr::SizeMismatch {
                what: "dense parameters",
                got: params.len(),
                expected: self.size,
            });
        }

        let w_size = self.size - self.dim.1;
        let (w_raw, b_raw) = params.split_at(w_size);
        let weights = ArrayView2::from_shape(self.dim, w_raw)?;
        Ok((weights, ArrayView1::from(b_raw)))
    }
}

#[cfg(test)]
mod tests {
    use ndarray_rand::{RandomExt, rand_distr::Uniform};

    use super::*;

    fn loss(layer: &mut Dense, params: &[f32], x: &Array2<f32>) -> f32 {
        layer
            .forward(params, x.clone())
            .unwrap()
            .mapv(|a| a * a)
            .sum()
            / 2.
    }

    #[test]
    fn forward_is_affine() {
        let mut layer = Dense::new((2, 1), None);
        let params = [2., -1., 0.5];
        let x = array![[1f32, 1.], [3., 2.]];

        let y = layer.forward(&params, x).unwrap();
        assert_eq!(y, array![[1.5f32], [4.5]]);
    }

    #[test]
    fn rejects_wrong_input_width() {
        let mut layer = Dense::new((3, 2), None);
        let params = vec![0.; layer.size()];

        let err = layer.forward(&params, Array2::zeros((4, 2))).unwrap_err();
        assert!(matches!(err, MlErr::SizeMismatch { got: 2, expected: 3, .. }));
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let mut layer = Dense::new((4, 3), Some(ActFn::sigmoid(1.)));
        let mut params = Array1::random(layer.size(), Uniform::new(-1., 1.).unwrap()).to_vec();
        let x = Array2::random((5, 4), Uniform::new(-1., 1.).unwrap());

        // loss = Σ a² / 2, so the output delta is `a` itself.
        let a = layer.forward(&params, x.clone()).unwrap();
        let mut grad = vec![0.; layer.size()];
        layer.backward(&params, &mut grad, a).unwrap();

        let h = 1e-2;
        for i in 0..params.len() {
            let orig = params[i];
            params[i] = orig + h;
            let up = loss(&mut layer, &params, &x);
            params[i] = orig - h;
            let down = loss(&mut layer, &params, &x);
            params[i] = orig;

            let numeric = (up - down) / (2. * h);
            assert!(
                (numeric - grad[i]).abs() < 1e-2,
                "param {i}: numeric {numeric}, analytic {}",
                grad[i]
            );
        }
    }

    #[test]
    fn single_output_delta_keeps_standard_layout() {
        let mut layer = Dense::new((3, 1), None);
        let params = [1., 2., 3., 0.];
        let x = Array2::ones((4, 3));

        let y = layer.forward(&params, x).unwrap();
        let mut grad = vec![0.; layer.size()];
        let d = layer.backward(&params, &mut grad, y).unwrap();

        assert_eq!(d.dim(), (4, 3));
        assert!(d.is_standard_layout());
        assert_eq!(d.row(0), array![6f32, 12., 18.]);
    }
}
