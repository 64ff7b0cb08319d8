use ndarray::prelude::*;
use rayon::prelude::*;

use crate::{MlErr, Result, arch::activations::ActFn};

/// A 2D convolution over `(batch, channels, width, height)` inputs with stride 1 and zero padding
/// so that the spatial size is preserved.
///
/// Each sample is lowered with *im2col* into a `(channels · k², width · height)` matrix, which
/// turns the convolution into a single product with the `(filters, channels · k²)` kernel matrix.
/// Samples are processed in parallel.
#[derive(Clone)]
pub struct Conv2d {
    in_channels: usize,
    filters: usize,
    kernel: usize,
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata
    x: Array4<f32>,
    z: Array4<f32>,
}

impl Conv2d {
    /// Creates a new `Conv2d` layer.
    ///
    /// # Arguments
    /// * `in_channels` - The amount of channels of the input.
    /// * `filters` - The amount of output channels.
    /// * `kernel` - The side of the square kernel.
    /// * `act_fn` - The activation applied to the outputs.
    ///
    /// # Returns
    /// A new `Conv2d` instance.
    pub fn new(in_channels: usize, filters: usize, kernel: usize, act_fn: Option<ActFn>) -> Self {
        let w_size = filters * in_channels * kernel * kernel;

        Self {
            in_channels,
            filters,
            kernel,
            act_fn,
            size: w_size + filters,
            x: Array4::zeros((0, 0, 0, 0)),
            z: Array4::zeros((0, 0, 0, 0)),
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn filters(&self) -> usize {
        self.filters
    }

    /// The amount of inputs each output element depends on.
    pub fn fan_in(&self) -> usize {
        self.in_channels * self.kernel * self.kernel
    }

    pub fn weights_size(&self) -> usize {
        self.size - self.filters
    }

    pub fn forward(&mut self, params: &[f32], x: Array4<f32>) -> Result<Array4<f32>> {
        let (n, c, w, h) = x.dim();
        if c != self.in_channels {
            return Err(MlErr::SizeMismatch {
                what: "convolution input channels",
                got: c,
                expected: self.in_channels,
            });
        }

        let (kernels, biases) = self.view_params(params)?;
        let k = self.kernel;
        let biases = biases.insert_axis(Axis(1));

        let outputs: Vec<Array2<f32>> = (0..n)
            .into_par_iter()
            .map(|i| {
                let cols = im2col(x.index_axis(Axis(0), i), k);
                let mut z = kernels.dot(&cols);
                z += &biases;
                z
            })
            .collect();

        let mut z = Array4::zeros((n, self.filters, w, h));
        for (mut zi, out) in z.outer_iter_mut().zip(outputs) {
            zi.assign(&out.to_shape((self.filters, w, h))?);
        }

        let a = match &self.act_fn {
            Some(act_fn) => z.mapv(|z| act_fn.f(z)),
            None => z.clone(),
        };

        self.x = x;
        self.z = z;
        Ok(a)
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        mut d: Array4<f32>,
    ) -> Result<Array4<f32>> {
        if d.dim() != self.z.dim() {
            return Err(MlErr::ShapeMismatch {
                what: "convolution delta",
                got: d.shape().to_vec(),
                expected: self.z.shape().to_vec(),
            });
        }

        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let (n, c, w, h) = self.x.dim();
        let (k, filters) = (self.kernel, self.filters);
        let (kernels, _) = self.view_params(params)?;
        let (x, d) = (&self.x, &d);

        let per_sample = (0..n)
            .into_par_iter()
            .map(|i| -> Result<_> {
                let cols = im2col(x.index_axis(Axis(0), i), k);
                let di = d.index_axis(Axis(0), i);
                let di = di.to_shape((filters, w * h))?;

                let dk = di.dot(&cols.t());
                let db = di.sum_axis(Axis(1));
                let dx = col2im(kernels.t().dot(&di).view(), c, w, h, k);
                Ok((dk, db, dx))
            })
            .collect::<Result<Vec<_>>>()?;

        let (mut dk, mut db) = self.view_grad(grad)?;
        dk.fill(0.);
        db.fill(0.);

        let mut dx = Array4::zeros((n, c, w, h));
        for ((dki, dbi, dxi), mut dxo) in per_sample.into_iter().zip(dx.outer_iter_mut()) {
            dk += &dki;
            db += &dbi;
            dxo.assign(&dxi);
        }

        Ok(dx)
    }

    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        if grad.len() != self.size {
            return Err(MlErr::SizeMismatch {
                what: "convolution gradient",
                got: grad.len(),
                expected: self.size,
            });
        }

        let (dk_raw, db_raw) = grad.split_at_mut(self.weights_size());
        let dk = ArrayViewMut2::from_shape((self.filters, self.fan_in()), dk_raw)?;
        Ok((dk, ArrayViewMut1::from(db_raw)))
    }

    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        if params.len() != self.size {
            return Err(MlErr::SizeMismatch {
                what: "convolution parameters",
                got: params.len(),
                expected: self.size,
            });
        }

        let (k_raw, b_raw) = params.split_at(self.weights_size());
        let kernels = ArrayView2::from_shape((self.filters, self.fan_in()), k_raw)?;
        Ok((kernels, ArrayView1::from(b_raw)))
    }
}

/// The source index of output position `i` under kernel offset `ki`, `None` when it falls in the
/// zero padding.
fn source(i: usize, ki: usize, pad: usize, len: usize) -> Option<usize> {
    (i + ki).checked_sub(pad).filter(|&s| s < len)
}

/// Lowers one `(channels, width, height)` sample into columns, one per output position. Row
/// `(ch · k + ki) · k + kj` holds the input seen through kernel cell `(ki, kj)` of channel `ch`.
fn im2col(x: ArrayView3<f32>, k: usize) -> Array2<f32> {
    let (c, w, h) = x.dim();
    let pad = (k - 1) / 2;
    let mut cols = Array2::zeros((c * k * k, w * h));

    for ch in 0..c {
        for ki in 0..k {
            for kj in 0..k {
                let mut row = cols.row_mut((ch * k + ki) * k + kj);

                for i in 0..w {
                    let Some(si) = source(i, ki, pad, w) else {
                        continue;
                    };

                    for j in 0..h {
                        if let Some(sj) = source(j, kj, pad, h) {
                            row[i * h + j] = x[[ch, si, sj]];
                        }
                    }
                }
            }
        }
    }

    cols
}

/// The adjoint of [`im2col`]: accumulates columns back onto a `(channels, width, height)` sample.
fn col2im(cols: ArrayView2<f32>, c: usize, w: usize, h: usize, k: usize) -> Array3<f32> {
    let pad = (k - 1) / 2;
    let mut x = Array3::zeros((c, w, h));

    for ch in 0..c {
        for ki in 0..k {
            for kj in 0..k {
                let row = cols.row((ch * k + ki) * k + kj);

                for i in 0..w {
                    let Some(si) = source(i, ki, pad, w) else {
                        continue;
                    };

                    for j in 0..h {
                        if let Some(sj) = source(j, kj, pad, h) {
                            x[[ch, si, sj]] += row[i * h + j];
                        }
                    }
                }
            }
        }
    }

    x
}
