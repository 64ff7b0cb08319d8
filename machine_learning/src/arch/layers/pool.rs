use ndarray::{Array4, Zip};

use crate::{MlErr, Result, spec::Padding};

const NO_SOURCE: usize = usize::MAX;

/// Max-pooling over the two spatial axes of `(batch, channels, width, height)` inputs.
///
/// The forward pass remembers which input element won each window so the backward pass can route
/// the delta to it; every other input element gets a zero delta.
#[derive(Clone)]
pub struct MaxPool2d {
    window: usize,
    stride: usize,
    padding: Padding,

    // Forward metadata
    input_dim: (usize, usize, usize, usize),
    argmax: Array4<usize>,
}

impl MaxPool2d {
    pub fn new(window: usize, stride: usize, padding: Padding) -> Self {
        Self {
            window,
            stride,
            padding,
            input_dim: (0, 0, 0, 0),
            argmax: Array4::zeros((0, 0, 0, 0)),
        }
    }

    /// Returns the pooled length of a `len` long axis and the padding before its first element.
    ///
    /// # Returns
    /// An error if the window doesn't fit in a valid-padded axis.
    pub fn output_len(&self, len: usize) -> Result<(usize, usize)> {
        let (window, stride) = (self.window, self.stride);

        match self.padding {
            Padding::Valid if len < window => Err(MlErr::InvalidSpec(format!(
                "a pooling window of {window} doesn't fit in an axis of {len}"
            ))),
            Padding::Valid => Ok(((len - window) / stride + 1, 0)),
            Padding::Same => {
                let out = len.div_ceil(stride);
                let total = ((out.max(1) - 1) * stride + window).saturating_sub(len);
                Ok((out, total / 2))
            }
        }
    }

    pub fn forward(&mut self, x: Array4<f32>) -> Result<Array4<f32>> {
        let (n, c, w, h) = x.dim();
        let (ow, pad_w) = self.output_len(w)?;
        let (oh, pad_h) = self.output_len(h)?;
        let &mut Self { window, stride, .. } = self;

        let mut y = Array4::<f32>::zeros((n, c, ow, oh));
        let mut argmax = Array4::from_elem((n, c, ow, oh), NO_SOURCE);

        Zip::indexed(&mut y)
            .and(&mut argmax)
            .par_for_each(|(ni, ci, oi, oj), y, src| {
                let mut best = f32::NEG_INFINITY;

                for wi in 0..window {
                    let Some(si) = (oi * stride + wi).checked_sub(pad_w).filter(|&s| s < w) else {
                        continue;
                    };

                    for wj in 0..window {
                        let Some(sj) = (oj * stride + wj).checked_sub(pad_h).filter(|&s| s < h)
                        else {
                            continue;
                        };

                        let v = x[[ni, ci, si, sj]];
                        if *src == NO_SOURCE || v > best {
                            best = v;
                            *src = si * h + sj;
                        }
                    }
                }

                if *src != NO_SOURCE {
                    *y = best;
                }
            });

        self.input_dim = (n, c, w, h);
        self.argmax = argmax;
        Ok(y)
    }

    pub fn backward(&mut self, d: Array4<f32>) -> Result<Array4<f32>> {
        if d.dim() != self.argmax.dim() {
            return Err(MlErr::ShapeMismatch {
                what: "pooling delta",
                got: d.shape().to_vec(),
                expected: self.argmax.shape().to_vec(),
            });
        }

        let h = self.input_dim.3;
        let mut dx = Array4::zeros(self.input_dim);

        Zip::indexed(&self.argmax)
            .and(&d)
            .for_each(|(ni, ci, _, _), &src, &g| {
                if src != NO_SOURCE {
                    dx[[ni, ci, src / h, src % h]] += g;
                }
            });

        Ok(dx)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array;

    use super::*;

    #[test]
    fn valid_halves_even_axes() {
        let mut pool = MaxPool2d::new(2, 2, Padding::Valid);
        let x = Array::from_shape_fn((1, 1, 4, 4), |(_, _, i, j)| (i * 4 + j) as f32);

        let y = pool.forward(x).unwrap();
        assert_eq!(y.dim(), (1, 1, 2, 2));
        assert_eq!(y.into_raw_vec_and_offset().0, [5., 7., 13., 15.]);
    }

    #[test]
    fn same_keeps_the_odd_remainder() {
        let mut pool = MaxPool2d::new(2, 2, Padding::Same);
        let y = pool.forward(Array4::ones((2, 3, 5, 7))).unwrap();
        assert_eq!(y.dim(), (2, 3, 3, 4));
        assert!(y.iter().all(|&v| v == 1.));

        let mut pool = MaxPool2d::new(2, 2, Padding::Valid);
        let y = pool.forward(Array4::ones((2, 3, 5, 7))).unwrap();
        assert_eq!(y.dim(), (2, 3, 2, 3));
    }

    #[test]
    fn valid_rejects_window_larger_than_input() {
        let mut pool = MaxPool2d::new(3, 1, Padding::Valid);
        assert!(pool.forward(Array4::zeros((1, 1, 2, 5))).is_err());
    }

    #[test]
    fn backward_routes_delta_to_the_max() {
        let mut pool = MaxPool2d::new(2, 2, Padding::Valid);
        let mut x = Array4::zeros((1, 1, 2, 4));
        x[[0, 0, 1, 0]] = 3.;
        x[[0, 0, 0, 3]] = -1.;
        x[[0, 0, 0, 2]] = -2.;
        x[[0, 0, 1, 2]] = -5.;
        x[[0, 0, 1, 3]] = -4.;

        pool.forward(x).unwrap();
        let dx = pool.backward(Array4::from_elem((1, 1, 1, 2), 0.5)).unwrap();

        let mut expected = Array4::<f32>::zeros((1, 1, 2, 4));
        expected[[0, 0, 1, 0]] = 0.5;
        expected[[0, 0, 0, 3]] = 0.5;
        assert_eq!(dx, expected);
    }
}
