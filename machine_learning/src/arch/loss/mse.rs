use ndarray::{Array2, ArrayView2, Zip};

use super::LossFn;

/// Mean squared error, reduced by the mean over every element of the minibatch.
#[derive(Default, Clone, Copy, Debug)]
pub struct Mse;

impl Mse {
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for Mse {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        if y_pred.is_empty() {
            return 0.;
        }

        let mut sum = 0.;
        Zip::from(&y_pred).and(&y).for_each(|&p, &t| sum += (p - t).powi(2));
        sum / y_pred.len() as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let scale = 2. / y_pred.len().max(1) as f32;
        Zip::from(&y_pred)
            .and(&y)
            .map_collect(|&p, &t| scale * (p - t))
    }
}
