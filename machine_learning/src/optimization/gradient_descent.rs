use super::Optimizer;

/// Plain stochastic gradient descent with a fixed learning rate.
#[derive(Debug, Clone, Copy)]
pub struct GradientDescent {
    learning_rate: f32,
}

impl GradientDescent {
    /// Returns a new `GradientDescent`.
    ///
    /// # Arguments
    /// * `learning_rate` - The *length* of the steps taken on `update_params`.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for GradientDescent {
    /// Takes a step of `learning_rate` times the gradient in its opposite direction.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) {
        let lr = self.learning_rate;
        params
            .iter_mut()
            .zip(grad)
            .for_each(|(w, g)| *w -= lr * g);
    }
}
