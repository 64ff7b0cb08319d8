/// An update rule turning a gradient into a change of the parameters.
pub trait Optimizer {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]);
}
