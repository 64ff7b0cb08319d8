use std::{cell::RefCell, rc::Rc};

use rand::Rng;
use rand_distr::{Distribution, Uniform};

use super::{ParamGen, TruncatedNormal};
use crate::Result;

/// A parameter generator that follows a certain probabilistic distribution.
///
/// The random number generator is shared so that every generator in a chain draws from the same
/// seeded stream.
pub struct RandParamGen<R: Rng, D: Distribution<f32>> {
    rng: Rc<RefCell<R>>,
    distribution: D,
    remaining: usize,
}

impl<R: Rng, D: Distribution<f32>> RandParamGen<R, D> {
    /// Creates a new `RandParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `distribution` - The distribution to sample the random numbers from.
    /// * `limit` - The maximum amount of numbers to generate.
    pub fn new(rng: Rc<RefCell<R>>, distribution: D, limit: usize) -> Self {
        Self {
            rng,
            distribution,
            remaining: limit,
        }
    }
}

impl<R: Rng> RandParamGen<R, Uniform<f32>> {
    /// Creates a new `RandParamGen` using Xavier uniform initialization, that is, uniform in
    /// `±sqrt(6 / (fan_in + fan_out))`.
    ///
    /// # Returns
    /// An error if the calculated range is invalid.
    pub fn xavier_uniform(
        rng: Rc<RefCell<R>>,
        limit: usize,
        fan_in: usize,
        fan_out: usize,
    ) -> Result<Self> {
        let range = (6. / (fan_in + fan_out) as f32).sqrt();
        Ok(Self::new(rng, Uniform::new(-range, range)?, limit))
    }
}

impl<R: Rng> RandParamGen<R, TruncatedNormal> {
    /// Creates a new `RandParamGen` with a normal distribution truncated at two standard
    /// deviations.
    ///
    /// # Returns
    /// An error if `std_dev` is not finite (Nan or infinite).
    pub fn truncated_normal(
        rng: Rc<RefCell<R>>,
        limit: usize,
        mean: f32,
        std_dev: f32,
    ) -> Result<Self> {
        Ok(Self::new(rng, TruncatedNormal::new(mean, std_dev)?, limit))
    }
}

impl<R: Rng, D: Distribution<f32>> ParamGen for RandParamGen<R, D> {
    fn sample(&mut self, n: usize) -> Option<Vec<f32>> {
        if self.remaining == 0 {
            return None;
        }

        let n = n.min(self.remaining);
        self.remaining -= n;

        let mut rng = self.rng.borrow_mut();
        let sample = (0..n).map(|_| self.distribution.sample(&mut *rng)).collect();
        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn seeded_rng() -> Rc<RefCell<StdRng>> {
        Rc::new(RefCell::new(StdRng::seed_from_u64(42)))
    }

    #[test]
    fn xavier_stays_in_range() {
        let mut param_gen = RandParamGen::xavier_uniform(seeded_rng(), 100, 4, 2).unwrap();
        let sample = param_gen.sample(100).unwrap();
        let range = 1f32;

        assert_eq!(sample.len(), 100);
        assert!(sample.iter().all(|x| x.abs() <= range));
        assert!(param_gen.sample(1).is_none());
    }

    #[test]
    fn same_seed_same_params() {
        let a = RandParamGen::truncated_normal(seeded_rng(), 10, 0., 0.1)
            .unwrap()
            .sample(10);
        let b = RandParamGen::truncated_normal(seeded_rng(), 10, 0., 0.1)
            .unwrap()
            .sample(10);

        assert_eq!(a, b);
    }
}
