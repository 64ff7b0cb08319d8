use rand::Rng;
use rand_distr::{Distribution, Normal, NormalError};

/// A normal distribution whose samples further than two standard deviations from the mean are
/// discarded and drawn again.
#[derive(Debug, Clone, Copy)]
pub struct TruncatedNormal {
    normal: Normal<f32>,
    mean: f32,
    bound: f32,
}

impl TruncatedNormal {
    /// # Returns
    /// An error if `std_dev` is negative or not finite.
    pub fn new(mean: f32, std_dev: f32) -> Result<Self, NormalError> {
        if !std_dev.is_finite() || std_dev < 0. {
            return Err(NormalError::BadVariance);
        }

        Ok(Self {
            normal: Normal::new(mean, std_dev)?,
            mean,
            bound: 2. * std_dev,
        })
    }
}

impl Distribution<f32> for TruncatedNormal {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        loop {
            let x = self.normal.sample(rng);
            if (x - self.mean).abs() <= self.bound {
                return x;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn stays_within_two_deviations() {
        let dist = TruncatedNormal::new(0., 0.1).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let samples: Vec<f32> = (0..10_000).map(|_| dist.sample(&mut rng)).collect();
        assert!(samples.iter().all(|x| x.abs() <= 0.2));

        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        assert!(mean.abs() < 0.01);
    }

    #[test]
    fn rejects_bad_deviations() {
        for std_dev in [-1., -0.1, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                TruncatedNormal::new(0., std_dev),
                Err(NormalError::BadVariance)
            ));
        }
    }

    #[test]
    fn zero_deviation_samples_the_mean() {
        let dist = TruncatedNormal::new(0.5, 0.).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(dist.sample(&mut rng), 0.5);
    }
}
