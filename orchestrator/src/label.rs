//! The visual distance between two scenes.

use std::{error::Error, fmt};

use ndarray::Zip;
use scene::NormalizedBitmap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelErr {
    ShapeMismatch {
        first: [usize; 3],
        second: [usize; 3],
    },
    Empty,
}

impl fmt::Display for LabelErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch { first, second } => {
                write!(f, "can't compare bitmaps shaped {first:?} and {second:?}")
            }
            Self::Empty => write!(f, "can't compare bitmaps without pixels"),
        }
    }
}

impl Error for LabelErr {}

/// Mean squared difference between two bitmaps, `Σ(a − b)² / N` over all `N = W·H·C` elements.
///
/// Both bitmaps are normalized to `[0, 1]`, so the label is too. It is 0 for identical bitmaps and
/// symmetric in its arguments.
pub fn label(a: &NormalizedBitmap, b: &NormalizedBitmap) -> Result<f32, LabelErr> {
    let (first, second) = (a.shape(), b.shape());
    if first != second {
        return Err(LabelErr::ShapeMismatch { first, second });
    }

    let n: usize = first.iter().product();
    if n == 0 {
        return Err(LabelErr::Empty);
    }

    let sum = Zip::from(a.view())
        .and(b.view())
        .fold(0f64, |acc, &x, &y| acc + f64::from(x - y).powi(2));

    Ok((sum / n as f64) as f32)
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use scene::{Point, RasterSurface, Scene};

    use super::*;

    fn random_bitmap(rng: &mut StdRng, shape: (usize, usize, usize)) -> NormalizedBitmap {
        NormalizedBitmap::new(Array3::from_shape_fn(shape, |_| rng.random::<f32>()))
    }

    fn scene(seed: u64) -> Scene<RasterSurface, StdRng> {
        let surface = RasterSurface::new(400, 200).unwrap();
        Scene::new("scene", surface, StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn identical_bitmaps_are_at_zero() {
        let mut rng = StdRng::seed_from_u64(0);
        let a = random_bitmap(&mut rng, (20, 10, 1));

        assert_eq!(label(&a, &a).unwrap(), 0.);
    }

    #[test]
    fn symmetric_and_bounded() {
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..10 {
            let a = random_bitmap(&mut rng, (20, 10, 1));
            let b = random_bitmap(&mut rng, (20, 10, 1));
            let ab = label(&a, &b).unwrap();

            assert_eq!(ab, label(&b, &a).unwrap());
            assert!((0. ..=1.).contains(&ab));
        }

        let zeros = NormalizedBitmap::zeros([4, 4, 1]);
        let ones = NormalizedBitmap::new(Array3::ones((4, 4, 1)));
        assert_eq!(label(&zeros, &ones).unwrap(), 1.);
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let a = NormalizedBitmap::zeros([4, 2, 1]);
        let b = NormalizedBitmap::zeros([2, 4, 1]);

        assert_eq!(
            label(&a, &b),
            Err(LabelErr::ShapeMismatch {
                first: [4, 2, 1],
                second: [2, 4, 1]
            })
        );
    }

    #[test]
    fn blank_scenes_are_at_zero() {
        let (mut a, mut b) = (scene(0), scene(1));
        a.clear().unwrap();
        b.clear().unwrap();

        let a = a.bitmap().unwrap().normalize();
        let b = b.bitmap().unwrap().normalize();
        assert_eq!(label(&a, &b).unwrap(), 0.);
    }

    #[test]
    fn one_rectangle_against_blank() {
        let (mut a, mut b) = (scene(0), scene(1));
        a.place_rectangle(Point::new(100., 100.));
        a.draw().unwrap();
        b.draw().unwrap();

        let a = a.bitmap().unwrap().normalize();
        let b = b.bitmap().unwrap().normalize();
        let distance = label(&a, &b).unwrap();

        assert!((distance - 0.01).abs() < 1e-6, "distance {distance}");
    }
}
