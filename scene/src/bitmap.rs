use ndarray::{Array3, ArrayView3};

use crate::{Result, SurfaceErr};

/// The maximum value of a pixel in a `Bitmap`.
pub const MAX_PIXEL: f32 = 255.0;

/// A single channel snapshot of a surface: one opacity value per pixel in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Bitmap {
    /// Creates a new `Bitmap`.
    ///
    /// # Arguments
    /// * `width` - The width of the source surface.
    /// * `height` - The height of the source surface.
    /// * `data` - The pixels, indexed by `y * width + x`.
    ///
    /// # Returns
    /// A new `Bitmap` or an error if `data` doesn't hold exactly `width * height` values.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        let expected = width * height;

        if data.len() != expected {
            return Err(SurfaceErr::Readback {
                got: data.len(),
                expected,
            });
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// The shape of this bitmap, `[width, height, 1]`.
    pub fn shape(&self) -> [usize; 3] {
        [self.width, self.height, 1]
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the pixel at (`x`, `y`).
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width {
            return None;
        }

        self.data.get(y * self.width + x).copied()
    }

    /// Scales every pixel down to `[0, 1]`.
    pub fn normalize(&self) -> NormalizedBitmap {
        let &Self {
            width,
            height,
            ref data,
        } = self;

        let array = Array3::from_shape_fn((width, height, 1), |(x, y, _)| {
            data[y * width + x] as f32 / MAX_PIXEL
        });

        NormalizedBitmap(array)
    }
}

/// A `Bitmap` with every value in `[0, 1]`, shaped `[width, height, channels]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBitmap(Array3<f32>);

impl NormalizedBitmap {
    /// Wraps an already normalized array shaped `[width, height, channels]`.
    pub fn new(array: Array3<f32>) -> Self {
        Self(array)
    }

    /// An all zero bitmap of the given shape.
    pub fn zeros(shape: [usize; 3]) -> Self {
        Self(Array3::zeros(shape))
    }

    pub fn shape(&self) -> [usize; 3] {
        let (w, h, c) = self.0.dim();
        [w, h, c]
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.0.view()
    }

    pub fn into_array(self) -> Array3<f32> {
        self.0
    }
}
