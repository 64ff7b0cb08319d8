pub mod bitmap;
pub mod error;
pub mod scene;
pub mod shape;
pub mod surface;

pub use bitmap::{Bitmap, MAX_PIXEL, NormalizedBitmap};
pub use error::{Result, SurfaceErr};
pub use scene::{MAX_RECTANGLES, Scene};
pub use shape::{Point, Rectangle, Shape};
pub use surface::{Color, RasterSurface, Rect, Surface};
