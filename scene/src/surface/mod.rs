mod raster;

pub use raster::RasterSurface;

use crate::Result;

/// Axis aligned rectangle in surface coordinates, anchored at its top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Straight (non premultiplied) RGBA color, every channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// A fixed size 2D drawing target.
///
/// Drawing calls may complete asynchronously on some implementations, callers must give the
/// surface time to settle before calling `read_alpha`.
pub trait Surface {
    /// The width of the surface in pixels.
    fn width(&self) -> usize;

    /// The height of the surface in pixels.
    fn height(&self) -> usize;

    /// Paints `rect` with `color` over whatever is already on the surface.
    fn fill_rect(&mut self, rect: Rect, color: Color) -> Result<()>;

    /// Paints the outline of `rect` with `color`. The outline is `line_width` pixels wide and
    /// lies inside the rectangle's bounds.
    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f32) -> Result<()>;

    /// Resets every pixel to fully transparent.
    fn clear(&mut self) -> Result<()>;

    /// Reads back the opacity of every pixel in row-major order, one value in `[0, 255]` each.
    fn read_alpha(&self) -> Result<Vec<u8>>;
}
