use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

use super::{Color, Rect, Surface};
use crate::{Result, SurfaceErr};

/// An in-memory surface backed by a `tiny_skia` pixmap.
///
/// Pixels are premultiplied RGBA8. Rectangles are anti-aliased and painted with the source-over
/// operator.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    pixmap: Pixmap,
}

impl RasterSurface {
    /// Creates a new fully transparent `RasterSurface`.
    ///
    /// # Arguments
    /// * `width` - The width in pixels.
    /// * `height` - The height in pixels.
    ///
    /// # Returns
    /// A new `RasterSurface` or an error if any of the sides is zero or too large.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let invalid = || SurfaceErr::InvalidSize { width, height };

        let w = u32::try_from(width).map_err(|_| invalid())?;
        let h = u32::try_from(height).map_err(|_| invalid())?;
        let pixmap = Pixmap::new(w, h).ok_or_else(invalid)?;

        Ok(Self { pixmap })
    }

    fn paint(color: Color) -> Result<Paint<'static>> {
        let Color { r, g, b, a } = color;
        if ![r, g, b, a].iter().all(|c| c.is_finite()) {
            return Err(SurfaceErr::NonFinite { what: "color" });
        }

        let color = tiny_skia::Color::from_rgba(
            r.clamp(0., 1.),
            g.clamp(0., 1.),
            b.clamp(0., 1.),
            a.clamp(0., 1.),
        )
        .ok_or(SurfaceErr::NonFinite { what: "color" })?;

        let mut paint = Paint::default();
        paint.set_color(color);
        paint.anti_alias = true;
        Ok(paint)
    }
}

/// Converts `rect` to its `tiny_skia` counterpart, `None` when it has no area.
fn skia_rect(rect: Rect) -> Result<Option<tiny_skia::Rect>> {
    let Rect {
        x,
        y,
        width,
        height,
    } = rect;

    if ![x, y, width, height].iter().all(|v| v.is_finite()) {
        return Err(SurfaceErr::NonFinite { what: "rectangle" });
    }

    if width <= 0. || height <= 0. {
        return Ok(None);
    }

    Ok(tiny_skia::Rect::from_xywh(x, y, width, height))
}

impl Surface for RasterSurface {
    fn width(&self) -> usize {
        self.pixmap.width() as usize
    }

    fn height(&self) -> usize {
        self.pixmap.height() as usize
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) -> Result<()> {
        let paint = Self::paint(color)?;

        if let Some(rect) = skia_rect(rect)? {
            self.pixmap
                .fill_rect(rect, &paint, Transform::identity(), None);
        }

        Ok(())
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f32) -> Result<()> {
        let paint = Self::paint(color)?;
        let Some(outer) = skia_rect(rect)? else {
            return Ok(());
        };

        let lw = line_width.min(rect.width / 2.).min(rect.height / 2.);
        if !lw.is_finite() || lw <= 0. {
            return Ok(());
        }

        // The outline is the outer rectangle minus the inner one, filled even-odd.
        let inner = Rect::new(
            rect.x + lw,
            rect.y + lw,
            rect.width - 2. * lw,
            rect.height - 2. * lw,
        );

        let mut pb = PathBuilder::new();
        pb.push_rect(outer);
        if let Some(inner) = skia_rect(inner)? {
            pb.push_rect(inner);
        }

        if let Some(path) = pb.finish() {
            self.pixmap.fill_path(
                &path,
                &paint,
                FillRule::EvenOdd,
                Transform::identity(),
                None,
            );
        }

        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
        Ok(())
    }

    fn read_alpha(&self) -> Result<Vec<u8>> {
        Ok(self.pixmap.pixels().iter().map(|p| p.alpha()).collect())
    }
}
