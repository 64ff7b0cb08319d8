use crate::{
    Result,
    surface::{Color, Rect, Surface},
};

/// A position in surface coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis aligned rectangle positioned by its center.
#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    center: Point,
    width: f32,
    height: f32,
}

impl Rectangle {
    pub const DEFAULT_WIDTH: f32 = 40.0;
    pub const DEFAULT_HEIGHT: f32 = 20.0;

    /// Creates a new `Rectangle`.
    ///
    /// # Arguments
    /// * `center` - The center of the rectangle.
    /// * `width` - The horizontal size.
    /// * `height` - The vertical size.
    ///
    /// # Returns
    /// A new `Rectangle` instance.
    pub fn new(center: Point, width: f32, height: f32) -> Self {
        Self {
            center,
            width,
            height,
        }
    }

    /// The area this rectangle covers on a surface.
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.center.x - self.width / 2.0,
            self.center.y - self.height / 2.0,
            self.width,
            self.height,
        )
    }
}

impl From<Point> for Rectangle {
    fn from(center: Point) -> Self {
        Self::new(center, Self::DEFAULT_WIDTH, Self::DEFAULT_HEIGHT)
    }
}

/// Every kind of shape a scene can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rectangle(Rectangle),
}

impl Shape {
    pub const FILL: Color = Color::BLACK;
    pub const STROKE: Color = Color::BLACK;
    pub const STROKE_WIDTH: f32 = 1.0;

    /// A rectangle of the default size centered at `center`.
    pub fn rectangle(center: Point) -> Self {
        Self::Rectangle(center.into())
    }

    /// Paints this shape on `surface` with the fixed fill color and its outline.
    pub fn draw<S: Surface>(&self, surface: &mut S) -> Result<()> {
        match self {
            Shape::Rectangle(r) => {
                let bounds = r.bounds();
                surface.fill_rect(bounds, Self::FILL)?;
                surface.stroke_rect(bounds, Self::STROKE, Self::STROKE_WIDTH)
            }
        }
    }

    pub fn center(&self) -> Point {
        match self {
            Shape::Rectangle(r) => r.center,
        }
    }

    pub fn set_center(&mut self, center: Point) {
        match self {
            Shape::Rectangle(r) => r.center = center,
        }
    }
}
