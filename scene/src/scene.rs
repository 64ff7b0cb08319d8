use log::trace;
use rand::Rng;

use crate::{
    Bitmap, Result, SurfaceErr,
    shape::{Point, Shape},
    surface::Surface,
};

/// The maximum amount of rectangles a single `randomize` call places.
pub const MAX_RECTANGLES: usize = 10;

/// A named, ordered collection of shapes drawn onto its own fixed size surface.
///
/// Shapes are drawn in insertion order, so later shapes paint over earlier ones. Mutating the
/// shape list never touches the surface: call `draw` or `clear` to bring it up to date.
pub struct Scene<S, R>
where
    S: Surface,
    R: Rng,
{
    name: String,
    shapes: Vec<Shape>,
    surface: S,
    rng: R,
}

impl<S, R> Scene<S, R>
where
    S: Surface,
    R: Rng,
{
    /// Creates a new empty `Scene`.
    ///
    /// # Arguments
    /// * `name` - A name used to tell scenes apart in logs.
    /// * `surface` - The surface this scene draws on.
    /// * `rng` - The random number generator used by `randomize`.
    ///
    /// # Returns
    /// A new `Scene` or an error if the surface has no area.
    pub fn new(name: impl Into<String>, surface: S, rng: R) -> Result<Self> {
        let (width, height) = (surface.width(), surface.height());

        if width == 0 || height == 0 {
            return Err(SurfaceErr::InvalidSize { width, height });
        }

        Ok(Self {
            name: name.into(),
            shapes: Vec::new(),
            surface,
            rng,
        })
    }

    /// Appends between 1 and `MAX_RECTANGLES` default sized rectangles at uniformly random
    /// centers. Nothing is rendered.
    pub fn randomize(&mut self) {
        let rectangles = self.rng.random_range(1..=MAX_RECTANGLES);

        for _ in 0..rectangles {
            let center = self.random_coords();
            self.place_rectangle(center);
        }

        trace!("{}: placed {rectangles} rectangles", self.name);
    }

    /// Samples a point uniformly over `[0, width) x [0, height)`.
    pub fn random_coords(&mut self) -> Point {
        let x = self.rng.random_range(0.0..self.surface.width() as f32);
        let y = self.rng.random_range(0.0..self.surface.height() as f32);
        Point::new(x, y)
    }

    /// Appends a default sized rectangle centered at `center`.
    pub fn place_rectangle(&mut self, center: Point) {
        self.shapes.push(Shape::rectangle(center));
    }

    /// Removes the most recently placed shape without rendering.
    pub fn undo(&mut self) -> Option<Shape> {
        self.shapes.pop()
    }

    /// Paints every shape onto the surface in insertion order.
    pub fn draw(&mut self) -> Result<()> {
        for shape in &self.shapes {
            shape.draw(&mut self.surface)?;
        }

        Ok(())
    }

    /// Reads back the surface's opacity channel.
    ///
    /// Only meaningful once the surface finished rendering the last `draw`.
    pub fn bitmap(&self) -> Result<Bitmap> {
        let data = self.surface.read_alpha()?;
        Bitmap::new(self.surface.width(), self.surface.height(), data)
    }

    /// Removes every shape and blanks the surface.
    pub fn clear(&mut self) -> Result<()> {
        self.shapes.clear();
        self.surface.clear()
    }

    /// The shape of the bitmaps this scene produces.
    pub fn bitmap_shape(&self) -> [usize; 3] {
        [self.surface.width(), self.surface.height(), 1]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::surface::RasterSurface;

    const WIDTH: usize = 400;
    const HEIGHT: usize = 200;

    fn scene(seed: u64) -> Scene<RasterSurface, StdRng> {
        let surface = RasterSurface::new(WIDTH, HEIGHT).unwrap();
        Scene::new("test", surface, StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn randomize_places_between_one_and_ten_rectangles() {
        let mut scene = scene(7);

        for _ in 0..50 {
            scene.clear().unwrap();
            scene.randomize();
            assert!((1..=MAX_RECTANGLES).contains(&scene.len()));

            for shape in scene.shapes() {
                let Point { x, y } = shape.center();
                assert!((0.0..WIDTH as f32).contains(&x));
                assert!((0.0..HEIGHT as f32).contains(&y));
            }
        }
    }

    #[test]
    fn undo_removes_exactly_the_last_shape() {
        let mut scene = scene(1);
        scene.randomize();
        let k = scene.len();
        let last = scene.shapes().last().cloned();

        assert_eq!(scene.undo(), last);
        assert_eq!(scene.len(), k - 1);
    }

    #[test]
    fn clear_empties_the_scene_and_the_surface() {
        let mut scene = scene(3);
        scene.randomize();
        scene.draw().unwrap();
        assert!(scene.bitmap().unwrap().data().iter().any(|&p| p > 0));

        scene.clear().unwrap();

        assert!(scene.is_empty());
        assert!(scene.bitmap().unwrap().data().iter().all(|&p| p == 0));
    }

    #[test]
    fn single_default_rectangle_covers_eight_hundred_pixels() {
        let mut scene = scene(0);
        scene.place_rectangle(Point::new(100.0, 100.0));
        scene.draw().unwrap();

        let bitmap = scene.bitmap().unwrap();
        assert_eq!(bitmap.shape(), [WIDTH, HEIGHT, 1]);
        assert_eq!(bitmap.data().iter().filter(|&&p| p == 255).count(), 800);
        assert_eq!(bitmap.data().iter().filter(|&&p| p != 0 && p != 255).count(), 0);
        assert_eq!(bitmap.get(80, 90), Some(255));
        assert_eq!(bitmap.get(120, 110), Some(0));
    }

    #[test]
    fn bitmap_is_idempotent_without_redrawing() {
        let mut scene = scene(11);
        scene.randomize();
        scene.draw().unwrap();

        assert_eq!(scene.bitmap().unwrap(), scene.bitmap().unwrap());
    }

    #[test]
    fn same_seed_same_scene() {
        let mut a = scene(42);
        let mut b = scene(42);
        a.randomize();
        b.randomize();

        assert_eq!(a.shapes(), b.shapes());
    }

    #[test]
    fn undo_does_not_render() {
        let mut scene = scene(5);
        scene.place_rectangle(Point::new(20.0, 20.0));
        scene.draw().unwrap();
        let before = scene.bitmap().unwrap();

        scene.undo();

        assert_eq!(scene.bitmap().unwrap(), before);
    }
}
