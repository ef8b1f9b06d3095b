//! Software rendering abstractions
//!
//! Everything in this crate draws through the [`Canvas`] trait: a randomly addressable
//! grid of pixels with a visible [`Rectangle`]. The framebuffer
//! [`PixelSurface`](crate::backend::fbdev::PixelSurface) is the canonical implementation,
//! but any pixel store can be used, which is how the higher level drawing code is tested.
//!
//! Writes outside of [`Canvas::bounds`] are silently dropped by every implementation, so
//! drawing code never needs to clip by itself.

use crate::utils::{Physical, Point, Rectangle};

mod color;
pub mod marker;

pub use self::color::Color;

/// A two-dimensional, color addressable drawing target
pub trait Canvas {
    /// The visible area of this canvas
    ///
    /// Points inside this rectangle are addressable, every other point is clipped.
    fn bounds(&self) -> Rectangle<Physical>;

    /// Read the color of a single pixel
    ///
    /// Returns [`Color::TRANSPARENT`] for points outside of [`Canvas::bounds`].
    fn get(&self, point: Point<Physical>) -> Color;

    /// Write the color of a single pixel
    ///
    /// Points outside of [`Canvas::bounds`] are ignored.
    fn set(&mut self, point: Point<Physical>, color: Color);

    /// Fill the whole visible area with a single color
    fn fill(&mut self, color: Color) {
        let bounds = self.bounds();
        self.fill_rect(bounds, color);
    }

    /// Fill a rectangle, clipped to the visible area
    fn fill_rect(&mut self, rect: Rectangle<Physical>, color: Color) {
        if let Some(rect) = rect.intersection(self.bounds()) {
            for point in rect.points() {
                self.set(point, color);
            }
        }
    }

    /// Draw the one pixel wide outline of a rectangle, clipped to the visible area
    fn stroke_rect(&mut self, rect: Rectangle<Physical>, color: Color) {
        if rect.is_empty() {
            return;
        }
        let Some(visible) = rect.intersection(self.bounds()) else {
            return;
        };
        let left = rect.loc.x;
        let top = rect.loc.y;
        let right = rect.loc.x.saturating_add(rect.size.w - 1);
        let bottom = rect.loc.y.saturating_add(rect.size.h - 1);
        let columns = visible.loc.x..visible.loc.x.saturating_add(visible.size.w);
        let rows = visible.loc.y..visible.loc.y.saturating_add(visible.size.h);
        let edges = columns
            .flat_map(|x| [Point::new(x, top), Point::new(x, bottom)])
            .chain(rows.flat_map(|y| [Point::new(left, y), Point::new(right, y)]));
        for point in edges {
            if visible.contains(point) {
                self.set(point, color);
            }
        }
    }
}

impl<C: Canvas + ?Sized> Canvas for &mut C {
    fn bounds(&self) -> Rectangle<Physical> {
        (**self).bounds()
    }

    fn get(&self, point: Point<Physical>) -> Color {
        (**self).get(point)
    }

    fn set(&mut self, point: Point<Physical>, color: Color) {
        (**self).set(point, color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts writes, every point is in bounds of a 10x10 grid
    struct Counter {
        pixels: [[Color; 10]; 10],
        writes: usize,
    }

    impl Canvas for Counter {
        fn bounds(&self) -> Rectangle<Physical> {
            Rectangle::from_size((10, 10))
        }

        fn get(&self, point: Point<Physical>) -> Color {
            if !self.bounds().contains(point) {
                return Color::TRANSPARENT;
            }
            self.pixels[point.y as usize][point.x as usize]
        }

        fn set(&mut self, point: Point<Physical>, color: Color) {
            self.writes += 1;
            if self.bounds().contains(point) {
                self.pixels[point.y as usize][point.x as usize] = color;
            }
        }
    }

    fn counter() -> Counter {
        Counter {
            pixels: [[Color::BLACK; 10]; 10],
            writes: 0,
        }
    }

    #[test]
    fn stroke_rect_outline() {
        let mut canvas = counter();
        canvas.stroke_rect(Rectangle::from_loc_and_size((2, 2), (3, 3)), Color::WHITE);
        for (x, y) in [(2, 2), (4, 2), (2, 4), (4, 4), (3, 2)] {
            assert_eq!(canvas.get(Point::new(x, y)), Color::WHITE);
        }
        assert_eq!(canvas.get(Point::new(3, 3)), Color::BLACK);
    }

    #[test]
    fn stroke_rect_at_the_edge_of_i32() {
        let mut canvas = counter();
        canvas.stroke_rect(Rectangle::from_loc_and_size((5, 5), (i32::MAX, i32::MAX)), Color::WHITE);
        assert_eq!(canvas.get(Point::new(5, 9)), Color::WHITE);
        assert_eq!(canvas.get(Point::new(9, 5)), Color::WHITE);
        assert_eq!(canvas.get(Point::new(6, 6)), Color::BLACK);
        // the bottom and right edges are off screen
        assert_eq!(canvas.writes, 2 * 5);
    }

    #[test]
    fn stroke_rect_outside_writes_nothing() {
        let mut canvas = counter();
        canvas.stroke_rect(Rectangle::from_loc_and_size((20, 20), (3, 3)), Color::WHITE);
        canvas.stroke_rect(Rectangle::from_loc_and_size((0, 0), (0, 3)), Color::WHITE);
        assert_eq!(canvas.writes, 0);
    }
}
