use std::fmt;
use std::ops::{Add, Sub};

/// Type-level marker for the physical coordinate space, in framebuffer pixels
#[derive(Debug)]
pub struct Physical;

/// Type-level marker for raw coordinate space, provided by input devices
#[derive(Debug)]
pub struct Raw;

/*
 * Point
 */

/// A point as defined by its x and y coordinates
///
/// Operations on points are saturating.
#[repr(C)]
pub struct Point<Kind> {
    /// horizontal coordinate
    pub x: i32,
    /// vertical coordinate
    pub y: i32,
    _kind: std::marker::PhantomData<Kind>,
}

impl<Kind> Point<Kind> {
    /// Create a new [`Point`]
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Point {
            x,
            y,
            _kind: std::marker::PhantomData,
        }
    }
}

impl<S> fmt::Debug for Point<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("Point<{}>", std::any::type_name::<S>()))?;
        f.debug_struct("")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

impl<Kind> From<(i32, i32)> for Point<Kind> {
    #[inline]
    fn from((x, y): (i32, i32)) -> Point<Kind> {
        Point::new(x, y)
    }
}

impl<Kind> From<Point<Kind>> for (i32, i32) {
    #[inline]
    fn from(point: Point<Kind>) -> (i32, i32) {
        (point.x, point.y)
    }
}

impl<Kind> Add for Point<Kind> {
    type Output = Point<Kind>;
    #[inline]
    fn add(self, other: Point<Kind>) -> Point<Kind> {
        Point::new(self.x.saturating_add(other.x), self.y.saturating_add(other.y))
    }
}

impl<Kind> Sub for Point<Kind> {
    type Output = Point<Kind>;
    #[inline]
    fn sub(self, other: Point<Kind>) -> Point<Kind> {
        Point::new(self.x.saturating_sub(other.x), self.y.saturating_sub(other.y))
    }
}

impl<Kind> Clone for Point<Kind> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<Kind> Copy for Point<Kind> {}

impl<Kind> PartialEq for Point<Kind> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl<Kind> Eq for Point<Kind> {}

impl<Kind> Default for Point<Kind> {
    #[inline]
    fn default() -> Self {
        Point::new(0, 0)
    }
}

/*
 * Size
 */

/// A size as defined by its width and height
///
/// Constructors of this type ensure that the values are always positive via
/// `debug_assert!()`, however manually changing the values of the fields
/// can break this invariant.
#[repr(C)]
pub struct Size<Kind> {
    /// horizontal extent
    pub w: i32,
    /// vertical extent
    pub h: i32,
    _kind: std::marker::PhantomData<Kind>,
}

impl<Kind> Size<Kind> {
    /// Create a new [`Size`]
    #[inline]
    pub fn new(w: i32, h: i32) -> Self {
        debug_assert!(
            w >= 0 && h >= 0,
            "Attempting to create a `Size` of negative size: {:?}",
            (w, h)
        );
        Size {
            w,
            h,
            _kind: std::marker::PhantomData,
        }
    }

    /// Check if this [`Size`] is empty
    ///
    /// Returns true if either the width or the height is zero
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

impl<S> fmt::Debug for Size<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("Size<{}>", std::any::type_name::<S>()))?;
        f.debug_struct("").field("w", &self.w).field("h", &self.h).finish()
    }
}

impl<Kind> From<(i32, i32)> for Size<Kind> {
    #[inline]
    fn from((w, h): (i32, i32)) -> Size<Kind> {
        Size::new(w, h)
    }
}

impl<Kind> From<Size<Kind>> for (i32, i32) {
    #[inline]
    fn from(size: Size<Kind>) -> (i32, i32) {
        (size.w, size.h)
    }
}

impl<Kind> Clone for Size<Kind> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<Kind> Copy for Size<Kind> {}

impl<Kind> PartialEq for Size<Kind> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.w == other.w && self.h == other.h
    }
}

impl<Kind> Eq for Size<Kind> {}

impl<Kind> Default for Size<Kind> {
    #[inline]
    fn default() -> Self {
        Size::new(0, 0)
    }
}

/*
 * Rectangle
 */

/// A rectangle defined by its top-left corner and dimensions
#[repr(C)]
pub struct Rectangle<Kind> {
    /// Location of the top-left corner of the rectangle
    pub loc: Point<Kind>,
    /// Size of the rectangle, as (width, height)
    pub size: Size<Kind>,
}

impl<Kind> Rectangle<Kind> {
    /// Largest radius accepted by [`Rectangle::centered`], its side is `i32::MAX`
    pub const MAX_RADIUS: i32 = (i32::MAX - 1) / 2;

    /// Create a new [`Rectangle`] from the coordinates of its top-left corner and its dimensions
    #[inline]
    pub fn from_loc_and_size(loc: impl Into<Point<Kind>>, size: impl Into<Size<Kind>>) -> Self {
        Rectangle {
            loc: loc.into(),
            size: size.into(),
        }
    }

    /// Create a new [`Rectangle`] at the origin from its dimensions
    #[inline]
    pub fn from_size(size: impl Into<Size<Kind>>) -> Self {
        Rectangle {
            loc: Point::default(),
            size: size.into(),
        }
    }

    /// Create a square [`Rectangle`] centered on `center` that reaches `radius` pixels
    /// in every direction, both ends included.
    #[inline]
    pub fn centered(center: Point<Kind>, radius: i32) -> Self {
        // keeps the side length representable
        let radius = radius.clamp(0, Self::MAX_RADIUS);
        Rectangle::from_loc_and_size(
            (center.x.saturating_sub(radius), center.y.saturating_sub(radius)),
            (2 * radius + 1, 2 * radius + 1),
        )
    }

    /// Check if this [`Rectangle`] is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    /// Checks whether given [`Point`] is inside the rectangle
    #[inline]
    pub fn contains<P: Into<Point<Kind>>>(self, point: P) -> bool {
        let p: Point<Kind> = point.into();
        (p.x >= self.loc.x)
            && (p.x < self.loc.x.saturating_add(self.size.w))
            && (p.y >= self.loc.y)
            && (p.y < self.loc.y.saturating_add(self.size.h))
    }

    /// Checks whether a given [`Rectangle`] overlaps with this one
    #[inline]
    pub fn overlaps(self, other: impl Into<Rectangle<Kind>>) -> bool {
        let other = other.into();
        // if the rectangle is not outside of the other
        // they must overlap
        !(
            // self is left of other
            self.loc.x.saturating_add(self.size.w) <= other.loc.x
            // self is right of other
            ||  self.loc.x >= other.loc.x.saturating_add(other.size.w)
            // self is above of other
            ||  self.loc.y.saturating_add(self.size.h) <= other.loc.y
            // self is below of other
            ||  self.loc.y >= other.loc.y.saturating_add(other.size.h)
        )
    }

    /// Clamp rectangle to fit into another Rectangle. This can be useful if you need to
    /// clip a region to the visible part of a surface.
    #[inline]
    pub fn intersection(self, other: impl Into<Rectangle<Kind>>) -> Option<Self> {
        let other = other.into();
        if !self.overlaps(other) {
            return None;
        }
        let x1 = self.loc.x.max(other.loc.x);
        let y1 = self.loc.y.max(other.loc.y);
        let x2 = (self.loc.x.saturating_add(self.size.w)).min(other.loc.x.saturating_add(other.size.w));
        let y2 = (self.loc.y.saturating_add(self.size.h)).min(other.loc.y.saturating_add(other.size.h));
        Some(Rectangle::from_loc_and_size(
            (x1, y1),
            (x2.saturating_sub(x1), y2.saturating_sub(y1)),
        ))
    }

    /// Iterate over every point of this rectangle, row by row
    pub fn points(self) -> impl Iterator<Item = Point<Kind>> {
        let Rectangle { loc, size } = self;
        (loc.y..loc.y.saturating_add(size.h))
            .flat_map(move |y| (loc.x..loc.x.saturating_add(size.w)).map(move |x| Point::new(x, y)))
    }
}

impl<S> fmt::Debug for Rectangle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("Rectangle<{}>", std::any::type_name::<S>()))?;
        f.debug_struct("")
            .field("x", &self.loc.x)
            .field("y", &self.loc.y)
            .field("width", &self.size.w)
            .field("height", &self.size.h)
            .finish()
    }
}

impl<Kind> Clone for Rectangle<Kind> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<Kind> Copy for Rectangle<Kind> {}

impl<Kind> PartialEq for Rectangle<Kind> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.loc == other.loc && self.size == other.size
    }
}

impl<Kind> Eq for Rectangle<Kind> {}

impl<Kind> Default for Rectangle<Kind> {
    #[inline]
    fn default() -> Self {
        Rectangle {
            loc: Default::default(),
            size: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Physical, Point, Rectangle, Size};

    #[test]
    fn rectangle_contains_edges() {
        let rect = Rectangle::<Physical>::from_loc_and_size((10, 20), (100, 50));
        assert!(rect.contains((10, 20)));
        assert!(rect.contains((109, 69)));
        assert!(!rect.contains((110, 69)));
        assert!(!rect.contains((109, 70)));
        assert!(!rect.contains((9, 20)));
    }

    #[test]
    fn rectangle_centered_square() {
        let rect = Rectangle::<Physical>::centered(Point::new(50, 50), 2);
        assert_eq!(rect, Rectangle::from_loc_and_size((48, 48), (5, 5)));
        assert_eq!(rect.points().count(), 25);
    }

    #[test]
    fn rectangle_centered_huge_radius_is_clamped() {
        let rect = Rectangle::<Physical>::centered(Point::new(50, 50), i32::MAX);
        let radius = Rectangle::<Physical>::MAX_RADIUS;
        assert_eq!(rect.loc, Point::new(50 - radius, 50 - radius));
        assert_eq!(rect.size, Size::new(i32::MAX, i32::MAX));
        assert!(rect.contains((0, 0)));
        let screen = Rectangle::from_size((100, 100));
        assert!(rect.contains((99, 99)));
        assert_eq!(rect.intersection(screen), Some(screen));
    }

    #[test]
    fn rectangle_no_overlap_when_touching() {
        let a = Rectangle::<Physical>::from_loc_and_size((0, 0), (10, 10));
        let b = Rectangle::<Physical>::from_loc_and_size((10, 0), (10, 10));
        assert!(!a.overlaps(b));
        assert!(a.overlaps(Rectangle::from_loc_and_size((9, 9), (10, 10))));
    }

    #[test]
    fn rectangle_intersection() {
        let a = Rectangle::<Physical>::from_loc_and_size((0, 0), (10, 10));
        let b = Rectangle::from_loc_and_size((5, -5), (10, 10));
        assert_eq!(a.intersection(b), Some(Rectangle::from_loc_and_size((5, 0), (5, 5))));
    }

    #[test]
    fn size_empty() {
        assert!(Size::<Physical>::new(0, 5).is_empty());
        assert!(!Size::<Physical>::new(1, 1).is_empty());
    }
}
