//! Axis-aligned bounding box over scaled integer coordinates.

use super::Point;
use crate::Coord;
use serde::{Deserialize, Serialize};

/// An integer axis-aligned bounding box.
///
/// A freshly created box is inverted (min > max) and grows as points are
/// merged into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    /// Create a new, undefined (inverted) bounding box.
    pub fn new() -> Self {
        Self {
            min: Point::new(Coord::MAX, Coord::MAX),
            max: Point::new(Coord::MIN, Coord::MIN),
        }
    }

    /// Create a bounding box from explicit min/max corners.
    pub fn from_min_max(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Create a bounding box covering a set of points.
    pub fn from_points(points: &[Point]) -> Self {
        let mut bounds = Self::new();
        for p in points {
            bounds.merge_point(*p);
        }
        bounds
    }

    /// Check if the bounding box covers anything.
    pub fn is_defined(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    /// Grow to include a point.
    pub fn merge_point(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    /// Grow to include another bounding box.
    pub fn merge(&mut self, other: &BoundingBox) {
        if other.is_defined() {
            self.merge_point(other.min);
            self.merge_point(other.max);
        }
    }

    /// Width of the box.
    pub fn width(&self) -> Coord {
        self.max.x - self.min.x
    }

    /// Height of the box.
    pub fn height(&self) -> Coord {
        self.max.y - self.min.y
    }

    /// Size of the box as a vector.
    pub fn size(&self) -> Point {
        Point::new(self.width(), self.height())
    }

    /// Center of the box.
    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2,
            (self.min.y + self.max.y) / 2,
        )
    }

    /// Check if a point lies inside the box (borders included).
    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Grow the box by a margin on every side.
    pub fn expand(&mut self, margin: Coord) {
        self.min.x -= margin;
        self.min.y -= margin;
        self.max.x += margin;
        self.max.y += margin;
    }

    /// Return a copy grown by a margin on every side.
    pub fn expanded(&self, margin: Coord) -> Self {
        let mut result = *self;
        result.expand(margin);
        result
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let bounds = BoundingBox::from_points(&[
            Point::new(100, -50),
            Point::new(-20, 300),
            Point::new(80, 80),
        ]);

        assert_eq!(bounds.min, Point::new(-20, -50));
        assert_eq!(bounds.max, Point::new(100, 300));
        assert_eq!(bounds.width(), 120);
        assert_eq!(bounds.height(), 350);
    }

    #[test]
    fn test_undefined_box() {
        let bounds = BoundingBox::new();
        assert!(!bounds.is_defined());
        assert!(!bounds.contains_point(&Point::zero()));
    }

    #[test]
    fn test_expand_and_contains() {
        let mut bounds = BoundingBox::from_min_max(Point::zero(), Point::new(100, 100));
        assert!(!bounds.contains_point(&Point::new(110, 50)));

        bounds.expand(20);
        assert!(bounds.contains_point(&Point::new(110, 50)));
        assert_eq!(bounds.min, Point::new(-20, -20));
    }

    #[test]
    fn test_center() {
        let bounds = BoundingBox::from_min_max(Point::new(0, 0), Point::new(100, 40));
        assert_eq!(bounds.center(), Point::new(50, 20));
    }

    #[test]
    fn test_merge() {
        let mut a = BoundingBox::from_min_max(Point::zero(), Point::new(10, 10));
        let b = BoundingBox::from_min_max(Point::new(-5, 5), Point::new(3, 20));
        a.merge(&b);

        assert_eq!(a.min, Point::new(-5, 0));
        assert_eq!(a.max, Point::new(10, 20));
    }
}
