//! Polygon type for closed contours.
//!
//! A closed polygon (boundary) over scaled integer points. The polygon is
//! implicitly closed: the last point connects back to the first. Points
//! should be ordered counter-clockwise for outer contours (positive area)
//! and clockwise for holes (negative area).

use super::{BoundingBox, Point};
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Create a new empty polygon.
    #[inline]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a polygon from a vector of points.
    #[inline]
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Get the points of this polygon.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Get the number of points in the polygon.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the polygon is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a point to the polygon.
    #[inline]
    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    /// Get a point at the given index, wrapping around for indices >= len.
    #[inline]
    pub fn point_at(&self, index: usize) -> Point {
        self.points[index % self.points.len()]
    }

    /// Calculate the signed area of the polygon.
    /// Positive for counter-clockwise (exterior), negative for clockwise (hole).
    /// Uses the shoelace formula.
    pub fn signed_area(&self) -> CoordF {
        if self.points.len() < 3 {
            return 0.0;
        }

        let mut sum: i128 = 0;
        for i in 0..self.points.len() {
            let j = (i + 1) % self.points.len();
            sum += self.points[i].x as i128 * self.points[j].y as i128;
            sum -= self.points[j].x as i128 * self.points[i].y as i128;
        }

        sum as CoordF / 2.0
    }

    /// Calculate the unsigned area of the polygon.
    #[inline]
    pub fn area(&self) -> CoordF {
        self.signed_area().abs()
    }

    /// Check if the polygon is counter-clockwise (positive area).
    #[inline]
    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Check if the polygon is clockwise (negative area).
    #[inline]
    pub fn is_clockwise(&self) -> bool {
        self.signed_area() < 0.0
    }

    /// Reverse the order of points in the polygon.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Return a reversed copy of the polygon.
    pub fn reversed(&self) -> Self {
        let mut result = self.clone();
        result.reverse();
        result
    }

    /// Get the bounding box of the polygon.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }

    /// Check if a point is strictly inside the polygon using ray casting.
    /// Points on the boundary are not considered inside; use [`Polygon::inside`]
    /// for an explicit border policy.
    pub fn contains_point(&self, p: &Point) -> bool {
        if self.points.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = self.points.len() - 1;

        for i in 0..self.points.len() {
            let pi = &self.points[i];
            let pj = &self.points[j];

            if ((pi.y > p.y) != (pj.y > p.y))
                && (p.x as i128)
                    < (pj.x as i128 - pi.x as i128) * (p.y as i128 - pi.y as i128)
                        / (pj.y as i128 - pi.y as i128)
                        + pi.x as i128
            {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    /// Check if a point is on the boundary of the polygon.
    /// A 1-unit tolerance absorbs the integer rounding of projections.
    pub fn is_point_on_boundary(&self, p: &Point) -> bool {
        if self.points.len() < 2 {
            return false;
        }
        for i in 0..self.points.len() {
            let a = self.points[i];
            let b = self.point_at(i + 1);
            let proj = p.project_onto_segment(a, b);
            if p.distance_squared(&proj) <= 1 {
                return true;
            }
        }
        false
    }

    /// Point-in-polygon test with an explicit border policy.
    pub fn inside(&self, p: &Point, border_counts_inside: bool) -> bool {
        if self.is_point_on_boundary(p) {
            return border_counts_inside;
        }
        self.contains_point(p)
    }

    /// Find the closest point on the polygon boundary to the given point,
    /// returning it together with the index of the edge that hosts it.
    pub fn closest_point_with_edge(&self, p: &Point) -> Option<(Point, usize)> {
        if self.points.is_empty() {
            return None;
        }
        if self.points.len() == 1 {
            return Some((self.points[0], 0));
        }

        let mut closest = self.points[0];
        let mut edge = 0;
        let mut min_dist = i128::MAX;

        for i in 0..self.points.len() {
            let a = self.points[i];
            let b = self.point_at(i + 1);
            let proj = p.project_onto_segment(a, b);
            let dist = p.distance_squared(&proj);
            if dist < min_dist {
                min_dist = dist;
                closest = proj;
                edge = i;
            }
        }

        Some((closest, edge))
    }

    /// Find the closest point on the polygon boundary to the given point.
    pub fn closest_point(&self, p: &Point) -> Point {
        self.closest_point_with_edge(p)
            .map(|(point, _)| point)
            .unwrap_or(Point::zero())
    }

    /// Distance from a point to the polygon boundary.
    pub fn distance_to_point(&self, p: &Point) -> CoordF {
        let closest = self.closest_point(p);
        p.distance(&closest)
    }

    /// Translate the polygon by a vector.
    pub fn translate(&mut self, v: Point) {
        for p in &mut self.points {
            *p = *p + v;
        }
    }

    /// Return a translated copy of the polygon.
    pub fn translated(&self, v: Point) -> Self {
        let mut result = self.clone();
        result.translate(v);
        result
    }

    /// Remove segments shorter than `max_segment` provided the displacement of
    /// the removed vertex stays within `max_deviation`.
    ///
    /// Used to clean up unions of many near-circular branch cross-sections
    /// without altering single circles.
    pub fn simplify(&mut self, max_segment: Coord, max_deviation: Coord) {
        if self.points.len() < 3 {
            return;
        }

        let max_segment_sq = (max_segment as i128) * (max_segment as i128);
        let max_deviation_sq = (max_deviation as i128) * (max_deviation as i128);

        let mut new_points: Vec<Point> = Vec::with_capacity(self.points.len());

        for i in 0..self.points.len() {
            let curr = self.points[i];
            let next = self.point_at(i + 1);
            let prev = match new_points.last() {
                Some(p) => *p,
                None => self.points[self.points.len() - 1],
            };

            if curr.distance_squared(&next) < max_segment_sq {
                let displaced = curr.project_onto_segment(prev, next);
                if curr.distance_squared(&displaced) <= max_deviation_sq {
                    continue; // Drop this vertex.
                }
            }
            new_points.push(curr);
        }

        if new_points.len() >= 3 {
            self.points = new_points;
        }
    }

    /// Remove micrometre-scale jitter: a vertex is dropped when both of its
    /// adjoining segments are shorter than `remove_length`. Meant as a
    /// numerical cleanup after offset operations.
    pub fn smooth(&mut self, remove_length: Coord) {
        if self.points.len() < 4 {
            return;
        }

        let remove_sq = (remove_length as i128) * (remove_length as i128);
        let mut new_points: Vec<Point> = Vec::with_capacity(self.points.len());

        for i in 0..self.points.len() {
            let curr = self.points[i];
            let next = self.point_at(i + 1);
            let prev = match new_points.last() {
                Some(p) => *p,
                None => self.points[self.points.len() - 1],
            };

            if prev.distance_squared(&curr) < remove_sq && curr.distance_squared(&next) < remove_sq
            {
                continue;
            }
            new_points.push(curr);
        }

        if new_points.len() >= 3 {
            self.points = new_points;
        }
    }

    /// Create a rectangular polygon.
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self::from_points(vec![
            min,
            Point::new(max.x, min.y),
            max,
            Point::new(min.x, max.y),
        ])
    }
}

impl fmt::Debug for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Polygon({} points)", self.points.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale;

    fn make_square_mm(size: f64) -> Polygon {
        let half = scale(size / 2.0);
        Polygon::from_points(vec![
            Point::new(-half, -half),
            Point::new(half, -half),
            Point::new(half, half),
            Point::new(-half, half),
        ])
    }

    #[test]
    fn test_area_and_orientation() {
        let square = make_square_mm(10.0);
        let expected = (scale(10.0) as f64).powi(2);

        assert!((square.area() - expected).abs() < 1.0);
        assert!(square.is_counter_clockwise());
        assert!(square.reversed().is_clockwise());
    }

    #[test]
    fn test_contains_point() {
        let square = make_square_mm(10.0);

        assert!(square.contains_point(&Point::zero()));
        assert!(!square.contains_point(&Point::new(scale(20.0), 0)));
    }

    #[test]
    fn test_inside_border_policy() {
        let square = make_square_mm(10.0);
        let on_border = Point::new(scale(5.0), 0);

        assert!(square.inside(&on_border, true));
        assert!(!square.inside(&on_border, false));
        assert!(square.inside(&Point::zero(), false));
    }

    #[test]
    fn test_closest_point() {
        let square = make_square_mm(10.0);
        let p = Point::new(scale(10.0), 0);
        let closest = square.closest_point(&p);

        assert_eq!(closest, Point::new(scale(5.0), 0));
        assert!((square.distance_to_point(&p) - scale(5.0) as f64).abs() < 2.0);
    }

    #[test]
    fn test_simplify_removes_short_segments() {
        // A square with one extra vertex 1 micron off the bottom edge.
        let half = scale(5.0);
        let mut poly = Polygon::from_points(vec![
            Point::new(-half, -half),
            Point::new(0, -half + 1),
            Point::new(half, -half),
            Point::new(half, half),
            Point::new(-half, half),
        ]);

        poly.simplify(scale(20.0), 10);
        assert_eq!(poly.len(), 4);
    }

    #[test]
    fn test_simplify_keeps_significant_vertices() {
        let mut square = make_square_mm(10.0);
        square.simplify(scale(0.1), 10);

        assert_eq!(square.len(), 4);
    }

    #[test]
    fn test_smooth_removes_jitter() {
        let half = scale(5.0);
        let mut poly = Polygon::from_points(vec![
            Point::new(-half, -half),
            Point::new(-half + 2, -half + 2),
            Point::new(-half + 4, -half),
            Point::new(half, -half),
            Point::new(half, half),
            Point::new(-half, half),
        ]);

        poly.smooth(5);
        assert!(poly.len() < 6);
    }

    #[test]
    fn test_translate() {
        let square = make_square_mm(2.0).translated(Point::new(scale(3.0), scale(4.0)));
        assert!(square.contains_point(&Point::new(scale(3.0), scale(4.0))));
    }
}
