//! ExPolygon type for polygons with holes.
//!
//! An `ExPolygon` is one connected region: an exterior contour plus interior
//! hole contours. `ExPolygons` is the set type used wherever the support
//! algorithm handles a forbidden or printable region; a region's reversed
//! inner ring is represented as a hole, so offsets and unions treat it as
//! "everything outside is part of the region".

use super::{BoundingBox, Point, Polygon};
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A polygon with holes (exterior contour + interior hole contours).
///
/// The contour should be counter-clockwise, holes clockwise.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExPolygon {
    /// The outer contour of the polygon.
    pub contour: Polygon,
    /// The holes (interior contours) of the polygon.
    pub holes: Vec<Polygon>,
}

/// A set of disjoint regions.
pub type ExPolygons = Vec<ExPolygon>;

impl ExPolygon {
    /// Create a new ExPolygon with only a contour and no holes.
    #[inline]
    pub fn new(contour: Polygon) -> Self {
        Self {
            contour,
            holes: Vec::new(),
        }
    }

    /// Create a new ExPolygon with a contour and holes.
    #[inline]
    pub fn with_holes(contour: Polygon, holes: Vec<Polygon>) -> Self {
        Self { contour, holes }
    }

    /// Check if the ExPolygon is empty (no contour points).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contour.is_empty()
    }

    /// Calculate the area of the ExPolygon (contour area minus hole areas).
    pub fn area(&self) -> CoordF {
        let contour_area = self.contour.area();
        let holes_area: CoordF = self.holes.iter().map(|h| h.area()).sum();
        contour_area - holes_area
    }

    /// Get the bounding box of the ExPolygon (same as contour's bounding box).
    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        self.contour.bounding_box()
    }

    /// Point-in-region test with an explicit border policy: inside the
    /// contour and not inside any hole. Both the contour border and the hole
    /// borders follow `border_counts_inside`.
    pub fn inside(&self, p: &Point, border_counts_inside: bool) -> bool {
        if !self.contour.inside(p, border_counts_inside) {
            return false;
        }
        for hole in &self.holes {
            if hole.is_point_on_boundary(p) {
                return border_counts_inside;
            }
            if hole.contains_point(p) {
                return false;
            }
        }
        true
    }

    /// Check if a point is strictly inside the region (border excluded).
    #[inline]
    pub fn contains_point(&self, p: &Point) -> bool {
        self.inside(p, false)
    }

    /// Translate the region by a vector.
    pub fn translate(&mut self, v: Point) {
        self.contour.translate(v);
        for hole in &mut self.holes {
            hole.translate(v);
        }
    }

    /// All rings of this region: the contour followed by the holes.
    pub fn all_polygons(&self) -> impl Iterator<Item = &Polygon> {
        std::iter::once(&self.contour).chain(self.holes.iter())
    }

    /// Mutable access to all rings of this region.
    pub fn all_polygons_mut(&mut self) -> impl Iterator<Item = &mut Polygon> {
        std::iter::once(&mut self.contour).chain(self.holes.iter_mut())
    }
}

impl From<Polygon> for ExPolygon {
    fn from(contour: Polygon) -> Self {
        Self::new(contour)
    }
}

impl fmt::Debug for ExPolygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExPolygon({} points, {} holes)",
            self.contour.len(),
            self.holes.len()
        )
    }
}

/// Point-in-set test over a region set with an explicit border policy.
pub fn contains(expolygons: &[ExPolygon], p: &Point, border_counts_inside: bool) -> bool {
    expolygons
        .iter()
        .any(|expoly| expoly.inside(p, border_counts_inside))
}

/// Total area of a region set.
pub fn total_area(expolygons: &[ExPolygon]) -> CoordF {
    expolygons.iter().map(|e| e.area()).sum()
}

/// Bounding box of a region set; undefined (inverted) when the set is empty.
pub fn bounding_box(expolygons: &[ExPolygon]) -> BoundingBox {
    let mut bounds = BoundingBox::new();
    for expoly in expolygons {
        bounds.merge(&expoly.bounding_box());
    }
    bounds
}

/// Remove regions whose area falls below `min_area` (scaled units squared).
pub fn remove_small(expolygons: ExPolygons, min_area: CoordF) -> ExPolygons {
    expolygons
        .into_iter()
        .filter(|e| e.area() > min_area)
        .collect()
}

/// Drop rings with fewer than 3 points; clipper output occasionally carries
/// degenerate slivers after aggressive erosion.
pub fn remove_degenerate(expolygons: ExPolygons) -> ExPolygons {
    expolygons
        .into_iter()
        .map(|mut e| {
            e.holes.retain(|h| h.len() >= 3);
            e
        })
        .filter(|e| e.contour.len() >= 3)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale;

    fn make_square(center: Point, size_mm: f64) -> Polygon {
        let half = scale(size_mm / 2.0);
        Polygon::rectangle(
            Point::new(center.x - half, center.y - half),
            Point::new(center.x + half, center.y + half),
        )
    }

    fn ring_10_with_4_hole() -> ExPolygon {
        ExPolygon::with_holes(
            make_square(Point::zero(), 10.0),
            vec![make_square(Point::zero(), 4.0).reversed()],
        )
    }

    #[test]
    fn test_inside_with_hole() {
        let ring = ring_10_with_4_hole();

        assert!(!ring.contains_point(&Point::zero())); // In the hole.
        assert!(ring.contains_point(&Point::new(scale(4.0), 0))); // In the ring body.
        assert!(!ring.contains_point(&Point::new(scale(20.0), 0))); // Outside.
    }

    #[test]
    fn test_area_subtracts_holes() {
        let ring = ring_10_with_4_hole();
        let expected = (scale(10.0) as f64).powi(2) - (scale(4.0) as f64).powi(2);

        assert!((ring.area() - expected).abs() < 1.0);
    }

    #[test]
    fn test_set_contains() {
        let set = vec![
            ExPolygon::new(make_square(Point::zero(), 2.0)),
            ExPolygon::new(make_square(Point::new(scale(10.0), 0), 2.0)),
        ];

        assert!(contains(&set, &Point::new(scale(10.0), 0), false));
        assert!(!contains(&set, &Point::new(scale(5.0), 0), false));
    }

    #[test]
    fn test_remove_small() {
        let set = vec![
            ExPolygon::new(make_square(Point::zero(), 10.0)),
            ExPolygon::new(make_square(Point::new(scale(20.0), 0), 0.05)),
        ];

        let filtered = remove_small(set, (scale(1.0) as f64).powi(2));
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_bounding_box_of_set() {
        let set = vec![
            ExPolygon::new(make_square(Point::zero(), 2.0)),
            ExPolygon::new(make_square(Point::new(scale(10.0), 0), 2.0)),
        ];

        let bounds = bounding_box(&set);
        assert_eq!(bounds.min.x, scale(-1.0));
        assert_eq!(bounds.max.x, scale(11.0));
    }
}
