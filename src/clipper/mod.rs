//! Polygon boolean operations and offsetting.
//!
//! Union, intersection, difference and Minkowski offsets over [`ExPolygons`],
//! implemented on the geo-clipper library. These operations carry the whole
//! support pipeline:
//! - collision areas are unions of model outlines and the machine border,
//!   inflated by the sampled branch radius,
//! - avoidance areas are erosions of the layer above united with the current
//!   collision layer,
//! - rendered branches are unions of per-node circles with the model
//!   subtracted back out.
//!
//! Branch-collision offsets must use round joins so branch cross-sections
//! stay near-circular; the round join is approximated by short segments.

use crate::geometry::{expolygon, ExPolygon, ExPolygons, Point, Polygon};
use crate::{scale, unscale, Coord, CoordF};
use geo::{Coord as GeoCoord, LineString, MultiPolygon, Polygon as GeoPolygon};
use geo_clipper::{Clipper, EndType, JoinType};

/// Precision factor handed to clipper; 1000 steps per millimetre keeps the
/// integer micron grid exact through the f64 round-trip.
const CLIPPER_FACTOR: CoordF = 1000.0;

/// Join type for offset corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetJoinType {
    /// Square corners
    Square,
    /// Round corners, approximated by short segments
    #[default]
    Round,
    /// Mitered corners
    Miter,
}

impl From<OffsetJoinType> for JoinType {
    fn from(jt: OffsetJoinType) -> Self {
        match jt {
            OffsetJoinType::Square => JoinType::Square,
            OffsetJoinType::Round => JoinType::Round(0.25), // Default arc tolerance
            OffsetJoinType::Miter => JoinType::Miter(2.0),  // Default miter limit
        }
    }
}

/// Convert a ring to a closed geo LineString in millimetres.
fn ring_to_geo(poly: &Polygon) -> LineString<f64> {
    let mut ring: Vec<GeoCoord<f64>> = poly
        .points()
        .iter()
        .map(|p| GeoCoord {
            x: unscale(p.x),
            y: unscale(p.y),
        })
        .collect();

    // Close the ring if needed
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            ring.push(*first);
        }
    }

    LineString::new(ring)
}

/// Convert our ExPolygon to geo's Polygon type (with holes).
fn expolygon_to_geo(expoly: &ExPolygon) -> GeoPolygon<f64> {
    let exterior = ring_to_geo(&expoly.contour);
    let holes: Vec<LineString<f64>> = expoly.holes.iter().map(ring_to_geo).collect();
    GeoPolygon::new(exterior, holes)
}

/// Convert a geo ring back to our Polygon type.
fn geo_to_ring(line: &LineString<f64>) -> Polygon {
    let mut points: Vec<Point> = line
        .coords()
        .map(|c| Point::new(scale(c.x), scale(c.y)))
        .collect();

    // Remove the closing point if present (our Polygon doesn't store it)
    if points.len() > 1 {
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            if first == last {
                points.pop();
            }
        }
    }

    Polygon::from_points(points)
}

/// Convert geo's Polygon to our ExPolygon type (with holes).
fn geo_to_expolygon(geo_poly: &GeoPolygon<f64>) -> ExPolygon {
    let contour = geo_to_ring(geo_poly.exterior());
    let holes: Vec<Polygon> = geo_poly.interiors().iter().map(geo_to_ring).collect();
    ExPolygon::with_holes(contour, holes)
}

/// Convert geo's MultiPolygon to our ExPolygons type. Degenerate slivers the
/// clipper occasionally emits after aggressive erosion are dropped here.
fn geo_multi_to_expolygons(multi: &MultiPolygon<f64>) -> ExPolygons {
    expolygon::remove_degenerate(multi.0.iter().map(geo_to_expolygon).collect())
}

/// Convert our ExPolygons to geo's MultiPolygon.
fn expolygons_to_geo_multi(expolys: &[ExPolygon]) -> MultiPolygon<f64> {
    MultiPolygon::new(expolys.iter().map(expolygon_to_geo).collect())
}

// ============================================================================
// Boolean Operations
// ============================================================================

/// Compute the union of two sets of polygons.
pub fn union(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return union_ex(clip);
    }
    if clip.is_empty() {
        return union_ex(subject);
    }

    let subject_geo = expolygons_to_geo_multi(subject);
    let clip_geo = expolygons_to_geo_multi(clip);

    let result = subject_geo.union(&clip_geo, CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

/// Union a single set of potentially overlapping polygons, resolving the
/// result into disjoint parts with holes.
pub fn union_ex(polygons: &[ExPolygon]) -> ExPolygons {
    if polygons.is_empty() {
        return vec![];
    }

    let subject_geo = expolygons_to_geo_multi(polygons);
    let empty = MultiPolygon::<f64>::new(vec![]);

    let result = subject_geo.union(&empty, CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

/// Compute the intersection of two sets of polygons.
pub fn intersection(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() || clip.is_empty() {
        return vec![];
    }

    let subject_geo = expolygons_to_geo_multi(subject);
    let clip_geo = expolygons_to_geo_multi(clip);

    let result = subject_geo.intersection(&clip_geo, CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

/// Compute the difference of two sets of polygons (subject - clip).
pub fn difference(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return vec![];
    }
    if clip.is_empty() {
        return subject.to_vec();
    }

    let subject_geo = expolygons_to_geo_multi(subject);
    let clip_geo = expolygons_to_geo_multi(clip);

    let result = subject_geo.difference(&clip_geo, CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

// ============================================================================
// Offset Operations
// ============================================================================

/// Offset ExPolygons by a given distance in scaled units.
///
/// Positive delta inflates (grows) the polygons, negative delta deflates
/// (shrinks) them.
pub fn offset_expolygons(
    expolygons: &[ExPolygon],
    delta: Coord,
    join_type: OffsetJoinType,
) -> ExPolygons {
    if expolygons.is_empty() {
        return vec![];
    }
    if delta == 0 {
        return union_ex(expolygons);
    }

    let geo_multi = expolygons_to_geo_multi(expolygons);
    let jt = join_type.into();

    let result = geo_multi.offset(unscale(delta), jt, EndType::ClosedPolygon, CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

/// Offset a single ExPolygon by a given distance in scaled units.
pub fn offset_expolygon(
    expolygon: &ExPolygon,
    delta: Coord,
    join_type: OffsetJoinType,
) -> ExPolygons {
    offset_expolygons(std::slice::from_ref(expolygon), delta, join_type)
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Decompose a region set into simple parts-with-holes, one per connected
/// outer contour. Order is unspecified but stable within one call.
pub fn split_into_parts(expolygons: &[ExPolygon]) -> ExPolygons {
    union_ex(expolygons)
}

/// Simplify every ring of a region set: segments shorter than `max_segment`
/// are removed while vertex displacement stays within `max_deviation`.
/// Regions smaller than the deviation budget are dropped entirely.
pub fn simplify_expolygons(
    expolygons: ExPolygons,
    max_segment: Coord,
    max_deviation: Coord,
) -> ExPolygons {
    let simplified = expolygons
        .into_iter()
        .map(|mut expoly| {
            for ring in expoly.all_polygons_mut() {
                ring.simplify(max_segment, max_deviation);
            }
            expoly
        })
        .collect();
    expolygon::remove_small(simplified, max_deviation as CoordF * max_deviation as CoordF)
}

/// Remove micrometre-scale jitter from every ring of a region set. Designed
/// as numerical cleanup after offsets.
pub fn smooth_expolygons(expolygons: ExPolygons, remove_length: Coord) -> ExPolygons {
    expolygons
        .into_iter()
        .map(|mut expoly| {
            for ring in expoly.all_polygons_mut() {
                ring.smooth(remove_length);
            }
            expoly
        })
        .filter(|expoly| !expoly.is_empty())
        .collect()
}
