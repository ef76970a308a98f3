//! Point-movement helpers over region sets.
//!
//! The node dropper steers branch positions with three primitives: pull a
//! candidate into an overhang part, push a tentative position out of an
//! avoidance area, and nudge a model-resting branch deeper into the internal
//! guide. All of them are no-ops when the point already satisfies the
//! condition, and all of them refuse moves beyond a squared distance budget
//! so the slope limit cannot be violated by geometry cleanup.

use super::expolygon::{self, ExPolygon};
use super::Point;
use crate::Coord;

/// The closest point on a region-set boundary, together with the edge that
/// hosts it and the index of the hosting part.
#[derive(Debug, Clone, Copy)]
pub struct ClosestPolygonPoint {
    pub location: Point,
    pub segment_start: Point,
    pub segment_end: Point,
    pub part_index: usize,
}

impl ClosestPolygonPoint {
    /// Unit normal of the hosting edge, scaled to `length`. Returns the zero
    /// vector for a degenerate edge.
    fn edge_normal(&self, length: Coord) -> Point {
        let seg = self.segment_end - self.segment_start;
        Point::new(-seg.y, seg.x).normalized_to(length)
    }
}

/// Find the closest boundary point of a region set. Hole borders count as
/// boundary. Returns `None` when the set has no edges.
pub fn find_closest(p: Point, parts: &[ExPolygon]) -> Option<ClosestPolygonPoint> {
    let mut best: Option<ClosestPolygonPoint> = None;
    let mut best_dist = i128::MAX;

    for (part_index, part) in parts.iter().enumerate() {
        for ring in part.all_polygons() {
            if ring.len() < 2 {
                continue;
            }
            let Some((location, edge)) = ring.closest_point_with_edge(&p) else {
                continue;
            };
            let dist = p.distance_squared(&location);
            if dist < best_dist {
                best_dist = dist;
                best = Some(ClosestPolygonPoint {
                    location,
                    segment_start: ring.points()[edge],
                    segment_end: ring.point_at(edge + 1),
                    part_index,
                });
            }
        }
    }

    best
}

/// Move `p` onto (or into) a single region.
///
/// With `preferred_dist_inside == 0` the point is pulled to the nearest
/// boundary point when outside; a point already inside is left alone. With a
/// positive distance the point is placed that far inside the region. The
/// move is only applied when its squared length stays within `max_dist2`.
pub fn move_inside(
    part: &ExPolygon,
    p: &mut Point,
    preferred_dist_inside: Coord,
    max_dist2: i128,
) -> bool {
    if part.inside(p, true) && preferred_dist_inside == 0 {
        return true;
    }

    let parts = std::slice::from_ref(part);
    let closest = match find_closest(*p, parts) {
        Some(c) => c,
        None => return false,
    };

    let candidate = if preferred_dist_inside == 0 {
        Some(closest.location)
    } else {
        pick_candidate(parts, &closest, preferred_dist_inside, true)
    };

    match candidate {
        Some(candidate) if p.distance_squared(&candidate) <= max_dist2 => {
            *p = candidate;
            true
        }
        _ => false,
    }
}

/// Move `p` out of a region set, to `preferred_dist_outside` beyond the
/// nearest boundary. A point already outside is left alone. The move is only
/// applied when its squared length stays within `max_dist2`.
pub fn move_outside(
    region: &[ExPolygon],
    p: &mut Point,
    preferred_dist_outside: Coord,
    max_dist2: i128,
) -> bool {
    if !expolygon::contains(region, p, false) {
        return true;
    }

    let closest = match find_closest(*p, region) {
        Some(c) => c,
        None => return true,
    };

    match pick_candidate(region, &closest, preferred_dist_outside, false) {
        Some(candidate) if p.distance_squared(&candidate) <= max_dist2 => {
            *p = candidate;
            true
        }
        _ => false,
    }
}

/// Place `p` at `preferred_dist_inside` inside a region set, measured from a
/// previously computed closest boundary point. Used to walk model-resting
/// branches toward the interior; the caller clamps the resulting
/// displacement to the slope limit.
pub fn ensure_inside(
    region: &[ExPolygon],
    p: &mut Point,
    closest: &ClosestPolygonPoint,
    preferred_dist_inside: Coord,
) -> bool {
    match pick_candidate(region, closest, preferred_dist_inside, true) {
        Some(candidate) => {
            *p = candidate;
            true
        }
        None => false,
    }
}

/// Offset the closest boundary point along the hosting edge's normal, picking
/// the side that lands inside (or outside) the region.
fn pick_candidate(
    region: &[ExPolygon],
    closest: &ClosestPolygonPoint,
    distance: Coord,
    want_inside: bool,
) -> Option<Point> {
    let normal = closest.edge_normal(distance.max(1));
    if normal == Point::zero() {
        return None;
    }

    let candidates = [closest.location + normal, closest.location - normal];
    candidates
        .into_iter()
        .find(|c| expolygon::contains(region, c, false) == want_inside)
}
