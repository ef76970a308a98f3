//! Contact-point seeding.
//!
//! Tips are placed on a grid rotated by 22 degrees about the corner of the
//! mesh bounding box; the rotation supports diagonal overhang edges better
//! than an axis-aligned grid. Candidates are pulled into each overhang part
//! by up to half an overhang step so constant surfaces whose grid points
//! fall between overhang areas still get caught. An overhang part that
//! catches no candidate at all receives one fallback node at its
//! moved-inside bounding-box centre, so small features are not silently
//! dropped.

use super::{insert_dropped_node, Node, NodeLayer, TreeModelVolumes, TreeSupportSettings};
use crate::geometry::{expolygon, polygon_utils, BoundingBox, Point};
use crate::storage::MeshStorage;
use crate::Coord;
use std::f64::consts::PI;

/// Grid rotation; an empirical angle that supports diagonal overhangs well.
const ROTATE_ANGLE: f64 = 22.0 / 180.0 * PI;

/// Seed tip nodes for one mesh into the contact-node layers.
pub fn generate_contact_points(
    mesh: &MeshStorage,
    settings: &TreeSupportSettings,
    volumes: &TreeModelVolumes,
    contact_nodes: &mut [NodeLayer],
) {
    if !mesh.bounding_box.is_defined() {
        return;
    }
    let grid_points = generate_grid_points(&mesh.bounding_box, settings.branch_distance);

    let z_distance_top_layers = settings.z_distance_top_layers;
    let half_overhang_distance =
        (settings.support_angle.tan() * settings.layer_height as f64 / 2.0) as Coord;
    let half_overhang_distance_sq =
        half_overhang_distance as i128 * half_overhang_distance as i128;

    let layer_limit = mesh
        .overhang_areas
        .len()
        .min(contact_nodes.len())
        .saturating_sub(z_distance_top_layers);

    for layer_nr in 1..layer_limit {
        // Support must stay z_distance_top below the overhang it supports.
        let overhang = &mesh.overhang_areas[layer_nr + z_distance_top_layers];
        if overhang.is_empty() {
            continue;
        }

        for overhang_part in overhang {
            // Allow candidates within half an overhang step of the part.
            let overhang_bounds = overhang_part
                .bounding_box()
                .expanded(half_overhang_distance);
            let mut added = false;

            for candidate in &grid_points {
                if !overhang_bounds.contains_point(candidate) {
                    continue;
                }
                let mut candidate = *candidate;
                polygon_utils::move_inside(
                    overhang_part,
                    &mut candidate,
                    0,
                    half_overhang_distance_sq,
                );
                let collides = expolygon::contains(
                    volumes.collision(0, layer_nr),
                    &candidate,
                    true,
                );
                if overhang_part.inside(&candidate, true) && !collides {
                    let contact_node = Node::new(
                        candidate,
                        0,
                        (layer_nr + z_distance_top_layers) % 2 == 1,
                        settings.support_roof_layers,
                        true,
                    );
                    insert_dropped_node(&mut contact_nodes[layer_nr], contact_node);
                    added = true;
                }
            }

            if !added {
                // The grid missed this part entirely; support it anyway.
                let mut candidate = overhang_part.bounding_box().center();
                polygon_utils::move_inside(overhang_part, &mut candidate, 0, i128::MAX);
                let contact_node = Node::new(
                    candidate,
                    0,
                    layer_nr % 2 == 1,
                    settings.support_roof_layers,
                    true,
                );
                insert_dropped_node(&mut contact_nodes[layer_nr], contact_node);
            }
        }
    }
}

/// Generate grid candidates covering the whole mesh footprint.
///
/// The grid is laid out axis-aligned over the bounding box of the mesh box
/// rotated by -22 degrees, then rotated back; rotation pivots on the lower
/// left corner of the original bounding box.
fn generate_grid_points(bounding_box: &BoundingBox, point_spread: Coord) -> Vec<Point> {
    let size = bounding_box.size();

    let mut rotated_bounding_box = BoundingBox::new();
    rotated_bounding_box.merge_point(Point::zero());
    rotated_bounding_box.merge_point(size.rotate(-ROTATE_ANGLE));
    rotated_bounding_box.merge_point(Point::new(0, size.y).rotate(-ROTATE_ANGLE));
    rotated_bounding_box.merge_point(Point::new(size.x, 0).rotate(-ROTATE_ANGLE));

    let mut unrotated_bounding_box = BoundingBox::new();
    unrotated_bounding_box.merge_point(rotated_bounding_box.min.rotate(ROTATE_ANGLE));
    unrotated_bounding_box.merge_point(rotated_bounding_box.max.rotate(ROTATE_ANGLE));
    unrotated_bounding_box.merge_point(
        Point::new(rotated_bounding_box.min.x, rotated_bounding_box.max.y).rotate(ROTATE_ANGLE),
    );
    unrotated_bounding_box.merge_point(
        Point::new(rotated_bounding_box.max.x, rotated_bounding_box.min.y).rotate(ROTATE_ANGLE),
    );

    let mut grid_points = Vec::new();
    let mut x = unrotated_bounding_box.min.x;
    while x <= unrotated_bounding_box.max.x {
        let mut y = unrotated_bounding_box.min.y;
        while y <= unrotated_bounding_box.max.y {
            // Make the points absolute again by adding the position of the
            // lower left corner of the original bounding box.
            grid_points.push(Point::new(x, y).rotate(ROTATE_ANGLE) + bounding_box.min);
            y += point_spread;
        }
        x += point_spread;
    }

    grid_points
}
