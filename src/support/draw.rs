//! Rendering node sets into per-layer support areas.
//!
//! Every node becomes one cross-section shape: inside the tip the template
//! circle is morphed into a 45-degree square whose orientation alternates
//! with the node's skin direction, past the tip it widens with the diameter
//! angle. Shapes land in the roof channel while the node's roof counter is
//! non-negative and in the plain support channel afterwards. The model below
//! is subtracted back out at the bottom Z distance, floors are sampled from
//! the outlines underneath, and each remaining connected part becomes one
//! infill part. Layers render in parallel; the only shared scalar is the
//! max-filled-layer counter.

use super::{NodeLayer, TreeModelVolumes, TreeSupportSettings};
use crate::clipper::{self, OffsetJoinType};
use crate::geometry::{ExPolygon, ExPolygons, Point, Polygon};
use crate::storage::{SliceDataStorage, SupportInfillPart, SupportLayer};
use crate::Coord;
use rayon::prelude::*;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicI32, Ordering};

/// Vertices of the branch cross-section template.
const CIRCLE_RESOLUTION: usize = 10;

/// Render all contact-node layers into the storage's support output slots.
pub fn draw_circles(
    storage: &mut SliceDataStorage,
    settings: &TreeSupportSettings,
    volumes: &TreeModelVolumes,
    contact_nodes: &[NodeLayer],
) {
    let branch_radius = settings.branch_radius;

    // Pre-generate a circle with the correct diameter so the (co)sines are
    // not recomputed for every node.
    let mut branch_circle = Polygon::new();
    for i in 0..CIRCLE_RESOLUTION {
        let angle = i as f64 / CIRCLE_RESOLUTION as f64 * 2.0 * PI;
        branch_circle.push(Point::new(
            (angle.cos() * branch_radius as f64) as Coord,
            (angle.sin() * branch_radius as f64) as Coord,
        ));
    }
    // Side length of the regular template polygon.
    let circle_side_length =
        (2.0 * branch_radius as f64 * (PI / CIRCLE_RESOLUTION as f64).sin()) as Coord;

    let layer_count = contact_nodes.len();
    let max_filled_layer = AtomicI32::new(storage.support.layer_nr_max_filled_layer);

    let layers: Vec<SupportLayer> = {
        let storage_ref: &SliceDataStorage = storage;
        (0..layer_count)
            .into_par_iter()
            .map(|layer_nr| {
                render_layer(
                    storage_ref,
                    settings,
                    volumes,
                    &contact_nodes[layer_nr],
                    layer_nr,
                    layer_count,
                    &branch_circle,
                    circle_side_length,
                    &max_filled_layer,
                )
            })
            .collect()
    };

    storage.support.layers = layers;
    storage.support.layer_nr_max_filled_layer = max_filled_layer.load(Ordering::SeqCst);
}

#[allow(clippy::too_many_arguments)]
fn render_layer(
    storage: &SliceDataStorage,
    settings: &TreeSupportSettings,
    volumes: &TreeModelVolumes,
    nodes: &NodeLayer,
    layer_nr: usize,
    layer_count: usize,
    branch_circle: &Polygon,
    circle_side_length: Coord,
    max_filled_layer: &AtomicI32,
) -> SupportLayer {
    let mut support_circles: ExPolygons = Vec::new();
    let mut roof_circles: ExPolygons = Vec::new();

    // Draw the support areas, adding roofs to the roof channel instead of
    // the normal areas.
    for node in nodes.values() {
        let mut circle = Polygon::new();
        let scale_factor = (node.distance_to_top + 1) as f64 / settings.tip_layers as f64;
        for corner in branch_circle.points() {
            let corner = if node.distance_to_top < settings.tip_layers {
                // We're in the tip: morph the circle toward a 45-degree
                // square whose orientation alternates with the skin
                // direction. The two transforms are intentionally not
                // mirror images of each other.
                let x = corner.x as f64;
                let y = corner.y as f64;
                let half_scale = scale_factor / 2.0;
                if node.skin_direction {
                    Point::new(
                        (x * (0.5 + half_scale) + y * (0.5 - half_scale)) as Coord,
                        (x * (0.5 - half_scale) + y * (0.5 + half_scale)) as Coord,
                    )
                } else {
                    Point::new(
                        (x * (0.5 + half_scale) - y * (0.5 - half_scale)) as Coord,
                        (x * (-0.5 + half_scale) + y * (0.5 + half_scale)) as Coord,
                    )
                }
            } else {
                let widen = 1.0
                    + (node.distance_to_top - settings.tip_layers) as f64
                        * settings.diameter_angle_scale_factor;
                Point::new(
                    (corner.x as f64 * widen) as Coord,
                    (corner.y as f64 * widen) as Coord,
                )
            };
            circle.push(node.position + corner);
        }

        let shape = ExPolygon::new(circle);
        if node.support_roof_layers_below >= 0 {
            roof_circles.push(shape);
        } else {
            support_circles.push(shape);
        }
    }

    let mut support_layer = clipper::union_ex(&support_circles);
    let mut roof_layer = clipper::union_ex(&roof_circles);
    support_layer = clipper::difference(&support_layer, &roof_layer);

    // Subtract the model itself to keep the bottom Z distance; sample 0 has
    // zero branch radius but the proper X/Y clearance.
    let z_collision_layer =
        (layer_nr as i64 - settings.z_distance_bottom_layers as i64 + 1).max(0) as usize;
    if volumes.layer_count() > z_collision_layer {
        let collision = volumes.collision(0, z_collision_layer);
        support_layer = clipper::difference(&support_layer, collision);
        roof_layer = clipper::difference(&roof_layer, collision);
    }

    // Smooth the support as much as possible without altering single
    // circles: any segment shorter than the side length of the widest
    // circle this layer can carry is removed. The roof keeps its accuracy.
    let max_scale_factor = ((layer_count as f64 - layer_nr as f64 - settings.tip_layers as f64)
        * settings.diameter_angle_scale_factor)
        .max(0.0);
    support_layer = clipper::simplify_expolygons(
        support_layer,
        (circle_side_length as f64 * (1.0 + max_scale_factor)) as Coord,
        // Deviate at most a quarter of a line so the lines still stack.
        settings.line_width / 4,
    );

    // Subtract support floors.
    let mut floor_layer: ExPolygons = Vec::new();
    if settings.support_bottom_enable {
        let layer_height = settings.layer_height as f64;
        let skip_layers = ((settings.support_interface_skip_height as f64 / layer_height).ceil()
            as usize)
            .max(1);
        let bottom_height_layers =
            (settings.support_bottom_height as f64 / layer_height).ceil() as usize;

        let mut sample_offsets: Vec<usize> =
            (0..bottom_height_layers).step_by(skip_layers).collect();
        // One additional sample at the complete bottom height.
        sample_offsets.push(bottom_height_layers);

        for layers_below in sample_offsets {
            let sample_layer = (layer_nr as i64
                - layers_below as i64
                - settings.z_distance_bottom_layers as i64)
                .max(0) as usize;
            let outlines = storage.layer_outlines(sample_layer, false);
            floor_layer.extend(clipper::intersection(&support_layer, &outlines));
        }
        floor_layer = clipper::union_ex(&floor_layer);
        // Subtract the floor from the normal support.
        support_layer = clipper::difference(
            &support_layer,
            &clipper::offset_expolygons(&floor_layer, 10, OffsetJoinType::Round),
        );
    }

    // Every connected part becomes one support part.
    let support_infill_parts: Vec<SupportInfillPart> = support_layer
        .into_iter()
        .map(|outline| SupportInfillPart {
            outline,
            line_width: settings.line_width,
            wall_count: settings.wall_count,
        })
        .collect();

    if !support_infill_parts.is_empty() || !roof_layer.is_empty() {
        max_filled_layer.fetch_max(layer_nr as i32, Ordering::SeqCst);
    }

    SupportLayer {
        support_infill_parts,
        support_roof: roof_layer,
        support_bottom: floor_layer,
    }
}
