//! Top-down node dropping.
//!
//! Layers are processed from the top down; layer 0 is never relaxed because
//! its nodes are the final feet. Within a layer the nodes are bucketed:
//! bucket 0 heads for the build plate, every other bucket belongs to one
//! connected part of the radius-0 avoidance area and rests on the model. A
//! minimum spanning tree per bucket drives two passes: the first merges
//! dyads that are about to collapse into each other and absorbs close
//! neighbours of interior nodes, the second moves every survivor toward the
//! average of its neighbours, clamped to the slope limit. Every tentative
//! position is then reconciled against the volumes for the radius the branch
//! will have one layer further down, and plate reachability is recomputed.

use super::{
    insert_dropped_node, MinimumSpanningTree, Node, NodeLayer, TreeModelVolumes,
    TreeSupportSettings,
};
use crate::clipper;
use crate::geometry::{expolygon, polygon_utils, Point};
use crate::Coord;
use std::collections::BTreeSet;

/// Drop the nodes of every layer down to the layer below it.
pub fn drop_nodes(
    settings: &TreeSupportSettings,
    volumes: &TreeModelVolumes,
    contact_nodes: &mut Vec<NodeLayer>,
) {
    let max_move = settings.maximum_move_distance;
    let max_move_sq = max_move as i128 * max_move as i128;

    // Skip layer 0, since we can't drop down the vertices there.
    for layer_nr in (1..contact_nodes.len()).rev() {
        // Group together all nodes for each part.
        let parts = clipper::split_into_parts(volumes.avoidance(0, layer_nr));
        let mut nodes_per_part: Vec<NodeLayer> = vec![NodeLayer::new(); parts.len() + 1];

        for node in contact_nodes[layer_nr].values() {
            if !settings.support_rests_on_model && !node.to_buildplate {
                // Can't rest on model and unable to reach the build plate.
                // Drop the node and leave that spot unsupported.
                continue;
            }
            if node.to_buildplate || parts.is_empty() {
                // It's outside, so make it go towards the build plate.
                nodes_per_part[0].insert(node.position, node.clone());
                continue;
            }
            // Find which part this node rests on. The node has a radius and
            // the avoidance parts are offset by that radius, so the set of
            // parts can differ per node; the closest part is good enough,
            // and an inside hit settles it immediately.
            let mut closest_part_distance2 = i128::MAX;
            let mut closest_part = 0usize;
            for (part_index, part) in parts.iter().enumerate() {
                if part.inside(&node.position, true) {
                    closest_part = part_index;
                    break;
                }
                if let Some(closest_point) =
                    polygon_utils::find_closest(node.position, std::slice::from_ref(part))
                {
                    let distance2 = node.position.distance_squared(&closest_point.location);
                    if distance2 < closest_part_distance2 {
                        closest_part_distance2 = distance2;
                        closest_part = part_index;
                    }
                }
            }
            // Index 0 is reserved for the outside group.
            nodes_per_part[closest_part + 1].insert(node.position, node.clone());
        }

        // A spanning tree for every group.
        let spanning_trees: Vec<MinimumSpanningTree> = nodes_per_part
            .iter()
            .map(|group| {
                let points: Vec<Point> = group.keys().copied().collect();
                MinimumSpanningTree::new(&points)
            })
            .collect();

        for (group_index, mst) in spanning_trees.iter().enumerate() {
            let positions: Vec<Point> = nodes_per_part[group_index].keys().copied().collect();
            let mut to_delete: BTreeSet<Point> = BTreeSet::new();

            // First pass: merge nodes that are about to collapse into each
            // other.
            for position in &positions {
                if to_delete.contains(position) {
                    continue;
                }
                let node = nodes_per_part[group_index][position].clone();
                let neighbours = mst.adjacent_nodes(*position);

                if neighbours.len() == 1
                    && neighbours[0].distance_squared(position) < max_move_sq
                    && mst.adjacent_nodes(neighbours[0]).len() == 1
                {
                    // We have just two nodes left, and they're very close.
                    // Insert a completely new node halfway and let both
                    // originals fade.
                    let neighbour_node = nodes_per_part[group_index][&neighbours[0]].clone();
                    let distance_to_top =
                        node.distance_to_top.max(neighbour_node.distance_to_top);
                    let support_roof_layers_below = node
                        .support_roof_layers_below
                        .max(neighbour_node.support_roof_layers_below);

                    let next_position = (*position + neighbours[0]) / 2;
                    let (next_position, to_buildplate) = reconcile(
                        settings,
                        volumes,
                        group_index,
                        layer_nr,
                        node.position,
                        distance_to_top,
                        next_position,
                    );

                    insert_dropped_node(
                        &mut contact_nodes[layer_nr - 1],
                        Node::new(
                            next_position,
                            distance_to_top + 1,
                            node.skin_direction,
                            support_roof_layers_below - 1,
                            to_buildplate,
                        ),
                    );
                    to_delete.insert(*position);
                    to_delete.insert(neighbours[0]);
                } else if neighbours.len() > 1 {
                    // Absorb all neighbours that are too close into this
                    // node. Leaf nodes are never merged this way: merging
                    // them would incur movement greater than the maximum
                    // move distance.
                    for neighbour in neighbours {
                        if neighbour.distance_squared(position) >= max_move_sq {
                            continue;
                        }
                        if to_delete.contains(neighbour) {
                            continue;
                        }
                        let neighbour_node = nodes_per_part[group_index][neighbour].clone();
                        if let Some(absorber) = nodes_per_part[group_index].get_mut(position) {
                            absorber.distance_to_top = absorber
                                .distance_to_top
                                .max(neighbour_node.distance_to_top);
                            absorber.support_roof_layers_below = absorber
                                .support_roof_layers_below
                                .max(neighbour_node.support_roof_layers_below);
                        }
                        to_delete.insert(*neighbour);
                    }
                }
            }

            // Second pass: move the surviving nodes along their neighbours
            // and drop them to the layer below.
            for position in &positions {
                if to_delete.contains(position) {
                    continue;
                }
                let node = nodes_per_part[group_index][position].clone();

                if group_index > 0
                    && expolygon::contains(volumes.collision(0, layer_nr), position, false)
                {
                    // The branch is inside the model. If the X/Y offset
                    // would remove all of it, stop it here.
                    let branch_radius_node = settings.branch_radius_at(node.distance_to_top);
                    if let Some(to_outside) =
                        polygon_utils::find_closest(*position, volumes.collision(0, layer_nr))
                    {
                        let inside_dist2 = position.distance_squared(&to_outside.location);
                        if inside_dist2
                            >= branch_radius_node as i128 * branch_radius_node as i128
                        {
                            continue; // Too far inside.
                        }
                    }
                }

                let mut next_layer_vertex = *position;
                let neighbours = mst.adjacent_nodes(*position);
                if neighbours.len() > 1
                    || (neighbours.len() == 1
                        && neighbours[0].distance_squared(position) >= max_move_sq)
                {
                    // Move towards the average position of all neighbours.
                    // A leaf whose sole neighbour is close is left where it
                    // is; the first pass owns that case.
                    let mut sum_direction = Point::zero();
                    for neighbour in neighbours {
                        sum_direction += *neighbour - *position;
                    }
                    if sum_direction.length_squared() <= max_move_sq {
                        next_layer_vertex += sum_direction;
                    } else {
                        next_layer_vertex += sum_direction.normalized_to(max_move);
                    }
                }

                let (next_layer_vertex, to_buildplate) = reconcile(
                    settings,
                    volumes,
                    group_index,
                    layer_nr,
                    node.position,
                    node.distance_to_top,
                    next_layer_vertex,
                );

                insert_dropped_node(
                    &mut contact_nodes[layer_nr - 1],
                    Node::new(
                        next_layer_vertex,
                        node.distance_to_top + 1,
                        node.skin_direction,
                        node.support_roof_layers_below - 1,
                        to_buildplate,
                    ),
                );
            }
        }
    }
}

/// Fit a tentative position to the volumes of the layer below, at the radius
/// the branch will have there, and recompute plate reachability.
///
/// Build-plate branches are pushed out of the avoidance area; model-resting
/// branches are nudged deeper into the internal guide, clamped to one slope
/// step of total displacement. The +100 micron allowances absorb the
/// rounding of the radius sampling.
fn reconcile(
    settings: &TreeSupportSettings,
    volumes: &TreeModelVolumes,
    group_index: usize,
    layer_nr: usize,
    origin: Point,
    distance_to_top: usize,
    mut next_position: Point,
) -> (Point, bool) {
    let branch_radius_node = settings.branch_radius_at(distance_to_top + 1);
    let radius_sample = volumes.sample_for_radius(branch_radius_node);
    let resolution = settings.radius_sample_resolution;

    if group_index == 0 {
        // Avoid collisions.
        let maximum_move_between_samples = settings.maximum_move_distance + resolution + 100;
        polygon_utils::move_outside(
            volumes.avoidance(radius_sample, layer_nr - 1),
            &mut next_position,
            resolution + 100,
            maximum_move_between_samples as i128 * maximum_move_between_samples as i128,
        );
    } else {
        // Move towards the centre of the polygon.
        let internal_guide = volumes.internal_guide(radius_sample, layer_nr - 1);
        if let Some(closest_point_on_border) =
            polygon_utils::find_closest(next_position, internal_guide)
        {
            let distance = origin.distance(&closest_point_on_border.location) as Coord;
            // Try moving a bit further inside: current distance + 1 step.
            let mut moved_inside = next_position;
            polygon_utils::ensure_inside(
                internal_guide,
                &mut moved_inside,
                &closest_point_on_border,
                distance + settings.maximum_move_distance,
            );
            let mut difference = moved_inside - origin;
            let max_move_sq = settings.maximum_move_distance as i128
                * settings.maximum_move_distance as i128;
            if difference.length_squared() > max_move_sq {
                difference = difference.normalized_to(settings.maximum_move_distance);
            }
            next_position = origin + difference;
        }
    }

    let to_buildplate = !expolygon::contains(
        volumes.avoidance(radius_sample, layer_nr - 1),
        &next_position,
        false,
    );
    (next_position, to_buildplate)
}
