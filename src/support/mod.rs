//! Tree support generation.
//!
//! Branches are planned top-down: tip nodes are seeded under every overhang,
//! then dropped layer by layer toward the build plate (or onto the model)
//! while nearby branches merge over a minimum spanning tree and every move
//! stays within the slope limit and outside the pre-computed collision
//! volumes. A final pass renders the node sets into per-layer support, roof
//! and floor polygons.
//!
//! Submodules, in pipeline order:
//! - [`volumes`]: collision, avoidance and internal-guide fields per
//!   (branch-radius sample, layer).
//! - [`contact`]: tip seeding on a rotated grid.
//! - [`minimum_spanning_tree`]: branch adjacency within a layer.
//! - [`drop`]: the top-down relaxation itself.
//! - [`draw`]: polygon output.
//!
//! The entry point is [`TreeSupport::generate_support_areas`].

pub mod contact;
pub mod draw;
pub mod drop;
pub mod minimum_spanning_tree;
pub mod volumes;

pub use minimum_spanning_tree::MinimumSpanningTree;
pub use volumes::TreeModelVolumes;

use crate::clipper::{self, OffsetJoinType};
use crate::geometry::{ExPolygon, ExPolygons, Point, Polygon};
use crate::storage::{BuildPlateShape, SliceDataStorage, SupportType, TreeSupportConfig};
use crate::{scale, Coord};
use log::{debug, info};
use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, PI};

/// Slope sentinel used when the branch angle allows unbounded horizontal
/// movement. 10 m; squares of it stay far below integer limits.
pub const MOVE_DISTANCE_UNBOUNDED: Coord = 10_000_000;

/// One branch position on one layer.
///
/// Nodes are identified by their position; the remaining fields are payload
/// that merges field-wise when two branches land on the same spot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Position on the current layer.
    pub position: Point,
    /// Layers since the branch tip.
    pub distance_to_top: usize,
    /// Parity used to rotate the tapered tip square.
    pub skin_direction: bool,
    /// While non-negative this branch still renders into the roof interface;
    /// decremented on every descent.
    pub support_roof_layers_below: i32,
    /// True while a collision-free descending path to the build plate exists
    /// at this node's radius.
    pub to_buildplate: bool,
}

impl Node {
    pub fn new(
        position: Point,
        distance_to_top: usize,
        skin_direction: bool,
        support_roof_layers_below: i32,
        to_buildplate: bool,
    ) -> Self {
        Self {
            position,
            distance_to_top,
            skin_direction,
            support_roof_layers_below,
            to_buildplate,
        }
    }
}

/// The nodes of one layer, keyed by position. The ordered map keeps every
/// downstream traversal deterministic.
pub type NodeLayer = BTreeMap<Point, Node>;

/// Insert a dropped node into a layer, resolving a position collision by
/// folding the payload: `distance_to_top` and `support_roof_layers_below`
/// take the maximum, `skin_direction` and `to_buildplate` keep the first
/// writer.
pub fn insert_dropped_node(layer: &mut NodeLayer, node: Node) {
    match layer.entry(node.position) {
        std::collections::btree_map::Entry::Vacant(slot) => {
            slot.insert(node);
        }
        std::collections::btree_map::Entry::Occupied(mut slot) => {
            let existing = slot.get_mut();
            existing.distance_to_top = existing.distance_to_top.max(node.distance_to_top);
            existing.support_roof_layers_below = existing
                .support_roof_layers_below
                .max(node.support_roof_layers_below);
        }
    }
}

/// Quantities derived once from the configuration and shared by every
/// pipeline stage.
#[derive(Debug, Clone)]
pub struct TreeSupportSettings {
    /// Radius of a branch at full thickness.
    pub branch_radius: Coord,
    /// Layers over which a tip tapers from a point to the full radius; this
    /// produces a 45 degree cone. At least 1.
    pub tip_layers: usize,
    /// Radius scale factor per layer past the tip, producing the configured
    /// widening angle.
    pub diameter_angle_scale_factor: f64,
    /// Largest radius a branch can reach over the whole print; bounds the
    /// collision-volume sampling.
    pub maximum_radius: Coord,
    /// Horizontal slope limit per layer.
    pub maximum_move_distance: Coord,
    /// Step of the branch-radius sampling.
    pub radius_sample_resolution: Coord,
    /// Support stays this many layers below an overhang.
    pub z_distance_top_layers: usize,
    /// Support stays this many layers above the model.
    pub z_distance_bottom_layers: usize,
    /// Roof interface thickness in layers; 0 when roofs are disabled.
    pub support_roof_layers: i32,
    /// Whether branches may terminate on the model.
    pub support_rests_on_model: bool,
    pub xy_distance: Coord,
    pub layer_height: Coord,
    pub line_width: Coord,
    pub wall_count: usize,
    pub support_angle: f64,
    pub branch_distance: Coord,
    pub support_bottom_enable: bool,
    pub support_bottom_height: Coord,
    pub support_interface_skip_height: Coord,
}

impl TreeSupportSettings {
    pub fn new(config: &TreeSupportConfig, layer_count: usize) -> Self {
        let branch_radius = config.support_tree_branch_diameter / 2;
        let layer_height = config.layer_height;

        let diameter_angle_scale_factor = config.support_tree_branch_diameter_angle.sin()
            * layer_height as f64
            / branch_radius as f64;

        let maximum_radius = branch_radius
            + (layer_count as f64 * branch_radius as f64 * diameter_angle_scale_factor) as Coord;

        let maximum_move_distance = if config.support_tree_angle < FRAC_PI_2 {
            (config.support_tree_angle.tan() * layer_height as f64) as Coord
        } else {
            MOVE_DISTANCE_UNBOUNDED
        };

        let z_distance_top_layers =
            (config.support_top_distance as f64 / layer_height as f64).ceil() as usize + 1;
        let z_distance_bottom_layers =
            (config.support_bottom_distance as f64 / layer_height as f64).ceil() as usize;

        let support_roof_layers = if config.support_roof_enable {
            (config.support_roof_height as f64 / layer_height as f64).round() as i32
        } else {
            0
        };

        Self {
            branch_radius,
            tip_layers: ((branch_radius / layer_height) as usize).max(1),
            diameter_angle_scale_factor,
            maximum_radius,
            maximum_move_distance,
            radius_sample_resolution: config.support_tree_collision_resolution.max(1),
            z_distance_top_layers,
            z_distance_bottom_layers,
            support_roof_layers,
            support_rests_on_model: config.support_type == SupportType::Everywhere,
            xy_distance: config.support_xy_distance,
            layer_height,
            line_width: config.support_line_width,
            wall_count: config.support_tree_wall_count,
            support_angle: config.support_angle,
            branch_distance: config.support_tree_branch_distance.max(1),
            support_bottom_enable: config.support_bottom_enable,
            support_bottom_height: config.support_bottom_height,
            support_interface_skip_height: config.support_interface_skip_height,
        }
    }

    /// Radius of a branch at the given distance to its tip: linear taper over
    /// the tip layers, then widening by the diameter angle.
    pub fn branch_radius_at(&self, distance_to_top: usize) -> Coord {
        if distance_to_top > self.tip_layers {
            self.branch_radius
                + (self.branch_radius as f64
                    * distance_to_top as f64
                    * self.diameter_angle_scale_factor) as Coord
        } else {
            (self.branch_radius as f64 * distance_to_top as f64 / self.tip_layers as f64) as Coord
        }
    }
}

/// Tree support generator.
///
/// Holds the machine volume border, which is computed once per run: a 1 m
/// band around the build-plate shape minus the adhesion-shrunk build area,
/// so that unions and offsets treat everything outside the usable plate as
/// forbidden.
#[derive(Debug)]
pub struct TreeSupport {
    machine_volume_border: ExPolygons,
}

impl TreeSupport {
    pub fn new(storage: &SliceDataStorage) -> Self {
        let machine = &storage.machine;

        let actual_border = match machine.machine_shape {
            BuildPlateShape::Elliptic => {
                // Approximate the elliptic plate over the machine bounds.
                const CIRCLE_RESOLUTION: usize = 50;
                let middle = machine.machine_size.center();
                let width = machine.machine_size.width();
                let depth = machine.machine_size.height();
                let mut border = Polygon::new();
                for i in 0..CIRCLE_RESOLUTION {
                    let angle = PI * 2.0 * i as f64 / CIRCLE_RESOLUTION as f64;
                    border.push(Point::new(
                        middle.x + (angle.cos() * width as f64 / 2.0) as Coord,
                        middle.y + (angle.sin() * depth as f64 / 2.0) as Coord,
                    ));
                }
                border
            }
            BuildPlateShape::Rectangular => Polygon::rectangle(
                machine.machine_size.min,
                machine.machine_size.max,
            ),
        };

        // Make sure there is enough room for the platform adhesion around
        // the support.
        let usable = clipper::offset_expolygon(
            &ExPolygon::new(actual_border),
            -machine.adhesion_size(),
            OffsetJoinType::Round,
        );

        // A 1 m band around the print volume; the usable area becomes the
        // band's hole.
        let band = clipper::offset_expolygons(&usable, scale(1000.0), OffsetJoinType::Round);
        let machine_volume_border = clipper::difference(&band, &usable);

        Self {
            machine_volume_border,
        }
    }

    /// The forbidden region outside the usable build area.
    pub fn machine_volume_border(&self) -> &ExPolygons {
        &self.machine_volume_border
    }

    /// Run the whole pipeline and fill the support output slots of the
    /// storage.
    pub fn generate_support_areas(&self, storage: &mut SliceDataStorage) {
        if !storage.tree_support_requested() {
            return;
        }
        let layer_count = storage.layer_count();
        if layer_count == 0 {
            storage.support.generated = true;
            return;
        }

        let settings = TreeSupportSettings::new(&storage.config, layer_count);
        info!(
            "generating tree support: {} layers, {} radius samples",
            layer_count,
            settings.maximum_radius / settings.radius_sample_resolution + 1
        );

        // Areas that have to be avoided, per radius sample and layer.
        let volumes = TreeModelVolumes::build(storage, &self.machine_volume_border, &settings);

        let mut contact_nodes: Vec<NodeLayer> = vec![NodeLayer::new(); layer_count];
        for mesh in &storage.meshes {
            if !(storage.config.support_tree_enable || mesh.support_tree_enable) {
                continue;
            }
            contact::generate_contact_points(mesh, &settings, &volumes, &mut contact_nodes);
        }
        debug!(
            "seeded {} contact nodes",
            contact_nodes.iter().map(|l| l.len()).sum::<usize>()
        );

        // Drop nodes to lower layers.
        drop::drop_nodes(&settings, &volumes, &mut contact_nodes);

        // Generate support areas.
        draw::draw_circles(storage, &settings, &volumes, &contact_nodes);

        storage.support.generated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::expolygon;
    use crate::storage::{AdhesionType, MachineSettings};

    fn storage_with_machine(machine: MachineSettings) -> SliceDataStorage {
        SliceDataStorage::new(machine, TreeSupportConfig::default(), vec![], vec![]).unwrap()
    }

    #[test]
    fn test_insert_dropped_node_merges() {
        let mut layer = NodeLayer::new();
        let position = Point::new(100, 100);

        insert_dropped_node(&mut layer, Node::new(position, 3, true, 2, true));
        insert_dropped_node(&mut layer, Node::new(position, 7, false, -1, false));

        let merged = &layer[&position];
        assert_eq!(merged.distance_to_top, 7);
        assert_eq!(merged.support_roof_layers_below, 2);
        // First writer wins for the non-folded fields.
        assert!(merged.skin_direction);
        assert!(merged.to_buildplate);
        assert_eq!(layer.len(), 1);
    }

    #[test]
    fn test_settings_move_distance() {
        let mut config = TreeSupportConfig {
            support_tree_angle: 45.0_f64.to_radians(),
            layer_height: scale(0.2),
            ..Default::default()
        };
        let settings = TreeSupportSettings::new(&config, 100);
        assert!((settings.maximum_move_distance - scale(0.2)).abs() <= 1);

        config.support_tree_angle = FRAC_PI_2;
        let settings = TreeSupportSettings::new(&config, 100);
        assert_eq!(settings.maximum_move_distance, MOVE_DISTANCE_UNBOUNDED);
    }

    #[test]
    fn test_branch_radius_taper() {
        let config = TreeSupportConfig {
            support_tree_branch_diameter: scale(2.0),
            layer_height: scale(0.2),
            ..Default::default()
        };
        let settings = TreeSupportSettings::new(&config, 100);
        assert_eq!(settings.tip_layers, 5);

        // Inside the tip: linear growth.
        assert_eq!(settings.branch_radius_at(0), 0);
        assert_eq!(settings.branch_radius_at(5), scale(1.0));
        // Past the tip: widening.
        assert!(settings.branch_radius_at(50) > scale(1.0));
    }

    #[test]
    fn test_machine_border_rectangular() {
        let storage = storage_with_machine(MachineSettings::default());
        let tree = TreeSupport::new(&storage);
        let border = tree.machine_volume_border();

        assert!(!border.is_empty());
        // The middle of the plate is usable.
        let middle = storage.machine.machine_size.center();
        assert!(!expolygon::contains(border, &middle, false));
        // Outside the plate is forbidden.
        assert!(expolygon::contains(
            border,
            &(storage.machine.machine_size.max + Point::new(scale(10.0), 0)),
            false
        ));
    }

    #[test]
    fn test_machine_border_respects_adhesion() {
        let machine = MachineSettings {
            adhesion_type: AdhesionType::Raft,
            raft_margin: scale(15.0),
            ..Default::default()
        };
        let storage = storage_with_machine(machine);
        let tree = TreeSupport::new(&storage);
        let border = tree.machine_volume_border();

        // A point within the raft margin of the plate edge is forbidden.
        let near_edge = Point::new(
            storage.machine.machine_size.max.x - scale(5.0),
            storage.machine.machine_size.center().y,
        );
        assert!(expolygon::contains(border, &near_edge, false));
    }

    #[test]
    fn test_machine_border_elliptic() {
        let machine = MachineSettings {
            machine_shape: BuildPlateShape::Elliptic,
            ..Default::default()
        };
        let storage = storage_with_machine(machine);
        let tree = TreeSupport::new(&storage);
        let border = tree.machine_volume_border();

        // The rectangular corner lies outside the ellipse.
        let corner = storage.machine.machine_size.max - Point::new(scale(2.0), scale(2.0));
        assert!(expolygon::contains(border, &corner, false));
        // The centre is usable.
        assert!(!expolygon::contains(
            border,
            &storage.machine.machine_size.center(),
            false
        ));
    }
}
