//! Sliced-model storage and configuration consumed by the support generator.
//!
//! The generator does not slice meshes or detect overhangs itself; it reads
//! per-layer outlines and overhang areas from a [`SliceDataStorage`] and
//! writes per-layer support geometry back into it. Configuration values use
//! semantic names: lengths are scaled units (micrometres), angles radians.

use crate::geometry::{BoundingBox, ExPolygon, ExPolygons};
use crate::{scale, Coord};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shape of the build plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BuildPlateShape {
    #[default]
    Rectangular,
    Elliptic,
}

/// Where support may rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SupportType {
    /// Support may only stand on the build plate.
    BuildplateOnly,
    /// Support may also rest on top of the model.
    #[default]
    Everywhere,
}

/// Platform adhesion method; determines how much plate margin the support
/// must keep clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdhesionType {
    #[default]
    None,
    Skirt,
    Brim,
    Raft,
}

impl AdhesionType {
    /// Resolve an adhesion type from its configuration name. Unknown names
    /// are assumed to need no adhesion margin.
    pub fn from_name(name: &str) -> Self {
        match name {
            "none" => Self::None,
            "skirt" => Self::Skirt,
            "brim" => Self::Brim,
            "raft" => Self::Raft,
            other => {
                warn!("unknown adhesion type \"{other}\", assuming no adhesion margin");
                Self::None
            }
        }
    }
}

/// Machine-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineSettings {
    /// Printable area of the build plate.
    pub machine_size: BoundingBox,
    pub machine_shape: BuildPlateShape,
    pub adhesion_type: AdhesionType,
    /// Line width shared by skirt and brim.
    pub skirt_brim_line_width: Coord,
    pub brim_line_count: usize,
    pub skirt_line_count: usize,
    /// Gap between the model and the skirt.
    pub skirt_gap: Coord,
    /// Margin claimed by a raft around the model.
    pub raft_margin: Coord,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            machine_size: BoundingBox::from_min_max(
                crate::geometry::Point::zero(),
                crate::geometry::Point::new(scale(220.0), scale(220.0)),
            ),
            machine_shape: BuildPlateShape::Rectangular,
            adhesion_type: AdhesionType::None,
            skirt_brim_line_width: scale(0.4),
            brim_line_count: 8,
            skirt_line_count: 1,
            skirt_gap: scale(3.0),
            raft_margin: scale(15.0),
        }
    }
}

impl MachineSettings {
    /// Plate margin consumed by the configured adhesion method.
    pub fn adhesion_size(&self) -> Coord {
        match self.adhesion_type {
            AdhesionType::None => 0,
            AdhesionType::Brim => self.skirt_brim_line_width * self.brim_line_count as Coord,
            AdhesionType::Raft => self.raft_margin,
            AdhesionType::Skirt => {
                self.skirt_gap + self.skirt_brim_line_width * self.skirt_line_count as Coord
            }
        }
    }
}

/// Tree support configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSupportConfig {
    /// Master switch; a per-mesh switch exists on [`MeshStorage`].
    pub support_tree_enable: bool,
    /// Diameter of a branch at full thickness.
    pub support_tree_branch_diameter: Coord,
    /// Widening of a branch per layer of distance to its tip (radians).
    pub support_tree_branch_diameter_angle: f64,
    /// Spacing of the contact-point grid.
    pub support_tree_branch_distance: Coord,
    /// Maximum slope a branch may take while descending (radians).
    pub support_tree_angle: f64,
    /// Step of the branch-radius sampling of the collision volumes.
    pub support_tree_collision_resolution: Coord,
    /// Wall line count of rendered support parts.
    pub support_tree_wall_count: usize,
    /// Horizontal clearance kept between support and model.
    pub support_xy_distance: Coord,
    /// Vertical clearance below overhangs.
    pub support_top_distance: Coord,
    /// Vertical clearance above the model.
    pub support_bottom_distance: Coord,
    pub support_line_width: Coord,
    /// Overhang threshold angle (radians); sets the contact-grid snap range.
    pub support_angle: f64,
    pub support_roof_enable: bool,
    pub support_roof_height: Coord,
    pub support_bottom_enable: bool,
    pub support_bottom_height: Coord,
    /// Sampling stride used when collecting floor areas.
    pub support_interface_skip_height: Coord,
    pub support_type: SupportType,
    pub layer_height: Coord,
}

impl Default for TreeSupportConfig {
    fn default() -> Self {
        Self {
            support_tree_enable: true,
            support_tree_branch_diameter: scale(2.0),
            support_tree_branch_diameter_angle: 5.0_f64.to_radians(),
            support_tree_branch_distance: scale(1.0),
            support_tree_angle: 40.0_f64.to_radians(),
            support_tree_collision_resolution: scale(0.5),
            support_tree_wall_count: 1,
            support_xy_distance: scale(0.7),
            support_top_distance: scale(0.1),
            support_bottom_distance: scale(0.1),
            support_line_width: scale(0.4),
            support_angle: 50.0_f64.to_radians(),
            support_roof_enable: true,
            support_roof_height: scale(1.0),
            support_bottom_enable: false,
            support_bottom_height: scale(1.0),
            support_interface_skip_height: scale(0.3),
            support_type: SupportType::Everywhere,
            layer_height: scale(0.2),
        }
    }
}

/// One mesh of the sliced scene, as far as support generation cares.
#[derive(Debug, Clone, Default)]
pub struct MeshStorage {
    /// Flattened 2D bounding box of the mesh.
    pub bounding_box: BoundingBox,
    /// Per-layer overhang areas (regions not supported by the layer below).
    pub overhang_areas: Vec<ExPolygons>,
    /// Per-mesh tree support switch.
    pub support_tree_enable: bool,
}

/// A connected support area with its print parameters.
#[derive(Debug, Clone)]
pub struct SupportInfillPart {
    pub outline: ExPolygon,
    pub line_width: Coord,
    pub wall_count: usize,
}

/// Support output of one layer.
#[derive(Debug, Clone, Default)]
pub struct SupportLayer {
    pub support_infill_parts: Vec<SupportInfillPart>,
    pub support_roof: ExPolygons,
    pub support_bottom: ExPolygons,
}

/// Support output of the whole print.
#[derive(Debug, Clone, Default)]
pub struct SupportStorage {
    pub layers: Vec<SupportLayer>,
    /// Highest layer carrying any support geometry, -1 when none.
    pub layer_nr_max_filled_layer: i32,
    pub generated: bool,
}

/// Everything the support generator reads and writes.
#[derive(Debug, Clone)]
pub struct SliceDataStorage {
    pub machine: MachineSettings,
    pub config: TreeSupportConfig,
    pub meshes: Vec<MeshStorage>,
    pub support: SupportStorage,
    layer_outlines: Vec<ExPolygons>,
    helper_outlines: Vec<ExPolygons>,
}

/// Errors raised while assembling a [`SliceDataStorage`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// A mesh carries a different number of overhang layers than the scene
    /// has outline layers.
    #[error("mesh {mesh} has {overhang_layers} overhang layers, expected {expected}")]
    LayerCountMismatch {
        mesh: usize,
        overhang_layers: usize,
        expected: usize,
    },
    /// Helper outlines must cover the same layers as the model outlines.
    #[error("helper outlines cover {got} layers, expected {expected}")]
    HelperLayerCountMismatch { got: usize, expected: usize },
}

impl SliceDataStorage {
    /// Assemble the storage, checking that every mesh agrees on the layer
    /// count.
    pub fn new(
        machine: MachineSettings,
        config: TreeSupportConfig,
        layer_outlines: Vec<ExPolygons>,
        meshes: Vec<MeshStorage>,
    ) -> Result<Self, StorageError> {
        let expected = layer_outlines.len();
        for (mesh_idx, mesh) in meshes.iter().enumerate() {
            if mesh.overhang_areas.len() != expected {
                return Err(StorageError::LayerCountMismatch {
                    mesh: mesh_idx,
                    overhang_layers: mesh.overhang_areas.len(),
                    expected,
                });
            }
        }

        let layer_count = expected;
        Ok(Self {
            machine,
            config,
            meshes,
            support: SupportStorage {
                layers: vec![SupportLayer::default(); layer_count],
                layer_nr_max_filled_layer: -1,
                generated: false,
            },
            layer_outlines,
            helper_outlines: vec![ExPolygons::new(); layer_count],
        })
    }

    /// Attach helper-part outlines (prime towers and the like), one set per
    /// layer.
    pub fn with_helper_outlines(
        mut self,
        helper_outlines: Vec<ExPolygons>,
    ) -> Result<Self, StorageError> {
        if helper_outlines.len() != self.layer_outlines.len() {
            return Err(StorageError::HelperLayerCountMismatch {
                got: helper_outlines.len(),
                expected: self.layer_outlines.len(),
            });
        }
        self.helper_outlines = helper_outlines;
        Ok(self)
    }

    /// Number of layers in the sliced scene.
    pub fn layer_count(&self) -> usize {
        self.layer_outlines.len()
    }

    /// Closed outline polygons of a layer. Out-of-range layers are empty.
    pub fn layer_outlines(&self, layer_nr: usize, include_helper_parts: bool) -> ExPolygons {
        let Some(model) = self.layer_outlines.get(layer_nr) else {
            return ExPolygons::new();
        };
        if !include_helper_parts {
            return model.clone();
        }
        let mut combined = model.clone();
        combined.extend(self.helper_outlines[layer_nr].iter().cloned());
        combined
    }

    /// True when tree support is requested globally or by any mesh.
    pub fn tree_support_requested(&self) -> bool {
        self.config.support_tree_enable || self.meshes.iter().any(|m| m.support_tree_enable)
    }
}
