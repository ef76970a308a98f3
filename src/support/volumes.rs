//! Collision, avoidance and internal-guide volumes.
//!
//! Three tensors indexed by (branch-radius sample, layer):
//!
//! - **collision**: where a branch of the sampled radius may not be. The
//!   model outline united with the machine border, inflated by the XY
//!   clearance plus the sampled radius with round joins. Sample 0 is the
//!   infinitesimally thin branch: pure model plus clearance.
//! - **avoidance**: the downward closure of collision. A point inside the
//!   avoidance area has no collision-free descending path to the build
//!   plate at the slope limit.
//! - **internal guide**: avoidance minus collision; steers branches that
//!   rest on the model toward its interior.
//!
//! Collision construction parallelises over radius samples; avoidance is
//! serially dependent layer-by-layer within a sample but samples propagate
//! in parallel. All cells are written once here and read-only afterwards.

use super::TreeSupportSettings;
use crate::clipper::{self, OffsetJoinType};
use crate::geometry::ExPolygons;
use crate::storage::SliceDataStorage;
use crate::Coord;
use rayon::prelude::*;

/// Jitter removed after each avoidance erosion, in scaled units.
const AVOIDANCE_SMOOTH_LENGTH: Coord = 5;

#[derive(Debug, Clone)]
pub struct TreeModelVolumes {
    collision: Vec<Vec<ExPolygons>>,
    avoidance: Vec<Vec<ExPolygons>>,
    internal_guide: Vec<Vec<ExPolygons>>,
    radius_sample_resolution: Coord,
}

impl TreeModelVolumes {
    /// Compute all three volumes for the sliced scene.
    pub fn build(
        storage: &SliceDataStorage,
        machine_volume_border: &ExPolygons,
        settings: &TreeSupportSettings,
    ) -> Self {
        let resolution = settings.radius_sample_resolution;
        let sample_count =
            (settings.maximum_radius as f64 / resolution as f64).round() as usize + 1;
        let layer_count = storage.layer_count();

        let collision: Vec<Vec<ExPolygons>> = (0..sample_count)
            .into_par_iter()
            .map(|radius_sample| {
                let radius = radius_sample as Coord * resolution;
                (0..layer_count)
                    .map(|layer_nr| {
                        let outline = storage.layer_outlines(layer_nr, false);
                        let merged = clipper::union(&outline, machine_volume_border);
                        // Enough space to avoid the (sampled) width of the
                        // branch.
                        clipper::offset_expolygons(
                            &merged,
                            settings.xy_distance + radius,
                            OffsetJoinType::Round,
                        )
                    })
                    .collect()
            })
            .collect();

        let max_move = settings.maximum_move_distance;
        let avoidance: Vec<Vec<ExPolygons>> = collision
            .par_iter()
            .map(|collision_sample| Self::propagate_avoidance(collision_sample, max_move))
            .collect();

        let internal_guide: Vec<Vec<ExPolygons>> = collision
            .par_iter()
            .zip(avoidance.par_iter())
            .map(|(collision_sample, avoidance_sample)| {
                collision_sample
                    .iter()
                    .zip(avoidance_sample.iter())
                    .map(|(collision_layer, avoidance_layer)| {
                        clipper::difference(avoidance_layer, collision_layer)
                    })
                    .collect()
            })
            .collect();

        Self {
            collision,
            avoidance,
            internal_guide,
            radius_sample_resolution: resolution,
        }
    }

    /// Close the per-layer reachability operator: inset the layer above by
    /// the slope limit (one layer of maximum movement), then union the
    /// current collision layer. Smoothing keeps the erosion from
    /// accumulating micrometre segments.
    fn propagate_avoidance(collision_sample: &[ExPolygons], max_move: Coord) -> Vec<ExPolygons> {
        let mut avoidance_sample: Vec<ExPolygons> = Vec::with_capacity(collision_sample.len());
        let Some(bottom) = collision_sample.first() else {
            return avoidance_sample;
        };
        avoidance_sample.push(bottom.clone());

        for (layer_nr, collision_layer) in collision_sample.iter().enumerate().skip(1) {
            let eroded = clipper::offset_expolygons(
                &avoidance_sample[layer_nr - 1],
                -max_move,
                OffsetJoinType::Round,
            );
            let smoothed = clipper::smooth_expolygons(eroded, AVOIDANCE_SMOOTH_LENGTH);
            avoidance_sample.push(clipper::union(&smoothed, collision_layer));
        }

        avoidance_sample
    }

    /// Map a branch radius to its sample index, clamped to the sampled range.
    pub fn sample_for_radius(&self, radius: Coord) -> usize {
        let sample = (radius as f64 / self.radius_sample_resolution as f64).round() as usize;
        sample.min(self.sample_count().saturating_sub(1))
    }

    /// Forbidden region for a branch of the sampled radius.
    pub fn collision(&self, radius_sample: usize, layer_nr: usize) -> &ExPolygons {
        &self.collision[radius_sample][layer_nr]
    }

    /// Region without a collision-free descending path at the sampled radius.
    pub fn avoidance(&self, radius_sample: usize, layer_nr: usize) -> &ExPolygons {
        &self.avoidance[radius_sample][layer_nr]
    }

    /// Avoidance minus collision at the sampled radius.
    pub fn internal_guide(&self, radius_sample: usize, layer_nr: usize) -> &ExPolygons {
        &self.internal_guide[radius_sample][layer_nr]
    }

    pub fn sample_count(&self) -> usize {
        self.collision.len()
    }

    pub fn layer_count(&self) -> usize {
        self.collision.first().map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{expolygon, ExPolygon, Point, Polygon};
    use crate::storage::{MachineSettings, SliceDataStorage, TreeSupportConfig};
    use crate::support::TreeSupport;

    fn tower_storage(layers: usize) -> SliceDataStorage {
        let outline = ExPolygon::new(Polygon::rectangle(
            Point::new_scale(100.0, 100.0),
            Point::new_scale(110.0, 110.0),
        ));
        SliceDataStorage::new(
            MachineSettings::default(),
            TreeSupportConfig::default(),
            vec![vec![outline]; layers],
            vec![],
        )
        .unwrap()
    }

    fn build_volumes(storage: &SliceDataStorage) -> (TreeSupportSettings, TreeModelVolumes) {
        let settings = TreeSupportSettings::new(&storage.config, storage.layer_count());
        let tree = TreeSupport::new(storage);
        let volumes = TreeModelVolumes::build(storage, tree.machine_volume_border(), &settings);
        (settings, volumes)
    }

    #[test]
    fn test_collision_grows_with_radius() {
        let storage = tower_storage(4);
        let (_, volumes) = build_volumes(&storage);

        assert!(volumes.sample_count() > 1);
        // A point 1mm outside the model clears sample 0 but not a fat branch.
        let near = Point::new_scale(99.0, 105.0);
        assert!(!expolygon::contains(volumes.collision(0, 1), &near, false));
        let fat = volumes.sample_count() - 1;
        assert!(expolygon::contains(volumes.collision(fat, 1), &near, false));
    }

    #[test]
    fn test_collision_subset_of_avoidance() {
        let storage = tower_storage(5);
        let (_, volumes) = build_volumes(&storage);

        // Collision minus avoidance must be empty on every cell.
        for radius_sample in 0..volumes.sample_count() {
            for layer_nr in 0..volumes.layer_count() {
                let extra = clipper::difference(
                    volumes.collision(radius_sample, layer_nr),
                    volumes.avoidance(radius_sample, layer_nr),
                );
                assert!(
                    expolygon::total_area(&extra) < 100.0,
                    "collision escapes avoidance at sample {radius_sample} layer {layer_nr}"
                );
            }
        }
    }

    #[test]
    fn test_avoidance_bottom_equals_collision() {
        let storage = tower_storage(3);
        let (_, volumes) = build_volumes(&storage);

        let diff_a = clipper::difference(volumes.avoidance(0, 0), volumes.collision(0, 0));
        let diff_b = clipper::difference(volumes.collision(0, 0), volumes.avoidance(0, 0));
        assert!(expolygon::total_area(&diff_a) < 1.0);
        assert!(expolygon::total_area(&diff_b) < 1.0);
    }

    #[test]
    fn test_avoidance_propagation_is_fixed_point() {
        let storage = tower_storage(5);
        let (settings, volumes) = build_volumes(&storage);

        // Re-running the propagation over the already propagated field keeps
        // it unchanged (up to clipper jitter).
        let sample: Vec<ExPolygons> = (0..volumes.layer_count())
            .map(|l| volumes.avoidance(0, l).clone())
            .collect();
        let again = TreeModelVolumes::propagate_avoidance(&sample, settings.maximum_move_distance);
        for (layer_nr, (a, b)) in sample.iter().zip(again.iter()).enumerate() {
            let extra = clipper::difference(b, a);
            assert!(
                expolygon::total_area(&extra) < 1000.0,
                "avoidance not a fixed point at layer {layer_nr}"
            );
        }
    }

    #[test]
    fn test_internal_guide_is_avoidance_minus_collision() {
        let storage = tower_storage(4);
        let (_, volumes) = build_volumes(&storage);

        for layer_nr in 0..volumes.layer_count() {
            let overlap = clipper::intersection(
                volumes.internal_guide(0, layer_nr),
                volumes.collision(0, layer_nr),
            );
            assert!(expolygon::total_area(&overlap) < 100.0);
        }
    }

    #[test]
    fn test_sample_for_radius_clamps() {
        let storage = tower_storage(3);
        let (settings, volumes) = build_volumes(&storage);

        assert_eq!(volumes.sample_for_radius(0), 0);
        let round_trip =
            volumes.sample_for_radius(settings.radius_sample_resolution * 2) as Coord;
        assert_eq!(round_trip, 2);
        // Radii beyond the bookkeeping clamp to the last sample.
        assert_eq!(
            volumes.sample_for_radius(settings.maximum_radius * 10),
            volumes.sample_count() - 1
        );
    }
}
