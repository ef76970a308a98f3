//! Tree-style support structure generation for FFF 3D printing.
//!
//! Given a sliced model (per-layer outlines plus per-layer overhang areas),
//! this crate synthesises a branching scaffold that rises from the build
//! plate (or from the model itself) and ends beneath every overhang, so that
//! filament deposited above has something to rest upon.
//!
//! # Pipeline
//!
//! 1. **Collision volumes** ([`support::TreeModelVolumes`]): for every
//!    sampled branch radius and every layer, the region a branch of that
//!    radius must not occupy.
//! 2. **Avoidance volumes**: the downward closure of the collision volumes;
//!    a point outside the avoidance area still has a collision-free path to
//!    the build plate.
//! 3. **Contact seeding** ([`support::contact`]): tip nodes placed under
//!    overhangs on a rotated grid.
//! 4. **Node dropping** ([`support::drop`]): top-down relaxation that merges
//!    nearby branches over a minimum spanning tree and walks the survivors
//!    toward the build plate within the slope limit.
//! 5. **Drawing** ([`support::draw`]): per-layer support, roof and floor
//!    polygons from the node sets.
//!
//! Everything is driven through [`storage::SliceDataStorage`]; the entry
//! point is [`support::TreeSupport`].
//!
//! # Coordinates
//!
//! Geometry uses integer coordinates scaled by [`SCALING_FACTOR`] to avoid
//! floating-point robustness issues: one unit is one micrometre. Angles are
//! radians, layers count from 0 at the build plate.

pub mod clipper;
pub mod geometry;
pub mod storage;
pub mod support;

/// Scaled integer coordinate type. 1 unit = 1 micrometre.
pub type Coord = i64;

/// Floating-point coordinate type, in millimetres.
pub type CoordF = f64;

/// Number of scaled units per millimetre.
pub const SCALING_FACTOR: CoordF = 1000.0;

/// Convert millimetres to scaled units.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Convert scaled units to millimetres.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_roundtrip() {
        assert_eq!(scale(1.0), 1000);
        assert_eq!(scale(0.2), 200);
        assert!((unscale(scale(12.345)) - 12.345).abs() < 1e-3);
    }

    #[test]
    fn test_scale_negative() {
        assert_eq!(scale(-2.5), -2500);
        assert!((unscale(-2500) + 2.5).abs() < 1e-9);
    }
}
