//! Geometric gates deciding whether two nested regions form a ring marker.

use std::f32::consts::PI;

use crate::detector::RingDetectorParams;
use crate::segment::Region;

/// Area relations implied by the inner/outer diameter ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingGeometry {
    /// Inner over outer diameter.
    pub diameter_ratio: f32,
    /// `diameter_ratio²`: inner disk area over outer disk area.
    pub inner_to_outer_area: f32,
    /// Expected `pixels / bbox_area` of the outer annulus.
    pub outer_fill: f32,
    /// Expected `pixels / bbox_area` of the inner disk.
    pub inner_fill: f32,
    /// Expected annulus pixels over inner disk pixels, `(1 - d²) / d²`.
    pub annulus_to_core: f32,
}

impl RingGeometry {
    pub fn new(diameter_ratio: f32) -> Self {
        let r = diameter_ratio * diameter_ratio;
        Self {
            diameter_ratio,
            inner_to_outer_area: r,
            outer_fill: PI * (1.0 - r) / 4.0,
            inner_fill: PI / 4.0,
            annulus_to_core: (1.0 - r) / r,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RegionRole {
    Outer,
    Inner,
}

/// Why a pair of round regions was not accepted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum PairRejection {
    SizeRatio { normalized: f32 },
    OffCenter { dx: f32, dy: f32 },
}

pub(crate) struct RingValidator {
    geometry: RingGeometry,
    min_region_size: usize,
    roundness_tolerance: f32,
    ratio_tolerance: f32,
    center_tolerance_abs: f32,
    center_tolerance_rel: f32,
}

#[inline]
fn within(value: f32, tolerance: f32) -> bool {
    (value - 1.0).abs() < tolerance
}

impl RingValidator {
    pub(crate) fn new(params: &RingDetectorParams) -> Self {
        Self {
            geometry: RingGeometry::new(params.diameter_ratio),
            min_region_size: params.min_region_size,
            roundness_tolerance: params.roundness_tolerance,
            ratio_tolerance: params.ratio_tolerance,
            center_tolerance_abs: params.center_tolerance_abs,
            center_tolerance_rel: params.center_tolerance_rel,
        }
    }

    pub(crate) fn geometry(&self) -> &RingGeometry {
        &self.geometry
    }

    /// `bbox_area * expected_fill / size`; 1.0 for an ideal shape.
    pub(crate) fn roundness(&self, region: &Region, role: RegionRole) -> f32 {
        if region.size == 0 {
            return 0.0;
        }
        let fill = match role {
            RegionRole::Outer => self.geometry.outer_fill,
            RegionRole::Inner => self.geometry.inner_fill,
        };
        region.bbox.area() as f32 * fill / region.size as f32
    }

    /// Size and roundness gate applied to each region on its own.
    pub(crate) fn is_round(&self, region: &Region, role: RegionRole) -> bool {
        region.size > self.min_region_size
            && within(self.roundness(region, role), self.roundness_tolerance)
    }

    /// Area-ratio and concentricity gates on an outer/inner pair.
    pub(crate) fn check_pair(&self, outer: &Region, inner: &Region) -> Result<(), PairRejection> {
        if inner.size == 0 {
            return Err(PairRejection::SizeRatio { normalized: f32::INFINITY });
        }
        let normalized = outer.size as f32 / inner.size as f32 / self.geometry.annulus_to_core;
        if !within(normalized, self.ratio_tolerance) {
            return Err(PairRejection::SizeRatio { normalized });
        }

        let dx = (inner.centroid.x - outer.centroid.x).abs();
        let dy = (inner.centroid.y - outer.centroid.y).abs();
        let tol_x =
            self.center_tolerance_abs + self.center_tolerance_rel * outer.bbox.extent_x() as f32;
        let tol_y =
            self.center_tolerance_abs + self.center_tolerance_rel * outer.bbox.extent_y() as f32;
        if dx > tol_x || dy > tol_y {
            return Err(PairRejection::OffCenter { dx, dy });
        }
        Ok(())
    }
}
