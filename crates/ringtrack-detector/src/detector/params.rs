use ringtrack_core::MAX_CHANNEL_SUM;
use serde::{Deserialize, Serialize};

use super::RingParamsError;
use crate::label_map::PixelClass;

/// Which class the outer annulus belongs to. The core is always the opposite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingPolarity {
    /// Dark annulus around a bright core.
    #[default]
    DarkRing,
    /// Bright annulus around a dark core.
    LightRing,
}

impl RingPolarity {
    pub fn outer_class(self) -> PixelClass {
        match self {
            RingPolarity::DarkRing => PixelClass::Dark,
            RingPolarity::LightRing => PixelClass::Light,
        }
    }

    pub fn inner_class(self) -> PixelClass {
        self.outer_class().opposite()
    }
}

/// Configuration for [`RingDetector`](super::RingDetector).
///
/// Fixed for the lifetime of a detector. Every field has a default, so a
/// JSON config only needs to list what it overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingDetectorParams {
    /// Inner over outer diameter of the printed marker.
    pub diameter_ratio: f32,
    pub polarity: RingPolarity,
    /// Regions with at most this many pixels are never candidates.
    pub min_region_size: usize,
    /// Allowed deviation of the bounding-box fill ratio from the ideal.
    pub roundness_tolerance: f32,
    /// Allowed deviation of the outer/inner pixel-count ratio from the ideal.
    pub ratio_tolerance: f32,
    /// Concentricity tolerance in pixels, per axis.
    pub center_tolerance_abs: f32,
    /// Concentricity tolerance as a fraction of the outer region's extent.
    pub center_tolerance_rel: f32,
    /// Allowed deviation of `4π·m0·m1 / n` from 1.
    pub circularity_tolerance: f32,
    /// Failures during which the last good threshold is retried every other
    /// frame before plain threshold search.
    pub max_failed: u32,
    /// Threshold search restarts once its step (per channel) drops to this.
    pub min_threshold_step: i32,
    /// Cap on regions grown per frame.
    pub max_regions: usize,
    /// Seed the next frame at the last marker and clear only around it.
    pub tracking: bool,
    /// Channel-sum threshold for the first frame.
    pub initial_threshold: i32,
}

impl Default for RingDetectorParams {
    fn default() -> Self {
        Self {
            diameter_ratio: 0.5,
            polarity: RingPolarity::DarkRing,
            min_region_size: 10,
            roundness_tolerance: 0.3,
            ratio_tolerance: 0.4,
            center_tolerance_abs: 5.0,
            center_tolerance_rel: 0.1,
            circularity_tolerance: 0.1,
            max_failed: 0,
            min_threshold_step: 16,
            max_regions: 1000,
            tracking: true,
            initial_threshold: MAX_CHANNEL_SUM / 2 + 1,
        }
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), RingParamsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RingParamsError::Tolerance { name, value })
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), RingParamsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(RingParamsError::CenterTolerance { name, value })
    }
}

impl RingDetectorParams {
    /// Defaults for a marker with the given inner/outer diameter ratio.
    pub fn for_diameter_ratio(diameter_ratio: f32) -> Self {
        Self {
            diameter_ratio,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), RingParamsError> {
        let d = self.diameter_ratio;
        if !(d.is_finite() && d > 0.0 && d < 1.0) {
            return Err(RingParamsError::DiameterRatio(d));
        }
        positive("roundness_tolerance", self.roundness_tolerance)?;
        positive("ratio_tolerance", self.ratio_tolerance)?;
        positive("circularity_tolerance", self.circularity_tolerance)?;
        non_negative("center_tolerance_abs", self.center_tolerance_abs)?;
        non_negative("center_tolerance_rel", self.center_tolerance_rel)?;
        if self.max_regions < 2 {
            return Err(RingParamsError::MaxRegions(self.max_regions));
        }
        if self.min_threshold_step < 1 {
            return Err(RingParamsError::ThresholdStep(self.min_threshold_step));
        }
        if !(0..=MAX_CHANNEL_SUM).contains(&self.initial_threshold) {
            return Err(RingParamsError::InitialThreshold(self.initial_threshold));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let p = RingDetectorParams::default();
        assert_eq!(p.initial_threshold, 384);
        assert_eq!(p.validate(), Ok(()));
        assert_eq!(p.polarity.inner_class(), PixelClass::Light);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let bad_ratio = RingDetectorParams::for_diameter_ratio(1.0);
        assert_eq!(bad_ratio.validate(), Err(RingParamsError::DiameterRatio(1.0)));

        let p = RingDetectorParams {
            circularity_tolerance: 0.0,
            ..RingDetectorParams::default()
        };
        assert!(matches!(
            p.validate(),
            Err(RingParamsError::Tolerance { name: "circularity_tolerance", .. })
        ));

        let p = RingDetectorParams {
            center_tolerance_rel: f32::NAN,
            ..RingDetectorParams::default()
        };
        assert!(p.validate().is_err());

        let p = RingDetectorParams {
            max_regions: 1,
            ..RingDetectorParams::default()
        };
        assert_eq!(p.validate(), Err(RingParamsError::MaxRegions(1)));

        let p = RingDetectorParams {
            min_threshold_step: 0,
            ..RingDetectorParams::default()
        };
        assert_eq!(p.validate(), Err(RingParamsError::ThresholdStep(0)));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let json = r#"{ "diameter_ratio": 0.6, "polarity": "light_ring" }"#;
        let p: RingDetectorParams = serde_json::from_str(json).expect("parse");
        assert_eq!(p.diameter_ratio, 0.6);
        assert_eq!(p.polarity, RingPolarity::LightRing);
        assert_eq!(p.min_region_size, 10);
        assert!(p.tracking);
    }
}
