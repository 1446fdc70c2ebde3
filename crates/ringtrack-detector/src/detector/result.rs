use nalgebra::{Point2, Vector2};
use ringtrack_core::PixelBox;
use serde::{Deserialize, Serialize};

/// Outcome of one detection call.
///
/// When `valid` is false the geometric fields carry no meaning and the next
/// call searches the whole frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RingDetection {
    pub valid: bool,
    /// Mean of all marker pixels (annulus and core).
    pub center: Point2<f32>,
    /// Pixel count of the outer annulus.
    pub size: usize,
    /// Bounding box of the outer annulus.
    pub bbox: PixelBox,
    /// Mean channel sum over the outer annulus (0..=765).
    pub mean_intensity: f32,
    /// Bounding-box fill ratio of the annulus relative to the ideal, ~1.
    pub roundness: f32,
    /// Leakage-corrected moment axes `[major, minor]`. See [`Self::radii`].
    pub axes: [f32; 2],
    /// Unit vector along the major axis.
    pub orientation: Vector2<f32>,
    /// Annulus pixels over core pixels.
    pub size_ratio: f32,
    /// Direction of `offset`, radians.
    pub angle: f32,
    /// Marker centre minus core centroid.
    pub offset: Vector2<f32>,
    /// Channel-sum threshold the frame was binarized with.
    pub threshold: i32,
}

impl RingDetection {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            center: Point2::origin(),
            size: 0,
            bbox: PixelBox::default(),
            mean_intensity: 0.0,
            roundness: 0.0,
            axes: [0.0; 2],
            orientation: Vector2::new(1.0, 0.0),
            size_ratio: 0.0,
            angle: 0.0,
            offset: Vector2::zeros(),
            threshold: 0,
        }
    }

    /// Outer ellipse semi-axes in pixels.
    ///
    /// A uniformly filled ellipse with semi-axis `a` has moment axis `a / 2`.
    pub fn radii(&self) -> [f32; 2] {
        [2.0 * self.axes[0], 2.0 * self.axes[1]]
    }

    /// Major-axis direction in radians, in `(-π/2, π/2]`.
    pub fn orientation_angle(&self) -> f32 {
        self.orientation.y.atan2(self.orientation.x)
    }
}

impl Default for RingDetection {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Bookkeeping for the last detection call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameStats {
    /// Regions grown this frame.
    pub regions: usize,
    /// Pixels assigned to those regions.
    pub labeled_pixels: usize,
    /// Scan was seeded at the previous marker.
    pub tracking: bool,
    /// The whole label map was cleared before the scan.
    pub full_clear: bool,
    /// Channel-sum threshold used.
    pub threshold: i32,
}
