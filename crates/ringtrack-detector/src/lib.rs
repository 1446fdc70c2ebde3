//! Real-time detection of concentric ring markers in RGB frames.
//!
//! A marker is a dark annulus around a bright core (or the inverse, see
//! [`RingPolarity`]) with a known inner/outer diameter ratio. Per frame the
//! detector:
//!
//! 1. binarizes pixels lazily against a channel-sum threshold while growing
//!    4-connected regions,
//! 2. keeps an outer region only if its bounding-box fill matches an annulus,
//!    then grows the region at its centroid and checks it is a round core of
//!    the right relative size and concentric with the annulus,
//! 3. fits the pair with second moments, rejects non-elliptic shapes and
//!    corrects the axes for boundary pixel leakage.
//!
//! Between frames the detector keeps the threshold and the last position.
//! After a hit the next scan starts at the marker and only the area around it
//! is cleared; after a miss the threshold steps through a bisection search.
//!
//! ```
//! use nalgebra::Point2;
//! use ringtrack_core::synth::{render_dark_ring, RingShape};
//! use ringtrack_detector::{RingDetector, RingDetectorParams};
//!
//! let frame = render_dark_ring(160, 120, &RingShape::circle(Point2::new(70.0, 55.0), 30.0, 15.0));
//! let mut detector = RingDetector::new(160, 120, RingDetectorParams::default()).unwrap();
//! let ring = detector.detect(&frame.view()).unwrap();
//! assert!(ring.valid);
//! assert!((ring.center.x - 70.0).abs() < 1.0);
//! ```

mod detector;
pub mod ellipse;
mod io;
mod label_map;
mod segment;
pub mod threshold;
mod validate;

pub use detector::{
    region_color, FrameStats, OverlayMode, RingDetectError, RingDetection, RingDetector,
    RingDetectorParams, RingParamsError, RingPolarity,
};
pub use io::{FrameReport, RingDetectConfig, RingDetectReport, RingIoError};
pub use label_map::PixelClass;
pub use threshold::ThresholdSchedule;
pub use validate::RingGeometry;

pub use ringtrack_core::{FrameError, PixelBox, RgbImage, RgbImageView};
