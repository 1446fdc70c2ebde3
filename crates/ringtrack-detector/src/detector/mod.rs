//! Ring detection pipeline.
//!
//! [`RingDetector`] owns every buffer it needs and carries the threshold and
//! tracking state from one frame to the next. Each call scans the frame for a
//! dark (or light) region, checks whether it encloses a concentric region of
//! the opposite class with the configured proportions, and fits the pair.

mod error;
mod overlay;
mod params;
mod pipeline;
mod result;

pub use error::{RingDetectError, RingParamsError};
pub use overlay::{region_color, OverlayMode};
pub use params::{RingDetectorParams, RingPolarity};
pub use pipeline::RingDetector;
pub use result::{FrameStats, RingDetection};
