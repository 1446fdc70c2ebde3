//! Facade crate for the `ringtrack-*` workspace.
//!
//! This crate provides:
//! - re-exports of the frame types (`ringtrack-core`) and the detector
//!   (`ringtrack-detector`),
//! - (feature `image`) helpers that run the detector on `image::RgbImage`
//!   frames and render overlays,
//! - (feature `cli`) the `ringtrack` command-line tool.
//!
//! ## Quickstart
//!
//! ```no_run
//! use ringtrack::detect;
//! use ringtrack::RingDetectorParams;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let first = detect::load_rgb("frame_0000.png")?;
//! let mut detector = detect::detector_for(&first, RingDetectorParams::default())?;
//! for path in ["frame_0000.png", "frame_0001.png"] {
//!     let frame = detect::load_rgb(path)?;
//!     let ring = detect::detect_image(&mut detector, &frame)?;
//!     if ring.valid {
//!         println!("{path}: ({:.1}, {:.1})", ring.center.x, ring.center.y);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `ringtrack::core`: RGB frames, pixel boxes, synthetic ring rendering, logger.
//! - `ringtrack::detector`: the ring detector, its parameters and JSON I/O.
//! - `ringtrack::detect` (feature `image`): helpers for `image::RgbImage`.

pub use ringtrack_core as core;
pub use ringtrack_detector as detector;

pub use ringtrack_core::{PixelBox, RgbImage, RgbImageView};
pub use ringtrack_detector::{
    FrameStats, OverlayMode, RingDetectError, RingDetection, RingDetector, RingDetectorParams,
    RingPolarity,
};

#[cfg(feature = "image")]
pub mod detect;
