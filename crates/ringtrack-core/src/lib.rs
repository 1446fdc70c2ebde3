//! Core types shared by the `ringtrack-*` crates.
//!
//! This crate is intentionally small: interleaved RGB frame buffers, an
//! integer pixel bounding box, a synthetic ring renderer used by tests and
//! benchmarks, and the logger setup. It knows nothing about how a marker is
//! found.

mod geometry;
mod image;
mod logger;
pub mod synth;

pub use geometry::PixelBox;
pub use image::{FrameError, RgbImage, RgbImageView, CHANNELS, MAX_CHANNEL_SUM};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, LOG_ENV};
