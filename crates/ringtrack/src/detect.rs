//! Detection helpers for `image::RgbImage` frames.

use crate::core::{self, RgbImageView};
use crate::detector::{OverlayMode, RingDetectError, RingDetection, RingDetector, RingDetectorParams};
use image::ImageReader;
use std::path::Path;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the image helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Detect(#[from] RingDetectError),

    #[error("overlay buffer does not match a {width}x{height} image")]
    OverlayBuffer { width: u32, height: u32 },
}

/// Borrow an `image::RgbImage` as the detector's frame view.
pub fn view_from_rgb(img: &image::RgbImage) -> RgbImageView<'_> {
    RgbImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Load any format `image` can decode and convert it to 8-bit RGB.
pub fn load_rgb(path: impl AsRef<Path>) -> Result<image::RgbImage, DetectError> {
    Ok(ImageReader::open(path)?.decode()?.to_rgb8())
}

/// Build a detector sized for `img`.
pub fn detector_for(
    img: &image::RgbImage,
    params: RingDetectorParams,
) -> Result<RingDetector, DetectError> {
    Ok(RingDetector::new(
        img.width() as usize,
        img.height() as usize,
        params,
    )?)
}

/// Run one detection step on `img`, tracking from the previous call.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(detector, img), fields(width = img.width(), height = img.height()))
)]
pub fn detect_image(
    detector: &mut RingDetector,
    img: &image::RgbImage,
) -> Result<RingDetection, DetectError> {
    Ok(detector.detect(&view_from_rgb(img))?)
}

/// Copy of `img` with the regions of the detector's last frame painted in.
///
/// Valid only for the frame most recently passed to the detector.
pub fn overlay_image(
    detector: &RingDetector,
    img: &image::RgbImage,
    mode: OverlayMode,
) -> Result<image::RgbImage, DetectError> {
    let (width, height) = img.dimensions();
    let mut frame = core::RgbImage {
        width: width as usize,
        height: height as usize,
        data: img.as_raw().clone(),
    };
    detector.paint_overlay(&mut frame, mode)?;
    image::RgbImage::from_raw(width, height, frame.data)
        .ok_or(DetectError::OverlayBuffer { width, height })
}

/// Convert a `ringtrack-core` frame (for example a synthetic one) to an
/// `image::RgbImage`.
pub fn to_image(frame: &core::RgbImage) -> Result<image::RgbImage, DetectError> {
    let (width, height) = (frame.width as u32, frame.height as u32);
    image::RgbImage::from_raw(width, height, frame.data.clone())
        .ok_or(DetectError::OverlayBuffer { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::synth::{render_dark_ring, RingShape};
    use nalgebra::Point2;

    fn ring_image() -> image::RgbImage {
        let frame = render_dark_ring(200, 160, &RingShape::circle(Point2::new(90.0, 70.0), 32.0, 16.0));
        to_image(&frame).expect("image")
    }

    #[test]
    fn detects_on_image_crate_frames() {
        let img = ring_image();
        let mut det = detector_for(&img, RingDetectorParams::default()).expect("detector");
        let ring = detect_image(&mut det, &img).expect("detect");
        assert!(ring.valid);
        assert!((ring.center.x - 90.0).abs() < 1.0);
        assert!((ring.center.y - 70.0).abs() < 1.0);
    }

    #[test]
    fn overlay_marks_the_marker() {
        let img = ring_image();
        let mut det = detector_for(&img, RingDetectorParams::default()).expect("detector");
        detect_image(&mut det, &img).expect("detect");
        let overlay = overlay_image(&det, &img, OverlayMode::Accepted).expect("overlay");
        assert_eq!(overlay.dimensions(), img.dimensions());
        assert_eq!(overlay.get_pixel(90, 70).0, crate::detector::region_color(2));
        assert_eq!(overlay.get_pixel(2, 2), img.get_pixel(2, 2));
    }

    #[test]
    fn size_change_is_reported() {
        let img = ring_image();
        let mut det = detector_for(&img, RingDetectorParams::default()).expect("detector");
        let other = image::RgbImage::new(10, 10);
        assert!(matches!(
            detect_image(&mut det, &other),
            Err(DetectError::Detect(RingDetectError::FrameSizeMismatch { .. }))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_rgb(dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, DetectError::Io(_)));
    }
}
