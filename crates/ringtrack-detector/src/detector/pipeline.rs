use log::{debug, trace, warn};
use ringtrack_core::{FrameError, PixelBox, RgbImage, RgbImageView, CHANNELS, MAX_CHANNEL_SUM};

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::overlay::{paint_labels, OverlayMode};
use super::{FrameStats, RingDetectError, RingDetection, RingDetectorParams};
use crate::ellipse::{fit_ring, RingFit};
use crate::label_map::{classify, PixelClass, UNVISITED};
use crate::segment::{Region, Segmenter};
use crate::threshold::ThresholdSchedule;
use crate::validate::{RegionRole, RingGeometry, RingValidator};

/// What the previous call left in the label map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LabelState {
    Clean,
    /// Every touched pixel lies within two pixels of this box.
    Window(PixelBox),
    Dirty,
}

/// Real-time ring marker detector for fixed-size RGB frames.
///
/// All buffers are allocated in [`RingDetector::new`]; detection calls only
/// write into them. Calls take `&mut self` and must be made frame after frame
/// from one thread.
pub struct RingDetector {
    width: usize,
    height: usize,
    params: RingDetectorParams,
    outer_class: PixelClass,
    inner_class: PixelClass,
    validator: RingValidator,
    segmenter: Segmenter,
    schedule: ThresholdSchedule,
    label_state: LabelState,
    last: RingDetection,
    track_ok: bool,
    /// Region ids of the accepted outer/inner pair in the last frame.
    accepted: Option<(i32, i32)>,
    stats: FrameStats,
}

impl RingDetector {
    /// Build a detector for `width x height` frames.
    pub fn new(
        width: usize,
        height: usize,
        params: RingDetectorParams,
    ) -> Result<Self, RingDetectError> {
        if width < 3 || height < 3 {
            return Err(RingDetectError::FrameTooSmall { width, height });
        }
        params.validate()?;
        if params.initial_threshold == 0 || params.initial_threshold == MAX_CHANNEL_SUM {
            warn!(
                "initial threshold {} puts every pixel in one class until the first failure",
                params.initial_threshold
            );
        }

        Ok(Self {
            width,
            height,
            outer_class: params.polarity.outer_class(),
            inner_class: params.polarity.inner_class(),
            validator: RingValidator::new(&params),
            segmenter: Segmenter::new(width, height, params.max_regions),
            schedule: ThresholdSchedule::new(
                params.initial_threshold,
                params.max_failed,
                params.min_threshold_step,
            ),
            label_state: LabelState::Clean,
            last: RingDetection::invalid(),
            track_ok: false,
            accepted: None,
            stats: FrameStats::default(),
            params,
        })
    }

    #[inline]
    pub fn params(&self) -> &RingDetectorParams {
        &self.params
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn geometry(&self) -> &RingGeometry {
        self.validator.geometry()
    }

    /// Threshold the next frame will be binarized with.
    pub fn threshold(&self) -> i32 {
        self.schedule.threshold()
    }

    /// Consecutive frames without a marker, modulo the search restart.
    pub fn failures(&self) -> u32 {
        self.schedule.failures()
    }

    pub fn last_detection(&self) -> &RingDetection {
        &self.last
    }

    pub fn last_stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Whether the last frame was found with exactly the marker's two regions.
    pub fn is_tracking(&self) -> bool {
        self.track_ok
    }

    /// Drop tracking and threshold state; the next call starts cold.
    pub fn reset(&mut self) {
        self.segmenter.labels_mut().clear_all();
        self.label_state = LabelState::Clean;
        self.schedule.reset(self.params.initial_threshold);
        self.last = RingDetection::invalid();
        self.track_ok = false;
        self.accepted = None;
        self.stats = FrameStats::default();
    }

    /// Detect the marker, seeding from the previous result.
    pub fn detect(&mut self, frame: &RgbImageView<'_>) -> Result<RingDetection, RingDetectError> {
        let hint = self.last;
        self.detect_from(frame, &hint)
    }

    /// Detect the marker, seeding the scan at `hint` when it is valid.
    ///
    /// The partial label-map clear is only used when `hint` covers the area
    /// touched by the previous call; any other hint costs a full clear.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame, hint), fields(width = frame.width, height = frame.height, seeded = hint.valid))
    )]
    pub fn detect_from(
        &mut self,
        frame: &RgbImageView<'_>,
        hint: &RingDetection,
    ) -> Result<RingDetection, RingDetectError> {
        self.check_frame(frame)?;

        let tracking = self.params.tracking && hint.valid;
        let full_clear = self.prepare_labels(tracking, &hint.bbox);
        let threshold = self.schedule.threshold();
        self.segmenter.begin_frame();
        self.accepted = None;

        let start = if tracking {
            self.segmenter
                .labels()
                .interior_index(hint.center.x, hint.center.y)
        } else {
            0
        };
        let found = self.scan(frame, start, threshold);

        let regions = self.segmenter.region_count();
        self.stats = FrameStats {
            regions,
            labeled_pixels: self.segmenter.regions().iter().map(|r| r.size).sum(),
            tracking,
            full_clear,
            threshold,
        };

        let detection = match found {
            Some((detection, next_threshold)) => {
                debug!(
                    "ring at ({:.2}, {:.2}) radii ({:.2}, {:.2}), threshold {} -> {}, {} regions",
                    detection.center.x,
                    detection.center.y,
                    2.0 * detection.axes[0],
                    2.0 * detection.axes[1],
                    threshold,
                    next_threshold,
                    regions
                );
                self.schedule.record_success(next_threshold);
                detection
            }
            None => {
                self.schedule.record_failure();
                debug!(
                    "no ring at threshold {} ({} regions), failures {}, next threshold {}",
                    threshold,
                    regions,
                    self.schedule.failures(),
                    self.schedule.threshold()
                );
                RingDetection {
                    threshold,
                    ..RingDetection::invalid()
                }
            }
        };

        self.track_ok = detection.valid && regions == 2;
        self.label_state = if self.track_ok {
            LabelState::Window(detection.bbox)
        } else {
            LabelState::Dirty
        };
        self.last = detection;
        Ok(detection)
    }

    /// Paint the regions of the last frame into `image`.
    pub fn paint_overlay(
        &self,
        image: &mut RgbImage,
        mode: OverlayMode,
    ) -> Result<(), RingDetectError> {
        if image.width != self.width || image.height != self.height {
            return Err(self.size_mismatch(image.width, image.height));
        }
        let labels = self.segmenter.labels().as_slice();
        match (mode, self.accepted) {
            (OverlayMode::AllRegions, _) => paint_labels(labels, image, |_| true),
            (OverlayMode::Accepted, Some((outer, inner))) => {
                paint_labels(labels, image, |id| id == outer || id == inner)
            }
            (OverlayMode::Accepted, None) => {}
        }
        Ok(())
    }

    fn size_mismatch(&self, width: usize, height: usize) -> RingDetectError {
        RingDetectError::FrameSizeMismatch {
            expected_width: self.width,
            expected_height: self.height,
            width,
            height,
        }
    }

    fn check_frame(&self, frame: &RgbImageView<'_>) -> Result<(), RingDetectError> {
        if frame.width != self.width || frame.height != self.height {
            return Err(self.size_mismatch(frame.width, frame.height));
        }
        let expected = self.width * self.height * CHANNELS;
        if frame.data.len() != expected {
            return Err(FrameError::BufferLength {
                width: frame.width,
                height: frame.height,
                expected,
                actual: frame.data.len(),
            }
            .into());
        }
        Ok(())
    }

    /// Undo the previous call's labels. Returns whether the whole map was
    /// cleared.
    fn prepare_labels(&mut self, tracking: bool, hint_bbox: &PixelBox) -> bool {
        let labels = self.segmenter.labels_mut();
        let full = match self.label_state {
            LabelState::Clean => false,
            LabelState::Window(window) if tracking && *hint_bbox == window => {
                labels.clear_window(&window);
                false
            }
            LabelState::Window(_) | LabelState::Dirty => {
                labels.clear_all();
                true
            }
        };
        self.label_state = LabelState::Clean;
        full
    }

    /// Walk the frame from `start`, wrapping once, until a marker is found.
    fn scan(
        &mut self,
        frame: &RgbImageView<'_>,
        start: usize,
        threshold: i32,
    ) -> Option<(RingDetection, i32)> {
        let len = self.segmenter.labels().len();
        let outer_label = self.outer_class.label();
        let mut idx = start;
        loop {
            if self.segmenter.is_full() {
                trace!("region cap {} reached", self.params.max_regions);
                return None;
            }
            let labels = self.segmenter.labels_mut();
            if labels.get(idx) == UNVISITED && classify(frame, idx, threshold) == self.outer_class {
                labels.set(idx, outer_label);
            }
            if labels.get(idx) == outer_label {
                if let Some(found) = self.examine(frame, idx, threshold) {
                    return Some(found);
                }
            }
            idx += 1;
            if idx == len {
                idx = 0;
            }
            if idx == start {
                return None;
            }
        }
    }

    /// Grow the outer candidate at `seed` and, if it looks like an annulus,
    /// the inner region at its centroid. Returns the detection and the
    /// threshold to use next.
    fn examine(
        &mut self,
        frame: &RgbImageView<'_>,
        seed: usize,
        threshold: i32,
    ) -> Option<(RingDetection, i32)> {
        self.segmenter.begin_candidate();
        let outer = self.segmenter.grow(frame, seed, threshold)?;
        if !self.validator.is_round(&outer, RegionRole::Outer) {
            if outer.size > self.params.min_region_size {
                trace!(
                    "region {} ({} px) rejected as annulus, roundness {:.3}",
                    outer.id,
                    outer.size,
                    self.validator.roundness(&outer, RegionRole::Outer)
                );
            }
            return None;
        }

        let inner_seed = self
            .segmenter
            .labels()
            .interior_index(outer.centroid.x, outer.centroid.y);
        let inner_label = self.inner_class.label();
        if self.segmenter.labels_mut().touch(frame, inner_seed, threshold) != inner_label {
            trace!("region {} has no {:?} core at its centroid", outer.id, self.inner_class);
            return None;
        }
        let inner = self.segmenter.grow(frame, inner_seed, threshold)?;
        if !self.validator.is_round(&inner, RegionRole::Inner) {
            trace!(
                "core {} ({} px) of region {} is not round, roundness {:.3}",
                inner.id,
                inner.size,
                outer.id,
                self.validator.roundness(&inner, RegionRole::Inner)
            );
            return None;
        }
        if let Err(rejection) = self.validator.check_pair(&outer, &inner) {
            trace!("pair {}/{} rejected: {:?}", outer.id, inner.id, rejection);
            return None;
        }

        let union = self.segmenter.grown_pixels(outer.span.0, inner.span.1);
        let fit = match fit_ring(
            union,
            self.width,
            inner.size,
            self.params.diameter_ratio,
            self.params.circularity_tolerance,
        ) {
            Ok(fit) => fit,
            Err(rejection) => {
                trace!("pair {}/{} failed the fit: {:?}", outer.id, inner.id, rejection);
                return None;
            }
        };

        self.accepted = Some((outer.id, inner.id));
        let next_threshold = ((outer.mean + inner.mean) / 2.0) as i32;
        Some((
            self.build_detection(&outer, &inner, &fit, threshold),
            next_threshold,
        ))
    }

    fn build_detection(
        &self,
        outer: &Region,
        inner: &Region,
        fit: &RingFit,
        threshold: i32,
    ) -> RingDetection {
        let center = fit.center.cast::<f32>();
        let offset = center - inner.centroid;
        RingDetection {
            valid: true,
            center,
            size: outer.size,
            bbox: outer.bbox,
            mean_intensity: outer.mean,
            roundness: self.validator.roundness(outer, RegionRole::Outer),
            axes: [fit.axes[0] as f32, fit.axes[1] as f32],
            orientation: fit.direction.cast::<f32>(),
            size_ratio: outer.size as f32 / inner.size as f32,
            angle: offset.y.atan2(offset.x),
            offset,
            threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label_map::BORDER;
    use nalgebra::Point2;
    use ringtrack_core::synth::{render_dark_ring, RingShape};

    fn ring_frame(cx: f32, cy: f32) -> RgbImage {
        render_dark_ring(160, 120, &RingShape::circle(Point2::new(cx, cy), 24.0, 12.0))
    }

    fn untouched_outside(det: &RingDetector, window: &PixelBox) -> bool {
        let labels = det.segmenter.labels();
        let w = det.width;
        labels.as_slice().iter().enumerate().all(|(idx, &label)| {
            label == UNVISITED || label == BORDER || window.contains(idx % w, idx / w)
        })
    }

    #[test]
    fn rejects_degenerate_construction() {
        assert!(matches!(
            RingDetector::new(2, 10, RingDetectorParams::default()),
            Err(RingDetectError::FrameTooSmall { .. })
        ));
        let params = RingDetectorParams::for_diameter_ratio(0.0);
        assert!(matches!(
            RingDetector::new(10, 10, params),
            Err(RingDetectError::InvalidParams(_))
        ));
    }

    #[test]
    fn successful_track_leaves_a_window() {
        let mut det = RingDetector::new(160, 120, RingDetectorParams::default()).expect("detector");
        let frame = ring_frame(80.0, 60.0);
        let first = det.detect(&frame.view()).expect("detect");
        assert!(first.valid);
        assert!(det.is_tracking());
        assert_eq!(det.label_state, LabelState::Window(first.bbox));
        let margin = first.bbox.expanded_clamped(2, 0, 159, 119);
        assert!(untouched_outside(&det, &margin));

        let second = det.detect(&frame.view()).expect("detect");
        assert!(second.valid);
        assert!(det.last_stats().tracking);
        assert!(!det.last_stats().full_clear);
        assert_eq!(det.last_stats().regions, 2);
    }

    #[test]
    fn foreign_hint_forces_full_clear() {
        let mut det = RingDetector::new(160, 120, RingDetectorParams::default()).expect("detector");
        let frame = ring_frame(80.0, 60.0);
        let first = det.detect(&frame.view()).expect("detect");
        let mut hint = first;
        hint.bbox.min_x += 1;
        let second = det.detect_from(&frame.view(), &hint).expect("detect");
        assert!(second.valid);
        assert!(det.last_stats().full_clear);
        assert!(det.last_stats().tracking);
    }

    #[test]
    fn failure_marks_labels_dirty() {
        let mut det = RingDetector::new(160, 120, RingDetectorParams::default()).expect("detector");
        let blank = RgbImage::filled(160, 120, [0, 0, 0]);
        let r = det.detect(&blank.view()).expect("detect");
        assert!(!r.valid);
        assert_eq!(r.threshold, 384);
        assert_eq!(det.label_state, LabelState::Dirty);
        assert_eq!(det.failures(), 1);

        det.reset();
        assert_eq!(det.label_state, LabelState::Clean);
        assert_eq!(det.failures(), 0);
        assert!(det.segmenter.labels().as_slice().iter().all(|&l| l <= 0));
    }

    #[test]
    fn threshold_moves_to_midpoint_of_marker() {
        let mut det = RingDetector::new(160, 120, RingDetectorParams::default()).expect("detector");
        let frame = ring_frame(80.0, 60.0);
        det.detect(&frame.view()).expect("detect");
        // Black annulus (0) around a white core (765).
        assert_eq!(det.threshold(), 382);
    }

    #[test]
    fn overlay_paints_accepted_pair() {
        let mut det = RingDetector::new(160, 120, RingDetectorParams::default()).expect("detector");
        let frame = ring_frame(80.0, 60.0);
        let r = det.detect(&frame.view()).expect("detect");
        assert!(r.valid);

        let mut overlay = frame.clone();
        det.paint_overlay(&mut overlay, OverlayMode::Accepted).expect("overlay");
        // Annulus pixel right of the core, region id 1.
        assert_eq!(overlay.pixel(80 + 18, 60), [255, 0, 255]);
        // Core pixel, region id 2.
        assert_eq!(overlay.pixel(80, 60), [255, 255, 0]);
        assert_eq!(overlay.pixel(5, 5), [255, 255, 255]);

        let mut wrong = RgbImage::new(10, 10);
        assert!(det.paint_overlay(&mut wrong, OverlayMode::AllRegions).is_err());
    }
}
