//! Region growing on the lazily binarized frame.

use nalgebra::Point2;
use ringtrack_core::{PixelBox, RgbImageView};

use crate::label_map::{LabelMap, PixelClass, WorkList};

/// One 4-connected region grown in the current frame.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Region {
    /// Positive, 1-based, in growth order.
    pub id: i32,
    pub class: PixelClass,
    pub bbox: PixelBox,
    pub size: usize,
    pub centroid: Point2<f32>,
    /// Mean channel sum over member pixels (0..=765).
    pub mean: f32,
    /// Member pixels are `work[span.0..span.1]`.
    pub span: (usize, usize),
}

/// Owns the label map, the work list and the per-frame region store.
pub(crate) struct Segmenter {
    labels: LabelMap,
    work: WorkList,
    regions: Vec<Region>,
    max_regions: usize,
}

impl Segmenter {
    pub(crate) fn new(width: usize, height: usize, max_regions: usize) -> Self {
        let labels = LabelMap::new(width, height);
        let work = WorkList::new(labels.len());
        debug_assert_eq!(work.capacity(), labels.len());
        Self {
            labels,
            work,
            regions: Vec::with_capacity(max_regions),
            max_regions,
        }
    }

    pub(crate) fn labels(&self) -> &LabelMap {
        &self.labels
    }

    pub(crate) fn labels_mut(&mut self) -> &mut LabelMap {
        &mut self.labels
    }

    /// Forget the previous frame's regions; ids restart at 1.
    pub(crate) fn begin_frame(&mut self) {
        self.regions.clear();
        self.work.reset();
    }

    /// Start a new candidate: the work list is rewound so the next grown
    /// regions occupy a contiguous span from position 0.
    pub(crate) fn begin_candidate(&mut self) {
        self.work.reset();
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.regions.len() >= self.max_regions
    }

    pub(crate) fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub(crate) fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Pixel indices grown at work-list positions `from..to`.
    pub(crate) fn grown_pixels(&self, from: usize, to: usize) -> &[usize] {
        self.work.span(from, to)
    }

    /// Grow the region containing `seed`.
    ///
    /// The seed must already carry a class label (dark or light); neighbors
    /// are classified against `threshold` on first touch. Returns `None` when
    /// the seed is not a class-labeled pixel or the region cap is reached.
    pub(crate) fn grow(
        &mut self,
        frame: &RgbImageView<'_>,
        seed: usize,
        threshold: i32,
    ) -> Option<Region> {
        if self.is_full() {
            return None;
        }
        let kind = self.labels.get(seed);
        let class = PixelClass::from_label(kind)?;

        let width = self.labels.width();
        let id = self.regions.len() as i32 + 1;
        let span_start = self.work.end();

        self.labels.set(seed, id);
        self.work.push(seed);

        let mut bbox = PixelBox::from_pixel(seed % width, seed / width);
        let mut sum_x = 0u64;
        let mut sum_y = 0u64;
        let mut sum_intensity = 0u64;

        while let Some(pos) = self.work.pop() {
            let x = pos % width;
            let y = pos / width;
            bbox.include(x, y);
            sum_x += x as u64;
            sum_y += y as u64;
            sum_intensity += frame.channel_sum(pos) as u64;

            // `pos` is never on the border, so all four neighbors exist.
            for nb in [pos + 1, pos - 1, pos - width, pos + width] {
                if self.labels.touch(frame, nb, threshold) == kind {
                    self.labels.set(nb, id);
                    self.work.push(nb);
                }
            }
        }

        let size = self.work.end() - span_start;
        let n = size as f64;
        let region = Region {
            id,
            class,
            bbox,
            size,
            centroid: Point2::new((sum_x as f64 / n) as f32, (sum_y as f64 / n) as f32),
            mean: (sum_intensity as f64 / n) as f32,
            span: (span_start, self.work.end()),
        };
        self.regions.push(region);
        Some(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label_map::{classify, BORDER, UNVISITED};
    use ringtrack_core::RgbImage;

    fn frame_with_rect(w: usize, h: usize, x0: usize, y0: usize, rw: usize, rh: usize) -> RgbImage {
        let mut img = RgbImage::filled(w, h, [250, 250, 250]);
        for y in y0..y0 + rh {
            for x in x0..x0 + rw {
                img.put_pixel(x, y, [0, 0, 30]);
            }
        }
        img
    }

    fn seed_dark(seg: &mut Segmenter, view: &RgbImageView<'_>, idx: usize, threshold: i32) {
        assert_eq!(classify(view, idx, threshold), PixelClass::Dark);
        seg.labels_mut().set(idx, PixelClass::Dark.label());
    }

    #[test]
    fn grows_filled_rectangle() {
        let img = frame_with_rect(32, 24, 5, 6, 10, 4);
        let view = img.view();
        let mut seg = Segmenter::new(32, 24, 16);
        seg.begin_frame();
        let seed = 7 * 32 + 8;
        seed_dark(&mut seg, &view, seed, 384);

        let region = seg.grow(&view, seed, 384).expect("region");
        assert_eq!(region.id, 1);
        assert_eq!(region.class, PixelClass::Dark);
        assert_eq!(region.size, 40);
        assert_eq!(
            region.bbox,
            PixelBox {
                min_x: 5,
                min_y: 6,
                max_x: 14,
                max_y: 9
            }
        );
        assert!((region.centroid.x - 9.5).abs() < 1e-5);
        assert!((region.centroid.y - 7.5).abs() < 1e-5);
        assert!((region.mean - 30.0).abs() < 1e-5);
        assert_eq!(region.span, (0, 40));

        // Every member carries the region id, direct neighbors were classified.
        let labels = seg.labels();
        assert_eq!(labels.get(6 * 32 + 5), 1);
        assert_eq!(labels.get(9 * 32 + 14), 1);
        assert_eq!(labels.get(6 * 32 + 4), PixelClass::Light.label());
        assert_eq!(labels.get(0), BORDER);
        assert_eq!(labels.get(20 * 32 + 20), UNVISITED);
    }

    #[test]
    fn flood_fill_stops_at_border_sentinel() {
        // Whole frame dark: the region is the full interior.
        let img = RgbImage::filled(12, 9, [0, 0, 0]);
        let view = img.view();
        let mut seg = Segmenter::new(12, 9, 4);
        seg.begin_frame();
        seed_dark(&mut seg, &view, 13, 100);
        let region = seg.grow(&view, 13, 100).expect("region");
        assert_eq!(region.size, 10 * 7);
        assert_eq!(region.bbox.min_x, 1);
        assert_eq!(region.bbox.max_x, 10);
        assert_eq!(region.bbox.max_y, 7);
    }

    #[test]
    fn ids_increase_and_cap_is_enforced() {
        let mut img = frame_with_rect(20, 10, 2, 2, 2, 2);
        for y in 2..4 {
            for x in 10..12 {
                img.put_pixel(x, y, [0, 0, 0]);
            }
        }
        let view = img.view();
        let mut seg = Segmenter::new(20, 10, 1);
        seg.begin_frame();
        let a = 2 * 20 + 2;
        let b = 2 * 20 + 10;
        seed_dark(&mut seg, &view, a, 384);
        seed_dark(&mut seg, &view, b, 384);
        assert_eq!(seg.grow(&view, a, 384).map(|r| r.id), Some(1));
        assert!(seg.is_full());
        assert!(seg.grow(&view, b, 384).is_none());
        assert_eq!(seg.region_count(), 1);

        seg.begin_frame();
        assert_eq!(seg.region_count(), 0);
    }

    #[test]
    fn unlabeled_seed_is_rejected() {
        let img = frame_with_rect(10, 10, 3, 3, 2, 2);
        let view = img.view();
        let mut seg = Segmenter::new(10, 10, 4);
        seg.begin_frame();
        assert!(seg.grow(&view, 3 * 10 + 3, 384).is_none());
        assert!(seg.grow(&view, 0, 384).is_none());
    }

    #[test]
    fn consecutive_regions_share_one_span() {
        // Dark square with a light hole in the middle.
        let mut img = frame_with_rect(16, 16, 4, 4, 8, 8);
        for y in 7..9 {
            for x in 7..9 {
                img.put_pixel(x, y, [255, 255, 255]);
            }
        }
        let view = img.view();
        let mut seg = Segmenter::new(16, 16, 8);
        seg.begin_frame();
        seg.begin_candidate();
        let outer_seed = 4 * 16 + 4;
        seed_dark(&mut seg, &view, outer_seed, 384);
        let outer = seg.grow(&view, outer_seed, 384).expect("outer");
        let hole = 7 * 16 + 7;
        assert_eq!(seg.labels_mut().touch(&view, hole, 384), PixelClass::Light.label());
        let inner = seg.grow(&view, hole, 384).expect("inner");

        assert_eq!(outer.size, 60);
        assert_eq!(inner.size, 4);
        assert_eq!(inner.span.0, outer.span.1);
        assert_eq!(seg.grown_pixels(outer.span.0, inner.span.1).len(), 64);
    }
}
