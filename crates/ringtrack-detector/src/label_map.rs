//! Per-pixel labels and the flood-fill work list.
//!
//! Both buffers are sized to the frame once, at detector construction, and
//! are reused for every frame afterwards.

use ringtrack_core::{PixelBox, RgbImageView};
use serde::{Deserialize, Serialize};

/// Pixel not classified yet in the current frame.
pub(crate) const UNVISITED: i32 = 0;
/// One-pixel frame edge. Never equal to a class label or a region id, so a
/// flood fill stops there without bounds checks.
pub(crate) const BORDER: i32 = -1000;
/// Classified as dark (`channel_sum <= threshold`), not yet in a region.
pub(crate) const DARK: i32 = -2;
/// Classified as light (`channel_sum > threshold`), not yet in a region.
pub(crate) const LIGHT: i32 = -1;

/// Binarized pixel class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelClass {
    Dark,
    Light,
}

impl PixelClass {
    #[inline]
    pub(crate) fn label(self) -> i32 {
        match self {
            PixelClass::Dark => DARK,
            PixelClass::Light => LIGHT,
        }
    }

    #[inline]
    pub(crate) fn from_label(label: i32) -> Option<Self> {
        match label {
            DARK => Some(PixelClass::Dark),
            LIGHT => Some(PixelClass::Light),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            PixelClass::Dark => PixelClass::Light,
            PixelClass::Light => PixelClass::Dark,
        }
    }
}

#[inline]
pub(crate) fn classify(frame: &RgbImageView<'_>, idx: usize, threshold: i32) -> PixelClass {
    if frame.channel_sum(idx) > threshold {
        PixelClass::Light
    } else {
        PixelClass::Dark
    }
}

/// Label per pixel: [`UNVISITED`], [`BORDER`], a class label, or a positive
/// region id.
pub(crate) struct LabelMap {
    width: usize,
    height: usize,
    labels: Vec<i32>,
}

impl LabelMap {
    /// Caller guarantees `width >= 3 && height >= 3`.
    pub(crate) fn new(width: usize, height: usize) -> Self {
        let mut map = Self {
            width,
            height,
            labels: vec![UNVISITED; width * height],
        };
        map.clear_all();
        map
    }

    #[inline]
    pub(crate) fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.labels.len()
    }

    pub(crate) fn as_slice(&self) -> &[i32] {
        &self.labels
    }

    /// Reset every pixel to unvisited and restore the border sentinel.
    pub(crate) fn clear_all(&mut self) {
        self.labels.fill(UNVISITED);
        let last_row = (self.height - 1) * self.width;
        self.labels[..self.width].fill(BORDER);
        self.labels[last_row..].fill(BORDER);
        for y in 0..self.height {
            self.labels[y * self.width] = BORDER;
            self.labels[y * self.width + self.width - 1] = BORDER;
        }
    }

    /// Reset the pixels around `bbox` (two-pixel margin). The border
    /// sentinel is never touched.
    pub(crate) fn clear_window(&mut self, bbox: &PixelBox) {
        let window = self.interior_window(bbox);
        for y in window.min_y..=window.max_y {
            let row = y * self.width;
            self.labels[row + window.min_x..=row + window.max_x].fill(UNVISITED);
        }
    }

    pub(crate) fn interior_window(&self, bbox: &PixelBox) -> PixelBox {
        let clamped = PixelBox {
            min_x: bbox.min_x.min(self.width - 2),
            min_y: bbox.min_y.min(self.height - 2),
            max_x: bbox.max_x.min(self.width - 2),
            max_y: bbox.max_y.min(self.height - 2),
        };
        clamped.expanded_clamped(2, 1, self.width - 2, self.height - 2)
    }

    #[inline]
    pub(crate) fn get(&self, idx: usize) -> i32 {
        self.labels[idx]
    }

    #[inline]
    pub(crate) fn set(&mut self, idx: usize, label: i32) {
        self.labels[idx] = label;
    }

    /// Classify `idx` on first touch and return its label.
    #[inline]
    pub(crate) fn touch(&mut self, frame: &RgbImageView<'_>, idx: usize, threshold: i32) -> i32 {
        let label = self.labels[idx];
        if label != UNVISITED {
            return label;
        }
        let label = classify(frame, idx, threshold).label();
        self.labels[idx] = label;
        label
    }

    /// Index of the interior pixel closest to `(x, y)`.
    pub(crate) fn interior_index(&self, x: f32, y: f32) -> usize {
        let xi = clamp_coord(x, self.width);
        let yi = clamp_coord(y, self.height);
        yi * self.width + xi
    }
}

fn clamp_coord(v: f32, len: usize) -> usize {
    if !v.is_finite() {
        return 1;
    }
    (v.round().max(1.0) as usize).min(len - 2)
}

/// Flat flood-fill frontier.
///
/// Indices are appended at `end` and consumed from `start`; nothing is ever
/// removed, so `items[..end]` keeps every pixel grown since the last
/// [`WorkList::reset`]. Each pixel is pushed at most once per frame (it is
/// relabeled on push), which bounds `end` by the pixel count.
pub(crate) struct WorkList {
    items: Vec<usize>,
    start: usize,
    end: usize,
}

impl WorkList {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            items: vec![0; capacity],
            start: 0,
            end: 0,
        }
    }

    #[inline]
    pub(crate) fn reset(&mut self) {
        self.start = 0;
        self.end = 0;
    }

    #[inline]
    pub(crate) fn push(&mut self, idx: usize) {
        self.items[self.end] = idx;
        self.end += 1;
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Option<usize> {
        if self.start < self.end {
            let idx = self.items[self.start];
            self.start += 1;
            Some(idx)
        } else {
            None
        }
    }

    #[inline]
    pub(crate) fn end(&self) -> usize {
        self.end
    }

    pub(crate) fn capacity(&self) -> usize {
        self.items.len()
    }

    /// Grown pixels in `from..to` (positions, not pixel indices).
    pub(crate) fn span(&self, from: usize, to: usize) -> &[usize] {
        &self.items[from..to.min(self.end)]
    }
}
