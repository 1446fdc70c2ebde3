use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Inclusive integer bounding box in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl PixelBox {
    /// Box covering a single pixel.
    pub fn from_pixel(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    #[inline]
    pub fn include(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    /// Width in pixels (`max_x - min_x + 1`).
    #[inline]
    pub fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    /// Height in pixels (`max_y - min_y + 1`).
    #[inline]
    pub fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    /// Distance between the extreme columns (`max_x - min_x`).
    #[inline]
    pub fn extent_x(&self) -> usize {
        self.max_x - self.min_x
    }

    /// Distance between the extreme rows (`max_y - min_y`).
    #[inline]
    pub fn extent_y(&self) -> usize {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point2<f32> {
        Point2::new(
            0.5 * (self.min_x + self.max_x) as f32,
            0.5 * (self.min_y + self.max_y) as f32,
        )
    }

    /// Grow by `margin` on every side, clamped to `[lo, hi_x] x [lo, hi_y]`.
    pub fn expanded_clamped(&self, margin: usize, lo: usize, hi_x: usize, hi_y: usize) -> Self {
        Self {
            min_x: self.min_x.saturating_sub(margin).max(lo),
            min_y: self.min_y.saturating_sub(margin).max(lo),
            max_x: (self.max_x + margin).min(hi_x),
            max_y: (self.max_y + margin).min(hi_y),
        }
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}
