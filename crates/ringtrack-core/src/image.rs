//! Interleaved 8-bit RGB frames.

/// Number of interleaved channels per pixel.
pub const CHANNELS: usize = 3;

/// Largest value of [`RgbImageView::channel_sum`].
pub const MAX_CHANNEL_SUM: i32 = 3 * 255;

/// Errors raised when wrapping a raw pixel buffer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame buffer holds {actual} bytes, expected {expected} for a {width}x{height} RGB frame")]
    BufferLength {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },
}

/// Borrowed RGB frame, row-major, `data.len() == width * height * 3`.
#[derive(Clone, Copy, Debug)]
pub struct RgbImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

impl<'a> RgbImageView<'a> {
    /// Wrap a raw buffer, checking that its length matches the dimensions.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, FrameError> {
        let expected = width * height * CHANNELS;
        if data.len() != expected {
            return Err(FrameError::BufferLength {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Sum of the three channels of the pixel at linear index `idx` (0..=765).
    #[inline]
    pub fn channel_sum(&self, idx: usize) -> i32 {
        let base = idx * CHANNELS;
        self.data[base] as i32 + self.data[base + 1] as i32 + self.data[base + 2] as i32
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let base = (y * self.width + x) * CHANNELS;
        [self.data[base], self.data[base + 1], self.data[base + 2]]
    }
}

/// Owned RGB frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbImage {
    /// All-black frame.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * CHANNELS],
        }
    }

    /// Frame filled with one color.
    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width * height * CHANNELS);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn view(&self) -> RgbImageView<'_> {
        RgbImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        self.view().pixel(x, y)
    }

    #[inline]
    pub fn put_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let base = (y * self.width + x) * CHANNELS;
        self.data[base..base + CHANNELS].copy_from_slice(&rgb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_rejects_short_buffer() {
        let data = vec![0u8; 10];
        let err = RgbImageView::new(2, 2, &data).unwrap_err();
        assert_eq!(
            err,
            FrameError::BufferLength {
                width: 2,
                height: 2,
                expected: 12,
                actual: 10
            }
        );
    }

    #[test]
    fn channel_sum_covers_full_range() {
        let mut img = RgbImage::new(3, 1);
        img.put_pixel(1, 0, [255, 255, 255]);
        img.put_pixel(2, 0, [10, 20, 30]);
        let view = img.view();
        assert_eq!(view.channel_sum(0), 0);
        assert_eq!(view.channel_sum(1), MAX_CHANNEL_SUM);
        assert_eq!(view.channel_sum(2), 60);
        assert_eq!(view.pixel(2, 0), [10, 20, 30]);
    }
}
