//! Debug painting of labeled regions onto an RGB frame.

use ringtrack_core::RgbImage;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayMode {
    /// Only the annulus and core of the accepted marker.
    #[default]
    Accepted,
    /// Every region grown in the last frame.
    AllRegions,
}

/// Color for region `id`: one channel off, the other two saturated, cycling
/// with the id so neighbouring regions differ.
pub fn region_color(id: i32) -> [u8; 3] {
    let j = id.rem_euclid(3) as usize;
    let mut rgb = [255u8; 3];
    rgb[j] = 0;
    rgb
}

/// Paint every pixel whose label is a region id accepted by `keep`.
pub(crate) fn paint_labels(labels: &[i32], image: &mut RgbImage, keep: impl Fn(i32) -> bool) {
    for (idx, &label) in labels.iter().enumerate() {
        if label > 0 && keep(label) {
            let (x, y) = (idx % image.width, idx / image.width);
            image.put_pixel(x, y, region_color(label));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_cycle_through_channels() {
        assert_eq!(region_color(1), [255, 0, 255]);
        assert_eq!(region_color(2), [255, 255, 0]);
        assert_eq!(region_color(3), [0, 255, 255]);
        assert_eq!(region_color(4), region_color(1));
    }

    #[test]
    fn paints_only_selected_regions() {
        let mut img = RgbImage::new(3, 2);
        let labels = [0, 1, 2, -1, 1, -1000];
        paint_labels(&labels, &mut img, |id| id == 1);
        assert_eq!(img.pixel(1, 0), [255, 0, 255]);
        assert_eq!(img.pixel(1, 1), [255, 0, 255]);
        assert_eq!(img.pixel(2, 0), [0, 0, 0]);
        assert_eq!(img.pixel(0, 1), [0, 0, 0]);
    }
}
