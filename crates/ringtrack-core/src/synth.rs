//! Synthetic ring marker rendering.
//!
//! Used by unit tests, integration tests and benchmarks across the workspace
//! to produce frames with a known marker pose. Rendering is hard-edged: a
//! pixel belongs to the zone that contains its center.

use nalgebra::Point2;

use crate::RgbImage;

/// Elliptical ring marker: an outer ellipse with a concentric inner ellipse
/// sharing the same orientation.
#[derive(Clone, Copy, Debug)]
pub struct RingShape {
    pub center: Point2<f32>,
    /// Outer semi-axes (along `angle`, across `angle`).
    pub outer_axes: [f32; 2],
    /// Inner semi-axes.
    pub inner_axes: [f32; 2],
    /// Major-axis direction in radians, image coordinates (y down).
    pub angle: f32,
}

/// Which part of a [`RingShape`] a pixel falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RingZone {
    Background,
    Ring,
    Core,
}

impl RingShape {
    /// Circular ring with the given radii.
    pub fn circle(center: Point2<f32>, outer_radius: f32, inner_radius: f32) -> Self {
        Self {
            center,
            outer_axes: [outer_radius, outer_radius],
            inner_axes: [inner_radius, inner_radius],
            angle: 0.0,
        }
    }

    /// Ellipse with the inner axes scaled from the outer ones by `diameter_ratio`.
    pub fn ellipse(center: Point2<f32>, outer_axes: [f32; 2], diameter_ratio: f32, angle: f32) -> Self {
        Self {
            center,
            outer_axes,
            inner_axes: [outer_axes[0] * diameter_ratio, outer_axes[1] * diameter_ratio],
            angle,
        }
    }

    pub fn zone(&self, x: f32, y: f32) -> RingZone {
        let (sin_a, cos_a) = self.angle.sin_cos();
        let dx = x - self.center.x;
        let dy = y - self.center.y;
        let u = dx * cos_a + dy * sin_a;
        let v = -dx * sin_a + dy * cos_a;
        if normalized_radius_sq(u, v, self.inner_axes) < 1.0 {
            RingZone::Core
        } else if normalized_radius_sq(u, v, self.outer_axes) < 1.0 {
            RingZone::Ring
        } else {
            RingZone::Background
        }
    }
}

fn normalized_radius_sq(u: f32, v: f32, axes: [f32; 2]) -> f32 {
    let a = u / axes[0];
    let b = v / axes[1];
    a * a + b * b
}

/// Render `shape` on a uniform background.
pub fn render_ring(
    width: usize,
    height: usize,
    shape: &RingShape,
    ring: [u8; 3],
    core: [u8; 3],
    background: [u8; 3],
) -> RgbImage {
    let mut img = RgbImage::filled(width, height, background);
    draw_ring(&mut img, shape, ring, core);
    img
}

/// Paint `shape` into an existing frame, leaving background pixels untouched.
pub fn draw_ring(img: &mut RgbImage, shape: &RingShape, ring: [u8; 3], core: [u8; 3]) {
    for y in 0..img.height {
        for x in 0..img.width {
            match shape.zone(x as f32, y as f32) {
                RingZone::Ring => img.put_pixel(x, y, ring),
                RingZone::Core => img.put_pixel(x, y, core),
                RingZone::Background => {}
            }
        }
    }
}

/// Black ring with a white core on a white background.
pub fn render_dark_ring(width: usize, height: usize, shape: &RingShape) -> RgbImage {
    render_ring(width, height, shape, [0, 0, 0], [255, 255, 255], [255, 255, 255])
}
