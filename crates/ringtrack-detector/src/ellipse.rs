//! Moment-based ellipse fitting for grown pixel sets.
//!
//! Everything here is closed form: the covariance of the member pixel
//! coordinates gives a 2x2 symmetric matrix whose eigenvalues are the squared
//! moment axes. For a uniformly filled ellipse with semi-axes `a, b` the moment
//! axes are `a / 2` and `b / 2`, so `4π·m0·m1` equals the pixel count and the
//! circularity ratio is 1.

use std::f64::consts::PI;

use nalgebra::{Point2, Vector2};

/// Mean and covariance of a set of pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SecondMoments {
    pub mean: Point2<f64>,
    /// `Σ dx² / n`
    pub cxx: f64,
    /// `Σ dx·dy / n`
    pub cxy: f64,
    /// `Σ dy² / n`
    pub cyy: f64,
    pub count: usize,
}

impl SecondMoments {
    /// Moments of the pixels at linear indices `indices` in a frame of the
    /// given width. `None` for an empty set.
    pub fn from_indices(indices: &[usize], width: usize) -> Option<Self> {
        if indices.is_empty() || width == 0 {
            return None;
        }
        let n = indices.len() as f64;
        let (mut sx, mut sy) = (0.0f64, 0.0f64);
        for &idx in indices {
            sx += (idx % width) as f64;
            sy += (idx / width) as f64;
        }
        let mean = Point2::new(sx / n, sy / n);

        let (mut cxx, mut cxy, mut cyy) = (0.0f64, 0.0f64, 0.0f64);
        for &idx in indices {
            let dx = (idx % width) as f64 - mean.x;
            let dy = (idx / width) as f64 - mean.y;
            cxx += dx * dx;
            cxy += dx * dy;
            cyy += dy * dy;
        }
        Some(Self {
            mean,
            cxx: cxx / n,
            cxy: cxy / n,
            cyy: cyy / n,
            count: indices.len(),
        })
    }
}

/// Principal moment axes of a pixel set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MomentAxes {
    /// `sqrt` of the larger covariance eigenvalue.
    pub major: f64,
    /// `sqrt` of the smaller covariance eigenvalue.
    pub minor: f64,
    /// Unit vector along the major axis. `(1, 0)` when the axes are equal.
    pub direction: Vector2<f64>,
}

/// Relative eigenvector magnitude below which the orientation is undefined.
const ISOTROPIC_EPS: f64 = 1e-9;

/// Eigen-decomposition of the covariance matrix in closed form.
///
/// `None` if the moments are degenerate (not finite, or the smaller
/// eigenvalue is not positive, as for a single row of pixels).
pub fn principal_axes(m: &SecondMoments) -> Option<MomentAxes> {
    let trace = m.cxx + m.cyy;
    let det = m.cxx * m.cyy - m.cxy * m.cxy;
    // trace² - 4·det, written in the form that cannot go negative through
    // cancellation for nearly circular sets.
    let diff = m.cxx - m.cyy;
    let disc = diff * diff + 4.0 * m.cxy * m.cxy;
    if !disc.is_finite() || !det.is_finite() || disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let f0 = 0.5 * (trace + root);
    let f1 = 0.5 * (trace - root);
    if f1 <= 0.0 {
        return None;
    }

    // Two algebraic forms of the f0 eigenvector; use the better conditioned.
    let a = Vector2::new(-m.cxy, m.cxx - f0);
    let b = Vector2::new(f0 - m.cyy, m.cxy);
    let v = if a.norm_squared() >= b.norm_squared() { a } else { b };
    let norm = v.norm();
    let direction = if norm > ISOTROPIC_EPS * f0 {
        let d = v / norm;
        // Fix the sign so the direction points into the right half-plane.
        if d.x < 0.0 || (d.x == 0.0 && d.y < 0.0) {
            -d
        } else {
            d
        }
    } else {
        Vector2::new(1.0, 0.0)
    };

    Some(MomentAxes {
        major: f0.sqrt(),
        minor: f1.sqrt(),
        direction,
    })
}

/// `4π·m0·m1 / count`: 1.0 for a filled ellipse.
pub fn circularity(axes: &MomentAxes, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    4.0 * PI * axes.major * axes.minor / count as f64
}

/// Offset `t` compensating discretization leakage between the inner and
/// outer ellipse of a ring.
///
/// Solves `(1-r)t² - ((m0i+m1i) + r(m0o+m1o))t + (m0i·m1i - r·m0o·m1o) = 0`
/// for the small root. Inner axes shrink by `t`, outer axes grow by `t`, after
/// which the corrected areas satisfy `inner = r · outer` exactly. `None` when
/// the quadratic has no real root or `r` is not in `(0, 1)`.
pub fn leakage_offset(inner: [f64; 2], outer: [f64; 2], r: f64) -> Option<f64> {
    let a = 1.0 - r;
    if !(a > 0.0 && r > 0.0) {
        return None;
    }
    let b = -(inner[0] + inner[1]) - r * (outer[0] + outer[1]);
    let c = inner[0] * inner[1] - r * outer[0] * outer[1];
    let disc = b * b - 4.0 * a * c;
    if !disc.is_finite() || disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / (2.0 * a);
    t.is_finite().then_some(t)
}

/// Final geometry of an accepted ring.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct RingFit {
    pub center: Point2<f64>,
    /// Leakage-corrected outer moment axes.
    pub axes: [f64; 2],
    pub direction: Vector2<f64>,
    pub circularity: f64,
    pub leakage: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum FitRejection {
    Empty,
    Degenerate,
    Circularity(f64),
    Leakage,
}

/// Fit the marker from the union of its outer and inner pixels.
///
/// `inner_size / union.len()` scales the outer axes into an inner estimate
/// before the leakage correction.
pub(crate) fn fit_ring(
    union: &[usize],
    width: usize,
    inner_size: usize,
    diameter_ratio: f32,
    circularity_tolerance: f32,
) -> Result<RingFit, FitRejection> {
    let moments = SecondMoments::from_indices(union, width).ok_or(FitRejection::Empty)?;
    let axes = principal_axes(&moments).ok_or(FitRejection::Degenerate)?;

    let circ = circularity(&axes, moments.count);
    if !((circ - 1.0).abs() < circularity_tolerance as f64) {
        return Err(FitRejection::Circularity(circ));
    }

    let r = (diameter_ratio as f64).powi(2);
    let scale = (inner_size as f64 / moments.count as f64).sqrt();
    let outer = [axes.major, axes.minor];
    let inner = [scale * axes.major, scale * axes.minor];
    let t = leakage_offset(inner, outer, r).ok_or(FitRejection::Leakage)?;
    let corrected = [outer[0] + t, outer[1] + t];
    if !(corrected[1] > 0.0) {
        return Err(FitRejection::Leakage);
    }

    Ok(RingFit {
        center: moments.mean,
        axes: corrected,
        direction: axes.direction,
        circularity: circ,
        leakage: t,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ellipse_indices(width: usize, cx: f64, cy: f64, a: f64, b: f64, angle: f64) -> Vec<usize> {
        let (s, c) = angle.sin_cos();
        let mut out = Vec::new();
        for y in 0..width {
            for x in 0..width {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                let u = dx * c + dy * s;
                let v = -dx * s + dy * c;
                if (u / a).powi(2) + (v / b).powi(2) < 1.0 {
                    out.push(y * width + x);
                }
            }
        }
        out
    }

    #[test]
    fn disk_moments_are_half_radius() {
        let idx = ellipse_indices(200, 100.0, 100.0, 40.0, 40.0, 0.0);
        let m = SecondMoments::from_indices(&idx, 200).expect("moments");
        assert_relative_eq!(m.mean.x, 100.0, epsilon = 1e-9);
        assert_relative_eq!(m.mean.y, 100.0, epsilon = 1e-9);
        assert!(m.cxy.abs() < 1e-9);

        let axes = principal_axes(&m).expect("axes");
        assert_relative_eq!(axes.major, 20.0, max_relative = 0.01);
        assert_relative_eq!(axes.minor, 20.0, max_relative = 0.01);
        assert_relative_eq!(circularity(&axes, m.count), 1.0, epsilon = 0.01);
    }

    #[test]
    fn perfectly_isotropic_moments_default_to_zero_angle() {
        let m = SecondMoments {
            mean: Point2::new(0.0, 0.0),
            cxx: 25.0,
            cxy: 0.0,
            cyy: 25.0,
            count: 100,
        };
        let axes = principal_axes(&m).expect("axes");
        assert_eq!(axes.direction, Vector2::new(1.0, 0.0));
        assert!(axes.major.is_finite() && axes.minor.is_finite());
        assert_relative_eq!(axes.major, 5.0);
    }

    #[test]
    fn axis_aligned_ellipse_has_horizontal_direction() {
        // cxy = 0 and cxx = f0: the first eigenvector form vanishes.
        let idx = ellipse_indices(200, 100.0, 100.0, 60.0, 30.0, 0.0);
        let m = SecondMoments::from_indices(&idx, 200).expect("moments");
        let axes = principal_axes(&m).expect("axes");
        assert_relative_eq!(axes.direction.x, 1.0, epsilon = 1e-6);
        assert!(axes.direction.y.abs() < 1e-6);
        assert_relative_eq!(axes.major / axes.minor, 2.0, max_relative = 0.02);
    }

    #[test]
    fn rotated_ellipse_direction() {
        let angle = 30f64.to_radians();
        let idx = ellipse_indices(200, 100.0, 100.0, 60.0, 25.0, angle);
        let m = SecondMoments::from_indices(&idx, 200).expect("moments");
        let axes = principal_axes(&m).expect("axes");
        let expected = Vector2::new(angle.cos(), angle.sin());
        assert!(axes.direction.dot(&expected).abs() > 0.999);
        assert_relative_eq!(axes.direction.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(circularity(&axes, m.count), 1.0, epsilon = 0.02);
    }

    #[test]
    fn degenerate_sets_are_rejected() {
        assert!(SecondMoments::from_indices(&[], 10).is_none());
        // A single row has zero variance across it.
        let row: Vec<usize> = (10..30).collect();
        let m = SecondMoments::from_indices(&row, 100).expect("moments");
        assert!(principal_axes(&m).is_none());

        let nan = SecondMoments {
            mean: Point2::new(0.0, 0.0),
            cxx: f64::NAN,
            cxy: 0.0,
            cyy: 1.0,
            count: 1,
        };
        assert!(principal_axes(&nan).is_none());
    }

    #[test]
    fn leakage_correction_restores_area_ratio() {
        let r = 0.25;
        let outer = [19.6, 19.4];
        let inner = [10.3, 10.2];
        let t = leakage_offset(inner, outer, r).expect("root");
        assert!(t > 0.0 && t < 1.0, "t = {t}");
        let ci = [inner[0] - t, inner[1] - t];
        let co = [outer[0] + t, outer[1] + t];
        assert_relative_eq!(ci[0] * ci[1], r * co[0] * co[1], max_relative = 1e-9);
    }

    #[test]
    fn leakage_correction_is_idempotent() {
        let r = 0.25;
        let outer = [20.4, 19.7];
        let inner = [10.9, 10.6];
        let t = leakage_offset(inner, outer, r).expect("root");
        let ci = [inner[0] - t, inner[1] - t];
        let co = [outer[0] + t, outer[1] + t];
        let t2 = leakage_offset(ci, co, r).expect("second root");
        assert!(t2.abs() < 1e-9, "second correction {t2}");
    }

    #[test]
    fn leakage_rejects_invalid_ratio_and_complex_roots() {
        assert!(leakage_offset([1.0, 1.0], [2.0, 2.0], 1.0).is_none());
        assert!(leakage_offset([1.0, 1.0], [2.0, 2.0], 0.0).is_none());
        assert!(leakage_offset([f64::NAN, 1.0], [2.0, 2.0], 0.25).is_none());
        // b² = 30.25 < 4ac = 89.25: no real root.
        assert!(leakage_offset([5.0, 5.0], [-19.0, 1.0], 0.25).is_none());
    }

    #[test]
    fn fit_ring_on_rendered_marker() {
        let width = 200;
        let union = ellipse_indices(width, 100.0, 100.0, 40.0, 40.0, 0.0);
        let inner = ellipse_indices(width, 100.0, 100.0, 20.0, 20.0, 0.0);
        let fit = fit_ring(&union, width, inner.len(), 0.5, 0.1).expect("fit");
        assert_relative_eq!(fit.center.x, 100.0, epsilon = 1e-9);
        assert_relative_eq!(2.0 * fit.axes[0], 40.0, max_relative = 0.02);
        assert!(fit.leakage.abs() < 0.5);
    }

    #[test]
    fn fit_ring_rejects_non_elliptic_sets() {
        // A filled square: 4π·m0·m1/n = π/3.
        let width = 100;
        let mut square = Vec::new();
        for y in 20..60 {
            for x in 20..60 {
                square.push(y * width + x);
            }
        }
        let err = fit_ring(&square, width, 400, 0.5, 0.02).unwrap_err();
        assert!(matches!(err, FitRejection::Circularity(_)));
        assert_eq!(fit_ring(&[], width, 0, 0.5, 0.1).unwrap_err(), FitRejection::Empty);
    }
}
