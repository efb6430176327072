//! Floating-point comparison utilities.

use crate::Matrix;
use wsv_core::Real;

/// Return `true` if `|a - b| <= n * epsilon` where `epsilon` is the
/// machine-epsilon relative to `max(|a|, |b|)`.
#[inline]
pub fn close_enough(a: Real, b: Real, n: u32) -> bool {
    if a == b {
        return true;
    }
    let eps = (a.abs().max(b.abs())) * f64::EPSILON * n as f64;
    (a - b).abs() <= eps
}

/// Largest absolute entry-wise difference between two equally-shaped
/// matrices, or `None` when the shapes differ.
pub fn max_abs_difference(a: &Matrix, b: &Matrix) -> Option<Real> {
    if a.shape() != b.shape() {
        return None;
    }
    Some(
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, Real::max),
    )
}
