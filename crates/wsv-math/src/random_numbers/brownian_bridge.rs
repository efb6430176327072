//! Brownian-bridge split of a Wiener increment.
//!
//! Given the increment `g = W(t + Δt) − W(t)`, the value at the midpoint
//! conditioned on `g` is Gaussian with mean `g/2` and variance `Δt/4`. The
//! split draws it from an independent standard normal vector `z`:
//!
//! ```text
//! g₁ = g/2 + √(Δt/4) · z,     g₂ = g − g₁
//! ```
//!
//! `g₁` and `g₂` are then independent `N(0, Δt/2)` increments whose sum is
//! `g` (to within one rounding per component).

use crate::Array;
use rand::Rng;
use wsv_core::{
    errors::{Error, Result},
    Real, Time,
};

/// Split the full-step increment `g` into two half-step increments using the
/// auxiliary standard normal vector `z`.
///
/// `g₂` is computed as `g − g₁` in floating point, so `g₁ + g₂` equals `g`
/// only up to rounding (a few ulp per component), not bit for bit.
pub fn split_increment(g: &Array, dt: Time, z: &Array) -> Result<(Array, Array)> {
    if z.len() != g.len() {
        return Err(Error::vector_len("bridge auxiliary normals", g.len(), z.len()));
    }
    wsv_core::ensure!(dt >= 0.0, "time step must be non-negative, got {dt}");
    let spread: Real = (0.25 * dt).sqrt();
    let first = g * 0.5 + z * spread;
    let second = g - &first;
    Ok((first, second))
}

/// [`split_increment`] drawing the auxiliary normals from `rng`.
pub fn bridge_split<R: Rng + ?Sized>(g: &Array, dt: Time, rng: &mut R) -> Result<(Array, Array)> {
    let z = crate::distributions::standard_normal_array(g.len(), rng);
    split_increment(g, dt, &z)
}
