//! Gaussian draws shaped as vectors and matrices.

use crate::{Array, Matrix};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// A length-`n` vector of i.i.d. standard normal deviates.
pub fn standard_normal_array<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Array {
    Array::from_fn(n, |_, _| StandardNormal.sample(rng))
}

/// A `rows × cols` matrix of i.i.d. standard normal deviates, filled in
/// column-major order.
pub fn standard_normal_matrix<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
    Matrix::from_fn(rows, cols, |_, _| StandardNormal.sample(rng))
}
