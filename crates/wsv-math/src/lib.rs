//! # wsv-math
//!
//! Numerical building blocks for Wishart path simulation: dense
//! vector/matrix aliases over nalgebra, the pivoted generalized Cholesky
//! decomposition, symmetric PSD square roots, the noncentral chi-squared
//! sampler, reproducible per-path random streams and small statistics
//! helpers.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use nalgebra::{DMatrix, DVector};
use wsv_core::Real;

// ── Modules ───────────────────────────────────────────────────────────────────

/// Floating-point comparison utilities.
pub mod comparison;

/// Probability distributions and Gaussian draws.
pub mod distributions;

/// Matrix decompositions and matrix functions.
pub mod matrix_utilities;

/// Random number generators and Brownian-bridge helpers.
pub mod random_numbers;

/// Statistics accumulators.
pub mod statistics;

// ── Dense linear algebra types ────────────────────────────────────────────────

/// A dynamically-sized column vector of `Real` values.
pub type Array = DVector<Real>;

/// A dynamically-sized matrix of `Real` values.
pub type Matrix = DMatrix<Real>;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use comparison::close_enough;
pub use distributions::{
    standard_normal_array, standard_normal_matrix, NoncentralChiSquared, StudentTDistribution,
};
pub use matrix_utilities::{
    generalized_cholesky, generalized_cholesky_with_scale, indicator_identity, is_symmetric,
    matrix_exp, positive_part_sqrt, symmetric_eigen, symmetric_sqrt, CholeskyDecomposition,
};
pub use random_numbers::{path_rng, split_increment, PathRng};
pub use statistics::IncrementalStatistics;
