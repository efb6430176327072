//! Probability distributions.
//!
//! Provides the noncentral chi-squared sampler behind exact squared-Bessel
//! transitions, Gaussian vector/matrix draws, and Student-t quantiles for
//! Monte-Carlo confidence intervals (via `statrs`).

pub mod noncentral_chi_squared;
pub mod normal;
pub mod student_t;

pub use noncentral_chi_squared::NoncentralChiSquared;
pub use normal::{standard_normal_array, standard_normal_matrix};
pub use student_t::StudentTDistribution;
