//! The canonical-form stepper seam.
//!
//! After the change of basis `V = U⁻ᵀ X U⁻¹`, `R = U⁻ᵀ Y`, the covariance
//! part of the model becomes the canonical process
//!
//! ```text
//! dV = (δ + b_u V + V b_uᵀ) dt + √V dZ I_dⁿ + I_dⁿ dZᵀ √V,     δ = ᾱ I_dⁿ
//! dR = √V dZ ρ_c + ρ_⊥ √V dβ
//! ```
//!
//! The Fonseca–Zhou process only consumes this dynamics through
//! [`CanonicalStepper`]; [`crate::wishart_canonical::WishartCanonicalProcess`]
//! is the implementation shipped with the crate.

use crate::batch_config::BatchConfig;
use crate::scheme::CanonicalScheme;
use rand::Rng;
use std::fmt;
use wsv_core::{errors::Result, Real, Time};
use wsv_math::{Array, Matrix};

/// Parameters of the canonical process, derived once from the model
/// parameters and the basis transform.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalParameters {
    /// Dimension `d`.
    pub dimension: usize,
    /// Rank `n` of the volatility-of-volatility Gram matrix.
    pub rank: usize,
    /// Scalar `ᾱ`, so that `δ = ᾱ I_dⁿ`.
    pub alpha_bar: Real,
    /// Canonical drift `b_u = U⁻ᵀ b Uᵀ`.
    pub drift: Matrix,
    /// Canonical correlation `ρ_c` (zero beyond index `n`).
    pub correlation: Array,
    /// Residual correlation `ρ_⊥ = √(|ρ|² − |ρ_c|²)`.
    pub residual_correlation: Real,
}

impl CanonicalParameters {
    /// The canonical mean-reversion level `δ = ᾱ I_dⁿ`.
    pub fn delta(&self) -> Matrix {
        wsv_math::indicator_identity(self.dimension, self.rank) * self.alpha_bar
    }
}

/// A generator of canonical-form transitions `(V, R) ↦ (V', R')`.
///
/// Implementations must keep `V` symmetric positive semidefinite across
/// calls. Shared read-only between worker threads once prepared.
pub trait CanonicalStepper: fmt::Debug + Send + Sync + Sized {
    /// Build the stepper for the given canonical parameters.
    fn from_parameters(parameters: &CanonicalParameters) -> Result<Self>;

    /// Per-batch initializer: precompute whatever depends on the grid.
    fn prepare(&mut self, config: &BatchConfig) -> Result<()>;

    /// Whether [`prepare`](Self::prepare) has run.
    fn is_prepared(&self) -> bool;

    /// Advance `(v, rho)` by `dt`, which must equal the prepared step size.
    fn step<R: Rng + ?Sized>(
        &self,
        v: &Matrix,
        rho: &Array,
        dt: Time,
        scheme: CanonicalScheme,
        rng: &mut R,
    ) -> Result<(Matrix, Array)>;
}
