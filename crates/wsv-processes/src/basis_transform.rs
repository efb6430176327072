//! Change of basis to canonical form.
//!
//! With `G = aᵀa` and its generalized Cholesky decomposition
//! `P G Pᵀ = [c; k][c; k]ᵀ` of rank `n`, let `M` be the identity with its
//! leading `n` columns replaced by `[c; k]`. Then
//!
//! ```text
//! Uᵀ = Pᵀ M,    U = Mᵀ P,    Uᵀ I_dⁿ U = G
//! ```
//!
//! so that `α = ᾱ G` becomes `δ = ᾱ I_dⁿ` in the coordinates
//! `V = U⁻ᵀ X U⁻¹`. `M` is lower triangular with a positive diagonal and is
//! therefore always invertible.

use crate::canonical::CanonicalParameters;
use crate::fonseca_zhou_process::FonsecaZhouParameters;
use wsv_core::{
    errors::{Error, Result},
    Real,
};
use wsv_math::{
    comparison::max_abs_difference, generalized_cholesky, indicator_identity, Array, Matrix,
};

const IDENTITY_TOLERANCE: Real = 1e-8;

/// The matrices `U`, `U⁻¹` and the rank `n` derived from `a`.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisTransform {
    u: Matrix,
    u_inv: Matrix,
    rank: usize,
}

impl BasisTransform {
    /// Build the transform from the volatility-of-volatility matrix `a`.
    ///
    /// Fails with [`Error::Decomposition`] if `aᵀa` cannot be decomposed or
    /// `M` cannot be inverted, and with [`Error::Postcondition`] if the
    /// resulting `U` does not reproduce `aᵀa`.
    pub fn new(a: &Matrix) -> Result<Self> {
        let d = a.nrows();
        if !a.is_square() {
            return Err(Error::matrix_shape("a", (d, d), a.shape()));
        }
        let gram = a.transpose() * a;
        let gram = (&gram + gram.transpose()) * 0.5;
        let chol = generalized_cholesky(&gram)?;
        let n = chol.rank();

        let lower = chol.lower();
        let m = Matrix::from_fn(d, d, |i, j| {
            if j < n {
                lower[(i, j)]
            } else if i == j {
                1.0
            } else {
                0.0
            }
        });
        let m_inv = m
            .clone()
            .try_inverse()
            .ok_or_else(|| Error::Decomposition("basis matrix M is singular".into()))?;

        let p = chol.permutation_matrix();
        let u = m.transpose() * &p;
        let u_inv = p.transpose() * m_inv.transpose();

        let scale = 1.0 + gram.amax();
        let round_trip = max_abs_difference(&(&u * &u_inv), &Matrix::identity(d, d)).unwrap_or(Real::INFINITY);
        wsv_core::ensure_post!(
            round_trip <= IDENTITY_TOLERANCE * scale,
            "U U⁻¹ differs from the identity by {round_trip}"
        );
        let reproduced = u.transpose() * indicator_identity(d, n) * &u;
        let gram_error = max_abs_difference(&reproduced, &gram).unwrap_or(Real::INFINITY);
        wsv_core::ensure_post!(
            gram_error <= IDENTITY_TOLERANCE * scale,
            "Uᵀ I_dⁿ U differs from aᵀa by {gram_error}"
        );

        Ok(Self { u, u_inv, rank: n })
    }

    /// The change-of-basis matrix `U`.
    pub fn u(&self) -> &Matrix {
        &self.u
    }

    /// Its inverse `U⁻¹`.
    pub fn u_inv(&self) -> &Matrix {
        &self.u_inv
    }

    /// Rank `n` of `aᵀa`.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Dimension `d`.
    pub fn dimension(&self) -> usize {
        self.u.nrows()
    }

    /// `(U⁻ᵀ X U⁻¹, U⁻ᵀ Y)`. The covariance part is symmetrized.
    pub fn to_canonical(&self, x: &Matrix, y: &Array) -> (Matrix, Array) {
        let u_inv_t = self.u_inv.transpose();
        let v = &u_inv_t * x * &self.u_inv;
        let r = &u_inv_t * y;
        (symmetrize(v), r)
    }

    /// `(Uᵀ V U, Uᵀ R)`. The covariance part is symmetrized.
    pub fn from_canonical(&self, v: &Matrix, r: &Array) -> (Matrix, Array) {
        let u_t = self.u.transpose();
        let x = &u_t * v * &self.u;
        let y = &u_t * r;
        (symmetrize(x), y)
    }

    /// Canonical drift, correlations and `ᾱ` for the given model parameters.
    pub fn canonical_parameters(&self, params: &FonsecaZhouParameters) -> Result<CanonicalParameters> {
        let d = self.dimension();
        let n = self.rank;
        if params.dimension() != d {
            return Err(Error::matrix_shape("a", (params.dimension(), params.dimension()), (d, d)));
        }
        let u_inv_t = self.u_inv.transpose();

        let drift = &u_inv_t * params.b() * self.u.transpose();

        let delta = &u_inv_t * params.alpha() * &self.u_inv;
        let target = indicator_identity(d, n) * params.alpha_bar();
        let delta_error = max_abs_difference(&delta, &target).unwrap_or(Real::INFINITY);
        wsv_core::ensure_post!(
            delta_error <= IDENTITY_TOLERANCE * (1.0 + params.alpha_bar().abs()),
            "U⁻ᵀ α U⁻¹ differs from ᾱ I_dⁿ by {delta_error}"
        );

        let a_tilde = params.a() * &self.u_inv;
        let mut correlation = a_tilde.transpose() * params.rho();
        for j in n..d {
            correlation[j] = 0.0;
        }
        let residual = (params.rho().norm_squared() - correlation.norm_squared()).max(0.0);

        Ok(CanonicalParameters {
            dimension: d,
            rank: n,
            alpha_bar: params.alpha_bar(),
            drift,
            correlation,
            residual_correlation: residual.sqrt(),
        })
    }
}

// (m + mᵀ) / 2 is exactly symmetric in floating point.
fn symmetrize(m: Matrix) -> Matrix {
    (&m + m.transpose()) * 0.5
}
