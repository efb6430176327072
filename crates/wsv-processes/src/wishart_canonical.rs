//! Canonical Wishart process with exact elementary flows.
//!
//! The canonical generator splits into
//!
//! * the linear flow `dV = (b_u V + V b_uᵀ) dt`, solved by `V ↦ F V Fᵀ` with
//!   `F = e^{b_u h}`;
//! * for every canonical direction `i < n`, the elementary Wishart flow
//!   `dV = ᾱ eᵢ dt + √V dZ eᵢ + eᵢ dZᵀ √V` together with the return
//!   component `dR = ρ_c,i √V dZ eᵢ` driven by the same noise;
//! * the residual return flow `dR = ρ_⊥ √V dβ` with `V` frozen.
//!
//! An elementary flow only moves row and column `i` of `V`. Writing the
//! other block as `B = Pᵀ L Lᵀ P` (generalized Cholesky, rank `r`) and the
//! off-diagonal column as `x = Pᵀ L ζ`, the Schur complement
//! `s = V_ii − |ζ|²` is a squared Bessel process of dimension `ᾱ − r` and
//! `ζ` is an `r`-dimensional Brownian motion, so the flow is sampled exactly
//! provided `ᾱ ≥ d − 1`. All three flows keep `V` positive semidefinite.

use crate::batch_config::BatchConfig;
use crate::canonical::{CanonicalParameters, CanonicalStepper};
use crate::scheme::CanonicalScheme;
use rand::distributions::Distribution;
use rand::Rng;
use tracing::debug;
use wsv_core::{
    errors::{Error, Result},
    Real, Time,
};
use wsv_math::{
    close_enough, generalized_cholesky_with_scale, matrix_exp,
    matrix_utilities::principal_submatrix, standard_normal_array, symmetric_sqrt, Array, Matrix,
    NoncentralChiSquared,
};

/// Flows precomputed for one step size.
#[derive(Debug, Clone)]
struct PreparedFlows {
    dt: Time,
    // e^{b_u dt}
    full: Matrix,
    // e^{b_u dt / 2}
    half: Matrix,
}

/// Canonical-form Wishart stepper (see the module documentation).
#[derive(Debug, Clone)]
pub struct WishartCanonicalProcess {
    params: CanonicalParameters,
    flows: Option<PreparedFlows>,
}

impl WishartCanonicalProcess {
    /// Canonical parameters.
    pub fn parameters(&self) -> &CanonicalParameters {
        &self.params
    }

    /// Step size the stepper was prepared for, if any.
    pub fn prepared_dt(&self) -> Option<Time> {
        self.flows.as_ref().map(|f| f.dt)
    }

    fn prepared_for(&self, dt: Time) -> Result<&PreparedFlows> {
        let flows = self.flows.as_ref().ok_or_else(|| {
            Error::Uninitialized("canonical Wishart flows have not been prepared".into())
        })?;
        if !close_enough(flows.dt, dt, 64) {
            return Err(Error::StepSizeMismatch {
                prepared: flows.dt,
                requested: dt,
            });
        }
        Ok(flows)
    }

    fn linear_flow(v: &mut Matrix, f: &Matrix) {
        let moved = f * &*v * f.transpose();
        *v = (&moved + moved.transpose()) * 0.5;
    }

    fn residual_flow<R: Rng + ?Sized>(&self, v: &Matrix, r: &mut Array, h: Time, rng: &mut R) -> Result<()> {
        let rho_perp = self.params.residual_correlation;
        if rho_perp == 0.0 {
            return Ok(());
        }
        let sqrt_v = symmetric_sqrt(v)?;
        let z = standard_normal_array(self.params.dimension, rng);
        *r += (sqrt_v * z) * (rho_perp * h.sqrt());
        Ok(())
    }

    fn elementary_flow<R: Rng + ?Sized>(
        &self,
        i: usize,
        v: &mut Matrix,
        r: &mut Array,
        h: Time,
        rng: &mut R,
    ) -> Result<()> {
        let d = self.params.dimension;
        let alpha = self.params.alpha_bar;

        let others: Vec<usize> = (0..d).filter(|&j| j != i).collect();
        let block = principal_submatrix(v, &others);
        let column: Vec<Real> = others.iter().map(|&j| v[(j, i)]).collect();

        let chol = generalized_cholesky_with_scale(&block, v.amax())?;
        let rank = chol.rank();
        let permuted: Vec<Real> = chol.permutation().iter().map(|&p| column[p]).collect();
        let zeta = chol.solve_factor(&permuted)?;
        let schur = (v[(i, i)] - zeta.norm_squared()).max(0.0);

        let zeta_t = &zeta + standard_normal_array(rank, rng) * h.sqrt();
        let bessel = NoncentralChiSquared::new(alpha - rank as Real, schur / h)?;
        let schur_t = h * bessel.sample(rng);

        let lower = chol.lower();
        let mut column_t = vec![0.0; d - 1];
        for (k, &p) in chol.permutation().iter().enumerate() {
            column_t[p] = (0..rank).map(|j| lower[(k, j)] * zeta_t[j]).sum();
        }
        let v_ii = schur_t + zeta_t.norm_squared();

        let rho_i = self.params.correlation[i];
        if rho_i != 0.0 {
            r[i] += 0.5 * rho_i * (v_ii - v[(i, i)] - alpha * h);
            for (k, &j) in others.iter().enumerate() {
                r[j] += rho_i * (column_t[k] - column[k]);
            }
        }

        v[(i, i)] = v_ii;
        for (k, &j) in others.iter().enumerate() {
            v[(i, j)] = column_t[k];
            v[(j, i)] = column_t[k];
        }
        Ok(())
    }
}

impl CanonicalStepper for WishartCanonicalProcess {
    fn from_parameters(parameters: &CanonicalParameters) -> Result<Self> {
        let d = parameters.dimension;
        wsv_core::ensure!(d >= 1, "canonical dimension must be positive");
        wsv_core::ensure!(
            parameters.rank <= d,
            "canonical rank {} exceeds dimension {d}",
            parameters.rank
        );
        if parameters.drift.shape() != (d, d) {
            return Err(Error::matrix_shape("canonical drift b_u", (d, d), parameters.drift.shape()));
        }
        if parameters.correlation.len() != d {
            return Err(Error::vector_len("canonical correlation", d, parameters.correlation.len()));
        }
        wsv_core::ensure!(
            parameters.alpha_bar >= (d - 1) as Real,
            "ᾱ = {} is below d − 1 = {}, the canonical Wishart process is not defined",
            parameters.alpha_bar,
            d - 1
        );
        wsv_core::ensure!(
            parameters.residual_correlation.is_finite() && parameters.residual_correlation >= 0.0,
            "residual correlation must be non-negative, got {}",
            parameters.residual_correlation
        );
        Ok(Self {
            params: parameters.clone(),
            flows: None,
        })
    }

    fn prepare(&mut self, config: &BatchConfig) -> Result<()> {
        config.validate()?;
        let dt = config.dt();
        let full = matrix_exp(&(&self.params.drift * dt))?;
        let half = matrix_exp(&(&self.params.drift * (0.5 * dt)))?;
        debug!(dt, steps = config.steps(), scheme = %config.scheme(), "prepared canonical Wishart flows");
        self.flows = Some(PreparedFlows { dt, full, half });
        Ok(())
    }

    fn is_prepared(&self) -> bool {
        self.flows.is_some()
    }

    fn step<R: Rng + ?Sized>(
        &self,
        v: &Matrix,
        rho: &Array,
        dt: Time,
        scheme: CanonicalScheme,
        rng: &mut R,
    ) -> Result<(Matrix, Array)> {
        let flows = self.prepared_for(dt)?;
        let d = self.params.dimension;
        if v.shape() != (d, d) {
            return Err(Error::matrix_shape("canonical covariance V", (d, d), v.shape()));
        }
        if rho.len() != d {
            return Err(Error::vector_len("canonical returns R", d, rho.len()));
        }
        let n = self.params.rank;
        let mut v = v.clone();
        let mut r = rho.clone();

        match scheme {
            CanonicalScheme::Symmetric => {
                let h = 0.5 * dt;
                Self::linear_flow(&mut v, &flows.half);
                self.residual_flow(&v, &mut r, h, rng)?;
                for i in 0..n {
                    self.elementary_flow(i, &mut v, &mut r, h, rng)?;
                }
                for i in (0..n).rev() {
                    self.elementary_flow(i, &mut v, &mut r, h, rng)?;
                }
                self.residual_flow(&v, &mut r, h, rng)?;
                Self::linear_flow(&mut v, &flows.half);
            }
            CanonicalScheme::RandomOrder => {
                if rng.gen::<bool>() {
                    Self::linear_flow(&mut v, &flows.full);
                    self.residual_flow(&v, &mut r, dt, rng)?;
                    for i in 0..n {
                        self.elementary_flow(i, &mut v, &mut r, dt, rng)?;
                    }
                } else {
                    for i in (0..n).rev() {
                        self.elementary_flow(i, &mut v, &mut r, dt, rng)?;
                    }
                    self.residual_flow(&v, &mut r, dt, rng)?;
                    Self::linear_flow(&mut v, &flows.full);
                }
            }
        }
        Ok((v, r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use wsv_math::{path_rng, IncrementalStatistics};

    fn parameters(d: usize, alpha_bar: Real, drift: Matrix, correlation: Array) -> CanonicalParameters {
        CanonicalParameters {
            dimension: d,
            rank: d,
            alpha_bar,
            drift,
            correlation,
            residual_correlation: 0.0,
        }
    }

    fn prepared(params: &CanonicalParameters, dt: Time) -> WishartCanonicalProcess {
        let mut p = WishartCanonicalProcess::from_parameters(params).unwrap();
        p.prepare(&BatchConfig::new(dt, 1, 1)).unwrap();
        p
    }

    #[test]
    fn rejects_inadmissible_alpha() {
        let params = parameters(3, 1.5, Matrix::zeros(3, 3), Array::zeros(3));
        assert!(matches!(
            WishartCanonicalProcess::from_parameters(&params),
            Err(Error::Precondition(_))
        ));
    }

    #[test]
    fn step_before_prepare_fails() {
        let params = parameters(2, 2.0, Matrix::zeros(2, 2), Array::zeros(2));
        let p = WishartCanonicalProcess::from_parameters(&params).unwrap();
        assert!(!p.is_prepared());
        let mut rng = path_rng(1, 0);
        let res = p.step(&Matrix::identity(2, 2), &Array::zeros(2), 0.1, CanonicalScheme::Symmetric, &mut rng);
        assert!(matches!(res, Err(Error::Uninitialized(_))));
    }

    #[test]
    fn step_size_is_checked() {
        let params = parameters(2, 2.0, Matrix::zeros(2, 2), Array::zeros(2));
        let p = prepared(&params, 0.1);
        assert_eq!(p.prepared_dt(), Some(0.1));
        let mut rng = path_rng(1, 0);
        let res = p.step(&Matrix::identity(2, 2), &Array::zeros(2), 0.05, CanonicalScheme::Symmetric, &mut rng);
        assert!(matches!(res, Err(Error::StepSizeMismatch { .. })));
    }

    #[test]
    fn one_dimensional_flow_is_a_squared_bessel_step() {
        // d = 1: V is a CIR-type process dV = ᾱ dt + 2√V dZ, E[V_h] = V_0 + ᾱ h
        let params = parameters(1, 1.5, Matrix::zeros(1, 1), Array::zeros(1));
        let dt = 0.5;
        let p = prepared(&params, dt);
        let mut rng = path_rng(17, 0);
        let mut stats = IncrementalStatistics::new();
        let v0 = Matrix::from_element(1, 1, 0.3);
        for _ in 0..20_000 {
            let (v, _) = p
                .step(&v0, &Array::zeros(1), dt, CanonicalScheme::RandomOrder, &mut rng)
                .unwrap();
            assert!(v[(0, 0)] >= 0.0);
            stats.add(v[(0, 0)]);
        }
        let expected = 0.3 + 1.5 * dt;
        let mean = stats.mean().unwrap();
        assert!((mean - expected).abs() < 4.0 * stats.error_estimate().unwrap(), "mean {mean}");
    }

    #[test]
    fn mean_of_the_canonical_process() {
        // E[V_t] = e^{bt} V_0 e^{bᵀt} + ᾱ ∫ e^{bs} e^{bᵀs} ds; with b = β I this is
        // e^{2βt} V_0 + ᾱ (e^{2βt} − 1) / (2β) I
        let beta = -0.4;
        let params = parameters(2, 2.5, Matrix::identity(2, 2) * beta, Array::zeros(2));
        let dt = 0.25;
        let p = prepared(&params, dt);
        let v0 = Matrix::from_row_slice(2, 2, &[0.5, 0.1, 0.1, 0.3]);
        let mut rng = path_rng(23, 0);
        let mut diag = IncrementalStatistics::new();
        let mut off = IncrementalStatistics::new();
        for _ in 0..20_000 {
            let mut v = v0.clone();
            let mut r = Array::zeros(2);
            for _ in 0..4 {
                let (v_next, r_next) = p.step(&v, &r, dt, CanonicalScheme::Symmetric, &mut rng).unwrap();
                v = v_next;
                r = r_next;
            }
            diag.add(v[(0, 0)]);
            off.add(v[(0, 1)]);
        }
        let e = (2.0 * beta * 1.0_f64).exp();
        let expected_diag = e * 0.5 + 2.5 * (e - 1.0) / (2.0 * beta);
        let expected_off = e * 0.1;
        // splitting bias in the mean is O(dt²) per unit time, well below 0.01 here
        let (d_mean, o_mean) = (diag.mean().unwrap(), off.mean().unwrap());
        assert!((d_mean - expected_diag).abs() < 4.0 * diag.error_estimate().unwrap() + 0.01, "diag {d_mean}");
        assert!((o_mean - expected_off).abs() < 4.0 * off.error_estimate().unwrap() + 0.01, "off {o_mean}");
    }

    #[test]
    fn flows_keep_v_positive_semidefinite() {
        let drift = Matrix::from_row_slice(3, 3, &[-0.3, 0.2, 0.0, 0.1, -0.5, 0.1, 0.0, 0.3, -0.2]);
        let correlation = Array::from_vec(vec![-0.4, 0.2, 0.1]);
        let mut params = parameters(3, 2.0, drift, correlation);
        params.residual_correlation = 0.5;
        let dt = 0.2;
        let p = prepared(&params, dt);
        let mut rng = path_rng(5, 0);
        // singular starting point
        let mut v = Matrix::from_row_slice(3, 3, &[1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        let mut r = Array::zeros(3);
        for step in 0..200 {
            let scheme = if step % 2 == 0 {
                CanonicalScheme::Symmetric
            } else {
                CanonicalScheme::RandomOrder
            };
            let (v_next, r_next) = p.step(&v, &r, dt, scheme, &mut rng).unwrap();
            v = v_next;
            r = r_next;
            let (values, _) = wsv_math::symmetric_eigen(&v).unwrap();
            assert!(values.min() >= -1e-10 * (1.0 + values.amax()), "eigenvalues {values}");
            assert!(wsv_math::is_symmetric(&v, 0.0));
            assert!(r.iter().all(|x| x.is_finite()));
        }
    }

    #[test]
    fn return_coupling_matches_the_diagonal_move() {
        // With d = 1 and no residual noise, R moves by ρ (ΔV − ᾱ h) / 2.
        let params = parameters(1, 2.0, Matrix::zeros(1, 1), Array::from_vec(vec![0.6]));
        let dt = 0.1;
        let p = prepared(&params, dt);
        let mut rng = path_rng(2, 0);
        let v0 = Matrix::from_element(1, 1, 0.2);
        let (v, r) = p
            .step(&v0, &Array::zeros(1), dt, CanonicalScheme::RandomOrder, &mut rng)
            .unwrap();
        assert_abs_diff_eq!(r[0], 0.3 * (v[(0, 0)] - 0.2 - 2.0 * dt), epsilon = 1e-14);
    }
}
