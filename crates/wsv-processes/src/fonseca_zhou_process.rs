//! Fonseca–Zhou Wishart stochastic-volatility process.
//!
//! The model couples a vector of log-returns `Y` to a matrix-valued
//! instantaneous covariance `X`:
//!
//! ```text
//! dY = (r − ½ diag X) dt + √X (ρ̄ dB + dW ρ)
//! dX = (α + bX + Xbᵀ) dt + √X dW a + aᵀ dWᵀ √X,      α = ᾱ aᵀa
//! ```
//!
//! with `ρ̄ = √(1 − |ρ|²)`. The generator splits into a return-only part
//! (`X` frozen, exact Gaussian step for `Y`) and a canonical part handled in
//! the basis of [`BasisTransform`] by a [`CanonicalStepper`]. Grid steps are
//! composed from these operators according to a [`SplittingScheme`]; a joint
//! Euler–Maruyama step is kept as first-order baseline.

use crate::basis_transform::BasisTransform;
use crate::batch_config::BatchConfig;
use crate::canonical::CanonicalStepper;
use crate::scheme::{CanonicalScheme, SplittingScheme};
use crate::wishart_canonical::WishartCanonicalProcess;
use rand::Rng;
use tracing::debug;
use wsv_core::{
    errors::{Error, Result},
    Rate, Real, Time,
};
use wsv_math::{
    positive_part_sqrt, random_numbers::brownian_bridge::bridge_split, standard_normal_array,
    standard_normal_matrix, symmetric_sqrt, Array, Matrix,
};

/// Slack allowed on `|ρ| ≤ 1`.
const CORRELATION_TOLERANCE: Real = 1e-12;

// ─── Parameters ──────────────────────────────────────────────────────────────

/// Model parameters `(r, ρ, ᾱ, a, b)`.
///
/// * `r`  — drift rate of the returns
/// * `ρ`  — correlation vector, `|ρ| ≤ 1`; its length fixes `d`
/// * `ᾱ`  — scalar with `α = ᾱ aᵀa`
/// * `a`  — volatility of volatility, `d × d`
/// * `b`  — covariance drift, `d × d`
#[derive(Debug, Clone, PartialEq)]
pub struct FonsecaZhouParameters {
    r: Rate,
    rho: Array,
    alpha_bar: Real,
    a: Matrix,
    b: Matrix,
}

impl FonsecaZhouParameters {
    /// Validate and bundle the parameters.
    pub fn new(r: Rate, rho: Array, alpha_bar: Real, a: Matrix, b: Matrix) -> Result<Self> {
        let d = rho.len();
        wsv_core::ensure!(d >= 1, "correlation vector must not be empty");
        if a.shape() != (d, d) {
            return Err(Error::matrix_shape("a", (d, d), a.shape()));
        }
        if b.shape() != (d, d) {
            return Err(Error::matrix_shape("b", (d, d), b.shape()));
        }
        wsv_core::ensure!(r.is_finite(), "drift rate must be finite, got {r}");
        wsv_core::ensure!(
            alpha_bar.is_finite() && alpha_bar >= 0.0,
            "ᾱ must be finite and non-negative, got {alpha_bar}"
        );
        wsv_core::ensure!(
            rho.iter().chain(a.iter()).chain(b.iter()).all(|v| v.is_finite()),
            "ρ, a and b must have finite entries"
        );
        let norm = rho.norm();
        wsv_core::ensure!(
            norm <= 1.0 + CORRELATION_TOLERANCE,
            "correlation vector must have norm at most 1, got {norm}"
        );
        Ok(Self {
            r,
            rho,
            alpha_bar,
            a,
            b,
        })
    }

    /// Dimension `d`.
    pub fn dimension(&self) -> usize {
        self.rho.len()
    }

    /// Drift rate `r`.
    pub fn r(&self) -> Rate {
        self.r
    }

    /// Correlation vector `ρ`.
    pub fn rho(&self) -> &Array {
        &self.rho
    }

    /// Complementary correlation `ρ̄ = √(1 − |ρ|²)`.
    pub fn rho_bar(&self) -> Real {
        (1.0 - self.rho.norm_squared()).max(0.0).sqrt()
    }

    /// Scalar `ᾱ`.
    pub fn alpha_bar(&self) -> Real {
        self.alpha_bar
    }

    /// Mean-reversion level `α = ᾱ aᵀa` (exactly symmetric).
    pub fn alpha(&self) -> Matrix {
        let gram = self.a.transpose() * &self.a;
        (&gram + gram.transpose()) * (0.5 * self.alpha_bar)
    }

    /// Volatility of volatility `a`.
    pub fn a(&self) -> &Matrix {
        &self.a
    }

    /// Covariance drift `b`.
    pub fn b(&self) -> &Matrix {
        &self.b
    }
}

// ─── State ───────────────────────────────────────────────────────────────────

/// The pair `(X, Y)` at one grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelState {
    /// Instantaneous covariance `X` (`d × d`, symmetric PSD).
    pub x: Matrix,
    /// Log-returns `Y` (length `d`).
    pub y: Array,
}

impl ModelState {
    /// Bundle a covariance matrix and a return vector.
    pub fn new(x: Matrix, y: Array) -> Self {
        Self { x, y }
    }

    /// `true` if every entry of `X` and `Y` is finite.
    pub fn is_finite(&self) -> bool {
        self.x.iter().chain(self.y.iter()).all(|v| v.is_finite())
    }
}

// ─── Process ─────────────────────────────────────────────────────────────────

/// The Fonseca–Zhou process with its basis transform and canonical stepper.
///
/// The stepper must be prepared for a batch (see [`prepare`](Self::prepare))
/// before any splitting scheme is used; the Euler scheme needs no
/// preparation.
#[derive(Debug, Clone)]
pub struct FonsecaZhouProcess<G = WishartCanonicalProcess> {
    params: FonsecaZhouParameters,
    rho_bar: Real,
    alpha: Matrix,
    basis: BasisTransform,
    stepper: G,
}

impl FonsecaZhouProcess {
    /// Build the process with the bundled canonical Wishart stepper.
    pub fn new(params: FonsecaZhouParameters) -> Result<Self> {
        Self::with_stepper(params)
    }
}

impl<G: CanonicalStepper> FonsecaZhouProcess<G> {
    /// Build the process with a custom canonical stepper.
    ///
    /// Computes the basis transform and the canonical parameters; any
    /// decomposition failure aborts construction.
    pub fn with_stepper(params: FonsecaZhouParameters) -> Result<Self> {
        let basis = BasisTransform::new(params.a())?;
        let canonical = basis.canonical_parameters(&params)?;
        let stepper = G::from_parameters(&canonical)?;
        debug!(
            dimension = params.dimension(),
            rank = basis.rank(),
            alpha_bar = params.alpha_bar(),
            residual_correlation = canonical.residual_correlation,
            "constructed Fonseca-Zhou process"
        );
        Ok(Self {
            rho_bar: params.rho_bar(),
            alpha: params.alpha(),
            params,
            basis,
            stepper,
        })
    }

    /// Model parameters.
    pub fn parameters(&self) -> &FonsecaZhouParameters {
        &self.params
    }

    /// Dimension `d`.
    pub fn dimension(&self) -> usize {
        self.params.dimension()
    }

    /// Complementary correlation `ρ̄`.
    pub fn rho_bar(&self) -> Real {
        self.rho_bar
    }

    /// The basis transform.
    pub fn basis(&self) -> &BasisTransform {
        &self.basis
    }

    /// The canonical stepper.
    pub fn stepper(&self) -> &G {
        &self.stepper
    }

    /// Prepare the canonical stepper for a batch.
    pub fn prepare(&mut self, config: &BatchConfig) -> Result<()> {
        config.validate()?;
        self.stepper.prepare(config)
    }

    /// Whether the canonical stepper has been prepared.
    pub fn is_prepared(&self) -> bool {
        self.stepper.is_prepared()
    }

    /// Check that `state` is `d × d` / length `d`.
    pub fn validate_state(&self, state: &ModelState) -> Result<()> {
        let d = self.dimension();
        if state.x.shape() != (d, d) {
            return Err(Error::matrix_shape("covariance state X", (d, d), state.x.shape()));
        }
        if state.y.len() != d {
            return Err(Error::vector_len("return state Y", d, state.y.len()));
        }
        Ok(())
    }

    fn check_step(&self, state: &ModelState, dt: Time) -> Result<()> {
        self.validate_state(state)?;
        wsv_core::ensure!(
            dt.is_finite() && dt >= 0.0,
            "time step must be finite and non-negative, got {dt}"
        );
        Ok(())
    }

    fn check_increment(&self, what: &'static str, g: &Array) -> Result<()> {
        let d = self.dimension();
        if g.len() != d {
            return Err(Error::vector_len(what, d, g.len()));
        }
        Ok(())
    }

    fn ensure_prepared(&self) -> Result<()> {
        if self.stepper.is_prepared() {
            Ok(())
        } else {
            Err(Error::Uninitialized(
                "call prepare() with the batch configuration before using a splitting scheme".into(),
            ))
        }
    }

    // ─── Elementary step operators ──────────────────────────────────────────

    /// Return-only step drawing `g = √Δt · z`.
    ///
    /// With `dt = 0` the state is returned unchanged.
    pub fn step_return_only<R: Rng + ?Sized>(
        &self,
        state: &ModelState,
        dt: Time,
        rng: &mut R,
    ) -> Result<ModelState> {
        self.check_step(state, dt)?;
        let g = standard_normal_array(self.dimension(), rng) * dt.sqrt();
        self.step_return_only_with(state, dt, &g)
    }

    /// Return-only step with a supplied increment `g`:
    /// `Y' = Y + (r − ½ diag X) Δt + ρ̄ √X g`, `X' = X`.
    pub fn step_return_only_with(&self, state: &ModelState, dt: Time, g: &Array) -> Result<ModelState> {
        self.check_step(state, dt)?;
        self.check_increment("return increment", g)?;
        let sqrt_x = symmetric_sqrt(&state.x)?;
        let y = &state.y + self.return_drift(&state.x, dt) + (sqrt_x * g) * self.rho_bar;
        Ok(ModelState::new(state.x.clone(), y))
    }

    /// Canonical-form step: map to `(U⁻ᵀ X U⁻¹, U⁻ᵀ Y)`, advance with the
    /// canonical stepper, map back with `U`.
    pub fn step_canonical<R: Rng + ?Sized>(
        &self,
        state: &ModelState,
        dt: Time,
        scheme: CanonicalScheme,
        rng: &mut R,
    ) -> Result<ModelState> {
        self.check_step(state, dt)?;
        self.ensure_prepared()?;
        let (v, rho) = self.basis.to_canonical(&state.x, &state.y);
        let (v_next, r_next) = self.stepper.step(&v, &rho, dt, scheme, rng)?;
        let d = self.dimension();
        if v_next.shape() != (d, d) {
            return Err(Error::matrix_shape("canonical stepper covariance", (d, d), v_next.shape()));
        }
        if r_next.len() != d {
            return Err(Error::vector_len("canonical stepper returns", d, r_next.len()));
        }
        let (x, y) = self.basis.from_canonical(&v_next, &r_next);
        Ok(ModelState::new(x, y))
    }

    /// Euler–Maruyama step drawing `g` and `dW`, both scaled by `√Δt`.
    pub fn step_euler<R: Rng + ?Sized>(&self, state: &ModelState, dt: Time, rng: &mut R) -> Result<ModelState> {
        self.check_step(state, dt)?;
        let d = self.dimension();
        let sqrt_dt = dt.sqrt();
        let g = standard_normal_array(d, rng) * sqrt_dt;
        let dw = standard_normal_matrix(d, d, rng) * sqrt_dt;
        self.step_euler_with(state, dt, &g, &dw)
    }

    /// Euler–Maruyama step with supplied `g` (length `d`) and `dW` (`d × d`).
    ///
    /// Uses `S = √(X⁺)`, the root of the positive part of `X`:
    ///
    /// ```text
    /// Y' = Y + (r − ½ diag X) Δt + ρ̄ S g + S dW ρ
    /// X' = X + (α + bX + Xbᵀ) Δt + S dW a + aᵀ dWᵀ S
    /// ```
    ///
    /// The returned covariance is the previous `X` plus this increment. It is
    /// exactly symmetric but may leave the PSD cone.
    pub fn step_euler_with(&self, state: &ModelState, dt: Time, g: &Array, dw: &Matrix) -> Result<ModelState> {
        self.check_step(state, dt)?;
        self.check_increment("return increment", g)?;
        let d = self.dimension();
        if dw.shape() != (d, d) {
            return Err(Error::matrix_shape("Brownian matrix increment dW", (d, d), dw.shape()));
        }

        let (sqrt_x, clipped) = positive_part_sqrt(&state.x)?;
        if clipped > 0 {
            debug!(clipped, "Euler step truncated negative eigenvalues of X");
        }
        let s_dw = &sqrt_x * dw;

        let y = &state.y
            + self.return_drift(&state.x, dt)
            + (&sqrt_x * g) * self.rho_bar
            + &s_dw * self.params.rho();

        let bx = self.params.b() * &state.x;
        let drift = &self.alpha + (&bx + bx.transpose());
        let noise = &s_dw * self.params.a();
        let x = &state.x + drift * dt + (&noise + noise.transpose());
        Ok(ModelState::new(x, y))
    }

    fn return_drift(&self, x: &Matrix, dt: Time) -> Array {
        let r = self.params.r();
        x.diagonal().map(|v| (r - 0.5 * v) * dt)
    }

    // ─── Scheme dispatch ────────────────────────────────────────────────────

    /// Advance one grid step of size `dt` with `scheme`, drawing every
    /// increment from `rng`.
    pub fn evolve<R: Rng + ?Sized>(
        &self,
        state: &ModelState,
        dt: Time,
        scheme: SplittingScheme,
        rng: &mut R,
    ) -> Result<ModelState> {
        self.check_step(state, dt)?;
        let canonical = match scheme.canonical_scheme() {
            Some(canonical) => canonical,
            None => return self.step_euler(state, dt, rng),
        };
        self.ensure_prepared()?;

        if scheme == SplittingScheme::Strang {
            let half = 0.5 * dt;
            let first = self.step_return_only(state, half, rng)?;
            let second = self.step_canonical(&first, dt, canonical, rng)?;
            return self.step_return_only(&second, half, rng);
        }
        let return_first = scheme == SplittingScheme::TwoStage || rng.gen::<bool>();
        if return_first {
            let mid = self.step_return_only(state, dt, rng)?;
            self.step_canonical(&mid, dt, canonical, rng)
        } else {
            let mid = self.step_canonical(state, dt, canonical, rng)?;
            self.step_return_only(&mid, dt, rng)
        }
    }

    /// Advance one grid step with a supplied full-step return increment `g`
    /// (length `d`, distributed as `√Δt · N(0, I)`).
    ///
    /// For [`SplittingScheme::Strang`] `g` is split into two half-step
    /// increments with a Brownian bridge; for [`SplittingScheme::Euler`] it
    /// is the return noise and `dW` is drawn from `rng`.
    pub fn evolve_with_increment<R: Rng + ?Sized>(
        &self,
        state: &ModelState,
        dt: Time,
        scheme: SplittingScheme,
        g: &Array,
        rng: &mut R,
    ) -> Result<ModelState> {
        self.check_step(state, dt)?;
        self.check_increment("return increment", g)?;
        let canonical = match scheme.canonical_scheme() {
            Some(canonical) => canonical,
            None => {
                let d = self.dimension();
                let dw = standard_normal_matrix(d, d, rng) * dt.sqrt();
                return self.step_euler_with(state, dt, g, &dw);
            }
        };
        self.ensure_prepared()?;

        if scheme == SplittingScheme::Strang {
            let half = 0.5 * dt;
            let (g1, g2) = bridge_split(g, dt, rng)?;
            let first = self.step_return_only_with(state, half, &g1)?;
            let second = self.step_canonical(&first, dt, canonical, rng)?;
            return self.step_return_only_with(&second, half, &g2);
        }
        let return_first = scheme == SplittingScheme::TwoStage || rng.gen::<bool>();
        if return_first {
            let mid = self.step_return_only_with(state, dt, g)?;
            self.step_canonical(&mid, dt, canonical, rng)
        } else {
            let mid = self.step_canonical(state, dt, canonical, rng)?;
            self.step_return_only_with(&mid, dt, g)
        }
    }
}
