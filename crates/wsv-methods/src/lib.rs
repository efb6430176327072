//! # wsv-methods
//!
//! Monte Carlo methods for the Wishart stochastic-volatility model: batch
//! path generation over a uniform grid and estimation of the joint
//! characteristic function of `(X_T, Y_T)`.
//!
//! # Modules
//!
//! * [`monte_carlo`] — path generation, characteristic-function estimator,
//!   MC model orchestrator

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Monte Carlo simulation: path generation, characteristic estimator.
pub mod monte_carlo;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use monte_carlo::{
    characteristic, estimate_characteristic, generate, CharacteristicEstimate, MonteCarloModel,
    Path, Simulation,
};
