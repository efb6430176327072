//! # wishart-sv
//!
//! Splitting-scheme simulation of the Fonseca–Zhou Wishart
//! stochastic-volatility model.
//!
//! This crate is a **façade** that re-exports the workspace crates.
//! Application code should depend on this crate rather than the individual
//! `wsv-*` crates.
//!
//! ## Quick start
//!
//! ```rust
//! use wishart_sv::math::{Array, Matrix};
//! use wishart_sv::methods::{characteristic, generate};
//! use wishart_sv::processes::{BatchConfig, FonsecaZhouParameters, FonsecaZhouProcess, SplittingScheme};
//!
//! let params = FonsecaZhouParameters::new(
//!     0.02,
//!     Array::from_vec(vec![-0.3, -0.2]),
//!     2.5,
//!     Matrix::identity(2, 2) * 0.2,
//!     Matrix::identity(2, 2) * -0.5,
//! )?;
//! let mut process = FonsecaZhouProcess::new(params)?;
//! let config = BatchConfig::new(1.0, 10, 100)
//!     .with_scheme(SplittingScheme::Strang)
//!     .terminal_only();
//! let states = generate(&mut process, &(Matrix::identity(2, 2) * 0.04), &Array::zeros(2), &config)?
//!     .into_terminal_states();
//! let phi = characteristic(&Matrix::identity(2, 2), &Array::zeros(2), &states)?;
//! assert!(phi.norm() <= 1.0 + 1e-12);
//! # Ok::<(), wishart_sv::core::Error>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Core types, aliases, and error definitions.
pub use wsv_core as core;

/// Matrix decompositions, samplers, random streams, statistics.
pub use wsv_math as math;

/// The Fonseca–Zhou process, basis transform and step operators.
pub use wsv_processes as processes;

/// Path generation and characteristic-function estimation.
pub use wsv_methods as methods;
