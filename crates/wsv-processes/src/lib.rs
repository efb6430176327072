//! # wsv-processes
//!
//! The Fonseca–Zhou Wishart stochastic-volatility process: parameters and
//! state, the change of basis to canonical form, the canonical stepper seam
//! with its exact Wishart implementation, and the splitting-scheme step
//! operators that advance one grid step.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod basis_transform;
pub mod batch_config;
pub mod canonical;
pub mod fonseca_zhou_process;
pub mod scheme;
pub mod wishart_canonical;

pub use basis_transform::BasisTransform;
pub use batch_config::{BatchConfig, DEFAULT_SEED};
pub use canonical::{CanonicalParameters, CanonicalStepper};
pub use fonseca_zhou_process::{FonsecaZhouParameters, FonsecaZhouProcess, ModelState};
pub use scheme::{CanonicalScheme, SplittingScheme};
pub use wishart_canonical::WishartCanonicalProcess;
