//! Error types for the workspace.
//!
//! Every fallible operation returns the single `thiserror`-derived [`Error`]
//! enum. The variants keep the failure classes of the simulation engine
//! distinguishable: shape problems, decomposition failures, a canonical
//! stepper used before it was prepared, and plain precondition violations.
//! The `ensure!`, `ensure_post!` and `fail!` macros are the usual shorthands.

use thiserror::Error;

/// The top-level error type used throughout the workspace.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// General runtime error.
    #[error("{0}")]
    Runtime(String),

    /// Precondition violated.
    #[error("precondition not satisfied: {0}")]
    Precondition(String),

    /// Postcondition violated.
    #[error("postcondition not satisfied: {0}")]
    Postcondition(String),

    /// A state, increment or parameter has the wrong shape.
    #[error("dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Name of the offending quantity.
        what: &'static str,
        /// Expected shape, e.g. `"2x2"`.
        expected: String,
        /// Shape actually supplied.
        found: String,
    },

    /// A matrix decomposition (generalized Cholesky, square root, inverse)
    /// could not be computed.
    #[error("decomposition failed: {0}")]
    Decomposition(String),

    /// A canonical-form stepper was used before its batch initializer ran.
    #[error("canonical stepper not initialized: {0}")]
    Uninitialized(String),

    /// A prepared canonical stepper was asked for a step of another size.
    #[error("canonical stepper prepared for dt = {prepared}, step requested with dt = {requested}")]
    StepSizeMismatch {
        /// Step size the stepper was prepared for.
        prepared: f64,
        /// Step size of the rejected call.
        requested: f64,
    },

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Shape error for a `rows × cols` matrix.
    pub fn matrix_shape(what: &'static str, expected: (usize, usize), found: (usize, usize)) -> Self {
        Error::DimensionMismatch {
            what,
            expected: format!("{}x{}", expected.0, expected.1),
            found: format!("{}x{}", found.0, found.1),
        }
    }

    /// Shape error for a vector.
    pub fn vector_len(what: &'static str, expected: usize, found: usize) -> Self {
        Error::DimensionMismatch {
            what,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

/// Shorthand `Result` type used throughout the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Returns `Err(Error::Precondition(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use wsv_core::{ensure, errors::Error};
/// fn positive(x: f64) -> wsv_core::errors::Result<f64> {
///     ensure!(x > 0.0, "x must be positive, got {x}");
///     Ok(x)
/// }
/// assert!(positive(1.0).is_ok());
/// assert!(positive(-1.0).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::Precondition(
                format!($($msg)*)
            ));
        }
    };
}

/// Returns `Err(Error::Postcondition(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use wsv_core::{ensure_post, errors::Error};
/// fn compute(x: f64) -> wsv_core::errors::Result<f64> {
///     let result = x * 2.0;
///     ensure_post!(result > 0.0, "result must be positive, got {result}");
///     Ok(result)
/// }
/// assert!(compute(1.0).is_ok());
/// assert!(compute(-1.0).is_err());
/// ```
#[macro_export]
macro_rules! ensure_post {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::Postcondition(
                format!($($msg)*)
            ));
        }
    };
}

/// Returns `Err(Error::Runtime(...))` immediately.
///
/// # Example
/// ```
/// use wsv_core::{fail, errors::Error};
/// fn always_err() -> wsv_core::errors::Result<()> {
///     fail!("something went wrong");
/// }
/// assert!(always_err().is_err());
/// ```
#[macro_export]
macro_rules! fail {
    ($($msg:tt)*) => {
        return Err($crate::errors::Error::Runtime(format!($($msg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked_sqrt(x: f64) -> Result<f64> {
        crate::ensure!(x >= 0.0, "negative input {x}");
        Ok(x.sqrt())
    }

    #[test]
    fn ensure_maps_to_precondition() {
        assert_eq!(checked_sqrt(4.0), Ok(2.0));
        match checked_sqrt(-1.0) {
            Err(Error::Precondition(msg)) => assert!(msg.contains("-1")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn shape_errors_render_both_shapes() {
        let e = Error::matrix_shape("x0", (2, 2), (3, 2));
        assert_eq!(e.to_string(), "dimension mismatch for x0: expected 2x2, found 3x2");
        let e = Error::vector_len("y0", 2, 5);
        assert_eq!(e.to_string(), "dimension mismatch for y0: expected 2, found 5");
    }

    #[test]
    fn step_size_mismatch_message() {
        let e = Error::StepSizeMismatch {
            prepared: 0.5,
            requested: 0.25,
        };
        assert!(e.to_string().contains("0.5"));
        assert!(e.to_string().contains("0.25"));
    }
}
