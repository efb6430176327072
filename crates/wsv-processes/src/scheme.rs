//! Time-stepping schemes.
//!
//! [`SplittingScheme`] selects how one grid step of the full model is
//! composed from the elementary step operators; it is resolved once from its
//! short tag (`"euler"`, `"r"`, `"2"`, `"1"`) and dispatched by `match`
//! afterwards. [`CanonicalScheme`] selects how a canonical-form stepper
//! composes its own sub-flows.

use std::fmt;
use std::str::FromStr;
use wsv_core::errors::Error;

/// Composition of the elementary step operators over one grid step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SplittingScheme {
    /// Joint Euler–Maruyama step of covariance and returns (first order).
    #[cfg_attr(feature = "serde", serde(rename = "euler"))]
    Euler,
    /// Lie–Trotter splitting with a fair coin choosing the operator order.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "r"))]
    RandomizedLieTrotter,
    /// Return-only step followed by the canonical step, in fixed order.
    #[cfg_attr(feature = "serde", serde(rename = "2"))]
    TwoStage,
    /// Strang splitting: half return step, full canonical step, half return
    /// step.
    #[cfg_attr(feature = "serde", serde(rename = "1"))]
    Strang,
}

impl SplittingScheme {
    /// All schemes, in tag order.
    pub const ALL: [SplittingScheme; 4] = [
        SplittingScheme::Euler,
        SplittingScheme::RandomizedLieTrotter,
        SplittingScheme::TwoStage,
        SplittingScheme::Strang,
    ];

    /// Short tag of the scheme.
    pub fn tag(&self) -> &'static str {
        match self {
            SplittingScheme::Euler => "euler",
            SplittingScheme::RandomizedLieTrotter => "r",
            SplittingScheme::TwoStage => "2",
            SplittingScheme::Strang => "1",
        }
    }

    /// `true` for the schemes that call the canonical-form stepper.
    pub fn is_splitting(&self) -> bool {
        !matches!(self, SplittingScheme::Euler)
    }

    /// The canonical-form composition a splitting scheme asks for, `None`
    /// for [`SplittingScheme::Euler`].
    pub fn canonical_scheme(&self) -> Option<CanonicalScheme> {
        match self {
            SplittingScheme::Euler => None,
            SplittingScheme::RandomizedLieTrotter => Some(CanonicalScheme::RandomOrder),
            SplittingScheme::TwoStage | SplittingScheme::Strang => Some(CanonicalScheme::Symmetric),
        }
    }
}

impl fmt::Display for SplittingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for SplittingScheme {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "euler" => Ok(SplittingScheme::Euler),
            "r" => Ok(SplittingScheme::RandomizedLieTrotter),
            "2" => Ok(SplittingScheme::TwoStage),
            "1" => Ok(SplittingScheme::Strang),
            other => Err(Error::InvalidArgument(format!(
                "unknown splitting scheme {other:?}, expected one of \"euler\", \"r\", \"2\", \"1\""
            ))),
        }
    }
}

/// Composition of the sub-flows inside a canonical-form step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalScheme {
    /// Palindromic composition of half-step sub-flows.
    Symmetric,
    /// Full-step sub-flows in forward or reverse order, chosen by a fair coin.
    RandomOrder,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact_tags() {
        for scheme in SplittingScheme::ALL {
            assert_eq!(scheme.tag().parse::<SplittingScheme>(), Ok(scheme));
            assert_eq!(scheme.to_string(), scheme.tag());
        }
    }

    #[test]
    fn rejects_unknown_tags() {
        for tag in ["", "R", "Euler", "3", "strang", " r"] {
            assert!(matches!(
                tag.parse::<SplittingScheme>(),
                Err(Error::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn canonical_mapping() {
        assert_eq!(SplittingScheme::Euler.canonical_scheme(), None);
        assert_eq!(
            SplittingScheme::RandomizedLieTrotter.canonical_scheme(),
            Some(CanonicalScheme::RandomOrder)
        );
        assert_eq!(SplittingScheme::Strang.canonical_scheme(), Some(CanonicalScheme::Symmetric));
        assert!(!SplittingScheme::Euler.is_splitting());
        assert!(SplittingScheme::TwoStage.is_splitting());
        assert_eq!(SplittingScheme::default(), SplittingScheme::RandomizedLieTrotter);
    }
}
