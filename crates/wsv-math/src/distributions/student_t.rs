//! Student's t-distribution, wrapping `statrs`.
//!
//! Used for the confidence intervals of Monte-Carlo estimates, where the
//! number of degrees of freedom is the sample count minus one.

use statrs::distribution::{ContinuousCDF, StudentsT};
use wsv_core::{
    errors::{Error, Result},
    Real,
};

/// Standard Student's t-distribution with `df` degrees of freedom.
#[derive(Debug, Clone)]
pub struct StudentTDistribution {
    dist: StudentsT,
    df: Real,
}

impl StudentTDistribution {
    /// Create a Student-t distribution with the given degrees of freedom.
    pub fn new(df: Real) -> Result<Self> {
        wsv_core::ensure!(df > 0.0, "degrees of freedom must be positive, got {df}");
        let dist = StudentsT::new(0.0, 1.0, df)
            .map_err(|e| Error::InvalidArgument(format!("Student-t with df = {df}: {e}")))?;
        Ok(Self { dist, df })
    }

    /// Degrees of freedom.
    pub fn df(&self) -> Real {
        self.df
    }

    /// Inverse CDF (quantile function) for `p` in `(0, 1)`.
    pub fn inverse_cdf(&self, p: Real) -> Result<Real> {
        wsv_core::ensure!(p > 0.0 && p < 1.0, "probability must be in (0, 1), got {p}");
        Ok(self.dist.inverse_cdf(p))
    }

    /// Two-sided critical value `t*` with `P(|T| ≤ t*) = level`.
    pub fn two_sided_quantile(&self, level: Real) -> Result<Real> {
        wsv_core::ensure!(
            level > 0.0 && level < 1.0,
            "confidence level must be in (0, 1), got {level}"
        );
        self.inverse_cdf(0.5 + 0.5 * level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn quantiles_are_symmetric_about_zero() {
        let d = StudentTDistribution::new(5.0).unwrap();
        assert_abs_diff_eq!(d.inverse_cdf(0.5).unwrap(), 0.0, epsilon = 1e-9);
        for p in [0.01, 0.25, 0.4] {
            let lo = d.inverse_cdf(p).unwrap();
            let hi = d.inverse_cdf(1.0 - p).unwrap();
            assert!(lo < 0.0, "p = {p}: {lo}");
            assert_abs_diff_eq!(lo, -hi, epsilon = 1e-6);
        }
    }

    #[test]
    fn tabulated_critical_value() {
        // t(0.975; 4) = 2.776445
        let d = StudentTDistribution::new(4.0).unwrap();
        assert_abs_diff_eq!(d.inverse_cdf(0.975).unwrap(), 2.776445, epsilon = 1e-5);
        assert_abs_diff_eq!(d.two_sided_quantile(0.95).unwrap(), 2.776445, epsilon = 1e-5);
    }

    #[test]
    fn large_df_matches_normal_quantile() {
        let d = StudentTDistribution::new(1e6).unwrap();
        // Φ⁻¹(0.975) ≈ 1.959964
        assert_abs_diff_eq!(d.two_sided_quantile(0.95).unwrap(), 1.959964, epsilon = 1e-3);
    }

    #[test]
    fn invalid_arguments() {
        assert!(StudentTDistribution::new(0.0).is_err());
        let d = StudentTDistribution::new(3.0).unwrap();
        assert!(d.inverse_cdf(1.0).is_err());
        assert!(d.two_sided_quantile(0.0).is_err());
    }
}
