//! Noncentral chi-squared sampling.
//!
//! A squared Bessel process of dimension `δ` started at `s₀` satisfies
//! `s_h ~ h · χ'²(δ, s₀/h)`, so exact transitions of the diagonal Schur
//! complement in a Wishart elementary flow reduce to one draw from this
//! distribution. Degrees of freedom may be any real `δ ≥ 0`.
//!
//! ```text
//! δ > 1 :  χ'²(δ, λ) = (Z + √λ)² + χ²(δ − 1)
//! δ ≤ 1 :  χ'²(δ, λ) = χ²(δ + 2K),   K ~ Poisson(λ / 2)
//! ```

use rand::Rng;
use rand_distr::{Distribution, Gamma, Poisson, StandardNormal};
use wsv_core::{
    errors::{Error, Result},
    Real,
};

/// Noncentral chi-squared distribution `χ'²(δ, λ)`.
#[derive(Debug, Clone)]
pub struct NoncentralChiSquared {
    df: Real,
    noncentrality: Real,
    // χ²(δ − 1) as Gamma((δ − 1)/2, 2), present when δ > 1
    central: Option<Gamma<Real>>,
    // Poisson(λ/2), present when δ ≤ 1 and λ > 0
    mixing: Option<Poisson<Real>>,
}

impl NoncentralChiSquared {
    /// Create the distribution with `df = δ ≥ 0` and `noncentrality = λ ≥ 0`.
    pub fn new(df: Real, noncentrality: Real) -> Result<Self> {
        wsv_core::ensure!(
            df.is_finite() && df >= 0.0,
            "degrees of freedom must be finite and non-negative, got {df}"
        );
        wsv_core::ensure!(
            noncentrality.is_finite() && noncentrality >= 0.0,
            "noncentrality must be finite and non-negative, got {noncentrality}"
        );
        let (central, mixing) = if df > 1.0 {
            let central = Gamma::new(0.5 * (df - 1.0), 2.0)
                .map_err(|e| Error::InvalidArgument(format!("chi-squared with df = {}: {e}", df - 1.0)))?;
            (Some(central), None)
        } else if noncentrality > 0.0 {
            let mixing = Poisson::new(0.5 * noncentrality)
                .map_err(|e| Error::InvalidArgument(format!("Poisson mixing with mean {}: {e}", 0.5 * noncentrality)))?;
            (None, Some(mixing))
        } else {
            (None, None)
        };
        Ok(Self {
            df,
            noncentrality,
            central,
            mixing,
        })
    }

    /// Degrees of freedom `δ`.
    pub fn df(&self) -> Real {
        self.df
    }

    /// Noncentrality parameter `λ`.
    pub fn noncentrality(&self) -> Real {
        self.noncentrality
    }

    /// Mean `δ + λ`.
    pub fn mean(&self) -> Real {
        self.df + self.noncentrality
    }

    /// Variance `2(δ + 2λ)`.
    pub fn variance(&self) -> Real {
        2.0 * (self.df + 2.0 * self.noncentrality)
    }
}

impl Distribution<Real> for NoncentralChiSquared {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Real {
        if let Some(central) = &self.central {
            let z: Real = StandardNormal.sample(rng);
            let shifted = z + self.noncentrality.sqrt();
            return shifted * shifted + central.sample(rng);
        }
        let k: Real = match &self.mixing {
            Some(poisson) => poisson.sample(rng),
            None => 0.0,
        };
        let shape = 0.5 * self.df + k;
        if shape <= 0.0 {
            return 0.0;
        }
        match Gamma::new(shape, 2.0) {
            Ok(gamma) => gamma.sample(rng),
            Err(_) => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random_numbers::path_rng;
    use crate::statistics::IncrementalStatistics;

    fn sample_moments(df: Real, lambda: Real, n: usize) -> (Real, Real) {
        let dist = NoncentralChiSquared::new(df, lambda).unwrap();
        let mut rng = path_rng(2024, 3);
        let mut stats = IncrementalStatistics::new();
        for _ in 0..n {
            let x = dist.sample(&mut rng);
            assert!(x >= 0.0 && x.is_finite());
            stats.add(x);
        }
        (stats.mean().unwrap(), stats.variance().unwrap())
    }

    #[test]
    fn moments_above_one_degree_of_freedom() {
        let (mean, var) = sample_moments(3.5, 2.0, 40_000);
        assert!((mean - 5.5).abs() < 0.1, "mean {mean}");
        assert!((var - 15.0).abs() < 0.6, "variance {var}");
    }

    #[test]
    fn moments_below_one_degree_of_freedom() {
        let (mean, var) = sample_moments(0.5, 1.5, 40_000);
        assert!((mean - 2.0).abs() < 0.06, "mean {mean}");
        assert!((var - 7.0).abs() < 0.4, "variance {var}");
    }

    #[test]
    fn degenerate_cases() {
        let mut rng = path_rng(1, 1);
        let zero = NoncentralChiSquared::new(0.0, 0.0).unwrap();
        assert_eq!(zero.sample(&mut rng), 0.0);
        // δ = 0 with λ > 0 has an atom at zero of mass e^{-λ/2}
        let atom = NoncentralChiSquared::new(0.0, 0.2).unwrap();
        let zeros = (0..2_000).filter(|_| atom.sample(&mut rng) == 0.0).count();
        let expected = 2_000.0 * (-0.1f64).exp();
        assert!((zeros as Real - expected).abs() < 60.0, "zeros {zeros}");
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(NoncentralChiSquared::new(-0.1, 1.0).is_err());
        assert!(NoncentralChiSquared::new(1.0, -1.0).is_err());
        assert!(NoncentralChiSquared::new(Real::NAN, 1.0).is_err());
    }

    #[test]
    fn analytic_moments() {
        let d = NoncentralChiSquared::new(2.0, 3.0).unwrap();
        assert_eq!(d.mean(), 5.0);
        assert_eq!(d.variance(), 16.0);
    }
}
