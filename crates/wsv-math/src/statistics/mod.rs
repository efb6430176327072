//! Incremental statistics accumulator.

use wsv_core::Real;

/// Incremental statistics accumulator.
///
/// Accumulates weighted samples and reports the mean, the unbiased variance,
/// the standard error of the mean and the sample range. Uses Welford's
/// update, so long Monte-Carlo runs do not lose precision to cancellation.
#[derive(Debug, Clone)]
pub struct IncrementalStatistics {
    count: usize,
    sum_w: Real,
    mean: Real,
    // weighted sum of squared deviations from the running mean
    m2: Real,
    min: Real,
    max: Real,
}

impl Default for IncrementalStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalStatistics {
    /// Create a new empty accumulator.
    pub fn new() -> Self {
        Self {
            count: 0,
            sum_w: 0.0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Add a single sample with weight 1.
    pub fn add(&mut self, x: Real) {
        self.add_weighted(x, 1.0);
    }

    /// Add a weighted sample.
    pub fn add_weighted(&mut self, x: Real, weight: Real) {
        self.count += 1;
        self.sum_w += weight;
        let delta = x - self.mean;
        self.mean += delta * weight / self.sum_w;
        self.m2 += weight * delta * (x - self.mean);
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    /// Number of samples.
    pub fn samples(&self) -> usize {
        self.count
    }

    /// Sum of weights.
    pub fn sum_weights(&self) -> Real {
        self.sum_w
    }

    /// Weighted mean.  Returns `None` if no samples have been added.
    pub fn mean(&self) -> Option<Real> {
        if self.sum_w == 0.0 {
            None
        } else {
            Some(self.mean)
        }
    }

    /// Weighted variance (unbiased, Bessel-corrected).  Returns `None` for
    /// fewer than 2 samples.
    pub fn variance(&self) -> Option<Real> {
        if self.sum_w == 0.0 || self.count < 2 {
            return None;
        }
        let n = self.count as Real;
        Some(self.m2 / self.sum_w * n / (n - 1.0))
    }

    /// Standard deviation.  Returns `None` for fewer than 2 samples.
    pub fn std_dev(&self) -> Option<Real> {
        self.variance().map(|v| v.sqrt())
    }

    /// Standard error of the mean, `σ / √n`.
    pub fn error_estimate(&self) -> Option<Real> {
        self.std_dev().map(|s| s / (self.count as Real).sqrt())
    }

    /// Minimum sample value.  Returns `None` if no samples have been added.
    pub fn minimum(&self) -> Option<Real> {
        (self.count > 0).then_some(self.min)
    }

    /// Maximum sample value.  Returns `None` if no samples have been added.
    pub fn maximum(&self) -> Option<Real> {
        (self.count > 0).then_some(self.max)
    }

    /// Reset the accumulator to its initial state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Extend<Real> for IncrementalStatistics {
    fn extend<I: IntoIterator<Item = Real>>(&mut self, iter: I) {
        for x in iter {
            self.add(x);
        }
    }
}
