//! Batch configuration for path generation.

use crate::scheme::SplittingScheme;
use wsv_core::{errors::Result, Time};

/// Base seed used when none is given.
pub const DEFAULT_SEED: u64 = 0x5EED_2024_F0A5_EC1A;

/// Everything a batch of simulated paths needs besides the model and the
/// initial state: horizon `T`, step count `N`, realization count `num`,
/// scheme, output mode, base seed and whether to run on the rayon pool.
///
/// ```
/// use wsv_processes::{BatchConfig, SplittingScheme};
///
/// let config = BatchConfig::new(1.0, 30, 100)
///     .with_scheme(SplittingScheme::Strang)
///     .terminal_only();
/// assert_eq!(config.dt(), 1.0 / 30.0);
/// assert!(!config.record_trajectory());
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchConfig {
    horizon: Time,
    steps: usize,
    paths: usize,
    scheme: SplittingScheme,
    record_trajectory: bool,
    seed: u64,
    parallel: bool,
}

impl BatchConfig {
    /// Configuration for `paths` realizations of `steps` equal steps up to
    /// `horizon`, with the default scheme, full trajectories, the default
    /// seed and sequential execution.
    pub fn new(horizon: Time, steps: usize, paths: usize) -> Self {
        Self {
            horizon,
            steps,
            paths,
            scheme: SplittingScheme::default(),
            record_trajectory: true,
            seed: DEFAULT_SEED,
            parallel: false,
        }
    }

    /// Set the splitting scheme.
    pub fn with_scheme(mut self, scheme: SplittingScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Record every grid state (`true`) or only the terminal state.
    pub fn with_trajectory(mut self, record: bool) -> Self {
        self.record_trajectory = record;
        self
    }

    /// Keep only terminal states.
    pub fn terminal_only(self) -> Self {
        self.with_trajectory(false)
    }

    /// Set the base seed of the per-path random streams.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Run realizations on the rayon thread pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Horizon `T`.
    pub fn horizon(&self) -> Time {
        self.horizon
    }

    /// Number of steps `N`.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Number of realizations `num`.
    pub fn paths(&self) -> usize {
        self.paths
    }

    /// Splitting scheme.
    pub fn scheme(&self) -> SplittingScheme {
        self.scheme
    }

    /// Whether full trajectories are recorded.
    pub fn record_trajectory(&self) -> bool {
        self.record_trajectory
    }

    /// Base seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Whether realizations run in parallel.
    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// Step size `T / N`.
    pub fn dt(&self) -> Time {
        self.horizon / self.steps as Time
    }

    /// The grid `0, T/N, …, T`.
    pub fn times(&self) -> Vec<Time> {
        let dt = self.dt();
        (0..=self.steps).map(|k| k as Time * dt).collect()
    }

    /// Check `T > 0`, `N ≥ 1` and `num ≥ 1`.
    pub fn validate(&self) -> Result<()> {
        wsv_core::ensure!(
            self.horizon.is_finite() && self.horizon > 0.0,
            "horizon must be positive and finite, got {}",
            self.horizon
        );
        wsv_core::ensure!(self.steps >= 1, "at least one time step is required");
        wsv_core::ensure!(self.paths >= 1, "at least one path is required");
        Ok(())
    }
}
