//! Monte Carlo simulation of the Fonseca–Zhou model.
//!
//! # Overview
//!
//! * [`generate`] — advances a batch of realizations over a uniform grid
//! * [`Path`] — one realization (grid times + states)
//! * [`characteristic`] / [`estimate_characteristic`] — sample estimate of
//!   `E[exp(−i (tr(ΓX) + Λ·Y))]`
//! * [`MonteCarloModel`] — owns a process, an initial state and a batch
//!   configuration and runs them end to end
//!
//! Every realization draws from its own Mersenne-Twister stream seeded from
//! `(base seed, path index)`, so a batch does not depend on whether it ran
//! sequentially or on the rayon pool.

use num_complex::Complex64;
use rayon::prelude::*;
use std::time::Instant;
use tracing::info;
use wsv_core::{
    errors::{Error, Result},
    Real, Time,
};
use wsv_math::{
    is_symmetric, path_rng, symmetric_eigen, Array, IncrementalStatistics, Matrix,
    StudentTDistribution,
};
use wsv_processes::{
    BatchConfig, CanonicalStepper, FonsecaZhouProcess, ModelState, WishartCanonicalProcess,
};

/// Relative slack on symmetry and eigenvalue sign of `x0`.
const INITIAL_STATE_TOLERANCE: Real = 1e-10;

// ─── Path ─────────────────────────────────────────────────────────────────────

/// A single realization: the states at the grid times `0, Δt, …, T`.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Grid times (including `t = 0`).
    pub times: Vec<Time>,
    /// Model states at each grid time.
    pub states: Vec<ModelState>,
}

impl Path {
    /// Number of time steps (= len − 1).
    pub fn steps(&self) -> usize {
        self.states.len().saturating_sub(1)
    }

    /// The initial state.
    pub fn front(&self) -> Option<&ModelState> {
        self.states.first()
    }

    /// The terminal state.
    pub fn back(&self) -> Option<&ModelState> {
        self.states.last()
    }

    /// Number of grid points, including the initial one.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the path holds no state.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

// ─── Simulation output ────────────────────────────────────────────────────────

/// Output of [`generate`], shaped by [`BatchConfig::record_trajectory`].
#[derive(Debug, Clone, PartialEq)]
pub enum Simulation {
    /// Full trajectories, one [`Path`] of `N + 1` states per realization.
    Trajectories(Vec<Path>),
    /// Terminal states only, one per realization.
    Terminal(Vec<ModelState>),
}

impl Simulation {
    /// Number of realizations.
    pub fn len(&self) -> usize {
        match self {
            Simulation::Trajectories(paths) => paths.len(),
            Simulation::Terminal(states) => states.len(),
        }
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Terminal state of every realization, in path order.
    pub fn terminal_states(&self) -> Vec<&ModelState> {
        match self {
            Simulation::Trajectories(paths) => paths.iter().filter_map(Path::back).collect(),
            Simulation::Terminal(states) => states.iter().collect(),
        }
    }

    /// Consume the batch, keeping only terminal states.
    pub fn into_terminal_states(self) -> Vec<ModelState> {
        match self {
            Simulation::Trajectories(paths) => paths
                .into_iter()
                .filter_map(|mut path| path.states.pop())
                .collect(),
            Simulation::Terminal(states) => states,
        }
    }
}

// ─── Path generation ──────────────────────────────────────────────────────────

/// Simulate `config.paths()` realizations of `config.steps()` steps of size
/// `T / N` from `(x0, y0)`.
///
/// The canonical stepper is prepared for `config` when the scheme is a
/// splitting scheme, which is why the process is borrowed mutably. `x0`
/// must be `d × d` symmetric PSD and `y0` of length `d`.
pub fn generate<G: CanonicalStepper>(
    process: &mut FonsecaZhouProcess<G>,
    x0: &Matrix,
    y0: &Array,
    config: &BatchConfig,
) -> Result<Simulation> {
    config.validate()?;
    let initial = ModelState::new(x0.clone(), y0.clone());
    process.validate_state(&initial)?;
    check_initial_covariance(x0)?;
    if config.scheme().is_splitting() {
        process.prepare(config)?;
    }

    info!(
        paths = config.paths(),
        steps = config.steps(),
        horizon = config.horizon(),
        scheme = %config.scheme(),
        parallel = config.parallel(),
        "generating Wishart SV batch"
    );
    let started = Instant::now();

    let process = &*process;
    let simulation = if config.record_trajectory() {
        let times = config.times();
        let run = |index: usize| -> Result<Path> {
            Ok(Path {
                times: times.clone(),
                states: simulate_path(process, &initial, config, index, true)?,
            })
        };
        let paths = if config.parallel() {
            (0..config.paths()).into_par_iter().map(run).collect::<Result<Vec<_>>>()?
        } else {
            (0..config.paths()).map(run).collect::<Result<Vec<_>>>()?
        };
        Simulation::Trajectories(paths)
    } else {
        let run = |index: usize| -> Result<ModelState> {
            let mut states = simulate_path(process, &initial, config, index, false)?;
            states
                .pop()
                .ok_or_else(|| Error::Runtime(format!("path {index} produced no state")))
        };
        let states = if config.parallel() {
            (0..config.paths()).into_par_iter().map(run).collect::<Result<Vec<_>>>()?
        } else {
            (0..config.paths()).map(run).collect::<Result<Vec<_>>>()?
        };
        Simulation::Terminal(states)
    };

    info!(
        paths = simulation.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "finished Wishart SV batch"
    );
    Ok(simulation)
}

fn check_initial_covariance(x0: &Matrix) -> Result<()> {
    let scale = 1.0 + x0.amax();
    wsv_core::ensure!(
        is_symmetric(x0, INITIAL_STATE_TOLERANCE * scale),
        "initial covariance must be symmetric"
    );
    let (eigenvalues, _) = symmetric_eigen(x0)?;
    let smallest = eigenvalues.min();
    wsv_core::ensure!(
        smallest >= -INITIAL_STATE_TOLERANCE * scale,
        "initial covariance must be positive semidefinite, smallest eigenvalue {smallest}"
    );
    Ok(())
}

/// Advance one realization; with `record` every grid state is kept,
/// otherwise only the terminal one.
fn simulate_path<G: CanonicalStepper>(
    process: &FonsecaZhouProcess<G>,
    initial: &ModelState,
    config: &BatchConfig,
    index: usize,
    record: bool,
) -> Result<Vec<ModelState>> {
    let mut rng = path_rng(config.seed(), index as u64);
    let dt = config.dt();
    let scheme = config.scheme();

    let mut states = Vec::with_capacity(if record { config.steps() + 1 } else { 1 });
    let mut state = initial.clone();
    for _ in 0..config.steps() {
        let next = process.evolve(&state, dt, scheme, &mut rng)?;
        if record {
            states.push(state);
        }
        state = next;
    }
    states.push(state);
    Ok(states)
}

// ─── Characteristic function ──────────────────────────────────────────────────

fn check_arguments(gamma: &Matrix, lambda: &Array, state: &ModelState) -> Result<()> {
    let d = state.y.len();
    if state.x.shape() != (d, d) {
        return Err(Error::matrix_shape("covariance state X", (d, d), state.x.shape()));
    }
    if gamma.shape() != (d, d) {
        return Err(Error::matrix_shape("Γ", (d, d), gamma.shape()));
    }
    if lambda.len() != d {
        return Err(Error::vector_len("Λ", d, lambda.len()));
    }
    Ok(())
}

/// `exp(−i (tr(ΓX) + Λ·Y))` for one state.
fn phase(gamma: &Matrix, lambda: &Array, state: &ModelState) -> Complex64 {
    let theta = (gamma * &state.x).trace() + lambda.dot(&state.y);
    Complex64::new(theta.cos(), -theta.sin())
}

/// Sample mean of `exp(−i (tr(ΓX) + Λ·Y))` over `states`.
///
/// Fails on an empty batch and on shape mismatches.
pub fn characteristic<'a, I>(gamma: &Matrix, lambda: &Array, states: I) -> Result<Complex64>
where
    I: IntoIterator<Item = &'a ModelState>,
{
    let mut sum = Complex64::new(0.0, 0.0);
    let mut count = 0usize;
    for state in states {
        check_arguments(gamma, lambda, state)?;
        sum += phase(gamma, lambda, state);
        count += 1;
    }
    wsv_core::ensure!(count > 0, "characteristic function of an empty batch");
    Ok(sum / count as Real)
}

/// A characteristic-function estimate with its sampling error.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacteristicEstimate {
    /// Sample mean.
    pub value: Complex64,
    /// Standard errors of the real and imaginary parts (zero for a single
    /// sample).
    pub std_error: Complex64,
    /// Number of samples.
    pub samples: usize,
}

impl CharacteristicEstimate {
    /// Two-sided Student-t confidence interval on the real part at `level`
    /// (e.g. `0.95`), with `samples − 1` degrees of freedom.
    pub fn confidence_interval(&self, level: Real) -> Result<(Real, Real)> {
        wsv_core::ensure!(
            self.samples >= 2,
            "a confidence interval needs at least two samples, got {}",
            self.samples
        );
        let t = StudentTDistribution::new((self.samples - 1) as Real)?.two_sided_quantile(level)?;
        let half_width = t * self.std_error.re;
        Ok((self.value.re - half_width, self.value.re + half_width))
    }
}

/// Like [`characteristic`], also reporting standard errors.
pub fn estimate_characteristic<'a, I>(
    gamma: &Matrix,
    lambda: &Array,
    states: I,
) -> Result<CharacteristicEstimate>
where
    I: IntoIterator<Item = &'a ModelState>,
{
    let mut re = IncrementalStatistics::new();
    let mut im = IncrementalStatistics::new();
    for state in states {
        check_arguments(gamma, lambda, state)?;
        let z = phase(gamma, lambda, state);
        re.add(z.re);
        im.add(z.im);
    }
    let (mean_re, mean_im) = match (re.mean(), im.mean()) {
        (Some(a), Some(b)) => (a, b),
        _ => wsv_core::fail!("characteristic function of an empty batch"),
    };
    Ok(CharacteristicEstimate {
        value: Complex64::new(mean_re, mean_im),
        std_error: Complex64::new(
            re.error_estimate().unwrap_or(0.0),
            im.error_estimate().unwrap_or(0.0),
        ),
        samples: re.samples(),
    })
}

// ─── MonteCarloModel ──────────────────────────────────────────────────────────

/// A Monte Carlo orchestrator: process, initial state and batch config.
#[derive(Debug, Clone)]
pub struct MonteCarloModel<G = WishartCanonicalProcess> {
    process: FonsecaZhouProcess<G>,
    x0: Matrix,
    y0: Array,
    config: BatchConfig,
}

impl<G: CanonicalStepper> MonteCarloModel<G> {
    /// Bundle the inputs, validating shapes and the configuration.
    pub fn new(process: FonsecaZhouProcess<G>, x0: Matrix, y0: Array, config: BatchConfig) -> Result<Self> {
        config.validate()?;
        process.validate_state(&ModelState::new(x0.clone(), y0.clone()))?;
        check_initial_covariance(&x0)?;
        Ok(Self {
            process,
            x0,
            y0,
            config,
        })
    }

    /// The process.
    pub fn process(&self) -> &FonsecaZhouProcess<G> {
        &self.process
    }

    /// The batch configuration.
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Replace the batch configuration.
    pub fn set_config(&mut self, config: BatchConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Run the configured batch.
    pub fn simulate(&mut self) -> Result<Simulation> {
        generate(&mut self.process, &self.x0, &self.y0, &self.config)
    }

    /// Terminal states of the configured batch (trajectories are not kept).
    pub fn terminal_states(&mut self) -> Result<Vec<ModelState>> {
        let config = self.config.clone().terminal_only();
        Ok(generate(&mut self.process, &self.x0, &self.y0, &config)?.into_terminal_states())
    }

    /// Characteristic function at `(Γ, Λ)` estimated from a fresh batch.
    pub fn characteristic(&mut self, gamma: &Matrix, lambda: &Array) -> Result<Complex64> {
        let states = self.terminal_states()?;
        characteristic(gamma, lambda, &states)
    }

    /// Like [`characteristic`](Self::characteristic), with standard errors.
    pub fn estimate_characteristic(&mut self, gamma: &Matrix, lambda: &Array) -> Result<CharacteristicEstimate> {
        let states = self.terminal_states()?;
        estimate_characteristic(gamma, lambda, &states)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
