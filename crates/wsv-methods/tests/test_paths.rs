//! Batch path generation and characteristic-function estimation.
//!
//! These integration tests drive `generate` end to end through the
//! Fonseca–Zhou process and every splitting scheme.

use proptest::prelude::*;
use wsv_core::Real;
use wsv_math::{is_symmetric, Array, IncrementalStatistics, Matrix};
use wsv_methods::{characteristic, generate, Simulation};
use wsv_processes::{BatchConfig, FonsecaZhouParameters, FonsecaZhouProcess, ModelState, SplittingScheme};

fn mean_reverting_process() -> FonsecaZhouProcess {
    let params = FonsecaZhouParameters::new(
        0.02,
        Array::from_vec(vec![-0.3, -0.2]),
        2.5,
        Matrix::identity(2, 2) * 0.2,
        Matrix::identity(2, 2) * -0.5,
    )
    .unwrap();
    FonsecaZhouProcess::new(params).unwrap()
}

fn small_x0() -> Matrix {
    Matrix::identity(2, 2) * 0.04
}

fn trajectories(sim: Simulation) -> Vec<wsv_methods::Path> {
    match sim {
        Simulation::Trajectories(paths) => paths,
        Simulation::Terminal(_) => panic!("expected full trajectories"),
    }
}

// ─── Batch shape ──────────────────────────────────────────────────────────────

#[test]
fn batch_sizes_and_path_lengths() {
    for scheme in SplittingScheme::ALL {
        let mut process = mean_reverting_process();
        let config = BatchConfig::new(1.0, 6, 7).with_scheme(scheme);
        let paths = trajectories(generate(&mut process, &small_x0(), &Array::zeros(2), &config).unwrap());
        assert_eq!(paths.len(), 7, "{scheme}");
        for path in &paths {
            assert_eq!(path.len(), 7, "{scheme}");
            assert_eq!(path.times.len(), 7, "{scheme}");
            assert_eq!(path.front().unwrap().x, small_x0());
            assert!(path.states.iter().all(ModelState::is_finite), "{scheme}");
        }
    }
}

#[test]
fn terminal_only_mode() {
    let mut process = mean_reverting_process();
    let config = BatchConfig::new(1.0, 6, 9).terminal_only();
    let sim = generate(&mut process, &small_x0(), &Array::zeros(2), &config).unwrap();
    let Simulation::Terminal(states) = &sim else {
        panic!("expected terminal states");
    };
    assert_eq!(states.len(), 9);

    // the terminal states are the last points of the full trajectories
    let full = generate(&mut process, &small_x0(), &Array::zeros(2), &config.clone().with_trajectory(true)).unwrap();
    let from_paths: Vec<ModelState> = full.into_terminal_states();
    assert_eq!(&from_paths, states);
}

#[test]
fn covariance_is_symmetric_at_every_grid_point() {
    for scheme in SplittingScheme::ALL {
        let mut process = mean_reverting_process();
        let config = BatchConfig::new(2.0, 20, 5).with_scheme(scheme).with_seed(31);
        let paths = trajectories(generate(&mut process, &small_x0(), &Array::zeros(2), &config).unwrap());
        for path in &paths {
            for state in &path.states {
                assert!(is_symmetric(&state.x, 0.0), "{scheme}: {}", state.x);
            }
        }
    }
}

#[test]
fn parallel_batches_match_sequential_ones() {
    for scheme in [SplittingScheme::RandomizedLieTrotter, SplittingScheme::Euler] {
        let mut process = mean_reverting_process();
        let config = BatchConfig::new(1.0, 5, 16).with_scheme(scheme).with_seed(99);
        let sequential = generate(&mut process, &small_x0(), &Array::zeros(2), &config).unwrap();
        let parallel =
            generate(&mut process, &small_x0(), &Array::zeros(2), &config.clone().with_parallel(true)).unwrap();
        assert_eq!(sequential, parallel, "{scheme}");
    }
}

#[test]
fn seeds_select_different_streams() {
    let mut process = mean_reverting_process();
    let config = BatchConfig::new(1.0, 3, 2).terminal_only();
    let a = generate(&mut process, &small_x0(), &Array::zeros(2), &config).unwrap();
    let b = generate(&mut process, &small_x0(), &Array::zeros(2), &config.clone().with_seed(1)).unwrap();
    assert_ne!(a, b);
    // two paths of one batch use different streams
    let states = a.into_terminal_states();
    assert_ne!(states[0], states[1]);
}

// ─── Concrete scenario ────────────────────────────────────────────────────────

#[test]
fn rank_two_scenario_produces_a_full_trajectory() {
    let params = FonsecaZhouParameters::new(
        0.01,
        Array::from_vec(vec![0.2, -0.3]),
        3.0,
        Matrix::from_row_slice(2, 2, &[2.0, -1.0, 2.0, 1.0]),
        Matrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 0.0]),
    )
    .unwrap();
    let x0 = Matrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 2.0]);
    for scheme in SplittingScheme::ALL {
        let mut process = FonsecaZhouProcess::new(params.clone()).unwrap();
        let config = BatchConfig::new(1.0, 30, 1).with_scheme(scheme);
        let paths = trajectories(generate(&mut process, &x0, &Array::zeros(2), &config).unwrap());
        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        assert_eq!(path.len(), 31, "{scheme}");
        for state in &path.states {
            assert_eq!(state.x.shape(), (2, 2));
            assert_eq!(state.y.len(), 2);
            assert!(state.is_finite(), "{scheme}: {state:?}");
            assert!(is_symmetric(&state.x, 0.0), "{scheme}: {}", state.x);
        }
    }
}

// ─── Moments ──────────────────────────────────────────────────────────────────

fn terminal_moments(scheme: SplittingScheme, seed: u64) -> Vec<IncrementalStatistics> {
    let mut process = mean_reverting_process();
    let config = BatchConfig::new(1.0, 8, 4000)
        .with_scheme(scheme)
        .with_seed(seed)
        .with_parallel(true)
        .terminal_only();
    let states = generate(&mut process, &small_x0(), &Array::zeros(2), &config)
        .unwrap()
        .into_terminal_states();
    let mut stats = vec![IncrementalStatistics::new(); 5];
    for s in &states {
        stats[0].add(s.x[(0, 0)]);
        stats[1].add(s.x[(0, 1)]);
        stats[2].add(s.x[(1, 1)]);
        stats[3].add(s.y[0]);
        stats[4].add(s.y[1]);
    }
    stats
}

#[test]
fn randomized_and_two_stage_schemes_agree_on_terminal_moments() {
    let lie_trotter = terminal_moments(SplittingScheme::RandomizedLieTrotter, 11);
    let two_stage = terminal_moments(SplittingScheme::TwoStage, 12);
    for (i, (a, b)) in lie_trotter.iter().zip(&two_stage).enumerate() {
        let (ma, mb) = (a.mean().unwrap(), b.mean().unwrap());
        let se: Real = a.error_estimate().unwrap().hypot(b.error_estimate().unwrap());
        assert!((ma - mb).abs() < 5.0 * se + 0.01, "moment {i}: {ma} vs {mb} (se {se})");
    }
}

// ─── Characteristic function ──────────────────────────────────────────────────

fn small_batch() -> Vec<ModelState> {
    let mut process = mean_reverting_process();
    let config = BatchConfig::new(1.0, 4, 20).terminal_only().with_seed(5);
    generate(&mut process, &small_x0(), &Array::zeros(2), &config)
        .unwrap()
        .into_terminal_states()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn characteristic_is_permutation_invariant(
        order in Just((0..20).collect::<Vec<usize>>()).prop_shuffle(),
        gamma_scale in -5.0..5.0_f64,
        l0 in -5.0..5.0_f64,
        l1 in -5.0..5.0_f64,
    ) {
        let states = small_batch();
        let gamma = Matrix::from_row_slice(2, 2, &[1.0, 0.3, -0.2, 0.5]) * gamma_scale;
        let lambda = Array::from_vec(vec![l0, l1]);
        let reference = characteristic(&gamma, &lambda, &states).unwrap();
        let shuffled = characteristic(&gamma, &lambda, order.iter().map(|&i| &states[i])).unwrap();
        prop_assert!((reference - shuffled).norm() <= 1e-12);
    }
}

#[test]
fn characteristic_at_the_origin_is_one() {
    let states = small_batch();
    let phi = characteristic(&Matrix::zeros(2, 2), &Array::zeros(2), &states).unwrap();
    assert_eq!(phi.re, 1.0);
    assert_eq!(phi.im, 0.0);
}

#[test]
fn characteristic_of_an_empty_batch_is_an_error() {
    let empty: Vec<ModelState> = Vec::new();
    assert!(characteristic(&Matrix::identity(2, 2), &Array::zeros(2), &empty).is_err());
}
