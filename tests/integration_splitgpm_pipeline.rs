//! Integration tests for the SplitGPM training pipeline.
//!
//! Purpose
//! -------
//! - Validate the end-to-end path: text matrices on disk, weight
//!   initialization, model compilation, trainability configuration,
//!   minibatch Adam, and the snapshot written back to disk.
//! - Exercise the driver with a tiny configuration so that the run takes
//!   milliseconds while touching every stage.
//!
//! Coverage
//! --------
//! - `gpm::driver`: `run` and `fit` with custom `TrainOptions`.
//! - `gpm::snapshot`: `load_snapshot` on the file the driver wrote.
//! - `gpm::session`: seeded determinism across runs.
//!
//! Exclusions
//! ----------
//! - Gradient correctness and parameter-store details, covered by unit
//!   tests in `gpm::model` and `gpm::params`.
//! - The full-size reference run (17 066 genes, 10 000 iterations).
use ndarray::{Array, Array2, Axis};
use rand::{rngs::StdRng, Rng, SeedableRng};
use splitgpm::gpm::{
    driver::{fit, run},
    snapshot::{load_snapshot, ParamValue},
    GpmError, ParamGroup, Session, TrainOptions,
};
use std::{
    env, fs,
    path::{Path, PathBuf},
    process,
};

/// Purpose
/// -------
/// Per-test scratch directory under the system temp dir.
fn scratch_dir(tag: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("splitgpm-it-{tag}-{}", process::id()));
    fs::create_dir_all(&dir).expect("scratch directory should be creatable");
    dir
}

/// Purpose
/// -------
/// Write `m` as whitespace-separated text, one row per line.
fn write_matrix(path: &Path, m: &Array2<f64>) {
    let text: String = m
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|v| format!("{v:.6}")).collect::<Vec<_>>().join(" ") + "\n")
        .collect();
    fs::write(path, text).expect("matrix file should be writable");
}

/// Purpose
/// -------
/// Ten time points on [0, 1] and four genes of seeded random nonnegative
/// expression.
fn toy_inputs() -> (Array2<f64>, Array2<f64>) {
    let mut rng = StdRng::seed_from_u64(2024);
    let x = Array::linspace(0.0, 1.0, 10).insert_axis(Axis(1));
    let y = Array2::from_shape_simple_fn((10, 4), || 3.0 * rng.gen::<f64>());
    (x, y)
}

/// Purpose
/// -------
/// Small run configuration: C = 2, G = 4, T = 5, K1 = 1, K2 = 2, 5 steps.
fn toy_options(dir: &Path) -> TrainOptions {
    TrainOptions {
        x_path: dir.join("toy.X.txt"),
        y_path: dir.join("toy.Y.txt"),
        output_path: dir.join("toy.trained.bin"),
        n_cells: 2,
        n_genes: 4,
        n_inducing: 5,
        k1: 1,
        k2: 2,
        minibatch_size: 4,
        max_iter: 5,
        log_every: None,
        ..TrainOptions::default()
    }
}

#[test]
// Purpose
// -------
// The driver trains on files and writes a loadable, non-empty snapshot.
//
// Given
// -----
// - X (10×1) and Y (10×4) written as text, C = 2, G = 4, T = 5, K1 = 1, K2 = 2.
//
// Expect
// ------
// - The output file exists and is non-empty.
// - The loaded mapping has entries for W1, W2, the feature, the kernel and
//   the likelihood, with the expected shapes.
fn driver_run_writes_loadable_snapshot() {
    let dir = scratch_dir("run");
    let opts = toy_options(&dir);
    let (x, y) = toy_inputs();
    write_matrix(&opts.x_path, &x);
    write_matrix(&opts.y_path, &y);

    let returned = run(&opts).expect("driver run should succeed on toy data");

    let size = fs::metadata(&opts.output_path).expect("snapshot should exist").len();
    assert!(size > 0);
    let loaded = load_snapshot(&opts.output_path).expect("snapshot should load");
    assert_eq!(loaded, returned);
    for key in [
        "test.W1",
        "test.W2",
        "test.feature.feat.Z",
        "test.kern.kern.variance",
        "test.kern.kern.lengthscales",
        "test.likelihood.variance",
    ] {
        assert!(loaded.contains_key(key), "missing {key}");
    }
    assert_eq!(loaded["test.W1"].to_array().unwrap().shape(), &[2, 1]);
    assert_eq!(loaded["test.W2"].to_array().unwrap().shape(), &[4, 2]);
    match loaded["test.likelihood.variance"] {
        ParamValue::Scalar(v) => assert!(v.is_finite() && v > 0.0),
        ref other => panic!("Expected a scalar noise variance, got {other:?}"),
    }

    fs::remove_dir_all(&dir).expect("scratch directory should be removable");
}

#[test]
// Purpose
// -------
// Same seed and inputs give identical trained parameters.
fn fit_is_deterministic_for_a_seed() {
    let opts = toy_options(Path::new("."));
    let (x, y) = toy_inputs();

    let a = fit(&opts, x.clone(), y.clone(), &mut Session::new(17)).expect("first fit");
    let b = fit(&opts, x, y, &mut Session::new(17)).expect("second fit");

    assert_eq!(a.params(), b.params());
    assert!(a.is_trainable(ParamGroup::Kernel));
    assert!(a.elbo().expect("elbo").is_finite());
}

#[test]
// Purpose
// -------
// Missing input files surface as I/O errors from the driver.
fn driver_run_reports_missing_inputs() {
    let dir = scratch_dir("missing");
    let opts = toy_options(&dir);

    let err = run(&opts).expect_err("run should fail without inputs");

    assert!(matches!(err, GpmError::Io { .. }));
    fs::remove_dir_all(&dir).expect("scratch directory should be removable");
}
