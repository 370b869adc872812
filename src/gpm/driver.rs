//! End-to-end training run: load → build → trainability → train → save.
//!
//! [`TrainOptions::default`] reproduces the reference configuration
//! (5 cells, 17 066 genes, 5 inducing points, `K1 = 1`, `K2 = 20`, batch
//! 500, Adam at 0.005 for 10 000 steps) with data paths relative to the
//! working directory.
use crate::{
    gpm::{
        builder::{SplitGpmBuilder, DEFAULT_MODEL_NAME},
        data::load_matrix,
        errors::{GpmError, GpmResult},
        features::{InducingPoints, SharedIndependentFeature},
        kernel::{Rbf, SharedIndependentKernel},
        likelihood::GaussianLikelihood,
        model::SplitGpm,
        params::ParamGroup,
        session::Session,
        snapshot::{save_model, Snapshot, DEFAULT_SNAPSHOT_PATH},
        weights::{log_weights, random_weights},
    },
    optimization::adam_optimizer::{
        types::{DEFAULT_BETA1, DEFAULT_BETA2, DEFAULT_EPSILON},
        AdamOptions,
    },
};
use log::info;
use ndarray::Array2;
use std::path::PathBuf;

/// Groups the driver switches on before training.
pub const TRAINED_GROUPS: [ParamGroup; 5] = [
    ParamGroup::W1,
    ParamGroup::W2,
    ParamGroup::Feature,
    ParamGroup::Kernel,
    ParamGroup::Likelihood,
];

/// Configuration of one training run.
///
/// Fields
/// ------
/// - `x_path`, `y_path`: whitespace-delimited input matrices.
/// - `output_path`: snapshot destination, overwritten if present.
/// - `n_cells` (`C`), `n_genes` (`G`), `n_inducing` (`T`), `k1`, `k2`:
///   model sizes. `Y` must have exactly `n_genes` columns.
/// - `minibatch_size`, `learning_rate`, `max_iter`, `log_every`: training.
/// - `seed`: seeds the session generator (weights and minibatches).
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOptions {
    pub x_path: PathBuf,
    pub y_path: PathBuf,
    pub output_path: PathBuf,
    pub model_name: String,
    pub n_cells: usize,
    pub n_genes: usize,
    pub n_inducing: usize,
    pub k1: usize,
    pub k2: usize,
    pub minibatch_size: usize,
    pub learning_rate: f64,
    pub max_iter: usize,
    pub log_every: Option<usize>,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            x_path: PathBuf::from("../data/neur.X.txt"),
            y_path: PathBuf::from("../data/neur.Y.txt"),
            output_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            n_cells: 5,
            n_genes: 17_066,
            n_inducing: 5,
            k1: 1,
            k2: 20,
            minibatch_size: 500,
            learning_rate: 0.005,
            max_iter: 10_000,
            log_every: Some(500),
            seed: 0,
        }
    }
}

impl TrainOptions {
    /// Check sizes and build the optimizer options.
    ///
    /// # Errors
    /// - `ZeroSize` for any zero model size.
    /// - `Optimization` for invalid learning rate, iteration count or
    ///   logging interval.
    pub fn adam_options(&self) -> GpmResult<AdamOptions> {
        let sizes = [
            ("number of cells", self.n_cells),
            ("number of genes", self.n_genes),
            ("number of inducing points", self.n_inducing),
            ("cell clusters K1", self.k1),
            ("gene clusters K2", self.k2),
            ("minibatch size", self.minibatch_size),
        ];
        if let Some((what, _)) = sizes.into_iter().find(|(_, v)| *v == 0) {
            return Err(GpmError::ZeroSize { what });
        }
        Ok(AdamOptions::with_moments(
            self.learning_rate,
            DEFAULT_BETA1,
            DEFAULT_BETA2,
            DEFAULT_EPSILON,
            self.max_iter,
            self.log_every,
        )?)
    }
}

/// Build, configure and train a model on in-memory data.
///
/// `session` is reset first; weights are drawn from it and the model is
/// registered with it.
///
/// # Errors
/// - `ShapeMismatch` if `y` does not have `opts.n_genes` columns.
/// - Any option, build or training error.
pub fn fit(
    opts: &TrainOptions, x: Array2<f64>, y: Array2<f64>, session: &mut Session,
) -> GpmResult<SplitGpm> {
    let adam = opts.adam_options()?;
    if y.ncols() != opts.n_genes {
        return Err(GpmError::ShapeMismatch {
            what: "columns of Y (genes)",
            expected: opts.n_genes,
            found: y.ncols(),
        });
    }
    session.reset();

    let w1 = log_weights(&random_weights(session.rng(), opts.n_cells, opts.k1));
    let w2 = log_weights(&random_weights(session.rng(), opts.n_genes, opts.k2));
    let kernel = SharedIndependentKernel::new(Rbf::new(0), opts.k1 * opts.k2)?;
    let feature =
        SharedIndependentFeature::new(InducingPoints::linspace(0.0, 1.0, opts.n_inducing)?);

    let mut model = SplitGpmBuilder::new(x, y)
        .weights(w1, w2)
        .kernel(kernel)
        .likelihood(GaussianLikelihood::default())
        .feature(feature)
        .minibatch_size(opts.minibatch_size)
        .name(opts.model_name.clone())
        .compile(session)?;
    for group in TRAINED_GROUPS {
        model.set_trainable(group, true);
    }
    model.train(&adam)?;
    Ok(model)
}

/// Load the input files, train, and save the snapshot to `opts.output_path`.
///
/// # Errors
/// Loader, build, training and snapshot errors, unchanged.
pub fn run(opts: &TrainOptions) -> GpmResult<Snapshot> {
    info!("Loading X from {} and Y from {}", opts.x_path.display(), opts.y_path.display());
    let x = load_matrix(&opts.x_path)?;
    let y = load_matrix(&opts.y_path)?;
    let mut session = Session::new(opts.seed);
    let model = fit(opts, x, y, &mut session)?;
    save_model(&model, Some(&opts.output_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptError;

    #[test]
    // Purpose
    // -------
    // Defaults match the reference run.
    fn defaults_match_reference_configuration() {
        let opts = TrainOptions::default();

        assert_eq!((opts.n_cells, opts.n_genes, opts.n_inducing), (5, 17_066, 5));
        assert_eq!((opts.k1, opts.k2, opts.minibatch_size), (1, 20, 500));
        assert_eq!(opts.output_path, PathBuf::from("../data/splitgpm.trained.pickle"));
        let adam = opts.adam_options().unwrap();
        assert_eq!((adam.learning_rate, adam.max_iter), (0.005, 10_000));
    }

    #[test]
    // Purpose
    // -------
    // Zero sizes and bad optimizer settings are rejected before any work.
    fn invalid_options_are_rejected() {
        let zero = TrainOptions { k2: 0, ..TrainOptions::default() };
        assert_eq!(zero.adam_options(), Err(GpmError::ZeroSize { what: "gene clusters K2" }));

        let lr = TrainOptions { learning_rate: -1.0, ..TrainOptions::default() };
        assert!(matches!(
            lr.adam_options(),
            Err(GpmError::Optimization { source: OptError::InvalidLearningRate { .. } })
        ));
    }

    #[test]
    // Purpose
    // -------
    // `fit` checks the gene count of Y against the options.
    fn fit_rejects_wrong_gene_count() {
        let opts = TrainOptions { n_genes: 3, max_iter: 1, ..TrainOptions::default() };
        let mut session = Session::new(0);

        let err = fit(&opts, Array2::zeros((5, 1)), Array2::zeros((5, 4)), &mut session);

        assert!(matches!(err, Err(GpmError::ShapeMismatch { expected: 3, found: 4, .. })));
    }
}
