//! Deferred two-phase construction of a [`SplitGpm`].
//!
//! Purpose
//! -------
//! Collect data, initial weights and model components without touching
//! them, then validate and finalize everything in one place:
//! [`SplitGpmBuilder::compile`]. A compiled model has a fixed structure;
//! only parameter values and trainability flags change afterwards.
//!
//! Key behaviors
//! -------------
//! - Likelihood defaults to unit noise, the cell layout to contiguous blocks
//!   with one block per row of `W1`, the model name to `"test"`.
//! - Data, weights, kernel, inducing feature and minibatch size are required.
//! - `compile` registers the model with the [`Session`] and forks the
//!   session generator for minibatch sampling.
//!
//! Invariants & assumptions
//! ------------------------
//! - `W1` has one row per cell and `W2` one row per gene.
//! - `kernel.output_dim() == K1 · K2` where `K1 = W1.ncols()`, `K2 = W2.ncols()`.
//! - The variational state starts at `q_mu = 0`, `q_sqrt = I` for every channel.
use crate::{
    gpm::{
        data::{CellLayout, SplitData},
        errors::{GpmError, GpmResult},
        features::SharedIndependentFeature,
        kernel::{rbf_matrix, SharedIndependentKernel},
        likelihood::GaussianLikelihood,
        linalg::{LowerFactor, JITTER},
        minibatch::MinibatchSampler,
        model::SplitGpm,
        params::{ParamStore, Params},
        session::Session,
    },
    optimization::numerical_stability::transformations::from_positive,
};
use log::info;
use ndarray::Array2;

/// Name given to models built without [`SplitGpmBuilder::name`].
pub const DEFAULT_MODEL_NAME: &str = "test";

/// Accumulates the pieces of a SplitGPM model until [`compile`](Self::compile).
#[derive(Debug, Clone)]
pub struct SplitGpmBuilder {
    x: Array2<f64>,
    y: Array2<f64>,
    w1: Option<Array2<f64>>,
    w2: Option<Array2<f64>>,
    kernel: Option<SharedIndependentKernel>,
    likelihood: GaussianLikelihood,
    feature: Option<SharedIndependentFeature>,
    minibatch_size: Option<usize>,
    name: String,
    layout: Option<CellLayout>,
}

impl SplitGpmBuilder {
    /// Start a model on covariates `x (N×D)` and expression `y (N×G)`.
    pub fn new(x: Array2<f64>, y: Array2<f64>) -> Self {
        Self {
            x,
            y,
            w1: None,
            w2: None,
            kernel: None,
            likelihood: GaussianLikelihood::default(),
            feature: None,
            minibatch_size: None,
            name: DEFAULT_MODEL_NAME.to_string(),
            layout: None,
        }
    }

    /// Initial cell (`C×K1`) and gene (`G×K2`) log-weights.
    pub fn weights(mut self, w1: Array2<f64>, w2: Array2<f64>) -> Self {
        self.w1 = Some(w1);
        self.w2 = Some(w2);
        self
    }

    pub fn kernel(mut self, kernel: SharedIndependentKernel) -> Self {
        self.kernel = Some(kernel);
        self
    }

    pub fn likelihood(mut self, likelihood: GaussianLikelihood) -> Self {
        self.likelihood = likelihood;
        self
    }

    pub fn feature(mut self, feature: SharedIndependentFeature) -> Self {
        self.feature = Some(feature);
        self
    }

    pub fn minibatch_size(mut self, size: usize) -> Self {
        self.minibatch_size = Some(size);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the default contiguous-block row → cell assignment.
    pub fn cell_layout(mut self, layout: CellLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Validate everything and build the model.
    ///
    /// # Errors
    /// - `MissingComponent` when weights, kernel, feature or minibatch size
    ///   were never supplied.
    /// - Data validation errors from [`SplitData::new`].
    /// - `ShapeMismatch` when `W1`/`W2` rows disagree with the cell or gene count.
    /// - `ZeroSize` for zero clusters or a zero minibatch size.
    /// - `NonFiniteWeights` for a NaN/±inf log-weight.
    /// - `OutputDimMismatch` when the kernel channel count is not `K1·K2`.
    /// - `ActiveDimOutOfRange` when the kernel reads a column X lacks.
    /// - `CholeskyFailed` if the inducing covariance is not positive definite.
    /// - `SessionBusy` if the session already holds a model.
    pub fn compile(self, session: &mut Session) -> GpmResult<SplitGpm> {
        let w1 = self.w1.ok_or(GpmError::MissingComponent { what: "cell weights W1" })?;
        let w2 = self.w2.ok_or(GpmError::MissingComponent { what: "gene weights W2" })?;
        let kernel = self.kernel.ok_or(GpmError::MissingComponent { what: "kernel" })?;
        let feature = self.feature.ok_or(GpmError::MissingComponent { what: "inducing feature" })?;
        let minibatch_size =
            self.minibatch_size.ok_or(GpmError::MissingComponent { what: "minibatch size" })?;

        let layout = self.layout.unwrap_or(CellLayout::Blocks { n_cells: w1.nrows() });
        let data = SplitData::new(self.x, self.y, &layout)?;
        check_weights("W1", &w1, "rows of W1 (cells)", data.n_cells, "cell clusters K1")?;
        check_weights("W2", &w2, "rows of W2 (genes)", data.n_genes(), "gene clusters K2")?;
        let (k1, k2) = (w1.ncols(), w2.ncols());
        if kernel.output_dim() != k1 * k2 {
            return Err(GpmError::OutputDimMismatch { kernel: kernel.output_dim(), k1, k2 });
        }
        if kernel.active_dim() >= data.x.ncols() {
            return Err(GpmError::ActiveDimOutOfRange {
                dim: kernel.active_dim(),
                columns: data.x.ncols(),
            });
        }

        let z = feature.inducing.z.clone();
        let m = z.len();
        let mut kzz =
            rbf_matrix(kernel.base.variance, kernel.base.lengthscale, z.view(), z.view());
        kzz.diag_mut().mapv_inplace(|v| v + JITTER);
        LowerFactor::new(&kzz)?;

        let sampler = MinibatchSampler::new(session.fork_rng(), data.n_rows(), minibatch_size)?;
        session.register_model(&self.name)?;

        let channels = kernel.output_dim();
        let params = Params {
            w1: w1.as_standard_layout().into_owned(),
            w2: w2.as_standard_layout().into_owned(),
            z,
            kernel_raw: [
                from_positive(kernel.base.variance),
                from_positive(kernel.base.lengthscale),
            ],
            noise_raw: from_positive(self.likelihood.variance),
            q_mu: Array2::zeros((m, channels)),
            q_sqrt: (0..channels).map(|_| Array2::eye(m)).collect(),
        };
        info!(
            "Compiled model '{}': N = {}, G = {}, C = {}, K1 = {}, K2 = {}, M = {}, batch = {}",
            self.name,
            data.n_rows(),
            data.n_genes(),
            data.n_cells,
            k1,
            k2,
            m,
            sampler.batch_size()
        );
        Ok(SplitGpm::from_parts(self.name, data, kernel, k1, k2, ParamStore::new(params), sampler))
    }
}

// ---- Helper methods ----

fn check_weights(
    name: &'static str, w: &Array2<f64>, rows_what: &'static str, rows: usize,
    cols_what: &'static str,
) -> GpmResult<()> {
    if w.nrows() != rows {
        return Err(GpmError::ShapeMismatch { what: rows_what, expected: rows, found: w.nrows() });
    }
    if w.ncols() == 0 {
        return Err(GpmError::ZeroSize { what: cols_what });
    }
    if let Some(((row, col), &value)) = w.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(GpmError::NonFiniteWeights { name, row, col, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpm::{features::InducingPoints, kernel::Rbf};
    use ndarray::{array, Array};

    fn builder(k1: usize, k2: usize) -> SplitGpmBuilder {
        let x = Array::linspace(0.0, 1.0, 6).insert_axis(ndarray::Axis(1));
        let y = Array2::from_shape_fn((6, 3), |(n, g)| (n + g) as f64 * 0.1);
        SplitGpmBuilder::new(x, y)
            .weights(Array2::zeros((2, k1)), Array2::zeros((3, k2)))
            .kernel(SharedIndependentKernel::new(Rbf::new(0), k1 * k2).unwrap())
            .feature(SharedIndependentFeature::new(InducingPoints::linspace(0.0, 1.0, 5).unwrap()))
            .minibatch_size(4)
    }

    #[test]
    // Purpose
    // -------
    // A complete builder compiles into a model with zero means and identity
    // square roots, and registers it with the session.
    fn compile_initializes_variational_state() {
        let mut session = Session::new(0);

        let model = builder(1, 2).compile(&mut session).unwrap();

        let p = model.params();
        assert_eq!(p.q_mu, Array2::<f64>::zeros((5, 2)));
        assert_eq!(p.q_sqrt.len(), 2);
        assert_eq!(p.q_sqrt[1], Array2::<f64>::eye(5));
        assert_eq!(session.live_model(), Some("test"));
    }

    #[test]
    // Purpose
    // -------
    // Structural mismatches are caught at compile time.
    fn compile_rejects_inconsistent_structure() {
        let mut session = Session::new(0);
        let wrong_channels = builder(1, 2)
            .kernel(SharedIndependentKernel::new(Rbf::new(0), 3).unwrap())
            .compile(&mut session);
        assert_eq!(wrong_channels.err(), Some(GpmError::OutputDimMismatch { kernel: 3, k1: 1, k2: 2 }));

        let wrong_dim = builder(1, 2)
            .kernel(SharedIndependentKernel::new(Rbf::new(1), 2).unwrap())
            .compile(&mut session);
        assert_eq!(wrong_dim.err(), Some(GpmError::ActiveDimOutOfRange { dim: 1, columns: 1 }));

        let wrong_genes = builder(1, 2).weights(Array2::zeros((2, 1)), Array2::zeros((4, 2)));
        assert!(matches!(
            wrong_genes.compile(&mut session),
            Err(GpmError::ShapeMismatch { expected: 3, found: 4, .. })
        ));

        let missing = SplitGpmBuilder::new(array![[0.0]], array![[1.0]]).compile(&mut session);
        assert!(matches!(missing, Err(GpmError::MissingComponent { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Non-finite log-weights (from a zero-sum row upstream) and zero batch
    // sizes are rejected before the model exists.
    fn compile_rejects_non_finite_weights_and_zero_batch() {
        let mut session = Session::new(0);
        let mut w2 = Array2::zeros((3, 2));
        w2[[2, 1]] = f64::NAN;

        let nan = builder(1, 2).weights(Array2::zeros((2, 1)), w2).compile(&mut session);
        assert!(matches!(nan, Err(GpmError::NonFiniteWeights { name: "W2", row: 2, col: 1, .. })));

        let zero = builder(1, 2).minibatch_size(0).compile(&mut session);
        assert_eq!(zero.err(), Some(GpmError::ZeroSize { what: "minibatch size" }));
        assert!(session.live_model().is_none());
    }
}
