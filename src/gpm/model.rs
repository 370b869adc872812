//! gpm::model — the SplitGPM variational objective and its training entry point.
//!
//! Purpose
//! -------
//! Jointly cluster cells (`K1` groups) and genes (`K2` groups) while fitting
//! one Gaussian-process time trend per cluster pair. Soft assignments are
//! `φ1 = softmax(W1)` over cells and `φ2 = softmax(W2)` over genes, row by
//! row; channel `k = k1·K2 + k2` carries the latent trend `f_k(x)`.
//!
//! Key behaviors
//! -------------
//! - The training objective is the minibatch evidence lower bound
//!
//!   ```text
//!   ELBO = (N/|B|) Σ_{n∈B} Σ_{k1,k2} φ1[c(n),k1] Σ_g φ2[g,k2] E_q[ln N(y_ng | f_k(x_n), σ²)]
//!          − Σ_k KL(q(v_k) ‖ N(0, I)) − Σ_c KL(φ1[c] ‖ U(K1)) − Σ_g KL(φ2[g] ‖ U(K2))
//!   ```
//!
//!   with whitened inducing outputs `u_k = L_zz v_k`, `q(v_k) = N(m_k, L_k L_kᵀ)`.
//! - Gene sums collapse into sufficient statistics per batch row:
//!   `s0[k2] = Σ_g φ2`, `s1[n,k2] = Σ_g y φ2`, `s2[n,k2] = Σ_g y² φ2`.
//! - Gradients are analytic for `W1`, `W2` and the variational group, and
//!   central finite differences of the data term for the inducing
//!   locations, kernel and likelihood hyperparameters.
//! - [`SplitGpm::train`] runs Adam through
//!   [`maximize`](crate::optimization::adam_optimizer::maximize) and writes
//!   the last iterate back into the parameter store.
//!
//! Invariants & assumptions
//! ------------------------
//! - The structure (`N`, `G`, `C`, `K1`, `K2`, `M`) is fixed at compile time.
//! - `value` and `grad` evaluate on the batch drawn by the most recent
//!   `next_batch`; the first batch is drawn at construction.
//! - Kernel matrices at the inducing inputs receive `JITTER` on the
//!   diagonal before factorization; a failed factorization is fatal.
//!
//! Testing notes
//! -------------
//! - Unit tests compare the analytic gradient with finite differences of
//!   the full objective, check the collapsed data term against a direct
//!   gene-by-gene sum, and confirm that frozen groups survive training.
use crate::{
    gpm::{
        data::SplitData,
        errors::{GpmError, GpmResult},
        kernel::{rbf_matrix, SharedIndependentKernel},
        linalg::{LowerFactor, JITTER},
        minibatch::MinibatchSampler,
        params::{write_variational, ParamGroup, ParamStore, Params},
    },
    optimization::{
        adam_optimizer::{
            finite_diff::fd_gradient_fallible, maximize, validation::validate_theta, AdamOptions,
            Cost, Grad, Objective, OptimOutcome, Theta,
        },
        errors::{OptError, OptResult},
        numerical_stability::transformations::{log_softmax_rows, softmax_rows_backward, to_positive},
    },
};
use log::{debug, info};
use ndarray::{s, Array1, Array2, Axis};
use std::{cell::RefCell, f64::consts::PI};

/// Groups whose gradient comes from finite differences of the data term.
const HYPER_GROUPS: [ParamGroup; 3] =
    [ParamGroup::Feature, ParamGroup::Kernel, ParamGroup::Likelihood];

/// A compiled SplitGPM model.
///
/// Built by [`SplitGpmBuilder::compile`](crate::gpm::builder::SplitGpmBuilder::compile).
/// Holds the validated data, the parameter store with per-group trainable
/// flags and the minibatch state used while training.
#[derive(Debug)]
pub struct SplitGpm {
    name: String,
    data: SplitData,
    kernel: SharedIndependentKernel,
    k1: usize,
    k2: usize,
    store: ParamStore,
    sampler: RefCell<MinibatchSampler>,
    batch: RefCell<Vec<usize>>,
}

impl SplitGpm {
    pub(crate) fn from_parts(
        name: String, data: SplitData, kernel: SharedIndependentKernel, k1: usize, k2: usize,
        store: ParamStore, mut sampler: MinibatchSampler,
    ) -> Self {
        let batch = sampler.sample();
        Self {
            name,
            data,
            kernel,
            k1,
            k2,
            store,
            sampler: RefCell::new(sampler),
            batch: RefCell::new(batch),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &SplitData {
        &self.data
    }

    /// Number of cell clusters `K1`.
    pub fn k1(&self) -> usize {
        self.k1
    }

    /// Number of gene clusters `K2`.
    pub fn k2(&self) -> usize {
        self.k2
    }

    /// Current parameter values.
    pub fn params(&self) -> &Params {
        self.store.params()
    }

    /// Mark a parameter group as trained or frozen.
    pub fn set_trainable(&mut self, group: ParamGroup, trainable: bool) {
        debug!("{}: {group:?} trainable = {trainable}", self.name);
        self.store.set_trainable(group, trainable);
    }

    pub fn is_trainable(&self, group: ParamGroup) -> bool {
        self.store.is_trainable(group)
    }

    /// Current trainable parameters flattened into θ.
    pub fn theta(&self) -> Theta {
        self.store.pack()
    }

    /// ELBO over the full data set at the current parameters.
    ///
    /// # Errors
    /// `CholeskyFailed` if the inducing covariance cannot be factorized.
    pub fn elbo(&self) -> GpmResult<f64> {
        let rows: Vec<usize> = (0..self.data.n_rows()).collect();
        self.objective(self.store.params(), &self.data, &rows)
    }

    /// Maximize the ELBO with Adam and keep the last iterate.
    ///
    /// Runs exactly `opts.max_iter` steps; every step draws a new minibatch.
    ///
    /// # Errors
    /// - `Optimization { NothingToTrain }` when every group is frozen.
    /// - Any numerical or validation failure raised during training.
    pub fn train(&mut self, opts: &AdamOptions) -> GpmResult<OptimOutcome> {
        let theta0 = self.store.pack();
        info!(
            "Training '{}': {} parameters in {:?}, {} iterations, lr = {}",
            self.name,
            theta0.len(),
            self.store.trainable_groups(),
            opts.max_iter,
            opts.learning_rate
        );
        let outcome = maximize(&*self, theta0, &self.data, opts)?;
        self.store.commit(&outcome.theta_hat)?;
        info!(
            "Finished '{}' after {} iterations, last minibatch ELBO {:.4}",
            self.name, outcome.iterations, outcome.value
        );
        Ok(outcome)
    }

    /// ELBO of `p` on the batch `rows`.
    fn objective(&self, p: &Params, data: &SplitData, rows: &[usize]) -> GpmResult<f64> {
        let ctx = BatchContext::new(self, p, data, rows)?;
        let e = ctx.channel_expectations(&ctx.pred, p.noise());
        let data_term = ctx.data_term(&e);
        Ok(data_term
            - kl_variational(&p.q_mu, &p.q_sqrt)
            - kl_uniform(&ctx.log_phi1)
            - kl_uniform(&ctx.log_phi2))
    }

    /// ∇θ ELBO of `p` on the batch `rows`, laid out like θ.
    fn gradient(&self, p: &Params, data: &SplitData, rows: &[usize], dim: usize) -> GpmResult<Grad> {
        let ctx = BatchContext::new(self, p, data, rows)?;
        let noise = p.noise();
        let e = ctx.channel_expectations(&ctx.pred, noise);
        let mut grad = Grad::zeros(dim);

        for group in [ParamGroup::W1, ParamGroup::W2, ParamGroup::Variational] {
            let Some((offset, len)) = self.store.segment(group) else { continue };
            let block = match group {
                ParamGroup::W1 => ctx.grad_w1(&e),
                ParamGroup::W2 => ctx.grad_w2(noise),
                _ => ctx.grad_variational(p, noise),
            };
            grad.slice_mut(s![offset..offset + len]).assign(&block);
        }

        let hyper: Vec<ParamGroup> =
            HYPER_GROUPS.into_iter().filter(|g| self.store.is_trainable(*g)).collect();
        if !hyper.is_empty() {
            let mut h0 = Vec::new();
            for g in &hyper {
                p.write_group(*g, &mut h0);
            }
            let h0 = Array1::from(h0);
            let data_term_at = |h: &Theta| -> OptResult<f64> {
                let hp = Hyper::unpack(p, &hyper, h);
                let pred = ctx.predictive(&hp, p)?;
                let e = ctx.channel_expectations(&pred, to_positive(hp.noise_raw));
                Ok(ctx.data_term(&e))
            };
            let g_hyper = fd_gradient_fallible(&h0, data_term_at)?;
            let mut cursor = 0;
            for g in &hyper {
                let len = p.group_len(*g);
                if let Some((offset, _)) = self.store.segment(*g) {
                    grad.slice_mut(s![offset..offset + len])
                        .assign(&g_hyper.slice(s![cursor..cursor + len]));
                }
                cursor += len;
            }
        }
        Ok(grad)
    }
}

impl Objective for SplitGpm {
    type Data = SplitData;

    fn value(&self, theta: &Theta, data: &SplitData) -> OptResult<Cost> {
        let p = self.store.decode(theta)?;
        let rows = self.batch.borrow();
        Ok(self.objective(&p, data, &rows)?)
    }

    /// Reject a θ or data set that does not match the compiled structure.
    fn check(&self, theta: &Theta, data: &SplitData) -> OptResult<()> {
        let dim = self.store.dim();
        if dim == 0 {
            return Err(OptError::NothingToTrain);
        }
        validate_theta(theta, dim)?;
        let p = self.store.params();
        let checks = [
            ("rows of training data", self.data.n_rows(), data.n_rows()),
            ("genes in training data", p.w2.nrows(), data.n_genes()),
            ("cells in training data", p.w1.nrows(), data.n_cells),
        ];
        for (what, expected, found) in checks {
            if expected != found {
                return Err(GpmError::ShapeMismatch { what, expected, found }.into());
            }
        }
        if self.kernel.active_dim() >= data.x.ncols() {
            return Err(GpmError::ActiveDimOutOfRange {
                dim: self.kernel.active_dim(),
                columns: data.x.ncols(),
            }
            .into());
        }
        Ok(())
    }

    fn grad(&self, theta: &Theta, data: &SplitData) -> OptResult<Grad> {
        let p = self.store.decode(theta)?;
        let rows = self.batch.borrow();
        Ok(self.gradient(&p, data, &rows, theta.len())?)
    }

    fn next_batch(&self, _data: &SplitData) -> OptResult<()> {
        let next = self.sampler.borrow_mut().sample();
        *self.batch.borrow_mut() = next;
        Ok(())
    }
}

// ---- Batch computations ----

/// Hyperparameters that the finite-difference block perturbs.
struct Hyper {
    z: Array1<f64>,
    kernel_raw: [f64; 2],
    noise_raw: f64,
}

impl Hyper {
    fn of(p: &Params) -> Self {
        Self { z: p.z.clone(), kernel_raw: p.kernel_raw, noise_raw: p.noise_raw }
    }

    /// `p`'s hyperparameters with `groups` overwritten from `h`.
    fn unpack(p: &Params, groups: &[ParamGroup], h: &Theta) -> Self {
        let mut out = Self::of(p);
        let mut cursor = 0;
        for g in groups {
            match g {
                ParamGroup::Feature => {
                    let m = out.z.len();
                    out.z.assign(&h.slice(s![cursor..cursor + m]));
                    cursor += m;
                }
                ParamGroup::Kernel => {
                    out.kernel_raw = [h[cursor], h[cursor + 1]];
                    cursor += 2;
                }
                ParamGroup::Likelihood => {
                    out.noise_raw = h[cursor];
                    cursor += 1;
                }
                _ => {}
            }
        }
        out
    }
}

/// Marginals of `f_k(x_n)` under `q` for a batch.
///
/// Fields
/// ------
/// - `a`: `B×M`, rows `a_n = L_zz⁻¹ k_z(x_n)`.
/// - `mean`, `var`: `B×K` predictive means and variances.
/// - `proj`: per channel, `B×M` matrix `A L_k`.
struct Predictive {
    a: Array2<f64>,
    mean: Array2<f64>,
    var: Array2<f64>,
    proj: Vec<Array2<f64>>,
}

/// Everything about a batch that does not depend on the hyperparameters.
struct BatchContext<'a> {
    data: &'a SplitData,
    rows: &'a [usize],
    cells: Vec<usize>,
    x: Array1<f64>,
    scale: f64,
    k1: usize,
    k2: usize,
    phi1: Array2<f64>,
    log_phi1: Array2<f64>,
    phi2: Array2<f64>,
    log_phi2: Array2<f64>,
    s0: Array1<f64>,
    s1: Array2<f64>,
    s2: Array2<f64>,
    pred: Predictive,
}

impl<'a> BatchContext<'a> {
    fn new(
        model: &SplitGpm, p: &Params, data: &'a SplitData, rows: &'a [usize],
    ) -> GpmResult<Self> {
        let active = model.kernel.active_dim();
        let x = rows.iter().map(|&n| data.x[[n, active]]).collect::<Array1<f64>>();
        let cells = rows.iter().map(|&n| data.cell_of[n]).collect();
        let log_phi1 = log_softmax_rows(&p.w1);
        let log_phi2 = log_softmax_rows(&p.w2);
        let phi1 = log_phi1.mapv(f64::exp);
        let phi2 = log_phi2.mapv(f64::exp);

        let s0 = phi2.sum_axis(Axis(0));
        let mut s1 = Array2::<f64>::zeros((rows.len(), model.k2));
        let mut s2 = Array2::<f64>::zeros((rows.len(), model.k2));
        for (b, &n) in rows.iter().enumerate() {
            let y = data.y.row(n);
            s1.row_mut(b).assign(&y.dot(&phi2));
            s2.row_mut(b).assign(&y.mapv(|v| v * v).dot(&phi2));
        }

        let mut ctx = Self {
            data,
            rows,
            cells,
            x,
            scale: data.n_rows() as f64 / rows.len() as f64,
            k1: model.k1,
            k2: model.k2,
            phi1,
            log_phi1,
            phi2,
            log_phi2,
            s0,
            s1,
            s2,
            pred: Predictive {
                a: Array2::zeros((0, 0)),
                mean: Array2::zeros((0, 0)),
                var: Array2::zeros((0, 0)),
                proj: Vec::new(),
            },
        };
        ctx.pred = ctx.predictive(&Hyper::of(p), p)?;
        Ok(ctx)
    }

    /// Predictive marginals at the batch inputs under hyperparameters `h`
    /// and the variational state of `p`.
    fn predictive(&self, h: &Hyper, p: &Params) -> GpmResult<Predictive> {
        let (variance, lengthscale) = (to_positive(h.kernel_raw[0]), to_positive(h.kernel_raw[1]));
        let mut kzz = rbf_matrix(variance, lengthscale, h.z.view(), h.z.view());
        kzz.diag_mut().mapv_inplace(|v| v + JITTER);
        let factor = LowerFactor::new(&kzz)?;
        let kzx = rbf_matrix(variance, lengthscale, h.z.view(), self.x.view());
        let a = factor.solve_lower(&kzx)?.reversed_axes().as_standard_layout().into_owned();

        let mean = a.dot(&p.q_mu);
        let prior = (&a * &a).sum_axis(Axis(1)).mapv(|q| variance - q);
        let proj: Vec<Array2<f64>> = p.q_sqrt.iter().map(|l| a.dot(l)).collect();
        let mut var = Array2::<f64>::zeros(mean.raw_dim());
        for (k, pk) in proj.iter().enumerate() {
            let explained = (pk * pk).sum_axis(Axis(1));
            var.column_mut(k).assign(&(&prior + &explained));
        }
        Ok(Predictive { a, mean, var, proj })
    }

    /// `E[b, k] = Σ_g φ2[g,k2] E_q[ln N(y_ng | f_k(x_n), σ²)]` via the
    /// sufficient statistics.
    fn channel_expectations(&self, pred: &Predictive, noise: f64) -> Array2<f64> {
        let half_log = 0.5 * (2.0 * PI * noise).ln();
        Array2::from_shape_fn(pred.mean.raw_dim(), |(b, k)| {
            let j = k % self.k2;
            let (mu, v, s0) = (pred.mean[[b, k]], pred.var[[b, k]], self.s0[j]);
            -s0 * half_log
                - (self.s2[[b, j]] - 2.0 * mu * self.s1[[b, j]] + (mu * mu + v) * s0)
                    / (2.0 * noise)
        })
    }

    /// Cell weight of channel `k` for batch row `b`.
    fn weight(&self, b: usize, k: usize) -> f64 {
        self.phi1[[self.cells[b], k / self.k2]]
    }

    /// Rescaled, cell-weighted sum of the channel expectations.
    fn data_term(&self, e: &Array2<f64>) -> f64 {
        let total: f64 = e.indexed_iter().map(|((b, k), &v)| self.weight(b, k) * v).sum();
        self.scale * total
    }

    fn grad_w1(&self, e: &Array2<f64>) -> Array1<f64> {
        let mut g = Array2::<f64>::zeros(self.phi1.raw_dim());
        for ((b, k), &v) in e.indexed_iter() {
            g[[self.cells[b], k / self.k2]] += self.scale * v;
        }
        g -= &self.log_phi1.mapv(|l| l + 1.0);
        softmax_rows_backward(&self.phi1, &g).iter().copied().collect()
    }

    fn grad_w2(&self, noise: f64) -> Array1<f64> {
        let half_log = 0.5 * (2.0 * PI * noise).ln();
        let mut g = Array2::<f64>::zeros(self.phi2.raw_dim());
        let mut alpha_sum = Array1::<f64>::zeros(self.k2);
        for (b, &n) in self.rows.iter().enumerate() {
            let y = self.data.y.row(n);
            let y_sq = y.mapv(|v| v * v);
            for j in 0..self.k2 {
                let (mut alpha, mut beta, mut gamma) = (0.0, 0.0, 0.0);
                for i in 0..self.k1 {
                    let k = i * self.k2 + j;
                    let w = self.weight(b, k);
                    let (mu, v) = (self.pred.mean[[b, k]], self.pred.var[[b, k]]);
                    alpha += w * (-half_log - (mu * mu + v) / (2.0 * noise));
                    beta += w * mu / noise;
                    gamma -= w / (2.0 * noise);
                }
                alpha_sum[j] += alpha;
                let mut col = g.column_mut(j);
                col.scaled_add(beta, &y);
                col.scaled_add(gamma, &y_sq);
            }
        }
        g += &alpha_sum;
        g *= self.scale;
        g -= &self.log_phi2.mapv(|l| l + 1.0);
        softmax_rows_backward(&self.phi2, &g).iter().copied().collect()
    }

    fn grad_variational(&self, p: &Params, noise: f64) -> Array1<f64> {
        let pred = &self.pred;
        let mut d_mean = Array2::<f64>::zeros(pred.mean.raw_dim());
        let mut d_var = Array2::<f64>::zeros(pred.var.raw_dim());
        for ((b, k), dm) in d_mean.indexed_iter_mut() {
            let j = k % self.k2;
            let w = self.scale * self.weight(b, k);
            *dm = w * (self.s1[[b, j]] - pred.mean[[b, k]] * self.s0[j]) / noise;
            d_var[[b, k]] = -0.5 * w * self.s0[j] / noise;
        }

        let g_mu = pred.a.t().dot(&d_mean) - &p.q_mu;
        let g_sqrt: Vec<Array2<f64>> = p
            .q_sqrt
            .iter()
            .enumerate()
            .map(|(k, l)| {
                let weighted = &pred.proj[k] * &d_var.column(k).insert_axis(Axis(1));
                let mut g = pred.a.t().dot(&weighted) * 2.0 - l;
                for i in 0..l.nrows() {
                    g[[i, i]] += 1.0 / l[[i, i]];
                }
                g
            })
            .collect();

        let mut out = Vec::with_capacity(p.group_len(ParamGroup::Variational));
        write_variational(&g_mu, &g_sqrt, &mut out);
        Array1::from(out)
    }
}

/// `Σ_k KL(N(m_k, L_k L_kᵀ) ‖ N(0, I))`.
fn kl_variational(q_mu: &Array2<f64>, q_sqrt: &[Array2<f64>]) -> f64 {
    let m = q_mu.nrows() as f64;
    let mean_term = q_mu.iter().map(|v| v * v).sum::<f64>();
    let cov_term: f64 = q_sqrt
        .iter()
        .map(|l| {
            let trace = l.iter().map(|v| v * v).sum::<f64>();
            let log_det = l.diag().iter().map(|d| (d * d).ln()).sum::<f64>();
            trace - m - log_det
        })
        .sum();
    0.5 * (mean_term + cov_term)
}

/// `Σ_r KL(φ[r] ‖ Uniform(K))` from row-wise log-probabilities.
fn kl_uniform(log_phi: &Array2<f64>) -> f64 {
    let ln_k = (log_phi.ncols() as f64).ln();
    log_phi.iter().map(|&l| l.exp() * (l + ln_k)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpm::{
        builder::SplitGpmBuilder,
        features::{InducingPoints, SharedIndependentFeature},
        kernel::Rbf,
        likelihood::{variational_expectation, GaussianLikelihood},
        session::Session,
        weights::{log_weights, random_weights},
    };
    use approx::assert_relative_eq;
    use ndarray::Array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement of the analytic and finite-difference gradients.
    // - The collapsed data term against a direct per-gene sum.
    // - KL terms at their minima.
    // - Training with frozen groups and the all-frozen error.
    // -------------------------------------------------------------------------

    /// 8 rows, 2 cells, 3 genes, K1 = 2, K2 = 2, M = 4; every row in every batch.
    fn tiny_model(session: &mut Session, batch: usize) -> SplitGpm {
        let x = Array::linspace(0.0, 1.0, 8).insert_axis(Axis(1));
        let y = Array2::from_shape_fn((8, 3), |(n, g)| ((n * 3 + g) as f64 * 0.7).sin());
        let w1 = log_weights(&random_weights(session.rng(), 2, 2));
        let w2 = log_weights(&random_weights(session.rng(), 3, 2));
        SplitGpmBuilder::new(x, y)
            .weights(w1, w2)
            .kernel(
                SharedIndependentKernel::new(Rbf::new(0).with_lengthscale(0.6).unwrap(), 4)
                    .unwrap(),
            )
            .likelihood(GaussianLikelihood::new(0.8).unwrap())
            .feature(SharedIndependentFeature::new(InducingPoints::linspace(0.0, 1.0, 4).unwrap()))
            .minibatch_size(batch)
            .compile(session)
            .unwrap()
    }

    /// Move the variational state away from its symmetric initialization.
    fn perturbed_theta(model: &SplitGpm) -> Theta {
        let theta = model.theta();
        Array1::from_shape_fn(theta.len(), |i| theta[i] + 0.05 * ((i as f64) * 1.3).sin())
    }

    #[test]
    // Purpose
    // -------
    // The analytic gradient (with its finite-difference hyperparameter
    // block) matches central differences of the whole objective.
    //
    // Given
    // -----
    // - A full-batch tiny model with every group trainable and a θ moved
    //   off the initial point.
    //
    // Expect
    // ------
    // - Every coordinate agrees to 1e-4, absolute or relative.
    fn analytic_gradient_matches_finite_differences() {
        let mut session = Session::new(11);
        let model = tiny_model(&mut session, 100);
        let data = model.data().clone();
        let theta = perturbed_theta(&model);

        let analytic = model.grad(&theta, &data).unwrap();
        let numeric = fd_gradient_fallible(&theta, |t| model.value(t, &data)).unwrap();

        assert_eq!(analytic.len(), numeric.len());
        for (a, n) in analytic.iter().zip(numeric.iter()) {
            assert_relative_eq!(*a, *n, epsilon = 1e-4, max_relative = 1e-4);
        }
    }

    #[test]
    // Purpose
    // -------
    // Freezing groups removes them from θ without breaking gradient agreement.
    fn frozen_groups_shrink_theta_and_keep_gradients_consistent() {
        let mut session = Session::new(5);
        let mut model = tiny_model(&mut session, 100);
        let full = model.theta().len();
        model.set_trainable(ParamGroup::Kernel, false);
        model.set_trainable(ParamGroup::W2, false);
        let data = model.data().clone();
        let theta = perturbed_theta(&model);

        let analytic = model.grad(&theta, &data).unwrap();
        let numeric = fd_gradient_fallible(&theta, |t| model.value(t, &data)).unwrap();

        assert_eq!(theta.len(), full - 2 - 6);
        for (a, n) in analytic.iter().zip(numeric.iter()) {
            assert_relative_eq!(*a, *n, epsilon = 1e-4, max_relative = 1e-4);
        }
    }

    #[test]
    // Purpose
    // -------
    // The sufficient-statistic data term equals the direct triple sum over
    // rows, channels and genes.
    fn collapsed_data_term_matches_direct_sum() {
        let mut session = Session::new(2);
        let model = tiny_model(&mut session, 100);
        let p = model.params();
        let rows: Vec<usize> = (0..8).collect();
        let ctx = BatchContext::new(&model, p, model.data(), &rows).unwrap();

        let collapsed = ctx.data_term(&ctx.channel_expectations(&ctx.pred, p.noise()));

        let mut direct = 0.0;
        for (b, &n) in rows.iter().enumerate() {
            for k in 0..4 {
                for g in 0..3 {
                    let phi2 = ctx.phi2[[g, k % 2]];
                    let y = model.data().y[[n, g]];
                    let (mu, v) = (ctx.pred.mean[[b, k]], ctx.pred.var[[b, k]]);
                    direct += ctx.weight(b, k) * phi2 * variational_expectation(y, mu, v, p.noise());
                }
            }
        }
        assert_relative_eq!(collapsed, direct, max_relative = 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // KL terms vanish at the prior: zero means, identity roots, uniform φ.
    fn kl_terms_vanish_at_prior() {
        let q_mu = Array2::<f64>::zeros((3, 2));
        let q_sqrt = vec![Array2::eye(3), Array2::eye(3)];
        let uniform = log_softmax_rows(&Array2::zeros((4, 5)));

        assert_relative_eq!(kl_variational(&q_mu, &q_sqrt), 0.0, epsilon = 1e-12);
        assert_relative_eq!(kl_uniform(&uniform), 0.0, epsilon = 1e-12);
        assert!(kl_uniform(&log_softmax_rows(&ndarray::array![[3.0, 0.0]])) > 0.0);
    }

    #[test]
    // Purpose
    // -------
    // A minibatch objective is an unbiased rescaling: with the batch equal
    // to the whole data set it matches the full-data ELBO.
    fn full_batch_value_matches_elbo() {
        let mut session = Session::new(4);
        let model = tiny_model(&mut session, 8);
        let data = model.data().clone();

        let value = model.value(&model.theta(), &data).unwrap();

        assert_relative_eq!(value, model.elbo().unwrap(), max_relative = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Training moves trainable groups, leaves frozen groups bit-identical,
    // and runs exactly the requested number of iterations.
    fn training_updates_only_trainable_groups() {
        let mut session = Session::new(9);
        let mut model = tiny_model(&mut session, 3);
        model.set_trainable(ParamGroup::Kernel, false);
        model.set_trainable(ParamGroup::Variational, false);
        let before = model.params().clone();
        let opts = AdamOptions::with_moments(0.01, 0.9, 0.999, 1e-8, 25, None).unwrap();

        let outcome = model.train(&opts).unwrap();

        let after = model.params();
        assert_eq!(outcome.iterations, 25);
        assert_eq!(after.kernel_raw, before.kernel_raw);
        assert_eq!(after.q_mu, before.q_mu);
        assert_eq!(after.q_sqrt, before.q_sqrt);
        assert_ne!(after.w1, before.w1);
        assert_ne!(after.noise_raw, before.noise_raw);
        assert!(model.elbo().unwrap().is_finite());
    }

    #[test]
    // Purpose
    // -------
    // With every group frozen there is nothing to optimize.
    fn training_with_everything_frozen_fails() {
        let mut session = Session::new(1);
        let mut model = tiny_model(&mut session, 4);
        for g in ParamGroup::ALL {
            model.set_trainable(g, false);
        }

        let err = model.train(&AdamOptions::default()).unwrap_err();

        assert_eq!(err, GpmError::Optimization { source: OptError::NothingToTrain });
    }
}
