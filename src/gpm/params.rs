//! Parameter groups, trainability flags and the θ vector layout.
//!
//! Purpose
//! -------
//! Hold every model parameter in unconstrained form, grouped the way
//! training switches them on and off, and translate between those groups
//! and the flat vector `θ` seen by the optimizer.
//!
//! Key behaviors
//! -------------
//! - [`ParamStore::pack`] concatenates the trainable groups in
//!   [`ParamGroup::ALL`] order; frozen groups never enter `θ`.
//! - [`ParamStore::decode`] overlays a `θ` onto the stored values and
//!   returns a full [`Params`]; frozen groups come from the store.
//! - [`ParamStore::commit`] writes a trained `θ` back into the store.
//!
//! Invariants & assumptions
//! ------------------------
//! - Shapes are fixed at construction: `w1 (C×K1)`, `w2 (G×K2)`, `z (M)`,
//!   `q_mu (M×K)`, `q_sqrt` as `K` lower-triangular `M×M` blocks.
//! - Positive hyperparameters are stored raw; their constrained values are
//!   `to_positive(raw)`.
//! - Inside `θ`, each `q_sqrt` block is packed row by row over its lower
//!   triangle (`M(M+1)/2` entries); the strict upper triangle stays zero.
use crate::optimization::{
    adam_optimizer::{validation::validate_theta, Theta},
    errors::OptResult,
    numerical_stability::transformations::to_positive,
};
use ndarray::{s, Array1, Array2, ArrayView1};

/// Parameter groups that can be frozen or trained independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamGroup {
    /// Cell assignment logits `W1`.
    W1,
    /// Gene assignment logits `W2`.
    W2,
    /// Inducing locations `Z`.
    Feature,
    /// Kernel variance and lengthscale.
    Kernel,
    /// Gaussian noise variance.
    Likelihood,
    /// Whitened variational mean and square root (`q_mu`, `q_sqrt`).
    Variational,
}

impl ParamGroup {
    pub const ALL: [ParamGroup; 6] = [
        ParamGroup::W1,
        ParamGroup::W2,
        ParamGroup::Feature,
        ParamGroup::Kernel,
        ParamGroup::Likelihood,
        ParamGroup::Variational,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Full decoded parameter set.
///
/// Fields
/// ------
/// - `w1`, `w2`: assignment logits; `softmax` of each row gives `φ1`, `φ2`.
/// - `z`: inducing locations.
/// - `kernel_raw`: `[raw variance, raw lengthscale]`.
/// - `noise_raw`: raw Gaussian noise variance.
/// - `q_mu`: whitened variational means, one column per channel.
/// - `q_sqrt`: lower-triangular square roots, one `M×M` block per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub w1: Array2<f64>,
    pub w2: Array2<f64>,
    pub z: Array1<f64>,
    pub kernel_raw: [f64; 2],
    pub noise_raw: f64,
    pub q_mu: Array2<f64>,
    pub q_sqrt: Vec<Array2<f64>>,
}

impl Params {
    /// Kernel variance `σ²_f`.
    pub fn kernel_variance(&self) -> f64 {
        to_positive(self.kernel_raw[0])
    }

    /// Kernel lengthscale `ℓ`.
    pub fn lengthscale(&self) -> f64 {
        to_positive(self.kernel_raw[1])
    }

    /// Likelihood noise variance `σ²`.
    pub fn noise(&self) -> f64 {
        to_positive(self.noise_raw)
    }

    /// Number of inducing points `M`.
    pub fn num_inducing(&self) -> usize {
        self.z.len()
    }

    /// Number of unconstrained values in `group`.
    pub fn group_len(&self, group: ParamGroup) -> usize {
        match group {
            ParamGroup::W1 => self.w1.len(),
            ParamGroup::W2 => self.w2.len(),
            ParamGroup::Feature => self.z.len(),
            ParamGroup::Kernel => 2,
            ParamGroup::Likelihood => 1,
            ParamGroup::Variational => {
                let m = self.num_inducing();
                self.q_mu.len() + self.q_sqrt.len() * m * (m + 1) / 2
            }
        }
    }

    /// Append the unconstrained values of `group` to `out`.
    pub fn write_group(&self, group: ParamGroup, out: &mut Vec<f64>) {
        match group {
            ParamGroup::W1 => out.extend(self.w1.iter()),
            ParamGroup::W2 => out.extend(self.w2.iter()),
            ParamGroup::Feature => out.extend(self.z.iter()),
            ParamGroup::Kernel => out.extend(self.kernel_raw),
            ParamGroup::Likelihood => out.push(self.noise_raw),
            ParamGroup::Variational => write_variational(&self.q_mu, &self.q_sqrt, out),
        }
    }

    /// Overwrite `group` from `values`, which must hold exactly
    /// [`group_len`](Self::group_len) entries.
    pub fn read_group(&mut self, group: ParamGroup, values: ArrayView1<f64>) {
        let mut it = values.iter().copied();
        match group {
            ParamGroup::W1 => self.w1.iter_mut().zip(it).for_each(|(w, v)| *w = v),
            ParamGroup::W2 => self.w2.iter_mut().zip(it).for_each(|(w, v)| *w = v),
            ParamGroup::Feature => self.z.iter_mut().zip(it).for_each(|(w, v)| *w = v),
            ParamGroup::Kernel => self.kernel_raw.iter_mut().zip(it).for_each(|(w, v)| *w = v),
            ParamGroup::Likelihood => self.noise_raw = values[0],
            ParamGroup::Variational => {
                self.q_mu.iter_mut().zip(&mut it).for_each(|(w, v)| *w = v);
                for l in self.q_sqrt.iter_mut() {
                    for i in 0..l.nrows() {
                        l.slice_mut(s![i, ..=i]).iter_mut().zip(&mut it).for_each(|(w, v)| *w = v);
                    }
                }
            }
        }
    }
}

/// Append `q_mu` row-major, then the lower triangle of each `q_sqrt` block
/// row by row. The layout of the variational group inside θ.
pub fn write_variational(q_mu: &Array2<f64>, q_sqrt: &[Array2<f64>], out: &mut Vec<f64>) {
    out.extend(q_mu.iter());
    for l in q_sqrt {
        for i in 0..l.nrows() {
            out.extend(l.slice(s![i, ..=i]).iter());
        }
    }
}

/// Current parameter values plus a trainable flag per group.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamStore {
    params: Params,
    trainable: [bool; 6],
}

impl ParamStore {
    /// Store `params` with every group trainable.
    pub fn new(params: Params) -> Self {
        Self { params, trainable: [true; 6] }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn set_trainable(&mut self, group: ParamGroup, trainable: bool) {
        self.trainable[group.index()] = trainable;
    }

    pub fn is_trainable(&self, group: ParamGroup) -> bool {
        self.trainable[group.index()]
    }

    /// Trainable groups in θ order.
    pub fn trainable_groups(&self) -> Vec<ParamGroup> {
        ParamGroup::ALL.into_iter().filter(|g| self.is_trainable(*g)).collect()
    }

    /// Length of θ under the current flags.
    pub fn dim(&self) -> usize {
        self.trainable_groups().iter().map(|g| self.params.group_len(*g)).sum()
    }

    /// Offset and length of `group` inside θ, or `None` if it is frozen.
    pub fn segment(&self, group: ParamGroup) -> Option<(usize, usize)> {
        let mut offset = 0;
        for g in self.trainable_groups() {
            let len = self.params.group_len(g);
            if g == group {
                return Some((offset, len));
            }
            offset += len;
        }
        None
    }

    /// Flatten the trainable groups into θ.
    pub fn pack(&self) -> Theta {
        let mut out = Vec::with_capacity(self.dim());
        for g in self.trainable_groups() {
            self.params.write_group(g, &mut out);
        }
        Array1::from(out)
    }

    /// Stored values with the trainable groups replaced from `theta`.
    ///
    /// # Errors
    /// - `ThetaLengthMismatch` if `theta.len() != self.dim()`.
    /// - `InvalidThetaInput` for a non-finite entry.
    pub fn decode(&self, theta: &Theta) -> OptResult<Params> {
        validate_theta(theta, self.dim())?;
        let mut params = self.params.clone();
        let mut offset = 0;
        for g in self.trainable_groups() {
            let len = params.group_len(g);
            params.read_group(g, theta.slice(s![offset..offset + len]));
            offset += len;
        }
        Ok(params)
    }

    /// Replace the stored values with `decode(theta)`.
    ///
    /// # Errors
    /// Same as [`decode`](Self::decode).
    pub fn commit(&mut self, theta: &Theta) -> OptResult<()> {
        self.params = self.decode(theta)?;
        Ok(())
    }
}
