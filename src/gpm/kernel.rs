//! Squared-exponential kernel and its shared multi-output wrapper.
//!
//! Purpose
//! -------
//! Provide the covariance function of the latent time trends. Every output
//! channel `k = k1·K2 + k2` uses one RBF kernel on a single active input
//! column, with one shared variance and lengthscale.
//!
//! Conventions
//! -----------
//! - Hyperparameters are held in constrained (positive) form here; the
//!   parameter store keeps their unconstrained counterparts in θ.
//! - Inputs are passed as the active column only (`ArrayView1<f64>`).
use crate::{
    gpm::errors::{GpmError, GpmResult},
    optimization::numerical_stability::transformations::POSITIVE_FLOOR,
};
use ndarray::{Array2, ArrayView1};

/// Radial basis function kernel `k(x, x') = σ² exp(-(x − x')² / (2ℓ²))`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rbf {
    pub active_dim: usize,
    pub variance: f64,
    pub lengthscale: f64,
}

impl Rbf {
    /// RBF on column `active_dim` with unit variance and lengthscale.
    pub fn new(active_dim: usize) -> Self {
        Self { active_dim, variance: 1.0, lengthscale: 1.0 }
    }

    /// Replace the signal variance `σ²`.
    ///
    /// # Errors
    /// `InvalidHyperparameter` unless `variance` is finite and above the
    /// positivity floor.
    pub fn with_variance(mut self, variance: f64) -> GpmResult<Self> {
        self.variance = check_positive("kernel variance", variance)?;
        Ok(self)
    }

    /// Replace the lengthscale `ℓ`.
    ///
    /// # Errors
    /// `InvalidHyperparameter` unless `lengthscale` is finite and above the
    /// positivity floor.
    pub fn with_lengthscale(mut self, lengthscale: f64) -> GpmResult<Self> {
        self.lengthscale = check_positive("kernel lengthscale", lengthscale)?;
        Ok(self)
    }
}

/// Evaluate `σ² exp(-(a − b)² / (2ℓ²))`.
pub fn rbf(variance: f64, lengthscale: f64, a: f64, b: f64) -> f64 {
    let r = (a - b) / lengthscale;
    variance * (-0.5 * r * r).exp()
}

/// Cross-covariance matrix `K[i, j] = k(a_i, b_j)`.
pub fn rbf_matrix(
    variance: f64, lengthscale: f64, a: ArrayView1<f64>, b: ArrayView1<f64>,
) -> Array2<f64> {
    Array2::from_shape_fn((a.len(), b.len()), |(i, j)| rbf(variance, lengthscale, a[i], b[j]))
}

/// One [`Rbf`] replicated over `output_dim` channels with shared hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedIndependentKernel {
    pub base: Rbf,
    pub output_dim: usize,
}

impl SharedIndependentKernel {
    /// Wrap `base` for `output_dim` channels.
    ///
    /// # Errors
    /// `ZeroSize` if `output_dim == 0`.
    pub fn new(base: Rbf, output_dim: usize) -> GpmResult<Self> {
        if output_dim == 0 {
            return Err(GpmError::ZeroSize { what: "kernel output dimension" });
        }
        Ok(Self { base, output_dim })
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    pub fn active_dim(&self) -> usize {
        self.base.active_dim
    }
}

// ---- Helper methods ----

pub(crate) fn check_positive(name: &'static str, value: f64) -> GpmResult<f64> {
    if !value.is_finite() || value <= POSITIVE_FLOOR {
        return Err(GpmError::InvalidHyperparameter { name, value });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // The Gram matrix is symmetric with σ² on the diagonal and decays with
    // distance at the rate set by ℓ.
    fn rbf_matrix_shape_diagonal_and_decay() {
        let x = array![0.0, 0.5, 1.0];

        let k = rbf_matrix(2.0, 0.5, x.view(), x.view());

        assert_eq!(k.shape(), &[3, 3]);
        for i in 0..3 {
            assert_abs_diff_eq!(k[[i, i]], 2.0);
        }
        assert_abs_diff_eq!(k[[0, 1]], k[[1, 0]]);
        assert_abs_diff_eq!(k[[0, 1]], 2.0 * (-0.5_f64).exp(), epsilon = 1e-12);
        assert!(k[[0, 2]] < k[[0, 1]]);
    }

    #[test]
    // Purpose
    // -------
    // Hyperparameter setters reject non-positive and non-finite values.
    fn setters_validate_positivity() {
        assert!(Rbf::new(0).with_variance(0.3).is_ok());
        assert_eq!(
            Rbf::new(0).with_lengthscale(0.0),
            Err(GpmError::InvalidHyperparameter { name: "kernel lengthscale", value: 0.0 })
        );
        assert!(Rbf::new(0).with_variance(f64::NAN).is_err());
    }

    #[test]
    // Purpose
    // -------
    // A shared kernel needs at least one output channel.
    fn shared_kernel_requires_channels() {
        assert!(SharedIndependentKernel::new(Rbf::new(0), 0).is_err());
        let k = SharedIndependentKernel::new(Rbf::new(0), 20).unwrap();
        assert_eq!((k.output_dim(), k.active_dim()), (20, 0));
    }
}
