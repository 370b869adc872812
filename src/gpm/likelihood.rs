//! Gaussian observation model.
use crate::gpm::{errors::GpmResult, kernel::check_positive};
use std::f64::consts::PI;

/// `y | f ~ N(f, σ²)` with a single noise variance shared by all genes.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianLikelihood {
    pub variance: f64,
}

impl GaussianLikelihood {
    /// Gaussian likelihood with noise variance `variance`.
    ///
    /// # Errors
    /// `InvalidHyperparameter` unless `variance` is finite and above the
    /// positivity floor.
    pub fn new(variance: f64) -> GpmResult<Self> {
        Ok(Self { variance: check_positive("likelihood variance", variance)? })
    }
}

impl Default for GaussianLikelihood {
    fn default() -> Self {
        Self { variance: 1.0 }
    }
}

/// `E_{f~N(mean, var)}[ln N(y | f, noise)]`.
pub fn variational_expectation(y: f64, mean: f64, var: f64, noise: f64) -> f64 {
    -0.5 * (2.0 * PI * noise).ln() - ((y - mean).powi(2) + var) / (2.0 * noise)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    // Purpose
    // -------
    // With zero predictive variance the expectation is the Gaussian log-density.
    fn expectation_reduces_to_log_density() {
        let (y, mean, noise): (f64, f64, f64) = (0.3, -0.2, 0.7);
        let log_density = -0.5 * (2.0 * PI * noise).ln() - (y - mean).powi(2) / (2.0 * noise);

        assert_abs_diff_eq!(variational_expectation(y, mean, 0.0, noise), log_density);
        assert!(variational_expectation(y, mean, 0.5, noise) < log_density);
    }

    #[test]
    // Purpose
    // -------
    // The default noise variance is one and invalid values are rejected.
    fn default_and_validation() {
        assert_eq!(GaussianLikelihood::default().variance, 1.0);
        assert!(GaussianLikelihood::new(-1.0).is_err());
    }
}
