//! Dense linear algebra bridge between `ndarray` and `nalgebra`.
//!
//! Purpose
//! -------
//! The model keeps all data in `ndarray`, while the Cholesky factorization
//! and triangular solves come from `nalgebra`. This module copies matrices
//! across the boundary and wraps the factorization in a small type.
//!
//! Invariants & assumptions
//! ------------------------
//! - Matrices handed to [`LowerFactor::new`] are square and symmetric up to
//!   round-off; only the lower triangle is read by `nalgebra`.
//! - Copies are column-major to match `DMatrix` storage.
use crate::gpm::errors::{GpmError, GpmResult};
use nalgebra::{Cholesky, DMatrix};
use ndarray::Array2;

/// Diagonal jitter added to inducing-point covariance matrices.
pub const JITTER: f64 = 1e-6;

/// Lower Cholesky factor `L` of a positive-definite matrix `K = L Lᵀ`.
#[derive(Debug, Clone)]
pub struct LowerFactor {
    l: DMatrix<f64>,
}

impl LowerFactor {
    /// Factorize `k`.
    ///
    /// # Errors
    /// `CholeskyFailed` when `k` is not numerically positive definite.
    pub fn new(k: &Array2<f64>) -> GpmResult<Self> {
        let size = k.nrows();
        let chol = Cholesky::new(to_dmatrix(k)).ok_or(GpmError::CholeskyFailed { size })?;
        Ok(Self { l: chol.l() })
    }

    /// Dimension of the factored matrix.
    pub fn size(&self) -> usize {
        self.l.nrows()
    }

    /// Solve `L X = B` by forward substitution.
    ///
    /// # Errors
    /// `CholeskyFailed` if the factor has a zero on its diagonal.
    pub fn solve_lower(&self, b: &Array2<f64>) -> GpmResult<Array2<f64>> {
        let x = self
            .l
            .solve_lower_triangular(&to_dmatrix(b))
            .ok_or(GpmError::CholeskyFailed { size: self.size() })?;
        Ok(from_dmatrix(&x))
    }

    /// The factor as an `ndarray` matrix.
    pub fn to_array(&self) -> Array2<f64> {
        from_dmatrix(&self.l)
    }
}

/// Copy an `ndarray` matrix into a freshly allocated `DMatrix`.
pub fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    let (rows, cols) = a.dim();
    let mut out = DMatrix::<f64>::zeros(rows, cols);
    for j in 0..cols {
        for i in 0..rows {
            out[(i, j)] = a[[i, j]];
        }
    }
    out
}

/// Copy a `DMatrix` into an `ndarray` matrix.
pub fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}
