//! numerical_stability — numerically robust parameter transforms.
//!
//! Purpose
//! -------
//! Collect numerically stable scalar and row-wise transforms used to map
//! unconstrained optimizer coordinates into model-space parameters:
//! strictly positive variances and lengthscales, and probability-simplex
//! assignment weights.
//!
//! Conventions
//! -----------
//! - All routines are pure numerical helpers on `f64` / `ndarray` values;
//!   they never log, perform I/O, or touch global state.
//! - Domain validation happens in the model layer, not here.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] compare stable forms with naive
//!   formulas and check Jacobian–vector products by finite differences.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    from_positive, log_softmax_rows, safe_softplus, safe_softplus_inv, softmax_rows_backward,
    to_positive, POSITIVE_FLOOR,
};

pub mod prelude {
    pub use super::transformations::{
        from_positive, log_softmax_rows, softmax_rows_backward, to_positive, POSITIVE_FLOOR,
    };
}
