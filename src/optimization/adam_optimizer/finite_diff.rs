//! adam_optimizer::finite_diff — finite-difference gradient helpers.
//!
//! Purpose
//! -------
//! Provide finite-difference gradient approximations around a parameter
//! vector, with error capture and validation, so that the rest of the
//! optimizer and the model layer can request derivatives without depending
//! directly on the `finitediff` API.
//!
//! Key behaviors
//! -------------
//! - [`fd_gradient`] tries central differences first and falls back to
//!   forward differences when the central estimate fails validation.
//! - [`fd_gradient_fallible`] wraps an objective returning `OptResult<f64>`
//!   so that errors raised inside the finite-difference closure surface as
//!   real errors instead of silent `NaN`s.
//!
//! Invariants & assumptions
//! ------------------------
//! - Gradients returned from this module always satisfy [`validate_grad`].
//! - Any error raised by the objective during differencing is captured in a
//!   shared cell and treated as a hard failure.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the quadratic happy path, closure error propagation,
//!   and the non-finite failure path.
use crate::optimization::{
    errors::{OptError, OptResult},
    adam_optimizer::{validation::validate_grad, Grad, Theta},
};
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// fd_gradient — central-difference gradient with forward fallback.
///
/// Parameters
/// ----------
/// - `theta`: `&Theta`
///   Point at which the gradient is approximated.
/// - `func`: `&G`
///   Scalar objective. Must route any evaluation error into `closure_err`
///   and return `NaN` in that case.
/// - `closure_err`: `&RefCell<Option<OptError>>`
///   Shared cell capturing the first error raised inside `func`.
///
/// Returns
/// -------
/// `OptResult<Grad>` with `grad.len() == theta.len()` and finite entries.
///
/// Errors
/// ------
/// - The error captured in `closure_err`, if any.
/// - `OptError::InvalidGradient` when both central and forward estimates
///   contain non-finite entries.
pub fn fd_gradient<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<OptError>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let dim = theta.len();
    let central = theta.central_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    if validate_grad(&central, dim).is_ok() {
        return Ok(central);
    }
    let forward = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    validate_grad(&forward, dim)?;
    Ok(forward)
}

/// fd_gradient_fallible — finite-difference gradient of a fallible objective.
///
/// Wraps `func` in a closure that stores the first error into a private
/// cell and returns `NaN`, then defers to [`fd_gradient`].
///
/// # Examples
/// ```rust
/// # use ndarray::array;
/// # use splitgpm::optimization::adam_optimizer::finite_diff::fd_gradient_fallible;
/// let theta = array![1.0_f64, -2.0];
/// let grad = fd_gradient_fallible(&theta, |x| Ok(x.dot(x))).unwrap();
/// assert!((grad[0] - 2.0).abs() < 1e-5);
/// assert!((grad[1] + 4.0).abs() < 1e-5);
/// ```
pub fn fd_gradient_fallible<G: Fn(&Theta) -> OptResult<f64>>(
    theta: &Theta, func: G,
) -> OptResult<Grad> {
    let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
    let wrapped = |x: &Theta| -> f64 {
        match func(x) {
            Ok(v) => v,
            Err(e) => {
                let mut slot = closure_err.borrow_mut();
                if slot.is_none() {
                    *slot = Some(e);
                }
                f64::NAN
            }
        }
    };
    fd_gradient(theta, &wrapped, &closure_err)
}
