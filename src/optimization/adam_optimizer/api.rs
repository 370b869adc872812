//! High-level entry point for maximizing a user-provided `Objective`.
//!
//! This wraps the model in an `ArgMinAdapter` (which *minimizes* `-ℓ(θ)`),
//! builds an Adam solver from the options and delegates the run to
//! `run_adam`.
use crate::optimization::{
    errors::OptResult,
    adam_optimizer::{
        adapter::ArgMinAdapter,
        run::run_adam,
        traits::{AdamOptions, Objective},
        OptimOutcome, Theta,
    },
};

/// Maximize an objective `ℓ(θ)` with Adam for a fixed number of iterations.
///
/// # Behavior
/// - Validates the initial guess via `f.check(theta0, data)`.
/// - Wraps `(f, data)` in an `ArgMinAdapter` that exposes a *minimization*
///   problem `c(θ) = -ℓ(θ)` to `argmin`.
/// - Runs exactly `opts.max_iter` Adam steps; there is no convergence test.
///
/// # Errors
/// - Propagates any error from `f.check`.
/// - Propagates runtime errors from `run_adam` (model failures, non-finite
///   objective or gradient).
///
/// # Example
/// ```no_run
/// use ndarray::array;
/// use splitgpm::optimization::adam_optimizer::{
///     maximize, AdamOptions, Objective, Theta, Grad, Cost,
/// };
/// use splitgpm::optimization::errors::OptResult;
///
/// struct Neg;
/// impl Objective for Neg {
///     type Data = ();
///     fn value(&self, t: &Theta, _: &()) -> OptResult<Cost> { Ok(-t.dot(t)) }
///     fn check(&self, _: &Theta, _: &()) -> OptResult<()> { Ok(()) }
///     fn grad(&self, t: &Theta, _: &()) -> OptResult<Grad> { Ok(t.mapv(|x| -2.0 * x)) }
/// }
///
/// let out = maximize(&Neg, array![1.0, -1.0], &(), &AdamOptions::new(0.01, 500)?)?;
/// println!("θ̂ = {:?}", out.theta_hat);
/// # Ok::<(), splitgpm::optimization::errors::OptError>(())
/// ```
pub fn maximize<F: Objective>(
    f: &F, theta0: Theta, data: &F::Data, opts: &AdamOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    run_adam(theta0, opts, problem)
}
