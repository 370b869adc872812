//! Public API surface for stochastic objective maximization.
//!
//! - [`Objective`]: trait users implement for their model.
//! - [`AdamOptions`]: configuration for the optimizer.
//! - [`OptimOutcome`]: normalized result returned by the high-level `maximize` API.
//!
//! Convention: we *maximize* a user objective `ℓ(θ)` by minimizing the cost
//! `c(θ) = -ℓ(θ)`. If an analytic gradient is provided, it should be the gradient
//! of the objective (`∇ℓ(θ)`); the adapter flips the sign as needed.
use crate::optimization::{
    errors::{OptError, OptResult},
    adam_optimizer::{
        types::{Cost, FnEvalMap, Grad, Theta, DEFAULT_BETA1, DEFAULT_BETA2, DEFAULT_EPSILON},
        validation::{validate_theta_hat, validate_value},
    },
};
use argmin::core::TerminationStatus;
use argmin_math::ArgminL2Norm;

/// User-implemented objective interface.
///
/// You maximize `ℓ(θ)`; internally we minimize the cost `c(θ) = -ℓ(θ)`.
/// If you provide an analytic gradient, return the gradient of `ℓ(θ)`
/// (the adapter flips the sign to match the cost).
///
/// - `type Data`: per-model data carried into `value`/`grad`/`check`.
///
/// Required:
/// - `value(&Theta, &Data) -> OptResult<Cost>`: evaluate `ℓ(θ)`.
/// - `check(&Theta, &Data) -> OptResult<()>`: validation hook to reject
///   obviously invalid `θ`/`data` pairs. Called once before optimization.
///
/// Optional:
/// - `grad(&Theta, &Data) -> OptResult<Grad>`: analytic gradient `∇ℓ(θ)`.
///   If not implemented, central finite differences are used automatically.
/// - `next_batch(&Data) -> OptResult<()>`: called once at the start of every
///   optimizer step, before the gradient. Stochastic objectives draw their
///   next minibatch here; `value` and `grad` then evaluate on that batch
///   until the following call.
pub trait Objective {
    type Data: 'static;

    // Required methods
    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    // Optional methods
    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }

    fn next_batch(&self, _data: &Self::Data) -> OptResult<()> {
        Ok(())
    }
}

/// Optimizer-level configuration.
///
/// Fields:
/// - `learning_rate` — fixed step size `α`.
/// - `beta1`, `beta2` — exponential decay rates of the first and second
///   moment estimates.
/// - `epsilon` — offset added to the denominator of each update.
/// - `max_iter` — exact number of iterations; there is no other stopping rule.
/// - `log_every` — when `Some(k)`, progress is logged every `k` iterations.
///
/// Default:
/// - `learning_rate = 0.005`, `beta1 = 0.9`, `beta2 = 0.999`,
///   `epsilon = 1e-8`, `max_iter = 10_000`, `log_every = Some(500)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AdamOptions {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    pub max_iter: usize,
    pub log_every: Option<usize>,
}

impl AdamOptions {
    /// Construct validated Adam options with default moment decays.
    ///
    /// # Errors
    /// - [`OptError::InvalidLearningRate`] for non-finite or non-positive `learning_rate`.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == 0`.
    pub fn new(learning_rate: f64, max_iter: usize) -> OptResult<Self> {
        Self::with_moments(
            learning_rate,
            DEFAULT_BETA1,
            DEFAULT_BETA2,
            DEFAULT_EPSILON,
            max_iter,
            Some(500),
        )
    }

    /// Construct fully specified, validated Adam options.
    ///
    /// # Rules
    /// - `learning_rate` and `epsilon` must be finite and strictly positive.
    /// - `beta1` and `beta2` must lie in `[0, 1)`.
    /// - `max_iter` must be `> 0`.
    /// - `log_every`, if provided, must be `> 0`.
    pub fn with_moments(
        learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64, max_iter: usize,
        log_every: Option<usize>,
    ) -> OptResult<Self> {
        if !learning_rate.is_finite() || learning_rate <= 0.0 {
            return Err(OptError::InvalidLearningRate {
                value: learning_rate,
                reason: "Learning rate must be finite and strictly positive.",
            });
        }
        verify_moment_decay("beta1", beta1)?;
        verify_moment_decay("beta2", beta2)?;
        if !epsilon.is_finite() || epsilon <= 0.0 {
            return Err(OptError::InvalidEpsilon {
                value: epsilon,
                reason: "Epsilon must be finite and strictly positive.",
            });
        }
        if max_iter == 0 {
            return Err(OptError::InvalidMaxIter {
                max_iter,
                reason: "Maximum iterations must be greater than zero.",
            });
        }
        if let Some(0) = log_every {
            return Err(OptError::InvalidLogEvery {
                log_every: 0,
                reason: "Logging interval must be greater than zero.",
            });
        }
        Ok(Self { learning_rate, beta1, beta2, epsilon, max_iter, log_every })
    }
}

impl Default for AdamOptions {
    fn default() -> Self {
        Self {
            learning_rate: 0.005,
            beta1: DEFAULT_BETA1,
            beta2: DEFAULT_BETA2,
            epsilon: DEFAULT_EPSILON,
            max_iter: 10_000,
            log_every: Some(500),
        }
    }
}

/// Canonical result returned by `maximize`.
///
/// - `theta_hat`: parameter vector after the final iteration. Stochastic
///   objectives are noisy, so this is the last iterate and not the best one.
/// - `value`: objective `ℓ(θ̂)` on the last minibatch (not the cost).
/// - `converged`: `true` if the solver reported a terminating status other
///   than `NotTerminated`.
/// - `status`: human-readable termination status string.
/// - `iterations`: number of optimizer iterations performed.
/// - `fn_evals`: function-evaluation counters reported by `argmin`.
/// - `grad_norm`: norm of the last available gradient, if present.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// Build a validated [`OptimOutcome`] from raw solver state.
    ///
    /// # Errors
    /// - Propagates any validation errors for `theta_hat` or `value`.
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus,
        iterations: u64, fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let (converged, status) = match termination {
            TerminationStatus::NotTerminated => (false, "Not terminated".to_string()),
            other => (true, format!("{other:?}")),
        };
        let iterations = iterations as usize;
        let grad_norm = grad.map(|g| g.l2_norm());
        Ok(Self { theta_hat, value, converged, status, iterations, fn_evals, grad_norm })
    }
}

// ---- Helper methods ----

fn verify_moment_decay(name: &'static str, value: f64) -> OptResult<()> {
    if !value.is_finite() || !(0.0..1.0).contains(&value) {
        return Err(OptError::InvalidMomentDecay {
            name,
            value,
            reason: "Moment decay rates must lie in [0, 1).",
        });
    }
    Ok(())
}
