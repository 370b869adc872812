//! Execution helper that runs the Adam solver on an objective and returns a
//! crate-friendly [`OptimOutcome`].
use crate::optimization::{
    errors::OptResult,
    adam_optimizer::{
        adam::Adam, adapter::ArgMinAdapter, types::AdamState, AdamOptions, Objective,
        OptimOutcome, Theta,
    },
};
use argmin::core::{
    observers::{Observe, ObserverMode},
    Error, Executor, State, KV,
};
use log::info;

/// Observer that reports progress through the `log` facade.
///
/// The reported value is the objective `ℓ = -cost` on the current minibatch.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl Observe<AdamState> for LogObserver {
    fn observe_iter(&mut self, state: &AdamState, _kv: &KV) -> Result<(), Error> {
        info!("iter {:>6}  objective {:.6}", state.get_iter(), -state.get_cost());
        Ok(())
    }
}

/// Run Adam on an objective for exactly `opts.max_iter` iterations.
///
/// # Arguments
/// - `theta0`: Initial parameter vector, moved into the executor state.
/// - `opts`: Adam options (learning rate, moment decays, iteration count).
/// - `problem`: An [`ArgMinAdapter`] wrapping the user's objective and data.
///
/// # Logging
/// When `opts.log_every` is `Some(k)`, a [`LogObserver`] is attached and
/// reports every `k`-th iteration at `info` level.
///
/// # Returns
/// An [`OptimOutcome`] carrying the **last** iterate (not the best-cost one,
/// since minibatch costs are not comparable across steps), the objective
/// on the final minibatch, termination status and evaluation counters.
///
/// # Errors
/// - Propagates any `argmin` runtime error or model error raised during
///   cost/gradient evaluation.
/// - Propagates validation errors from [`OptimOutcome::new`].
pub fn run_adam<'a, F>(
    theta0: Theta, opts: &AdamOptions, problem: ArgMinAdapter<'a, F>,
) -> OptResult<OptimOutcome>
where
    F: Objective,
{
    let mut optimizer = Executor::new(problem, Adam::new(opts))
        .configure(|state| state.param(theta0).max_iters(opts.max_iter as u64));
    if let Some(every) = opts.log_every {
        optimizer = optimizer.add_observer(LogObserver, ObserverMode::Every(every as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let value = -result.get_cost();
    let grad = result.take_gradient();
    OptimOutcome::new(result.take_param(), value, termination, iterations, function_counts, grad)
}
