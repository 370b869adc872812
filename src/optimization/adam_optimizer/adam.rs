//! adam_optimizer::adam — Adam as an Argmin solver.
//!
//! Purpose
//! -------
//! Provide a first-order stochastic solver with bias-corrected moment
//! estimates (Kingma & Ba, 2015) that plugs into Argmin's [`Executor`]
//! like any built-in solver.
//!
//! Key behaviors
//! -------------
//! - `init` takes the initial parameter vector from the state, allocates the
//!   moment buffers, and records the initial cost.
//! - `next_iter` requests one gradient (which also draws the step's
//!   minibatch via the adapter) and applies the Adam update.
//! - The cost at the new parameters is evaluated, on that same minibatch,
//!   only on iterations a progress observer reports and on the last
//!   iteration. Other iterations carry the previous cost forward.
//! - Termination is left entirely to the executor's `max_iters`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Moment buffers always have the length of the parameter vector.
//! - The solver never inspects cost values to stop early.
//!
//! [`Executor`]: argmin::core::Executor
use crate::optimization::adam_optimizer::{
    traits::AdamOptions,
    types::{AdamState, Cost, Grad, Theta},
};
use argmin::core::{ArgminError, CostFunction, Error, Gradient, Problem, Solver, KV};
use ndarray::Zip;

/// Adam solver state.
///
/// Fields
/// ------
/// - `learning_rate`, `beta1`, `beta2`, `epsilon`: copied from [`AdamOptions`].
/// - `m`, `v`: first and second raw moment estimates.
/// - `beta1_t`, `beta2_t`: running powers `β₁ᵗ`, `β₂ᵗ` for bias correction.
/// - `max_iter`, `report_every`: schedule of the iterations whose cost is
///   evaluated.
/// - `steps`: updates applied since `init`.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    max_iter: u64,
    report_every: Option<u64>,
    steps: u64,
    m: Grad,
    v: Grad,
    beta1_t: f64,
    beta2_t: f64,
}

impl Adam {
    /// Build a solver from validated options. Moment buffers are sized in `init`.
    pub fn new(opts: &AdamOptions) -> Self {
        Self {
            learning_rate: opts.learning_rate,
            beta1: opts.beta1,
            beta2: opts.beta2,
            epsilon: opts.epsilon,
            max_iter: opts.max_iter as u64,
            report_every: opts.log_every.map(|k| k as u64),
            steps: 0,
            m: Grad::zeros(0),
            v: Grad::zeros(0),
            beta1_t: 1.0,
            beta2_t: 1.0,
        }
    }

    /// Whether the cost after update `iter` (0-based) is observed.
    fn reports_cost(&self, iter: u64) -> bool {
        iter + 1 >= self.max_iter || self.report_every.is_some_and(|k| iter % k == 0)
    }

    /// Apply one Adam update to `param` in place given the cost gradient.
    fn step(&mut self, param: &mut Theta, grad: &Grad) {
        let (b1, b2) = (self.beta1, self.beta2);
        self.beta1_t *= b1;
        self.beta2_t *= b2;
        let lr_t = self.learning_rate * (1.0 - self.beta2_t).sqrt() / (1.0 - self.beta1_t);
        let eps_t = self.epsilon * (1.0 - self.beta2_t).sqrt();
        Zip::from(param).and(&mut self.m).and(&mut self.v).and(grad).for_each(|p, m, v, &g| {
            *m = b1 * *m + (1.0 - b1) * g;
            *v = b2 * *v + (1.0 - b2) * g * g;
            *p -= lr_t * *m / (v.sqrt() + eps_t);
        });
    }
}

impl<O> Solver<O, AdamState> for Adam
where
    O: CostFunction<Param = Theta, Output = Cost> + Gradient<Param = Theta, Gradient = Grad>,
{
    const NAME: &'static str = "Adam";

    fn init(
        &mut self, problem: &mut Problem<O>, mut state: AdamState,
    ) -> Result<(AdamState, Option<KV>), Error> {
        let param = state.take_param().ok_or_else(|| ArgminError::NotInitialized {
            text: "Adam requires an initial parameter vector.".to_string(),
        })?;
        self.m = Grad::zeros(param.len());
        self.v = Grad::zeros(param.len());
        self.beta1_t = 1.0;
        self.beta2_t = 1.0;
        self.steps = 0;
        let cost = problem.cost(&param)?;
        Ok((state.param(param).cost(cost), None))
    }

    fn next_iter(
        &mut self, problem: &mut Problem<O>, mut state: AdamState,
    ) -> Result<(AdamState, Option<KV>), Error> {
        let mut param = state.take_param().ok_or_else(|| ArgminError::NotInitialized {
            text: "Adam state lost its parameter vector.".to_string(),
        })?;
        let grad = problem.gradient(&param)?;
        self.step(&mut param, &grad);
        let iter = self.steps;
        self.steps += 1;
        if !self.reports_cost(iter) {
            return Ok((state.param(param).gradient(grad), None));
        }
        let cost = problem.cost(&param)?;
        Ok((state.param(param).gradient(grad).cost(cost), None))
    }
}
