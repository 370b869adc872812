//! adam_optimizer::types — shared numeric aliases.
//!
//! Purpose
//! -------
//! Centralize the core numeric types used by the stochastic optimizer so the
//! rest of the optimization code can stay agnostic to `ndarray` and Argmin
//! generics.
//!
//! Invariants & assumptions
//! ------------------------
//! - All optimizer vectors are `ndarray` containers over `f64`.
//! - `Cost` is always a scalar `f64`; higher layers handle the sign flip
//!   between cost and objective.
//!
//! Testing notes
//! -------------
//! - Type aliases and constants only; exercised by the surrounding modules.
use argmin::core::IterState;
use ndarray::Array1;
use std::collections::HashMap;

/// Parameter vector `θ` in unconstrained optimizer space.
pub type Theta = Array1<f64>;

/// Gradient vector matching the shape of [`Theta`].
pub type Grad = Array1<f64>;

/// Scalar objective value used by the optimizer.
///
/// Inside Argmin this is the cost `c(θ) = -ℓ(θ)` derived from an objective
/// `ℓ(θ)` that the caller maximizes.
pub type Cost = f64;

/// Function-evaluation counters as reported by the solver.
///
/// Maps human-readable counter names (e.g., `"cost_count"`) to counts.
pub type FnEvalMap = HashMap<String, u64>;

/// Argmin iteration state specialized to this crate's numeric types.
pub type AdamState = IterState<Theta, Grad, (), (), (), Cost>;

/// Default first-moment decay for Adam.
pub const DEFAULT_BETA1: f64 = 0.9;

/// Default second-moment decay for Adam.
pub const DEFAULT_BETA2: f64 = 0.999;

/// Default denominator offset for Adam.
pub const DEFAULT_EPSILON: f64 = 1e-8;
