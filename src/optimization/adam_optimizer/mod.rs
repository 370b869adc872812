//! adam_optimizer — Argmin-powered stochastic maximizer.
//!
//! Purpose
//! -------
//! Provide an Argmin-backed optimization layer for **maximizing** noisy
//! objectives `ℓ(θ)` such as minibatch evidence lower bounds. Callers
//! implement a single trait, [`Objective`], and invoke [`maximize`] to run
//! Adam for a fixed number of iterations.
//!
//! Key behaviors
//! -------------
//! - Convert user objectives into Argmin-compatible cost functions
//!   `c(θ) = -ℓ(θ)` via [`adapter::ArgMinAdapter`].
//! - Implement Adam as a regular Argmin [`Solver`](argmin::core::Solver) in
//!   [`adam`], so the run is driven by Argmin's executor and observers.
//! - Provide finite-difference helpers in [`finite_diff`] for objectives
//!   (or sub-blocks of objectives) without analytic derivatives.
//! - Centralize configuration ([`AdamOptions`]) and validation logic
//!   ([`validation`]).
//!
//! Conventions
//! -----------
//! - Parameters live in unconstrained space as [`Theta`] (`Array1<f64>`).
//! - Cost is always `c(θ) = -ℓ(θ)` internally; all user-facing values are
//!   expressed in terms of `ℓ`.
//! - Errors bubble up as [`OptResult<T>`](crate::optimization::errors::OptResult).
//!
//! Testing notes
//! -------------
//! - Unit tests in submodules cover sign conventions, the Adam update,
//!   option validation, finite differences and outcome normalization.
//! - The model's integration test exercises [`maximize`] end to end.

pub mod adam;
pub mod adapter;
pub mod api;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::traits::{AdamOptions, Objective, OptimOutcome};
pub use self::types::{Cost, FnEvalMap, Grad, Theta};

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{AdamOptions, Objective, OptimOutcome};
    pub use super::types::{Cost, Grad, Theta};
}
