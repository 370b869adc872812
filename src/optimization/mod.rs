//! optimization — stochastic optimizer, numerical helpers, and error surface.
//!
//! Purpose
//! -------
//! Provide a cohesive optimization layer for model training, combining an
//! Argmin-backed Adam maximizer, numerically stable parameter transforms,
//! and a single error/result surface. Callers implement an objective,
//! choose Adam options, and obtain trained parameters and diagnostics
//! without touching backend solver details.
//!
//! Key behaviors
//! -------------
//! - Expose a high-level API for **maximizing** noisy objectives `ℓ(θ)`
//!   (`adam_optimizer`).
//! - Supply shared numerical primitives (`numerical_stability`) for mapping
//!   unconstrained parameters into model space.
//! - Normalize configuration issues, numerical failures, and backend solver
//!   errors into a single enum (`errors::OptError`) with a common result
//!   alias (`OptResult<T>`).
//!
//! Conventions
//! -----------
//! - All solvers conceptually maximize `ℓ(θ)` by minimizing an internal
//!   cost `c(θ) = -ℓ(θ)`; user-facing APIs and outcomes are expressed in
//!   terms of `ℓ`.
//! - Public optimization entrypoints that can fail return `OptResult<T>`;
//!   callers never see raw Argmin errors.
//! - Progress reporting goes through the `log` facade only.

pub mod adam_optimizer;
pub mod errors;
pub mod numerical_stability;

pub mod prelude {
    pub use super::adam_optimizer::prelude::*;
    pub use super::errors::{OptError, OptResult};
    pub use super::numerical_stability::prelude::*;
}
