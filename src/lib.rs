//! splitgpm — joint cell/gene clustering with Gaussian-process time trends.
//!
//! Purpose
//! -------
//! Serve as the crate root for the SplitGPM training pipeline: load a time
//! covariate and an expression matrix, build a two-way mixture of sparse
//! variational Gaussian processes, fit it with minibatch Adam, and save the
//! trained parameters.
//!
//! Key behaviors
//! -------------
//! - [`gpm`] holds the model: data loading, weight initialization, kernel,
//!   inducing features, likelihood, the ELBO with its gradients, parameter
//!   groups, snapshots and the end-to-end driver.
//! - [`optimization`] holds the model-agnostic pieces: the [`Objective`]
//!   trait, Adam as an `argmin` solver, finite differences and numerically
//!   stable transforms.
//!
//! Invariants & assumptions
//! ------------------------
//! - Everything runs on one thread with whole matrices in memory.
//! - All randomness comes from a seeded [`gpm::Session`]; two runs with the
//!   same seed and inputs produce the same snapshot.
//!
//! Conventions
//! -----------
//! - The library logs through the `log` facade and never installs a logger;
//!   the `splitgpm` binary initializes `env_logger`.
//! - Errors are typed per layer ([`gpm::GpmError`],
//!   [`optimization::errors::OptError`]) and convert into each other.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to the code they cover; `tests/` runs a small
//!   end-to-end pipeline through the driver.
//!
//! [`Objective`]: optimization::adam_optimizer::Objective

pub mod gpm;
pub mod optimization;
