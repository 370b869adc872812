//! gpm — the SplitGPM model: data, components, objective and persistence.
//!
//! Purpose
//! -------
//! Cluster the cells and genes of a time-course expression matrix at the
//! same time, with one Gaussian-process trend per (cell cluster, gene
//! cluster) pair, and persist the trained parameters.
//!
//! Key behaviors
//! -------------
//! - [`data`] and [`weights`] load inputs and initialize assignment weights.
//! - [`kernel`], [`features`] and [`likelihood`] describe the model
//!   components; [`builder`] validates them and compiles a [`SplitGpm`].
//! - [`model`] evaluates the minibatch ELBO and its gradient and trains
//!   with the Adam layer in [`crate::optimization`].
//! - [`snapshot`] reads and writes trained values; [`driver`] runs the whole
//!   pipeline.
//!
//! Conventions
//! -----------
//! - Fallible operations return [`GpmResult`]; optimizer failures arrive
//!   wrapped in [`GpmError::Optimization`].
//! - All randomness flows from an explicit [`Session`].

pub mod builder;
pub mod data;
pub mod driver;
pub mod errors;
pub mod features;
pub mod kernel;
pub mod likelihood;
pub mod linalg;
pub mod minibatch;
pub mod model;
pub mod params;
pub mod session;
pub mod snapshot;
pub mod weights;

pub use self::builder::SplitGpmBuilder;
pub use self::data::{CellLayout, SplitData};
pub use self::driver::TrainOptions;
pub use self::errors::{GpmError, GpmResult};
pub use self::model::SplitGpm;
pub use self::params::ParamGroup;
pub use self::session::Session;
pub use self::snapshot::{ParamValue, Snapshot};
