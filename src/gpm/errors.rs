//! Errors for the SplitGPM model layer (data loading and validation, shape
//! checks, numerical failures, snapshot I/O, and wrapped optimizer failures).
//!
//! ## Conventions
//! - **Indices are 0-based**; matrix positions are reported as `(row, col)`
//!   and text positions as 1-based line numbers.
//! - I/O and serialization failures carry the offending path and the
//!   backend message as text so that the error stays `Clone + PartialEq`.
use crate::optimization::errors::OptError;
use std::path::Path;

/// Result alias for model-layer operations.
pub type GpmResult<T> = Result<T, GpmError>;

/// Unified error type for the SplitGPM model layer.
#[derive(Debug, Clone, PartialEq)]
pub enum GpmError {
    // ---- Input/data validation ----
    /// Matrix has no rows or no columns.
    EmptyMatrix { name: &'static str },

    /// A matrix entry is NaN/±inf.
    NonFiniteData { name: &'static str, row: usize, col: usize, value: f64 },

    /// Two matrices disagree on a dimension they must share.
    ShapeMismatch { what: &'static str, expected: usize, found: usize },

    /// Rows cannot be split into equally sized contiguous cell blocks.
    UnevenCellBlocks { rows: usize, cells: usize },

    /// Explicit cell index refers to a cell that does not exist.
    CellIndexOutOfRange { row: usize, cell: usize, cells: usize },

    /// Kernel active dimension is not a column of X.
    ActiveDimOutOfRange { dim: usize, columns: usize },

    // ---- Model configuration ----
    /// Kernel replicates over a channel count that does not equal K1·K2.
    OutputDimMismatch { kernel: usize, k1: usize, k2: usize },

    /// A size parameter that must be positive is zero.
    ZeroSize { what: &'static str },

    /// A log-weight is NaN/±inf (typically a zero-sum row before normalization).
    NonFiniteWeights { name: &'static str, row: usize, col: usize, value: f64 },

    /// A positive hyperparameter is non-finite or not above `POSITIVE_FLOOR`.
    InvalidHyperparameter { name: &'static str, value: f64 },

    /// The builder was compiled without a required component.
    MissingComponent { what: &'static str },

    /// The session already owns a live model; call `Session::reset` first.
    SessionBusy { name: String },

    // ---- Numerical ----
    /// Kernel matrix at the inducing inputs is not positive definite.
    CholeskyFailed { size: usize },

    // ---- I/O ----
    /// Reading or writing a file failed.
    Io { path: String, text: String },

    /// A text matrix could not be parsed.
    Parse { path: String, line: usize, text: String },

    /// A text matrix has rows of different lengths.
    RaggedRow { path: String, line: usize, expected: usize, found: usize },

    /// Snapshot (de)serialization failed.
    Serialization { path: String, text: String },

    // ---- Optimizer ----
    /// Training failed inside the optimizer.
    Optimization { source: OptError },
}

impl GpmError {
    pub(crate) fn io(path: &Path, err: impl std::fmt::Display) -> Self {
        GpmError::Io { path: path.display().to_string(), text: err.to_string() }
    }
}

impl std::error::Error for GpmError {}

impl std::fmt::Display for GpmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Input/data validation ----
            GpmError::EmptyMatrix { name } => write!(f, "Matrix {name} is empty"),
            GpmError::NonFiniteData { name, row, col, value } => {
                write!(f, "Non-finite value {value} in {name} at ({row}, {col})")
            }
            GpmError::ShapeMismatch { what, expected, found } => {
                write!(f, "Shape mismatch for {what}: expected {expected}, found {found}")
            }
            GpmError::UnevenCellBlocks { rows, cells } => {
                write!(f, "{rows} rows cannot be split into {cells} equal cell blocks")
            }
            GpmError::CellIndexOutOfRange { row, cell, cells } => {
                write!(f, "Row {row} is assigned to cell {cell}, but only {cells} cells exist")
            }
            GpmError::ActiveDimOutOfRange { dim, columns } => {
                write!(f, "Kernel active dimension {dim} is out of range for {columns} columns")
            }

            // ---- Model configuration ----
            GpmError::OutputDimMismatch { kernel, k1, k2 } => {
                write!(f, "Kernel has {kernel} output channels, but K1*K2 = {k1}*{k2}")
            }
            GpmError::ZeroSize { what } => write!(f, "{what} must be greater than zero"),
            GpmError::NonFiniteWeights { name, row, col, value } => {
                write!(f, "Non-finite log-weight {value} in {name} at ({row}, {col})")
            }
            GpmError::InvalidHyperparameter { name, value } => {
                write!(f, "Invalid {name}: {value}, must be finite and above the positivity floor")
            }
            GpmError::MissingComponent { what } => write!(f, "Model is missing its {what}"),
            GpmError::SessionBusy { name } => {
                write!(f, "Session already holds model '{name}'; reset it before building another")
            }

            // ---- Numerical ----
            GpmError::CholeskyFailed { size } => {
                write!(f, "Cholesky factorization of the {size}x{size} inducing kernel failed")
            }

            // ---- I/O ----
            GpmError::Io { path, text } => write!(f, "I/O error on {path}: {text}"),
            GpmError::Parse { path, line, text } => {
                write!(f, "Parse error in {path} at line {line}: {text}")
            }
            GpmError::RaggedRow { path, line, expected, found } => {
                write!(f, "Row at {path}:{line} has {found} values, expected {expected}")
            }
            GpmError::Serialization { path, text } => {
                write!(f, "Snapshot serialization failed for {path}: {text}")
            }

            // ---- Optimizer ----
            GpmError::Optimization { source } => write!(f, "Optimization failed: {source}"),
        }
    }
}

impl From<OptError> for GpmError {
    fn from(err: OptError) -> Self {
        match err {
            OptError::CholeskyFailed { size } => GpmError::CholeskyFailed { size },
            source => GpmError::Optimization { source },
        }
    }
}
