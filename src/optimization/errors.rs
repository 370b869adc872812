use argmin::core::{ArgminError, Error};

use crate::gpm::errors::GpmError;

/// Crate-wide result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Gradient ----
    /// Implies that FD should be used
    GradientNotImplemented,

    /// Gradient dimensions do not match parameter dimensions.
    GradientDimMismatch {
        expected: usize,
        found: usize,
    },

    /// Gradient elements need to be finite
    InvalidGradient {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    // ---- AdamOptions ----
    /// Learning rate needs to be positive and finite.
    InvalidLearningRate {
        value: f64,
        reason: &'static str,
    },
    /// Moment decay rates need to lie in [0, 1).
    InvalidMomentDecay {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
    /// Denominator offset needs to be positive and finite.
    InvalidEpsilon {
        value: f64,
        reason: &'static str,
    },
    /// Maximum iterations needs to be positive.
    InvalidMaxIter {
        max_iter: usize,
        reason: &'static str,
    },
    /// Progress logging interval needs to be positive.
    InvalidLogEvery {
        log_every: usize,
        reason: &'static str,
    },

    // ---- Cost function ----
    /// Cost function returned a non-finite value.
    NonFiniteCost {
        value: f64,
    },

    // ---- Parameter vector ----
    /// Theta length does not match the number of free parameters.
    ThetaLengthMismatch {
        expected: usize,
        actual: usize,
    },

    /// Unconstrained optimization input must have finite values.
    InvalidThetaInput {
        index: usize,
        value: f64,
    },

    /// Estimated parameters must be finite.
    InvalidThetaHat {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    /// Theta hat is missing
    MissingThetaHat,

    /// No parameter group is marked trainable.
    NothingToTrain,

    // ---- Argmin ---
    /// Wrapper for argmin::InvalidParameter
    InvalidParameter {
        text: String,
    },
    /// Wrapper for argmin::NotImplemented
    NotImplemented {
        text: String,
    },
    /// Wrapper for argmin::NotInitialized
    NotInitialized {
        text: String,
    },
    /// Wrapper for argmin::ConditionViolated
    ConditionViolated {
        text: String,
    },
    /// Wrapper for argmin::CheckPointNotFound
    CheckPointNotFound {
        text: String,
    },
    /// Wrapper for argmin::PotentialBug
    PotentialBug {
        text: String,
    },
    /// Wrapper for argmin::ImpossibleError
    ImpossibleError {
        text: String,
    },
    /// Wrapper for other argmin::Error types
    BackendError {
        text: String,
    },

    // ---- Model ----
    /// Kernel matrix at the inducing inputs is not positive definite.
    CholeskyFailed {
        size: usize,
    },
    /// Any other model-side failure raised while evaluating the objective.
    ModelError {
        text: String,
    },

    // ---- Fallback ----
    UnknownError,
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Gradient ----
            OptError::GradientNotImplemented => {
                write!(f, "Gradient not implemented, finite differences required")
            }
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient dimension mismatch: expected {expected}, found {found}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Invalid gradient at index {index}: {value}. {reason}")
            }

            // ---- AdamOptions ----
            OptError::InvalidLearningRate { value, reason } => {
                write!(f, "Invalid learning rate {value}: {reason}")
            }
            OptError::InvalidMomentDecay { name, value, reason } => {
                write!(f, "Invalid moment decay {name} = {value}: {reason}")
            }
            OptError::InvalidEpsilon { value, reason } => {
                write!(f, "Invalid epsilon {value}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::InvalidLogEvery { log_every, reason } => {
                write!(f, "Invalid logging interval {log_every}: {reason}")
            }

            // ---- Cost function ----
            OptError::NonFiniteCost { value } => {
                write!(f, "Objective returned a non-finite value: {value}")
            }

            // ---- Parameter vector ----
            OptError::ThetaLengthMismatch { expected, actual } => {
                write!(f, "Theta length mismatch: expected {expected}, actual {actual}")
            }
            OptError::InvalidThetaInput { index, value } => {
                write!(f, "Invalid theta input at index {index}: {value}, must be finite")
            }
            OptError::InvalidThetaHat { index, value, reason } => {
                write!(f, "Invalid parameter estimate at index {index}: {value}. {reason}")
            }
            OptError::MissingThetaHat => write!(f, "Optimizer returned no parameter vector"),
            OptError::NothingToTrain => write!(f, "No parameter group is marked trainable"),

            // ---- Argmin ---
            OptError::InvalidParameter { text } => write!(f, "Invalid parameter: {text}"),
            OptError::NotImplemented { text } => write!(f, "Not implemented: {text}"),
            OptError::NotInitialized { text } => write!(f, "Not initialized: {text}"),
            OptError::ConditionViolated { text } => write!(f, "Condition violated: {text}"),
            OptError::CheckPointNotFound { text } => write!(f, "Checkpoint not found: {text}"),
            OptError::PotentialBug { text } => write!(f, "Potential bug: {text}"),
            OptError::ImpossibleError { text } => write!(f, "Impossible error: {text}"),
            OptError::BackendError { text } => write!(f, "Backend error: {text}"),

            // ---- Model ----
            OptError::CholeskyFailed { size } => {
                write!(f, "Cholesky factorization of the {size}x{size} inducing kernel failed")
            }
            OptError::ModelError { text } => write!(f, "Model error: {text}"),

            // ---- Fallback ----
            OptError::UnknownError => write!(f, "Unknown error"),
        }
    }
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(argmin_err) => match argmin_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => OptError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => OptError::ImpossibleError { text },
                _ => OptError::UnknownError,
            },
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}

impl From<GpmError> for OptError {
    fn from(err: GpmError) -> Self {
        match err {
            GpmError::CholeskyFailed { size } => OptError::CholeskyFailed { size },
            GpmError::Optimization { source } => source,
            other => OptError::ModelError { text: other.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // An `OptError` that travelled through argmin as a boxed error must come
    // back out unchanged rather than collapsing into `BackendError`.
    fn opt_error_round_trips_through_argmin_error() {
        let err: Error = OptError::NonFiniteCost { value: f64::INFINITY }.into();

        let back = OptError::from(err);

        assert_eq!(back, OptError::NonFiniteCost { value: f64::INFINITY });
    }

    #[test]
    // Purpose
    // -------
    // Argmin's own error kinds are mapped onto the matching wrapper variant.
    fn argmin_error_maps_to_wrapper_variant() {
        let err: Error = ArgminError::NotInitialized { text: "param".to_string() }.into();

        match OptError::from(err) {
            OptError::NotInitialized { text } => assert_eq!(text, "param"),
            other => panic!("Expected NotInitialized, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Cholesky failures keep their structured form when crossing from the
    // model layer into the optimizer layer.
    fn gpm_cholesky_error_keeps_structure() {
        let err = OptError::from(GpmError::CholeskyFailed { size: 5 });

        assert_eq!(err, OptError::CholeskyFailed { size: 5 });
    }
}
