//! Error types for model evaluation and posterior sampling.

use bayesfin_core::DataError;
use thiserror::Error;

/// Errors from model construction, prediction and posterior handling.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Feature construction failed.
    #[error(transparent)]
    Data(#[from] DataError),

    /// A feature required by the model is absent from the input row.
    #[error("Missing feature: {0}")]
    MissingFeature(String),

    /// A feature value is NaN or infinite.
    #[error("Non-finite feature '{name}': {value}")]
    NonFiniteFeature {
        /// Feature name.
        name: String,
        /// Offending value.
        value: f64,
    },

    /// A parameter vector has the wrong length or an unusable value.
    #[error("Invalid parameter '{name}': {value}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Offending value.
        value: f64,
    },

    /// Posterior parameter names do not match the model.
    #[error("Posterior parameters {actual:?} do not match model parameters {expected:?}")]
    ParameterMismatch {
        /// Model parameter names.
        expected: Vec<String>,
        /// Posterior parameter names.
        actual: Vec<String>,
    },

    /// The posterior has no draws.
    #[error("Posterior contains no draws")]
    EmptyPosterior,

    /// Reading or writing a posterior file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Posterior JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from sampler configuration and execution.
#[derive(Debug, Error)]
pub enum SamplerError {
    /// Kept draw count outside `[1, MAX_SAMPLES]`.
    #[error("Invalid sample count {0}: must be in range [1, 1_000_000]")]
    InvalidSampleCount(usize),

    /// Chain count outside `[1, MAX_CHAINS]`.
    #[error("Invalid chain count {0}: must be in range [1, 64]")]
    InvalidChainCount(usize),

    /// Invalid parameter value with name and description.
    #[error("Invalid parameter '{name}': {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the invalid value.
        value: String,
    },

    /// The model's starting point has a non-finite log posterior.
    #[error("Initial point has non-finite log posterior ({0})")]
    InvalidInitialPoint(f64),

    /// No complete feature rows to fit.
    #[error("No observations to fit")]
    EmptyData,

    /// Model-level failure.
    #[error(transparent)]
    Model(#[from] ModelError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SamplerError::InvalidSampleCount(0);
        assert!(err.to_string().contains("Invalid sample count 0"));

        let err = ModelError::MissingFeature("var_lag_1".to_string());
        assert_eq!(err.to_string(), "Missing feature: var_lag_1");

        let err: ModelError = DataError::EmptyFrame.into();
        assert_eq!(err.to_string(), "Price frame is empty");
    }
}
