//! Error types for path simulation.

use bayesfin_core::DataError;
use bayesfin_models::ModelError;
use thiserror::Error;

/// Errors from simulation configuration and execution.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Run count outside `[1, MAX_RUNS]`.
    #[error("Invalid run count {0}: must be in range [1, 1_000_000]")]
    InvalidRunCount(usize),

    /// Step count above `MAX_STEPS`.
    #[error("Invalid step count {0}: must be in range [0, 10_000]")]
    InvalidStepCount(usize),

    /// Invalid parameter value with name and description.
    #[error("Invalid parameter '{name}': {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the invalid value.
        value: String,
    },

    /// The model did not produce a required site.
    #[error("Model prediction has no site '{0}'")]
    MissingSite(String),

    /// History manipulation or feature construction failed.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Posterior predictive step failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}
