//! Simulation run configuration.

use super::error::SimulationError;

/// Maximum number of simulated runs.
pub const MAX_RUNS: usize = 1_000_000;

/// Maximum number of simulated steps per run.
pub const MAX_STEPS: usize = 10_000;

/// Simulation configuration.
///
/// Immutable; use [`SimulationConfigBuilder`] to construct instances.
///
/// # Examples
///
/// ```rust
/// use bayesfin_simulation::SimulationConfig;
///
/// let config = SimulationConfig::builder()
///     .n_runs(500)
///     .n_steps(21)
///     .seed(42)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.n_runs(), 500);
/// assert_eq!(config.n_steps(), 21);
/// ```
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    n_runs: usize,
    n_steps: usize,
    seed: Option<u64>,
}

impl SimulationConfig {
    /// Creates a new configuration builder.
    #[inline]
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::default()
    }

    /// Number of independent runs.
    #[inline]
    pub fn n_runs(&self) -> usize {
        self.n_runs
    }

    /// Number of simulated steps per run.
    #[inline]
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Optional base seed.
    #[inline]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError` if `n_runs` is 0 or above [`MAX_RUNS`], or
    /// `n_steps` is above [`MAX_STEPS`]. Zero steps is allowed and
    /// reproduces the starting history.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.n_runs == 0 || self.n_runs > MAX_RUNS {
            return Err(SimulationError::InvalidRunCount(self.n_runs));
        }
        if self.n_steps > MAX_STEPS {
            return Err(SimulationError::InvalidStepCount(self.n_steps));
        }
        Ok(())
    }
}

/// Builder for [`SimulationConfig`].
#[derive(Clone, Debug, Default)]
pub struct SimulationConfigBuilder {
    n_runs: Option<usize>,
    n_steps: Option<usize>,
    seed: Option<u64>,
}

impl SimulationConfigBuilder {
    /// Sets the number of runs.
    #[inline]
    pub fn n_runs(mut self, n_runs: usize) -> Self {
        self.n_runs = Some(n_runs);
        self
    }

    /// Sets the number of steps per run.
    #[inline]
    pub fn n_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = Some(n_steps);
        self
    }

    /// Sets the base seed.
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the optional base seed.
    #[inline]
    pub fn maybe_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError` if `n_runs` or `n_steps` is unset or
    /// invalid.
    pub fn build(self) -> Result<SimulationConfig, SimulationError> {
        let n_runs = self.n_runs.ok_or(SimulationError::InvalidParameter {
            name: "n_runs",
            value: "must be specified".to_string(),
        })?;

        let n_steps = self.n_steps.ok_or(SimulationError::InvalidParameter {
            name: "n_steps",
            value: "must be specified".to_string(),
        })?;

        let config = SimulationConfig {
            n_runs,
            n_steps,
            seed: self.seed,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder_valid() {
        let config = SimulationConfig::builder()
            .n_runs(10)
            .n_steps(252)
            .build()
            .unwrap();

        assert_eq!(config.n_runs(), 10);
        assert_eq!(config.n_steps(), 252);
        assert_eq!(config.seed(), None);
    }

    #[test]
    fn test_config_zero_steps_allowed() {
        let config = SimulationConfig::builder().n_runs(1).n_steps(0).build();
        assert!(config.is_ok());
    }

    #[test]
    fn test_config_invalid_runs() {
        let result = SimulationConfig::builder().n_runs(0).n_steps(10).build();
        assert!(matches!(result, Err(SimulationError::InvalidRunCount(0))));

        let result = SimulationConfig::builder()
            .n_runs(MAX_RUNS + 1)
            .n_steps(10)
            .build();
        assert!(matches!(result, Err(SimulationError::InvalidRunCount(_))));
    }

    #[test]
    fn test_config_invalid_steps() {
        let result = SimulationConfig::builder()
            .n_runs(1)
            .n_steps(MAX_STEPS + 1)
            .build();
        assert!(matches!(result, Err(SimulationError::InvalidStepCount(_))));
    }

    #[test]
    fn test_config_missing_fields() {
        let result = SimulationConfig::builder().n_steps(10).build();
        assert!(matches!(
            result,
            Err(SimulationError::InvalidParameter { name: "n_runs", .. })
        ));

        let result = SimulationConfig::builder().n_runs(10).build();
        assert!(matches!(
            result,
            Err(SimulationError::InvalidParameter { name: "n_steps", .. })
        ));
    }

    #[test]
    fn test_config_with_seed() {
        let config = SimulationConfig::builder()
            .n_runs(1)
            .n_steps(1)
            .maybe_seed(Some(9))
            .build()
            .unwrap();
        assert_eq!(config.seed(), Some(9));
    }
}
