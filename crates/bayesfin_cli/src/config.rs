//! CLI configuration management
//!
//! Handles loading configuration from TOML files, environment variables and
//! command-line arguments.

use std::path::Path;
use std::str::FromStr;

use bayesfin_core::{CsvSchema, DateStep, FeatureConfig};
use bayesfin_models::{ModelSpec, SamplerConfig, SamplerError};
use bayesfin_simulation::{SimulationConfig, SimulationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },

    #[error("Configuration file error: {0}")]
    FileError(String),

    #[error("Environment variable error: {0}")]
    EnvError(String),
}

/// Log levels supported by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

/// MCMC settings (`[sampler]` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    /// Kept draws per chain
    pub n_samples: usize,
    /// Warmup iterations per chain
    pub n_warmup: usize,
    /// Number of chains
    pub n_chains: usize,
    /// Keep every `thin`-th draw
    pub thin: usize,
    /// Target acceptance rate during warmup
    pub target_accept: f64,
    /// Base seed (random if absent)
    pub seed: Option<u64>,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            n_samples: 1000,
            n_warmup: 1000,
            n_chains: 4,
            thin: 1,
            target_accept: 0.44,
            seed: None,
        }
    }
}

impl SamplerSettings {
    /// Build the validated sampler configuration
    pub fn to_sampler_config(&self) -> Result<SamplerConfig, SamplerError> {
        SamplerConfig::builder()
            .n_samples(self.n_samples)
            .n_warmup(self.n_warmup)
            .n_chains(self.n_chains)
            .thin(self.thin)
            .target_accept(self.target_accept)
            .maybe_seed(self.seed)
            .build()
    }
}

/// Path simulation settings (`[simulation]` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Number of simulated runs
    pub n_runs: usize,
    /// Steps simulated per run
    pub n_steps: usize,
    /// Base seed (random if absent)
    pub seed: Option<u64>,
    /// Date increment of simulated rows
    pub date_step: DateStep,
    /// Extra columns carried forward from the previous row
    pub inherit_vals: Vec<String>,
    /// Features held at their last observed value
    pub exo_fixed_effects: Vec<String>,
    /// Auxiliary prediction sites recorded on each simulated row
    pub additional_effects: Vec<String>,
    /// Steps per year, for annualising rates and volatilities
    pub periods_per_year: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            n_runs: 1000,
            n_steps: 30,
            seed: None,
            date_step: DateStep::default(),
            inherit_vals: Vec::new(),
            exo_fixed_effects: Vec::new(),
            additional_effects: Vec::new(),
            periods_per_year: 252.0,
        }
    }
}

impl SimulationSettings {
    /// Build the validated run configuration
    pub fn to_simulation_config(&self) -> Result<SimulationConfig, SimulationError> {
        SimulationConfig::builder()
            .n_runs(self.n_runs)
            .n_steps(self.n_steps)
            .maybe_seed(self.seed)
            .build()
    }
}

/// Full CLI configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BayesFinConfig {
    /// Log level
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    /// CSV column layout
    pub data: CsvSchema,
    /// Feature engineering
    pub features: FeatureConfig,
    /// Model options and priors
    pub model: ModelSpec,
    /// MCMC settings
    pub sampler: SamplerSettings,
    /// Simulation settings
    pub simulation: SimulationSettings,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    LogLevel::from_str(&s).map_err(serde::de::Error::custom)
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvError(format!("{name}={value}"))),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::EnvError(format!("{name}: {e}"))),
    }
}

impl BayesFinConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("Failed to read config file: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BayesFinConfig = toml::from_str(content)
            .map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::FileError(format!("Failed to render TOML: {}", e)))
    }

    /// Apply `BAYESFIN_*` environment overrides
    ///
    /// - `BAYESFIN_LOG_LEVEL`
    /// - `BAYESFIN_SEED` (sampler and simulation)
    /// - `BAYESFIN_RUNS`
    /// - `BAYESFIN_STEPS`
    /// - `BAYESFIN_CHAINS`
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(level) = std::env::var("BAYESFIN_LOG_LEVEL") {
            self.log_level = LogLevel::from_str(&level)?;
        }
        if let Some(seed) = env_parse::<u64>("BAYESFIN_SEED")? {
            self.sampler.seed = Some(seed);
            self.simulation.seed = Some(seed);
        }
        if let Some(runs) = env_parse("BAYESFIN_RUNS")? {
            self.simulation.n_runs = runs;
        }
        if let Some(steps) = env_parse("BAYESFIN_STEPS")? {
            self.simulation.n_steps = steps;
        }
        if let Some(chains) = env_parse("BAYESFIN_CHAINS")? {
            self.sampler.n_chains = chains;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name: &str, e: &dyn std::fmt::Display| ConfigError::InvalidValue {
            name: name.to_string(),
            value: e.to_string(),
        };

        self.features
            .validate()
            .map_err(|e| invalid("features", &e))?;
        self.sampler
            .to_sampler_config()
            .map_err(|e| invalid("sampler", &e))?;
        self.simulation
            .to_simulation_config()
            .map_err(|e| invalid("simulation", &e))?;

        if let DateStep::CalendarDays(days) = self.simulation.date_step {
            if days > DateStep::MAX_CALENDAR_DAYS {
                return Err(invalid(
                    "simulation.date_step",
                    &format!(
                        "{days} calendar days exceeds {}",
                        DateStep::MAX_CALENDAR_DAYS
                    ),
                ));
            }
        }
        if !(self.simulation.periods_per_year > 0.0 && self.simulation.periods_per_year.is_finite()) {
            return Err(invalid(
                "simulation.periods_per_year",
                &self.simulation.periods_per_year,
            ));
        }
        for name in &self.simulation.inherit_vals {
            if !self.data.extra_columns.contains(name) {
                return Err(invalid(
                    "simulation.inherit_vals",
                    &format!("'{name}' is not listed in data.extra_columns"),
                ));
            }
        }
        for name in &self.simulation.exo_fixed_effects {
            if !self.features.exogenous.contains(name) {
                return Err(invalid(
                    "simulation.exo_fixed_effects",
                    &format!("'{name}' is not listed in features.exogenous"),
                ));
            }
        }
        for name in &self.features.exogenous {
            if !self.data.extra_columns.contains(name) {
                return Err(invalid(
                    "features.exogenous",
                    &format!("'{name}' is not listed in data.extra_columns"),
                ));
            }
        }
        Ok(())
    }

    /// Merge with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli: &CliArgs) -> Result<(), ConfigError> {
        if cli.verbose {
            self.log_level = LogLevel::Debug;
        }
        if let Some(log_level) = &cli.log_level {
            self.log_level = LogLevel::from_str(log_level)?;
        }
        if let Some(seed) = cli.seed {
            self.sampler.seed = Some(seed);
            self.simulation.seed = Some(seed);
        }
        Ok(())
    }
}

/// CLI arguments that affect configuration
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Config file path
    pub config_file: Option<std::path::PathBuf>,
    /// Verbose output
    pub verbose: bool,
    /// Log level override
    pub log_level: Option<String>,
    /// Seed override
    pub seed: Option<u64>,
}

/// Build configuration from all sources
///
/// Priority (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables
/// 3. Config file
/// 4. Default values
///
/// A configured file path that does not exist is an error.
pub fn build_config(cli: &CliArgs) -> Result<BayesFinConfig, ConfigError> {
    let mut config = match &cli.config_file {
        Some(path) => BayesFinConfig::from_file(path)?,
        None => BayesFinConfig::default(),
    };

    config.apply_env()?;
    config.merge_with_cli(cli)?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BayesFinConfig::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.data.date_column, "date");
        assert_eq!(config.features.return_lags, 1);
        assert!(!config.model.jumps);
        assert_eq!(config.sampler.n_chains, 4);
        assert_eq!(config.simulation.n_steps, 30);
        assert_eq!(config.simulation.date_step, DateStep::CalendarDays(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("Info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("WARN").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("error").unwrap(), LogLevel::Error);

        assert!(LogLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(format!("{}", LogLevel::Trace), "trace");
        assert_eq!(format!("{}", LogLevel::Warn), "warn");
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
            log_level = "debug"

            [data]
            date_column = "Date"
            price_column = "Close"
            extra_columns = ["winter"]

            [features]
            return_lags = 2
            variance_window = 10
            exogenous = ["winter"]

            [model]
            jumps = true

            [model.priors]
            phi_scale = 0.25

            [sampler]
            n_samples = 500
            seed = 7

            [simulation]
            n_runs = 200
            n_steps = 21
            date_step = "weekdays"
            inherit_vals = ["winter"]
            exo_fixed_effects = ["winter"]
            additional_effects = ["jump"]
        "#;

        let config = BayesFinConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.data.price_column, "Close");
        assert_eq!(config.data.date_format, "%Y-%m-%d");
        assert_eq!(config.features.return_lags, 2);
        assert_eq!(config.features.variance_lags, 1);
        assert!(config.model.jumps);
        assert_eq!(config.model.priors.phi_scale, 0.25);
        assert_eq!(config.model.priors.mu_scale, 0.01);
        assert_eq!(config.sampler.n_samples, 500);
        assert_eq!(config.sampler.n_warmup, 1000);
        assert_eq!(config.sampler.seed, Some(7));
        assert_eq!(config.simulation.date_step, DateStep::Weekdays);
        assert_eq!(config.simulation.additional_effects, vec!["jump"]);
    }

    #[test]
    fn test_calendar_step_table() {
        let config = BayesFinConfig::from_toml_str(
            r#"
            [simulation]
            date_step = { calendar_days = 7 }
            "#,
        )
        .unwrap();
        assert_eq!(config.simulation.date_step, DateStep::CalendarDays(7));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = BayesFinConfig::from_toml_str("log_level = \"loud\"").unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));

        let err = BayesFinConfig::from_toml_str("[sampler]\nn_chains = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "sampler"));

        let err = BayesFinConfig::from_toml_str("[features]\nreturn_lags = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "features"));

        let err = BayesFinConfig::from_toml_str("[simulation]\nn_runs = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "simulation"));

        let err = BayesFinConfig::from_toml_str(
            "[simulation]\ndate_step = { calendar_days = 4294967295 }",
        )
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "simulation.date_step")
        );

        let err = BayesFinConfig::from_toml_str("[sampler]\nthin = 9223372036854775807").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "sampler"));
    }

    #[test]
    fn test_cross_section_checks() {
        let err = BayesFinConfig::from_toml_str("[features]\nexogenous = [\"winter\"]").unwrap_err();
        assert!(err.to_string().contains("data.extra_columns"));

        let err = BayesFinConfig::from_toml_str("[simulation]\nexo_fixed_effects = [\"winter\"]")
            .unwrap_err();
        assert!(err.to_string().contains("features.exogenous"));
    }

    #[test]
    fn test_cli_args_merge() {
        let mut config = BayesFinConfig::default();
        let cli = CliArgs {
            verbose: true,
            seed: Some(3),
            ..CliArgs::default()
        };
        config.merge_with_cli(&cli).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.sampler.seed, Some(3));
        assert_eq!(config.simulation.seed, Some(3));

        let cli = CliArgs {
            verbose: true,
            log_level: Some("warn".to_string()),
            ..CliArgs::default()
        };
        config.merge_with_cli(&cli).unwrap();
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_cli_invalid_log_level_rejected() {
        let mut config = BayesFinConfig::default();
        let cli = CliArgs {
            log_level: Some("loud".to_string()),
            ..CliArgs::default()
        };
        let err = config.merge_with_cli(&cli).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(ref s) if s == "loud"));
        assert_eq!(config.log_level, LogLevel::Info);

        let err = build_config(&cli).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(_)));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = BayesFinConfig::default();
        config.simulation.seed = Some(11);
        config.simulation.date_step = DateStep::CalendarDays(7);
        let rendered = config.to_toml_string().unwrap();
        let parsed = BayesFinConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_missing_config_file() {
        let cli = CliArgs {
            config_file: Some("/nonexistent/bayesfin.toml".into()),
            ..CliArgs::default()
        };
        assert!(matches!(build_config(&cli), Err(ConfigError::FileError(_))));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidLogLevel("bad".to_string());
        assert!(err.to_string().contains("Invalid log level"));

        let err = ConfigError::EnvError("BAYESFIN_RUNS=x".to_string());
        assert!(err.to_string().contains("BAYESFIN_RUNS=x"));
    }
}
