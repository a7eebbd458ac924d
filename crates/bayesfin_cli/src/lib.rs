//! BayesFin CLI library
//!
//! Configuration and command implementations behind the `bayesfin` binary.
//!
//! # Commands
//!
//! - `bayesfin fit` - Fit the return model to a price CSV
//! - `bayesfin simulate` - Simulate price paths from a fitted posterior
//! - `bayesfin price` - Price an option over simulated paths
//! - `bayesfin check` - Validate and print the effective configuration

pub mod commands;
pub mod config;
pub mod error;

pub use config::{build_config, BayesFinConfig, CliArgs, ConfigError, LogLevel};
pub use error::{CliError, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
