//! Check command implementation
//!
//! Validates the effective configuration and prints it as TOML.

use tracing::info;

use crate::config::BayesFinConfig;
use crate::Result;

/// Run the check command
pub fn run(config: &BayesFinConfig) -> Result<()> {
    config.validate()?;
    info!("Configuration is valid");
    println!("BayesFin v{}", crate::VERSION);
    println!();
    print!("{}", config.to_toml_string()?);
    Ok(())
}
