//! CLI command implementations
//!
//! Each submodule implements a specific CLI command. Shared loading helpers
//! live here.

pub mod check;
pub mod fit;
pub mod price;
pub mod simulate;

use std::path::Path;

use bayesfin_core::{load_csv, FeatureEngineer, PriceFrame};
use bayesfin_models::{GarchArModel, PosteriorSamples};
use bayesfin_simulation::{SimulatedRuns, Simulator};
use tracing::info;

use crate::config::BayesFinConfig;
use crate::{CliError, Result};

fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

/// Load the price history described by the `[data]` table
pub fn load_history(config: &BayesFinConfig, path: &Path) -> Result<PriceFrame> {
    ensure_exists(path)?;
    Ok(load_csv(path, &config.data)?)
}

/// Feature engineer and model matching the configuration
pub fn build_model(config: &BayesFinConfig) -> Result<(FeatureEngineer, GarchArModel)> {
    let engineer = FeatureEngineer::new(config.features.clone())?;
    let model = GarchArModel::new(engineer.config(), config.model.clone());
    Ok((engineer, model))
}

/// Load a posterior saved by `fit`
pub fn load_posterior(path: &Path) -> Result<PosteriorSamples> {
    ensure_exists(path)?;
    Ok(PosteriorSamples::load(path)?)
}

/// Run the configured simulation from a history and posterior file
pub fn simulate_runs(config: &BayesFinConfig, data: &Path, posterior: &Path) -> Result<SimulatedRuns> {
    let history = load_history(config, data)?;
    let posterior = load_posterior(posterior)?;
    let (engineer, model) = build_model(config)?;

    let settings = &config.simulation;
    let simulator = Simulator::new(model, engineer)
        .with_inherit_vals(settings.inherit_vals.clone())
        .with_exo_fixed_effects(settings.exo_fixed_effects.clone())
        .with_additional_effects(settings.additional_effects.clone())
        .with_date_step(settings.date_step);

    let runs = simulator.simulate_paths(&history, &posterior, &settings.to_simulation_config()?)?;
    info!(n_runs = runs.n_runs(), seed = runs.seed(), "Simulation finished");
    Ok(runs)
}

/// Print a result as pretty JSON
fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
