//! Fit command implementation
//!
//! Builds features from a price CSV, samples the posterior and saves it as
//! JSON.

use std::path::Path;

use bayesfin_models::{MetropolisSampler, PosteriorSamples, PredictiveModel};
use tracing::{info, warn};

use super::{build_model, load_history};
use crate::config::BayesFinConfig;
use crate::Result;

/// R-hat above this value is reported as a convergence warning
const R_HAT_WARN: f64 = 1.05;

/// Run the fit command
pub fn run(config: &BayesFinConfig, data: &Path, output: &Path) -> Result<PosteriorSamples> {
    info!(data = %data.display(), "Starting fit");

    let history = load_history(config, data)?;
    let (engineer, model) = build_model(config)?;
    let features = engineer.create_features(&history)?;
    info!(
        rows = features.len(),
        dropped = history.len() - features.len(),
        params = model.param_names().len(),
        "Built features"
    );

    let sampler = MetropolisSampler::new(config.sampler.to_sampler_config()?);
    let posterior = sampler.sample(&model, &features)?;

    print_summary(&posterior);
    posterior.save(output)?;
    info!(output = %output.display(), "Fit complete");
    Ok(posterior)
}

fn print_summary(posterior: &PosteriorSamples) {
    println!(
        "\n{:<18} {:>11} {:>11} {:>11} {:>11} {:>11} {:>8} {:>7}",
        "parameter", "mean", "sd", "5%", "50%", "95%", "ess", "r_hat"
    );
    for s in posterior.summary() {
        let r_hat = s.r_hat.map_or("-".to_string(), |r| format!("{r:.3}"));
        println!(
            "{:<18} {:>11.5} {:>11.5} {:>11.5} {:>11.5} {:>11.5} {:>8.0} {:>7}",
            s.name, s.mean, s.sd, s.q05, s.median, s.q95, s.ess, r_hat
        );
        if s.r_hat.is_some_and(|r| r > R_HAT_WARN) {
            warn!(parameter = %s.name, r_hat = ?s.r_hat, "Chains may not have converged");
        }
    }
    let rates: Vec<String> = posterior
        .acceptance_rates()
        .iter()
        .map(|r| format!("{r:.2}"))
        .collect();
    println!("\nacceptance rates: {}", rates.join(", "));
}
