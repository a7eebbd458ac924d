//! Simulate command implementation
//!
//! Rolls the fitted model forward and writes every run in long CSV format.

use std::path::Path;

use bayesfin_simulation::{PathStatistics, SimulatedRuns};
use tracing::info;

use super::{print_json, simulate_runs};
use crate::config::BayesFinConfig;
use crate::{CliError, Result};

/// Run the simulate command
pub fn run(
    config: &BayesFinConfig,
    data: &Path,
    posterior: &Path,
    output: &Path,
    include_history: bool,
    format: &str,
) -> Result<SimulatedRuns> {
    if !matches!(format, "json" | "table") {
        return Err(CliError::InvalidArgument(format!(
            "Unknown format: {}. Supported: json, table",
            format
        )));
    }

    info!(
        n_runs = config.simulation.n_runs,
        n_steps = config.simulation.n_steps,
        "Starting simulation"
    );

    let runs = simulate_runs(config, data, posterior)?;
    runs.write_csv(output, include_history)?;

    let stats = PathStatistics::from_runs(&runs, config.simulation.periods_per_year)?;
    match format {
        "json" => print_json(&stats)?,
        _ => {
            println!("\nruns              {}", stats.n_runs);
            println!(
                "terminal price    mean {:.4}  sd {:.4}",
                stats.terminal_mean, stats.terminal_sd
            );
            println!(
                "                  5% {:.4}  50% {:.4}  95% {:.4}",
                stats.terminal_q05, stats.terminal_median, stats.terminal_q95
            );
            println!(
                "realised vol      mean {:.4}  5% {:.4}  95% {:.4}",
                stats.realised_vol_mean, stats.realised_vol_q05, stats.realised_vol_q95
            );
        }
    }

    info!(output = %output.display(), "Simulation written");
    Ok(runs)
}
