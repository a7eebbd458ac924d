//! BayesFin CLI - Bayesian return model fitting and path simulation
//!
//! # Commands
//!
//! - `bayesfin fit --data <csv> --output <json>` - Fit the posterior
//! - `bayesfin simulate --data <csv> --posterior <json> --output <csv>` - Simulate paths
//! - `bayesfin price --data <csv> --posterior <json> --strike <k>` - Price an option
//! - `bayesfin check` - Validate and print the configuration

use std::path::PathBuf;

use bayesfin_cli::commands::{self, price::PriceRequest};
use bayesfin_cli::{build_config, BayesFinConfig, CliArgs as ConfigCliArgs, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// BayesFin - Bayesian commodity return model CLI
#[derive(Parser, Debug)]
#[command(name = "bayesfin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (TOML format)
    #[arg(short, long, global = true, value_name = "FILE", env = "BAYESFIN_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Seed for sampling and simulation
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit the model to a price history
    Fit {
        /// Price history CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Output file for posterior draws (JSON)
        #[arg(short, long, default_value = "posterior.json")]
        output: PathBuf,
    },

    /// Simulate price paths from a fitted posterior
    Simulate {
        /// Price history CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Posterior draws written by `fit`
        #[arg(short, long)]
        posterior: PathBuf,

        /// Steps per run (overrides configuration)
        #[arg(long)]
        steps: Option<usize>,

        /// Number of runs (overrides configuration)
        #[arg(long)]
        runs: Option<usize>,

        /// Output CSV of simulated runs
        #[arg(short, long, default_value = "simulations.csv")]
        output: PathBuf,

        /// Also write the starting history for every run
        #[arg(long)]
        include_history: bool,

        /// Summary format (json, table)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Price an option over simulated paths
    Price {
        /// Price history CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Posterior draws written by `fit`
        #[arg(short, long)]
        posterior: PathBuf,

        /// Strike (defaults to the last observed price)
        #[arg(short, long)]
        strike: Option<f64>,

        /// Price a put instead of a call
        #[arg(long)]
        put: bool,

        /// Arithmetic-average (Asian) settlement
        #[arg(long)]
        asian: bool,

        /// Continuously compounded annual rate
        #[arg(short, long, default_value = "0.0")]
        rate: f64,

        /// Steps to expiry (overrides configuration)
        #[arg(long)]
        steps: Option<usize>,

        /// Number of runs (overrides configuration)
        #[arg(long)]
        runs: Option<usize>,

        /// Output format (json, table)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Check configuration
    Check,
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn with_overrides(
    mut config: BayesFinConfig,
    steps: Option<usize>,
    runs: Option<usize>,
) -> Result<BayesFinConfig> {
    if let Some(steps) = steps {
        config.simulation.n_steps = steps;
    }
    if let Some(runs) = runs {
        config.simulation.n_runs = runs;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&ConfigCliArgs {
        config_file: cli.config.clone(),
        verbose: cli.verbose,
        log_level: cli.log_level.clone(),
        seed: cli.seed,
    })?;

    init_tracing(config.log_level.as_filter_str());
    info!(version = bayesfin_cli::VERSION, log_level = %config.log_level, "BayesFin CLI");

    match cli.command {
        Commands::Fit { data, output } => {
            commands::fit::run(&config, &data, &output)?;
        }
        Commands::Simulate {
            data,
            posterior,
            steps,
            runs,
            output,
            include_history,
            format,
        } => {
            let config = with_overrides(config, steps, runs)?;
            commands::simulate::run(&config, &data, &posterior, &output, include_history, &format)?;
        }
        Commands::Price {
            data,
            posterior,
            strike,
            put,
            asian,
            rate,
            steps,
            runs,
            format,
        } => {
            let config = with_overrides(config, steps, runs)?;
            let request = PriceRequest {
                strike,
                put,
                asian,
                rate,
            };
            commands::price::run(&config, &data, &posterior, &request, &format)?;
        }
        Commands::Check => commands::check::run(&config)?,
    }
    Ok(())
}
