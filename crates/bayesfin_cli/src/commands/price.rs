//! Price command implementation
//!
//! Simulates paths from the fitted posterior and prices a European or
//! arithmetic-Asian option on them.

use std::path::Path;

use bayesfin_simulation::{
    discount_factor, price_option, OptionPayoff, PayoffStyle, PricingResult,
};
use serde::Serialize;
use tracing::info;

use super::{print_json, simulate_runs};
use crate::config::BayesFinConfig;
use crate::{CliError, Result};

/// Option contract and discounting inputs
#[derive(Debug, Clone)]
pub struct PriceRequest {
    /// Strike price (defaults to the last observed price)
    pub strike: Option<f64>,
    /// Price a put instead of a call
    pub put: bool,
    /// Settle on the arithmetic mean of the path
    pub asian: bool,
    /// Continuously compounded annual rate
    pub rate: f64,
}

/// Pricing output
#[derive(Debug, Clone, Serialize)]
pub struct PriceReport {
    /// Contract priced
    pub payoff: OptionPayoff,
    /// Last observed price
    pub spot: f64,
    /// Simulated steps to expiry
    pub n_steps: usize,
    /// Discount factor applied to payoffs
    pub discount_factor: f64,
    /// Monte Carlo estimate
    pub result: PricingResult,
}

/// Run the price command
pub fn run(
    config: &BayesFinConfig,
    data: &Path,
    posterior: &Path,
    request: &PriceRequest,
    format: &str,
) -> Result<PriceReport> {
    if !matches!(format, "json" | "table") {
        return Err(CliError::InvalidArgument(format!(
            "Unknown format: {}. Supported: json, table",
            format
        )));
    }
    if !request.rate.is_finite() {
        return Err(CliError::InvalidArgument(format!("rate must be finite, got {}", request.rate)));
    }

    let runs = simulate_runs(config, data, posterior)?;
    let spot = runs
        .runs()
        .first()
        .and_then(|run| run.frame.prices().get(runs.history_len().saturating_sub(1)).copied())
        .ok_or_else(|| CliError::InvalidArgument("price history is empty".to_string()))?;

    let strike = request.strike.unwrap_or(spot);
    if !(strike.is_finite() && strike > 0.0) {
        return Err(CliError::InvalidArgument(format!("strike must be positive, got {}", strike)));
    }
    let payoff = if request.put {
        OptionPayoff::put(strike)
    } else {
        OptionPayoff::call(strike)
    };
    let payoff = if request.asian {
        payoff.with_style(PayoffStyle::AsianArithmetic)
    } else {
        payoff
    };

    let n_steps = config.simulation.n_steps;
    let years = n_steps as f64 / config.simulation.periods_per_year;
    let df = discount_factor(request.rate, years);
    let result = price_option(&runs, &payoff, df)?;
    info!(price = result.price, std_error = result.std_error, "Pricing complete");

    let report = PriceReport {
        payoff,
        spot,
        n_steps,
        discount_factor: df,
        result,
    };

    if format == "json" {
        print_json(&report)?;
    } else {
        print_table(&report);
    }
    Ok(report)
}

fn print_table(report: &PriceReport) {
    let r = &report.result;
    println!("\n┌──────────────────┬──────────────────┐");
    println!("│ {:<16} │ {:>16} │", "Option", format!("{:?} {:?}", report.payoff.style, report.payoff.payoff_type));
    println!("│ {:<16} │ {:>16.4} │", "Strike", report.payoff.strike);
    println!("│ {:<16} │ {:>16.4} │", "Spot", report.spot);
    println!("│ {:<16} │ {:>16} │", "Steps", report.n_steps);
    println!("│ {:<16} │ {:>16.6} │", "Discount factor", report.discount_factor);
    println!("├──────────────────┼──────────────────┤");
    println!("│ {:<16} │ {:>16.4} │", "Price", r.price);
    println!("│ {:<16} │ {:>16.4} │", "Std error", r.std_error);
    println!("│ {:<16} │ {:>16.4} │", "95% CI ±", r.confidence_95());
    println!("│ {:<16} │ {:>16} │", "Paths", r.n_paths);
    println!("└──────────────────┴──────────────────┘");
}
