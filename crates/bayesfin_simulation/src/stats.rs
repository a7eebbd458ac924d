//! Monte Carlo estimates over simulated runs.

use bayesfin_models::posterior::quantile_sorted;
use serde::Serialize;

use crate::error::SimulationError;
use crate::payoff::OptionPayoff;
use crate::runs::SimulatedRuns;

/// Discounted Monte Carlo price estimate.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PricingResult {
    /// Present value of the option.
    pub price: f64,
    /// Standard error of the price estimate.
    pub std_error: f64,
    /// Number of paths averaged.
    pub n_paths: usize,
    /// 5% quantile of the discounted payoff.
    pub q05: f64,
    /// Median discounted payoff.
    pub median: f64,
    /// 95% quantile of the discounted payoff.
    pub q95: f64,
}

impl PricingResult {
    /// Estimates the price from undiscounted per-path payoffs.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError::InvalidRunCount` for an empty slice and
    /// `SimulationError::InvalidParameter` for a discount factor outside
    /// `(0, ∞)` or a non-finite payoff.
    pub fn estimate(payoffs: &[f64], discount_factor: f64) -> Result<Self, SimulationError> {
        if payoffs.is_empty() {
            return Err(SimulationError::InvalidRunCount(0));
        }
        if !discount_factor.is_finite() || discount_factor <= 0.0 {
            return Err(SimulationError::InvalidParameter {
                name: "discount_factor",
                value: discount_factor.to_string(),
            });
        }
        if let Some(bad) = payoffs.iter().find(|p| !p.is_finite()) {
            return Err(SimulationError::InvalidParameter {
                name: "payoff",
                value: bad.to_string(),
            });
        }

        let n = payoffs.len() as f64;
        let mut discounted: Vec<f64> = payoffs.iter().map(|p| p * discount_factor).collect();
        let (mean, sd) = mean_sd(&discounted);
        discounted.sort_by(f64::total_cmp);

        Ok(Self {
            price: mean,
            std_error: sd / n.sqrt(),
            n_paths: payoffs.len(),
            q05: quantile_sorted(&discounted, 0.05),
            median: quantile_sorted(&discounted, 0.5),
            q95: quantile_sorted(&discounted, 0.95),
        })
    }

    /// Returns the 95% confidence interval half-width.
    #[inline]
    pub fn confidence_95(&self) -> f64 {
        1.96 * self.std_error
    }

    /// Returns the 99% confidence interval half-width.
    #[inline]
    pub fn confidence_99(&self) -> f64 {
        2.576 * self.std_error
    }
}

/// `exp(-rate · years)`.
#[inline]
pub fn discount_factor(rate: f64, years: f64) -> f64 {
    (-rate * years).exp()
}

/// Prices `payoff` over the simulated part of every run.
///
/// Runs without simulated rows settle on the last observed price.
///
/// # Errors
///
/// See [`PricingResult::estimate`].
pub fn price_option(
    runs: &SimulatedRuns,
    payoff: &OptionPayoff,
    discount_factor: f64,
) -> Result<PricingResult, SimulationError> {
    let payoffs: Vec<f64> = runs
        .paths(false)
        .iter()
        .zip(runs.paths(true))
        .map(|(simulated, with_spot)| {
            if simulated.is_empty() {
                payoff.evaluate(&with_spot)
            } else {
                payoff.evaluate(simulated)
            }
        })
        .collect();
    PricingResult::estimate(&payoffs, discount_factor)
}

/// Distribution summary of simulated runs.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PathStatistics {
    /// Number of runs.
    pub n_runs: usize,
    /// Mean terminal price.
    pub terminal_mean: f64,
    /// Standard deviation of terminal prices.
    pub terminal_sd: f64,
    /// 5% quantile of terminal prices.
    pub terminal_q05: f64,
    /// Median terminal price.
    pub terminal_median: f64,
    /// 95% quantile of terminal prices.
    pub terminal_q95: f64,
    /// Mean annualised realised volatility of the simulated log returns.
    pub realised_vol_mean: f64,
    /// 5% quantile of annualised realised volatility.
    pub realised_vol_q05: f64,
    /// 95% quantile of annualised realised volatility.
    pub realised_vol_q95: f64,
}

impl PathStatistics {
    /// Summarises `runs`; volatility is annualised with `periods_per_year`.
    ///
    /// Realised volatility is measured from the last observed price through
    /// the simulated prices and is `NaN` for runs with fewer than two
    /// simulated returns.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError::InvalidRunCount` if `runs` is empty.
    pub fn from_runs(runs: &SimulatedRuns, periods_per_year: f64) -> Result<Self, SimulationError> {
        if runs.n_runs() == 0 {
            return Err(SimulationError::InvalidRunCount(0));
        }

        let mut terminal = runs.terminal_prices();
        let (terminal_mean, terminal_sd) = mean_sd(&terminal);
        terminal.sort_by(f64::total_cmp);

        let mut vols: Vec<f64> = runs
            .paths(true)
            .iter()
            .map(|path| realised_vol(path, periods_per_year))
            .filter(|v| v.is_finite())
            .collect();
        let (realised_vol_mean, _) = if vols.is_empty() {
            (f64::NAN, f64::NAN)
        } else {
            mean_sd(&vols)
        };
        vols.sort_by(f64::total_cmp);

        Ok(Self {
            n_runs: runs.n_runs(),
            terminal_mean,
            terminal_sd,
            terminal_q05: quantile_sorted(&terminal, 0.05),
            terminal_median: quantile_sorted(&terminal, 0.5),
            terminal_q95: quantile_sorted(&terminal, 0.95),
            realised_vol_mean,
            realised_vol_q05: quantile_sorted(&vols, 0.05),
            realised_vol_q95: quantile_sorted(&vols, 0.95),
        })
    }
}

fn realised_vol(path: &[f64], periods_per_year: f64) -> f64 {
    let returns: Vec<f64> = path.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
    if returns.len() < 2 {
        return f64::NAN;
    }
    let (_, sd) = mean_sd(&returns);
    sd * periods_per_year.sqrt()
}

/// Mean and sample standard deviation (0 for a single value).
fn mean_sd(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}
