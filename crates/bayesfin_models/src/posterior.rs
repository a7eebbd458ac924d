//! Posterior draws, summaries and persistence.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ModelError;

/// Draws produced by a single chain.
#[derive(Clone, Debug, Default)]
pub struct ChainDraws {
    /// Kept parameter vectors, in iteration order.
    pub draws: Vec<Vec<f64>>,
    /// Fraction of accepted proposals after warmup.
    pub acceptance_rate: f64,
}

/// Per-parameter posterior summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSummary {
    /// Parameter name.
    pub name: String,
    /// Posterior mean.
    pub mean: f64,
    /// Posterior standard deviation.
    pub sd: f64,
    /// 5% quantile.
    pub q05: f64,
    /// 50% quantile.
    pub median: f64,
    /// 95% quantile.
    pub q95: f64,
    /// Effective sample size (summed over chains).
    pub ess: f64,
    /// Split potential scale reduction; `None` with fewer than 2 chains.
    pub r_hat: Option<f64>,
}

/// Named posterior draws, chain-concatenated.
///
/// Column `j` of the parameter matrix is stored as `values[j]`, so every
/// parameter is a contiguous slice of `n_chains * draws_per_chain` draws.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSamples {
    param_names: Vec<String>,
    values: Vec<Vec<f64>>,
    n_chains: usize,
    draws_per_chain: usize,
    acceptance_rates: Vec<f64>,
    seed: Option<u64>,
}

impl PosteriorSamples {
    /// Assembles posterior draws from chains of equal length.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::EmptyPosterior` if there are no draws and
    /// `ModelError::InvalidParameter` if chain lengths or draw widths
    /// are inconsistent.
    pub fn from_chains(
        param_names: Vec<String>,
        chains: Vec<ChainDraws>,
        seed: Option<u64>,
    ) -> Result<Self, ModelError> {
        let draws_per_chain = chains.first().map_or(0, |c| c.draws.len());
        if draws_per_chain == 0 {
            return Err(ModelError::EmptyPosterior);
        }

        let n_params = param_names.len();
        let mut values = vec![Vec::with_capacity(chains.len() * draws_per_chain); n_params];
        for chain in &chains {
            if chain.draws.len() != draws_per_chain {
                return Err(ModelError::InvalidParameter {
                    name: "draws_per_chain".to_string(),
                    value: chain.draws.len() as f64,
                });
            }
            for draw in &chain.draws {
                if draw.len() != n_params {
                    return Err(ModelError::InvalidParameter {
                        name: "draw.len".to_string(),
                        value: draw.len() as f64,
                    });
                }
                for (column, &v) in values.iter_mut().zip(draw) {
                    column.push(v);
                }
            }
        }

        Ok(Self {
            param_names,
            values,
            n_chains: chains.len(),
            draws_per_chain,
            acceptance_rates: chains.iter().map(|c| c.acceptance_rate).collect(),
            seed,
        })
    }

    /// Parameter names, in parameter-vector order.
    #[inline]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Total number of draws across chains.
    #[inline]
    pub fn n_draws(&self) -> usize {
        self.n_chains * self.draws_per_chain
    }

    /// Number of chains.
    #[inline]
    pub fn n_chains(&self) -> usize {
        self.n_chains
    }

    /// Post-warmup acceptance rate per chain.
    #[inline]
    pub fn acceptance_rates(&self) -> &[f64] {
        &self.acceptance_rates
    }

    /// Base seed the sampler used, if recorded.
    #[inline]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// All draws of one parameter.
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.param_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i].as_slice())
    }

    /// Parameter vector of draw `index`.
    pub fn draw(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.n_draws() {
            return None;
        }
        Some(self.values.iter().map(|column| column[index]).collect())
    }

    /// A uniformly chosen draw.
    pub fn random_draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let index = rng.gen_range(0..self.n_draws());
        self.values.iter().map(|column| column[index]).collect()
    }

    /// Checks that the draws belong to a model with parameters `expected`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ParameterMismatch` when the names differ.
    pub fn ensure_params(&self, expected: &[String]) -> Result<(), ModelError> {
        if self.param_names != expected {
            return Err(ModelError::ParameterMismatch {
                expected: expected.to_vec(),
                actual: self.param_names.clone(),
            });
        }
        Ok(())
    }

    /// Summary statistics and diagnostics per parameter.
    pub fn summary(&self) -> Vec<ParameterSummary> {
        self.param_names
            .iter()
            .zip(&self.values)
            .map(|(name, column)| {
                let (mean, sd) = mean_sd(column);
                let mut sorted = column.clone();
                sorted.sort_by(f64::total_cmp);
                let chains: Vec<&[f64]> = column.chunks(self.draws_per_chain).collect();
                ParameterSummary {
                    name: name.clone(),
                    mean,
                    sd,
                    q05: quantile_sorted(&sorted, 0.05),
                    median: quantile_sorted(&sorted, 0.5),
                    q95: quantile_sorted(&sorted, 0.95),
                    ess: chains.iter().map(|c| effective_sample_size(c)).sum(),
                    r_hat: split_r_hat(&chains),
                }
            })
            .collect()
    }

    /// Writes the draws as JSON.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Io` or `ModelError::Json` on failure.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        info!(path = %path.display(), n_draws = self.n_draws(), "Saved posterior");
        Ok(())
    }

    /// Reads draws written by [`Self::save`].
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Io`, `ModelError::Json` or, for a file without
    /// draws, `ModelError::EmptyPosterior`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let samples: Self = serde_json::from_reader(reader)?;
        if samples.n_draws() == 0
            || samples.values.len() != samples.param_names.len()
            || samples.values.iter().any(|c| c.len() != samples.n_draws())
        {
            return Err(ModelError::EmptyPosterior);
        }
        Ok(samples)
    }
}

fn mean_sd(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

/// Linear-interpolation quantile of sorted data.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Effective sample size from the initial positive autocorrelation sequence.
pub fn effective_sample_size(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 4 {
        return n as f64;
    }
    let (mean, sd) = mean_sd(values);
    let var = sd * sd * (n - 1) as f64 / n as f64;
    if var <= 0.0 {
        return n as f64;
    }

    let autocorr = |lag: usize| -> f64 {
        values[..n - lag]
            .iter()
            .zip(&values[lag..])
            .map(|(a, b)| (a - mean) * (b - mean))
            .sum::<f64>()
            / (n as f64 * var)
    };

    let mut tau = 1.0;
    let mut lag = 1;
    while lag + 1 < n {
        let pair = autocorr(lag) + autocorr(lag + 1);
        if pair <= 0.0 {
            break;
        }
        tau += 2.0 * pair;
        lag += 2;
    }
    (n as f64 / tau).clamp(1.0, n as f64)
}

/// Split-chain potential scale reduction factor.
pub fn split_r_hat(chains: &[&[f64]]) -> Option<f64> {
    if chains.len() < 2 {
        return None;
    }
    let half = chains.iter().map(|c| c.len()).min()? / 2;
    if half < 2 {
        return None;
    }
    let halves: Vec<&[f64]> = chains
        .iter()
        .flat_map(|c| [&c[..half], &c[half..2 * half]])
        .collect();

    let m = halves.len() as f64;
    let n = half as f64;
    let stats: Vec<(f64, f64)> = halves.iter().map(|h| mean_sd(h)).collect();
    let grand = stats.iter().map(|(mu, _)| mu).sum::<f64>() / m;
    let between = n / (m - 1.0) * stats.iter().map(|(mu, _)| (mu - grand).powi(2)).sum::<f64>();
    let within = stats.iter().map(|(_, sd)| sd * sd).sum::<f64>() / m;
    if within <= 0.0 {
        return Some(1.0);
    }
    let var_plus = (n - 1.0) / n * within + between / n;
    Some((var_plus / within).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, StandardNormal};

    fn names() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    fn chain(offset: f64, len: usize) -> ChainDraws {
        ChainDraws {
            draws: (0..len).map(|i| vec![offset + i as f64, -(i as f64)]).collect(),
            acceptance_rate: 0.4,
        }
    }

    #[test]
    fn test_from_chains_layout() {
        let posterior =
            PosteriorSamples::from_chains(names(), vec![chain(0.0, 3), chain(10.0, 3)], Some(5)).unwrap();
        assert_eq!(posterior.n_draws(), 6);
        assert_eq!(posterior.n_chains(), 2);
        assert_eq!(posterior.get("a").unwrap(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(posterior.draw(4), Some(vec![11.0, -1.0]));
        assert_eq!(posterior.draw(6), None);
        assert_eq!(posterior.seed(), Some(5));
    }

    #[test]
    fn test_from_chains_errors() {
        assert!(matches!(
            PosteriorSamples::from_chains(names(), vec![], None),
            Err(ModelError::EmptyPosterior)
        ));
        assert!(matches!(
            PosteriorSamples::from_chains(names(), vec![chain(0.0, 3), chain(0.0, 2)], None),
            Err(ModelError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_ensure_params() {
        let posterior = PosteriorSamples::from_chains(names(), vec![chain(0.0, 3)], None).unwrap();
        assert!(posterior.ensure_params(&names()).is_ok());
        assert!(matches!(
            posterior.ensure_params(&["a".to_string()]),
            Err(ModelError::ParameterMismatch { .. })
        ));
    }

    #[test]
    fn test_random_draw_is_a_stored_draw() {
        let posterior =
            PosteriorSamples::from_chains(names(), vec![chain(0.0, 5), chain(100.0, 5)], None).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let draw = posterior.random_draw(&mut rng);
            let index = posterior.get("a").unwrap().iter().position(|&a| a == draw[0]).unwrap();
            assert_eq!(posterior.draw(index).unwrap(), draw);
        }
    }

    #[test]
    fn test_quantile_sorted() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile_sorted(&sorted, 0.0), 1.0);
        assert_eq!(quantile_sorted(&sorted, 0.5), 3.0);
        assert_relative_eq!(quantile_sorted(&sorted, 0.1), 1.4, epsilon = 1e-12);
        assert!(quantile_sorted(&[], 0.5).is_nan());
    }

    #[test]
    fn test_diagnostics_on_independent_draws() {
        let mut rng = StdRng::seed_from_u64(11);
        let draws: Vec<f64> = (0..4000).map(|_| StandardNormal.sample(&mut rng)).collect();
        let ess = effective_sample_size(&draws);
        assert!(ess > 2500.0, "ess = {ess}");

        let chains: Vec<&[f64]> = draws.chunks(1000).collect();
        let r_hat = split_r_hat(&chains).unwrap();
        assert!((r_hat - 1.0).abs() < 0.02, "r_hat = {r_hat}");
    }

    #[test]
    fn test_r_hat_detects_separated_chains() {
        let a = vec![0.0, 0.1, -0.1, 0.05, 0.0, -0.05];
        let b = vec![5.0, 5.1, 4.9, 5.05, 5.0, 4.95];
        let r_hat = split_r_hat(&[a.as_slice(), b.as_slice()]).unwrap();
        assert!(r_hat > 2.0);
        assert_eq!(split_r_hat(&[a.as_slice()]), None);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posterior.json");
        let posterior =
            PosteriorSamples::from_chains(names(), vec![chain(0.0, 4), chain(1.0, 4)], Some(1)).unwrap();
        posterior.save(&path).unwrap();
        assert_eq!(PosteriorSamples::load(&path).unwrap(), posterior);
    }
}
