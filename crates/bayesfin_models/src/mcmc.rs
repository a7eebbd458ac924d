//! Adaptive random-walk Metropolis sampler.
//!
//! Each chain performs component-wise Gaussian random-walk updates on the
//! unconstrained parameter vector. During warmup the per-parameter proposal
//! scales are adapted in batches toward a target acceptance rate; the scales
//! are frozen afterwards so the kept draws come from a fixed kernel.
//!
//! Chains run in parallel via `rayon`. Chain `c` is seeded with
//! `seed + c`, so a fixed seed gives identical draws regardless of the
//! thread pool size.

use bayesfin_core::FeatureFrame;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::SamplerError;
use crate::model::PredictiveModel;
use crate::posterior::{ChainDraws, PosteriorSamples};

/// Maximum number of kept draws per chain.
pub const MAX_SAMPLES: usize = 1_000_000;

/// Maximum number of chains.
pub const MAX_CHAINS: usize = 64;

/// Maximum number of warmup iterations per chain.
pub const MAX_WARMUP: usize = 1_000_000;

/// Maximum thinning interval.
pub const MAX_THIN: usize = 1_000;

/// Warmup iterations per adaptation batch.
const ADAPT_BATCH: usize = 20;

/// Attempts at finding a finite jittered starting point per chain.
const MAX_INIT_ATTEMPTS: usize = 100;

/// Sampler configuration.
///
/// Use [`SamplerConfigBuilder`] to construct instances.
///
/// # Examples
///
/// ```rust
/// use bayesfin_models::SamplerConfig;
///
/// let config = SamplerConfig::builder()
///     .n_samples(1_000)
///     .n_warmup(500)
///     .n_chains(4)
///     .seed(42)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.n_chains(), 4);
/// ```
#[derive(Clone, Debug)]
pub struct SamplerConfig {
    n_samples: usize,
    n_warmup: usize,
    n_chains: usize,
    thin: usize,
    seed: Option<u64>,
    target_accept: f64,
    initial_step: f64,
}

impl SamplerConfig {
    /// Creates a new configuration builder.
    #[inline]
    pub fn builder() -> SamplerConfigBuilder {
        SamplerConfigBuilder::default()
    }

    /// Kept draws per chain.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Warmup (adaptation) iterations per chain.
    #[inline]
    pub fn n_warmup(&self) -> usize {
        self.n_warmup
    }

    /// Number of chains.
    #[inline]
    pub fn n_chains(&self) -> usize {
        self.n_chains
    }

    /// Thinning interval.
    #[inline]
    pub fn thin(&self) -> usize {
        self.thin
    }

    /// Optional base seed.
    #[inline]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Target per-parameter acceptance rate during adaptation.
    #[inline]
    pub fn target_accept(&self) -> f64 {
        self.target_accept
    }

    /// Relative initial proposal scale.
    #[inline]
    pub fn initial_step(&self) -> f64 {
        self.initial_step
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `SamplerError` if a count is out of range, `thin` is not in
    /// `1..=MAX_THIN`, `target_accept` is not in `(0, 1)` or `initial_step`
    /// is not positive.
    pub fn validate(&self) -> Result<(), SamplerError> {
        if self.n_samples == 0 || self.n_samples > MAX_SAMPLES {
            return Err(SamplerError::InvalidSampleCount(self.n_samples));
        }
        if self.n_chains == 0 || self.n_chains > MAX_CHAINS {
            return Err(SamplerError::InvalidChainCount(self.n_chains));
        }
        if self.n_warmup > MAX_WARMUP {
            return Err(SamplerError::InvalidParameter {
                name: "n_warmup",
                value: format!("{} exceeds {MAX_WARMUP}", self.n_warmup),
            });
        }
        if self.thin == 0 || self.thin > MAX_THIN {
            return Err(SamplerError::InvalidParameter {
                name: "thin",
                value: format!("{} not in 1..={MAX_THIN}", self.thin),
            });
        }
        if !(self.target_accept > 0.0 && self.target_accept < 1.0) {
            return Err(SamplerError::InvalidParameter {
                name: "target_accept",
                value: format!("{} not in (0, 1)", self.target_accept),
            });
        }
        if !(self.initial_step.is_finite() && self.initial_step > 0.0) {
            return Err(SamplerError::InvalidParameter {
                name: "initial_step",
                value: format!("{} must be positive", self.initial_step),
            });
        }
        Ok(())
    }
}

/// Builder for [`SamplerConfig`].
#[derive(Clone, Debug)]
pub struct SamplerConfigBuilder {
    n_samples: usize,
    n_warmup: usize,
    n_chains: usize,
    thin: usize,
    seed: Option<u64>,
    target_accept: f64,
    initial_step: f64,
}

impl Default for SamplerConfigBuilder {
    fn default() -> Self {
        Self {
            n_samples: 1_000,
            n_warmup: 1_000,
            n_chains: 4,
            thin: 1,
            seed: None,
            target_accept: 0.44,
            initial_step: 0.1,
        }
    }
}

impl SamplerConfigBuilder {
    /// Sets the kept draws per chain.
    #[inline]
    pub fn n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = n_samples;
        self
    }

    /// Sets the warmup iterations per chain.
    #[inline]
    pub fn n_warmup(mut self, n_warmup: usize) -> Self {
        self.n_warmup = n_warmup;
        self
    }

    /// Sets the number of chains.
    #[inline]
    pub fn n_chains(mut self, n_chains: usize) -> Self {
        self.n_chains = n_chains;
        self
    }

    /// Sets the thinning interval.
    #[inline]
    pub fn thin(mut self, thin: usize) -> Self {
        self.thin = thin;
        self
    }

    /// Sets the base seed.
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the optional base seed.
    #[inline]
    pub fn maybe_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the target acceptance rate.
    #[inline]
    pub fn target_accept(mut self, target_accept: f64) -> Self {
        self.target_accept = target_accept;
        self
    }

    /// Sets the relative initial proposal scale.
    #[inline]
    pub fn initial_step(mut self, initial_step: f64) -> Self {
        self.initial_step = initial_step;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// See [`SamplerConfig::validate`].
    pub fn build(self) -> Result<SamplerConfig, SamplerError> {
        let config = SamplerConfig {
            n_samples: self.n_samples,
            n_warmup: self.n_warmup,
            n_chains: self.n_chains,
            thin: self.thin,
            seed: self.seed,
            target_accept: self.target_accept,
            initial_step: self.initial_step,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Random-walk Metropolis sampler.
///
/// # Examples
///
/// ```rust,no_run
/// use bayesfin_core::{FeatureConfig, FeatureEngineer, PriceFrame};
/// use bayesfin_models::{GarchArModel, MetropolisSampler, ModelSpec, SamplerConfig};
///
/// # fn frame() -> PriceFrame { unimplemented!() }
/// let engineer = FeatureEngineer::new(FeatureConfig::default()).unwrap();
/// let features = engineer.create_features(&frame()).unwrap();
/// let model = GarchArModel::new(engineer.config(), ModelSpec::default());
///
/// let sampler = MetropolisSampler::new(SamplerConfig::builder().seed(1).build().unwrap());
/// let posterior = sampler.sample(&model, &features).unwrap();
/// println!("{} draws", posterior.n_draws());
/// ```
#[derive(Clone, Debug)]
pub struct MetropolisSampler {
    config: SamplerConfig,
}

impl MetropolisSampler {
    /// Creates a sampler.
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Draws from the posterior of `model` given `data`.
    ///
    /// # Errors
    ///
    /// Returns `SamplerError::EmptyData` if `data` has no rows,
    /// `SamplerError::Model` if the model cannot read `data` and
    /// `SamplerError::InvalidInitialPoint` if the model's starting point has
    /// a non-finite log posterior.
    pub fn sample<M: PredictiveModel>(
        &self,
        model: &M,
        data: &FeatureFrame,
    ) -> Result<PosteriorSamples, SamplerError> {
        self.config.validate()?;
        if data.is_empty() {
            return Err(SamplerError::EmptyData);
        }
        model.validate_data(data)?;

        let initial = model.initial_params(data);
        let initial_lp = model.log_posterior(&initial, data);
        if !initial_lp.is_finite() {
            return Err(SamplerError::InvalidInitialPoint(initial_lp));
        }

        let base_seed = self.config.seed.unwrap_or_else(rand::random);
        info!(
            n_params = initial.len(),
            n_obs = data.len(),
            n_chains = self.config.n_chains,
            n_warmup = self.config.n_warmup,
            n_samples = self.config.n_samples,
            seed = base_seed,
            "Starting Metropolis sampling"
        );

        let chains: Vec<ChainDraws> = (0..self.config.n_chains)
            .into_par_iter()
            .map(|chain| {
                let seed = base_seed.wrapping_add(chain as u64);
                self.run_chain(model, data, &initial, chain, seed)
            })
            .collect();

        for (c, chain) in chains.iter().enumerate() {
            debug!(chain = c, acceptance = chain.acceptance_rate, "Chain finished");
            if chain.acceptance_rate < 0.05 {
                warn!(chain = c, acceptance = chain.acceptance_rate, "Low acceptance rate");
            }
        }

        Ok(PosteriorSamples::from_chains(
            model.param_names(),
            chains,
            Some(base_seed),
        )?)
    }

    fn run_chain<M: PredictiveModel>(
        &self,
        model: &M,
        data: &FeatureFrame,
        initial: &[f64],
        chain: usize,
        seed: u64,
    ) -> ChainDraws {
        let mut rng = StdRng::seed_from_u64(seed);
        let cfg = &self.config;
        let n_params = initial.len();

        let mut scales: Vec<f64> = initial
            .iter()
            .map(|x| cfg.initial_step * x.abs().max(1e-2))
            .collect();

        let (mut current, mut current_lp) = jittered_start(model, data, initial, &scales, chain, &mut rng);

        let total = cfg.n_warmup + cfg.n_samples * cfg.thin;
        let mut draws = Vec::with_capacity(cfg.n_samples);
        let mut batch_accepts = vec![0usize; n_params];
        let mut kept_accepts = 0usize;
        let mut kept_proposals = 0usize;

        for iter in 0..total {
            let warming = iter < cfg.n_warmup;

            for j in 0..n_params {
                let z: f64 = StandardNormal.sample(&mut rng);
                let previous = current[j];
                current[j] = previous + scales[j] * z;
                let proposal_lp = model.log_posterior(&current, data);

                let log_alpha = proposal_lp - current_lp;
                let accept = log_alpha >= 0.0 || rng.gen::<f64>().ln() < log_alpha;
                if accept {
                    current_lp = proposal_lp;
                    if warming {
                        batch_accepts[j] += 1;
                    } else {
                        kept_accepts += 1;
                    }
                } else {
                    current[j] = previous;
                }
                if !warming {
                    kept_proposals += 1;
                }
            }

            if warming && (iter + 1) % ADAPT_BATCH == 0 {
                for (scale, accepts) in scales.iter_mut().zip(batch_accepts.iter_mut()) {
                    let rate = *accepts as f64 / ADAPT_BATCH as f64;
                    *scale *= (2.0 * (rate - cfg.target_accept)).exp();
                    *accepts = 0;
                }
            }

            if !warming && (iter - cfg.n_warmup + 1) % cfg.thin == 0 {
                draws.push(current.clone());
            }
        }

        let acceptance_rate = if kept_proposals > 0 {
            kept_accepts as f64 / kept_proposals as f64
        } else {
            0.0
        };

        ChainDraws {
            draws,
            acceptance_rate,
        }
    }
}

/// Finds a finite starting point near `initial`; chain 0 starts exactly at it.
fn jittered_start<M: PredictiveModel, R: Rng>(
    model: &M,
    data: &FeatureFrame,
    initial: &[f64],
    scales: &[f64],
    chain: usize,
    rng: &mut R,
) -> (Vec<f64>, f64) {
    if chain > 0 {
        for _ in 0..MAX_INIT_ATTEMPTS {
            let candidate: Vec<f64> = initial
                .iter()
                .zip(scales)
                .map(|(x, s)| {
                    let z: f64 = StandardNormal.sample(rng);
                    x + s * z
                })
                .collect();
            let lp = model.log_posterior(&candidate, data);
            if lp.is_finite() {
                return (candidate, lp);
            }
        }
    }
    (initial.to_vec(), model.log_posterior(initial, data))
}
