//! Model abstraction shared by the sampler and the simulator.

use std::collections::BTreeMap;

use bayesfin_core::{FeatureFrame, FeatureRow, TARGET_COLUMN};
use rand::Rng;

use crate::error::ModelError;

/// One posterior predictive draw: sampled value per model site.
///
/// The target site (`log_ret` by default) is always present; models may
/// add auxiliary sites such as an integer-valued jump indicator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Prediction {
    sites: BTreeMap<String, f64>,
}

impl Prediction {
    /// Creates an empty prediction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sampled site value.
    pub fn insert(&mut self, site: impl Into<String>, value: f64) {
        self.sites.insert(site.into(), value);
    }

    /// Returns a sampled site value.
    pub fn site(&self, name: &str) -> Option<f64> {
        self.sites.get(name).copied()
    }

    /// Iterates over `(site, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.sites.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// A probabilistic model with an unconstrained parameter vector.
///
/// Implementors describe the log density used for fitting and how to draw
/// one step ahead given a parameter draw and the current features.
pub trait PredictiveModel: Send + Sync {
    /// Parameter names, in parameter-vector order.
    fn param_names(&self) -> Vec<String>;

    /// Starting point for sampling, derived from the data.
    fn initial_params(&self, data: &FeatureFrame) -> Vec<f64>;

    /// Log prior density (up to a constant).
    fn log_prior(&self, params: &[f64]) -> f64;

    /// Log likelihood of the target given the features.
    fn log_likelihood(&self, params: &[f64], data: &FeatureFrame) -> f64;

    /// Checks that `data` carries every feature the model reads.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::MissingFeature` for an absent column.
    fn validate_data(&self, data: &FeatureFrame) -> Result<(), ModelError>;

    /// Draws one posterior predictive step.
    ///
    /// # Errors
    ///
    /// Returns `ModelError` if a feature is missing or non-finite, or the
    /// parameter vector is malformed.
    fn predict<R: Rng + ?Sized>(
        &self,
        params: &[f64],
        features: &FeatureRow,
        rng: &mut R,
    ) -> Result<Prediction, ModelError>;

    /// Log posterior density; `NaN` is mapped to `-inf`.
    fn log_posterior(&self, params: &[f64], data: &FeatureFrame) -> f64 {
        let prior = self.log_prior(params);
        if !prior.is_finite() {
            return f64::NEG_INFINITY;
        }
        let value = prior + self.log_likelihood(params, data);
        if value.is_nan() {
            f64::NEG_INFINITY
        } else {
            value
        }
    }

    /// Name of the site holding the simulated log return.
    fn target_site(&self) -> &str {
        TARGET_COLUMN
    }
}

/// Log density of `Normal(mean, variance)` at `x`.
#[inline]
pub fn normal_log_pdf(x: f64, mean: f64, variance: f64) -> f64 {
    const LN_2PI: f64 = 1.837_877_066_409_345_3;
    -0.5 * (LN_2PI + variance.ln() + (x - mean).powi(2) / variance)
}

/// Numerically stable `ln(exp(a) + exp(b))`.
#[inline]
pub fn log_sum_exp(a: f64, b: f64) -> f64 {
    let max = a.max(b);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    max + ((a - max).exp() + (b - max).exp()).ln()
}
