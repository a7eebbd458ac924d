//! Bayesian autoregressive model with GARCH-like conditional variance.
//!
//! # Model
//!
//! ```text
//! mean_t = mu + Σ_k phi_k · log_ret_lag_k + Σ_j delta_j · exo_j
//! var_t  = omega + alpha · log_ret_lag_1² + beta · var_lag_1
//!
//! log_ret_t ~ N(mean_t, var_t)
//! ```
//!
//! With jumps enabled the return is drawn from a two-component mixture:
//!
//! ```text
//! jump_t    ~ Bernoulli(p)
//! log_ret_t ~ N(mean_t, var_t + jump_t · jump_scale²)
//! ```
//!
//! The `beta` term is present only when the feature set carries `var_lag_1`.
//!
//! # Parameterisation
//!
//! Positive quantities are sampled on the log scale (`log_omega`,
//! `log_alpha`, `log_beta`, `log_jump_scale`) and the jump probability on
//! the logit scale, so the sampler works on an unconstrained vector.

use bayesfin_core::{
    return_lag_name, variance_lag_name, FeatureConfig, FeatureFrame, FeatureRow,
};
use rand::Rng;
use rand_distr::{Bernoulli, Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::model::{log_sum_exp, normal_log_pdf, PredictiveModel, Prediction};

/// Site name of the sampled jump indicator.
pub const JUMP_SITE: &str = "jump";

/// Prior hyperparameters. Every prior is a normal distribution on the
/// unconstrained scale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Priors {
    /// Standard deviation of the intercept prior (mean 0).
    pub mu_scale: f64,
    /// Standard deviation of the autoregressive coefficient priors (mean 0).
    pub phi_scale: f64,
    /// Standard deviation of the exogenous coefficient priors (mean 0).
    pub delta_scale: f64,
    /// Mean of the `log_omega` prior.
    pub log_omega_mean: f64,
    /// Standard deviation of the `log_omega` prior.
    pub log_omega_scale: f64,
    /// Mean of the `log_alpha` prior.
    pub log_alpha_mean: f64,
    /// Standard deviation of the `log_alpha` prior.
    pub log_alpha_scale: f64,
    /// Mean of the `log_beta` prior.
    pub log_beta_mean: f64,
    /// Standard deviation of the `log_beta` prior.
    pub log_beta_scale: f64,
    /// Mean of the `logit_jump_prob` prior.
    pub logit_jump_mean: f64,
    /// Standard deviation of the `logit_jump_prob` prior.
    pub logit_jump_scale: f64,
    /// Mean of the `log_jump_scale` prior.
    pub log_jump_size_mean: f64,
    /// Standard deviation of the `log_jump_scale` prior.
    pub log_jump_size_scale: f64,
}

impl Default for Priors {
    fn default() -> Self {
        Self {
            mu_scale: 0.01,
            phi_scale: 0.5,
            delta_scale: 0.01,
            log_omega_mean: -9.0,
            log_omega_scale: 2.0,
            log_alpha_mean: -2.0,
            log_alpha_scale: 1.0,
            log_beta_mean: -0.5,
            log_beta_scale: 1.0,
            logit_jump_mean: -3.0,
            logit_jump_scale: 1.5,
            log_jump_size_mean: -3.0,
            log_jump_size_scale: 1.0,
        }
    }
}

/// Model options independent of the feature set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSpec {
    /// Adds a Bernoulli jump component and the `jump` predictive site.
    pub jumps: bool,
    /// Prior hyperparameters.
    pub priors: Priors,
}

#[derive(Clone, Debug)]
struct Layout {
    phi: usize,
    delta: usize,
    log_omega: usize,
    log_alpha: usize,
    log_beta: Option<usize>,
    logit_jump: Option<usize>,
    log_jump_size: Option<usize>,
    len: usize,
}

/// GARCH-like autoregressive model of log returns.
///
/// # Examples
///
/// ```rust
/// use bayesfin_core::FeatureConfig;
/// use bayesfin_models::{GarchArModel, ModelSpec, PredictiveModel};
///
/// let model = GarchArModel::new(&FeatureConfig::default(), ModelSpec::default());
/// assert_eq!(
///     model.param_names(),
///     vec!["mu", "phi_1", "log_omega", "log_alpha", "log_beta"]
/// );
/// ```
#[derive(Clone, Debug)]
pub struct GarchArModel {
    return_features: Vec<String>,
    exogenous: Vec<String>,
    variance_feature: Option<String>,
    spec: ModelSpec,
    layout: Layout,
}

impl GarchArModel {
    /// Builds the model matching a feature configuration.
    pub fn new(features: &FeatureConfig, spec: ModelSpec) -> Self {
        let return_features: Vec<String> = (1..=features.return_lags).map(return_lag_name).collect();
        let variance_feature = (features.variance_lags > 0).then(|| variance_lag_name(1));

        let phi = 1;
        let delta = phi + return_features.len();
        let log_omega = delta + features.exogenous.len();
        let log_alpha = log_omega + 1;
        let mut next = log_alpha + 1;
        let log_beta = variance_feature.as_ref().map(|_| {
            next += 1;
            next - 1
        });
        let (logit_jump, log_jump_size) = if spec.jumps {
            next += 2;
            (Some(next - 2), Some(next - 1))
        } else {
            (None, None)
        };

        Self {
            return_features,
            exogenous: features.exogenous.clone(),
            variance_feature,
            spec,
            layout: Layout {
                phi,
                delta,
                log_omega,
                log_alpha,
                log_beta,
                logit_jump,
                log_jump_size,
                len: next,
            },
        }
    }

    /// Returns the model options.
    #[inline]
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Number of parameters.
    #[inline]
    pub fn n_params(&self) -> usize {
        self.layout.len
    }

    /// Conditional mean and variance for one row.
    fn moments(&self, params: &[f64], lags: &[f64], exo: &[f64], var_lag: f64) -> (f64, f64) {
        let l = &self.layout;
        let mut mean = params[0];
        for (k, lag) in lags.iter().enumerate() {
            mean += params[l.phi + k] * lag;
        }
        for (j, x) in exo.iter().enumerate() {
            mean += params[l.delta + j] * x;
        }

        let mut variance = params[l.log_omega].exp() + params[l.log_alpha].exp() * lags[0].powi(2);
        if let Some(b) = l.log_beta {
            variance += params[b].exp() * var_lag;
        }
        (mean, variance)
    }

    fn jump_params(&self, params: &[f64]) -> Option<(f64, f64)> {
        match (self.layout.logit_jump, self.layout.log_jump_size) {
            (Some(p), Some(s)) => {
                let prob = 1.0 / (1.0 + (-params[p]).exp());
                let size = params[s].exp();
                Some((prob, size * size))
            }
            _ => None,
        }
    }

    fn feature_value(row: &FeatureRow, name: &str) -> Result<f64, ModelError> {
        let value = *row
            .get(name)
            .ok_or_else(|| ModelError::MissingFeature(name.to_string()))?;
        if !value.is_finite() {
            return Err(ModelError::NonFiniteFeature {
                name: name.to_string(),
                value,
            });
        }
        Ok(value)
    }

    fn required_features(&self) -> impl Iterator<Item = &String> {
        self.return_features
            .iter()
            .chain(self.exogenous.iter())
            .chain(self.variance_feature.iter())
    }
}

fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 1e-4);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = if values.len() > 1 {
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
    } else {
        1e-4
    };
    (mean, variance.max(1e-10))
}

impl PredictiveModel for GarchArModel {
    fn param_names(&self) -> Vec<String> {
        let mut names = vec!["mu".to_string()];
        names.extend((1..=self.return_features.len()).map(|k| format!("phi_{k}")));
        names.extend(self.exogenous.iter().map(|e| format!("delta_{e}")));
        names.push("log_omega".to_string());
        names.push("log_alpha".to_string());
        if self.layout.log_beta.is_some() {
            names.push("log_beta".to_string());
        }
        if self.spec.jumps {
            names.push("logit_jump_prob".to_string());
            names.push("log_jump_scale".to_string());
        }
        names
    }

    fn initial_params(&self, data: &FeatureFrame) -> Vec<f64> {
        let (mean, variance) = mean_and_variance(data.target());
        let l = &self.layout;

        let mut params = vec![0.0; l.len];
        params[0] = mean;
        params[l.log_omega] = (0.5 * variance).ln();
        params[l.log_alpha] = (0.05_f64).ln();
        if let Some(b) = l.log_beta {
            params[b] = (0.4_f64).ln();
        }
        if let (Some(p), Some(s)) = (l.logit_jump, l.log_jump_size) {
            params[p] = self.spec.priors.logit_jump_mean;
            params[s] = (3.0 * variance.sqrt()).ln();
        }
        params
    }

    fn log_prior(&self, params: &[f64]) -> f64 {
        if params.len() != self.layout.len {
            return f64::NEG_INFINITY;
        }
        let pr = &self.spec.priors;
        let l = &self.layout;
        let sq = |s: f64| s * s;

        let mut lp = normal_log_pdf(params[0], 0.0, sq(pr.mu_scale));
        for k in 0..self.return_features.len() {
            lp += normal_log_pdf(params[l.phi + k], 0.0, sq(pr.phi_scale));
        }
        for j in 0..self.exogenous.len() {
            lp += normal_log_pdf(params[l.delta + j], 0.0, sq(pr.delta_scale));
        }
        lp += normal_log_pdf(params[l.log_omega], pr.log_omega_mean, sq(pr.log_omega_scale));
        lp += normal_log_pdf(params[l.log_alpha], pr.log_alpha_mean, sq(pr.log_alpha_scale));
        if let Some(b) = l.log_beta {
            lp += normal_log_pdf(params[b], pr.log_beta_mean, sq(pr.log_beta_scale));
        }
        if let (Some(p), Some(s)) = (l.logit_jump, l.log_jump_size) {
            lp += normal_log_pdf(params[p], pr.logit_jump_mean, sq(pr.logit_jump_scale));
            lp += normal_log_pdf(params[s], pr.log_jump_size_mean, sq(pr.log_jump_size_scale));
        }
        lp
    }

    fn log_likelihood(&self, params: &[f64], data: &FeatureFrame) -> f64 {
        if params.len() != self.layout.len {
            return f64::NEG_INFINITY;
        }

        let lag_columns: Result<Vec<&[f64]>, _> =
            self.return_features.iter().map(|n| data.feature(n)).collect();
        let exo_columns: Result<Vec<&[f64]>, _> =
            self.exogenous.iter().map(|n| data.feature(n)).collect();
        let var_column = match &self.variance_feature {
            Some(name) => data.feature(name).ok(),
            None => None,
        };
        let (Ok(lag_columns), Ok(exo_columns)) = (lag_columns, exo_columns) else {
            return f64::NEG_INFINITY;
        };
        if self.variance_feature.is_some() && var_column.is_none() {
            return f64::NEG_INFINITY;
        }

        let jump = self.jump_params(params);
        let mut lags = vec![0.0; lag_columns.len()];
        let mut exo = vec![0.0; exo_columns.len()];

        let mut total = 0.0;
        for (t, &y) in data.target().iter().enumerate() {
            for (slot, column) in lags.iter_mut().zip(&lag_columns) {
                *slot = column[t];
            }
            for (slot, column) in exo.iter_mut().zip(&exo_columns) {
                *slot = column[t];
            }
            let var_lag = var_column.map_or(0.0, |c| c[t]);
            let (mean, variance) = self.moments(params, &lags, &exo, var_lag);

            total += match jump {
                None => normal_log_pdf(y, mean, variance),
                Some((prob, size2)) => log_sum_exp(
                    (1.0 - prob).ln() + normal_log_pdf(y, mean, variance),
                    prob.ln() + normal_log_pdf(y, mean, variance + size2),
                ),
            };
        }
        total
    }

    fn validate_data(&self, data: &FeatureFrame) -> Result<(), ModelError> {
        for name in self.required_features() {
            data.feature(name)
                .map_err(|_| ModelError::MissingFeature(name.clone()))?;
        }
        Ok(())
    }

    fn predict<R: Rng + ?Sized>(
        &self,
        params: &[f64],
        features: &FeatureRow,
        rng: &mut R,
    ) -> Result<Prediction, ModelError> {
        if params.len() != self.layout.len {
            return Err(ModelError::InvalidParameter {
                name: "params.len".to_string(),
                value: params.len() as f64,
            });
        }

        let lags = self
            .return_features
            .iter()
            .map(|n| Self::feature_value(features, n))
            .collect::<Result<Vec<_>, _>>()?;
        let exo = self
            .exogenous
            .iter()
            .map(|n| Self::feature_value(features, n))
            .collect::<Result<Vec<_>, _>>()?;
        let var_lag = match &self.variance_feature {
            Some(name) => Self::feature_value(features, name)?,
            None => 0.0,
        };

        let (mean, mut variance) = self.moments(params, &lags, &exo, var_lag);

        let mut prediction = Prediction::new();
        if let Some((prob, size2)) = self.jump_params(params) {
            let bernoulli = Bernoulli::new(prob).map_err(|_| ModelError::InvalidParameter {
                name: "jump_prob".to_string(),
                value: prob,
            })?;
            let jumped = bernoulli.sample(rng);
            if jumped {
                variance += size2;
            }
            prediction.insert(JUMP_SITE, if jumped { 1.0 } else { 0.0 });
        }

        if !variance.is_finite() || variance <= 0.0 {
            return Err(ModelError::InvalidParameter {
                name: "variance".to_string(),
                value: variance,
            });
        }

        let z: f64 = StandardNormal.sample(rng);
        prediction.insert(self.target_site(), mean + variance.sqrt() * z);
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn features(jumps: bool, exogenous: Vec<String>) -> GarchArModel {
        GarchArModel::new(
            &FeatureConfig {
                return_lags: 2,
                variance_window: 5,
                variance_lags: 1,
                exogenous,
            },
            ModelSpec {
                jumps,
                priors: Priors::default(),
            },
        )
    }

    fn row(entries: &[(&str, f64)]) -> FeatureRow {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_param_layout() {
        let model = features(true, vec!["winter".to_string()]);
        assert_eq!(
            model.param_names(),
            vec![
                "mu",
                "phi_1",
                "phi_2",
                "delta_winter",
                "log_omega",
                "log_alpha",
                "log_beta",
                "logit_jump_prob",
                "log_jump_scale"
            ]
        );
        assert_eq!(model.n_params(), 9);
    }

    #[test]
    fn test_param_layout_without_variance_lag() {
        let model = GarchArModel::new(
            &FeatureConfig {
                variance_lags: 0,
                ..FeatureConfig::default()
            },
            ModelSpec::default(),
        );
        assert_eq!(model.param_names(), vec!["mu", "phi_1", "log_omega", "log_alpha"]);
    }

    #[test]
    fn test_moments() {
        let model = features(false, vec!["winter".to_string()]);
        // mu, phi_1, phi_2, delta, log_omega, log_alpha, log_beta
        let params = [0.001, 0.2, -0.1, 0.5, (1e-4_f64).ln(), (0.1_f64).ln(), (0.5_f64).ln()];
        let (mean, variance) = model.moments(&params, &[0.02, -0.01], &[1.0], 4e-4);
        assert_relative_eq!(mean, 0.001 + 0.004 + 0.001 + 0.5, epsilon = 1e-12);
        assert_relative_eq!(variance, 1e-4 + 0.1 * 4e-4 + 0.5 * 4e-4, epsilon = 1e-12);
    }

    #[test]
    fn test_predict_missing_and_non_finite_features() {
        let model = features(false, vec![]);
        let params = vec![0.0; model.n_params()];
        let mut rng = StdRng::seed_from_u64(1);

        let result = model.predict(&params, &row(&[("log_ret_lag_1", 0.0)]), &mut rng);
        assert!(matches!(result, Err(ModelError::MissingFeature(_))));

        let bad = row(&[
            ("log_ret_lag_1", 0.0),
            ("log_ret_lag_2", f64::NAN),
            ("var_lag_1", 1e-4),
        ]);
        let result = model.predict(&params, &bad, &mut rng);
        assert!(matches!(result, Err(ModelError::NonFiniteFeature { .. })));

        let result = model.predict(&params[..2], &bad, &mut rng);
        assert!(matches!(result, Err(ModelError::InvalidParameter { .. })));
    }

    #[test]
    fn test_predict_sites_and_moments() {
        let model = features(true, vec![]);
        let mut params = vec![0.0; model.n_params()];
        params[0] = 0.002;
        params[3] = (1e-4_f64).ln();
        params[4] = -50.0;
        params[5] = -50.0;
        params[6] = 2.0; // jump prob ~0.88
        params[7] = (0.05_f64).ln();

        let inputs = row(&[
            ("log_ret_lag_1", 0.01),
            ("log_ret_lag_2", 0.0),
            ("var_lag_1", 1e-4),
        ]);
        let mut rng = StdRng::seed_from_u64(7);
        let n = 20_000;
        let mut sum = 0.0;
        let mut jumps = 0.0;
        for _ in 0..n {
            let p = model.predict(&params, &inputs, &mut rng).unwrap();
            sum += p.site("log_ret").unwrap();
            let jump = p.site(JUMP_SITE).unwrap();
            assert!(jump == 0.0 || jump == 1.0);
            jumps += jump;
        }
        assert_relative_eq!(sum / n as f64, 0.002, epsilon = 2e-3);
        let expected_prob = 1.0 / (1.0 + (-2.0_f64).exp());
        assert_relative_eq!(jumps / n as f64, expected_prob, epsilon = 0.02);
    }

    #[test]
    fn test_log_prior_wrong_length() {
        let model = features(false, vec![]);
        assert_eq!(model.log_prior(&[0.0]), f64::NEG_INFINITY);
    }
}
