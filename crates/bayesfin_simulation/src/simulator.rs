//! Autoregressive posterior predictive path simulation.
//!
//! # Rollout
//!
//! ```text
//! history ← starting frame
//! features ← latest_features(history)        (fixed effects overridden)
//! repeat steps times:
//!     θ        ← uniform posterior draw
//!     sites    ← model.predict(θ, features)
//!     history  ← history + row(exp(sites[target]) · last price)
//!     features ← latest_features(history)
//! ```
//!
//! Exogenous fixed effects are read once from the last complete feature row
//! of the starting history and held constant for the whole path.

use std::collections::BTreeMap;

use bayesfin_core::{
    append_log_return, DataError, DateStep, FeatureEngineer, FeatureRow, PriceFrame,
};
use bayesfin_models::{PosteriorSamples, PredictiveModel};
use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::rng::SimRng;
use crate::runs::{SimulatedRun, SimulatedRuns};

/// Rolls a fitted model forward from an observed history.
///
/// # Examples
///
/// ```rust,no_run
/// use bayesfin_core::{FeatureConfig, FeatureEngineer, PriceFrame};
/// use bayesfin_models::{GarchArModel, ModelSpec, PosteriorSamples};
/// use bayesfin_simulation::{SimulationConfig, Simulator};
///
/// # fn history() -> PriceFrame { unimplemented!() }
/// let engineer = FeatureEngineer::new(FeatureConfig::default()).unwrap();
/// let model = GarchArModel::new(engineer.config(), ModelSpec::default());
/// let posterior = PosteriorSamples::load("posterior.json").unwrap();
///
/// let simulator = Simulator::new(model, engineer);
/// let config = SimulationConfig::builder().n_runs(100).n_steps(30).seed(1).build().unwrap();
/// let runs = simulator.simulate_paths(&history(), &posterior, &config).unwrap();
/// println!("{:?}", runs.terminal_prices());
/// ```
#[derive(Clone, Debug)]
pub struct Simulator<M> {
    model: M,
    feature_engineer: FeatureEngineer,
    target_site: String,
    inherit_vals: Vec<String>,
    exo_fixed_effects: Vec<String>,
    additional_effects: Vec<String>,
    date_step: DateStep,
}

impl<M: PredictiveModel> Simulator<M> {
    /// Creates a simulator reading the model's default target site.
    pub fn new(model: M, feature_engineer: FeatureEngineer) -> Self {
        let target_site = model.target_site().to_string();
        Self {
            model,
            feature_engineer,
            target_site,
            inherit_vals: Vec::new(),
            exo_fixed_effects: Vec::new(),
            additional_effects: Vec::new(),
            date_step: DateStep::default(),
        }
    }

    /// Reads the simulated log return from `site` instead of the default.
    pub fn with_target_site(mut self, site: impl Into<String>) -> Self {
        self.target_site = site.into();
        self
    }

    /// Extra columns copied from the previous row into each new row.
    pub fn with_inherit_vals(mut self, columns: Vec<String>) -> Self {
        self.inherit_vals = columns;
        self
    }

    /// Features held at their last observed value for the whole path.
    pub fn with_exo_fixed_effects(mut self, features: Vec<String>) -> Self {
        self.exo_fixed_effects = features;
        self
    }

    /// Auxiliary prediction sites recorded (truncated toward zero) as
    /// integer columns of each new row.
    pub fn with_additional_effects(mut self, sites: Vec<String>) -> Self {
        self.additional_effects = sites;
        self
    }

    /// Date increment between simulated rows.
    pub fn with_date_step(mut self, step: DateStep) -> Self {
        self.date_step = step;
        self
    }

    /// Returns the model.
    #[inline]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Returns the feature engineer.
    #[inline]
    pub fn feature_engineer(&self) -> &FeatureEngineer {
        &self.feature_engineer
    }

    /// Snapshot of the fixed effects from the last complete feature row.
    fn fixed_effects(&self, starting: &PriceFrame) -> Result<BTreeMap<String, f64>, SimulationError> {
        if self.exo_fixed_effects.is_empty() {
            return Ok(BTreeMap::new());
        }
        let features = self.feature_engineer.create_features(starting)?;
        let last = features.last_row().ok_or(DataError::InsufficientHistory {
            needed: self.feature_engineer.required_history() + 1,
            available: starting.len(),
        })?;

        self.exo_fixed_effects
            .iter()
            .map(|name| {
                last.get(name)
                    .map(|v| (name.clone(), *v))
                    .ok_or_else(|| SimulationError::from(DataError::MissingColumn(name.clone())))
            })
            .collect()
    }

    fn current_features(
        &self,
        history: &PriceFrame,
        fixed: &BTreeMap<String, f64>,
    ) -> Result<FeatureRow, SimulationError> {
        let mut row = self.feature_engineer.latest_features(history)?;
        row.extend(fixed.iter().map(|(k, v)| (k.clone(), *v)));
        Ok(row)
    }

    /// Simulates one path of `steps` new rows appended to `starting`.
    ///
    /// Returns the starting history followed by the simulated rows;
    /// `steps == 0` returns a copy of `starting`.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError` if the posterior does not match the model,
    /// the history is too short for the features, a prediction lacks the
    /// target or an additional site, or a prediction step fails.
    pub fn simulate_path(
        &self,
        steps: usize,
        starting: &PriceFrame,
        posterior: &PosteriorSamples,
        rng: &mut SimRng,
    ) -> Result<PriceFrame, SimulationError> {
        posterior.ensure_params(&self.model.param_names())?;

        let fixed = self.fixed_effects(starting)?;
        let mut history = starting.clone();
        let mut features = self.current_features(&history, &fixed)?;

        for step in 0..steps {
            let params = posterior.random_draw(rng);
            let prediction = self.model.predict(&params, &features, rng)?;

            let log_ret = prediction
                .site(&self.target_site)
                .ok_or_else(|| SimulationError::MissingSite(self.target_site.clone()))?;
            let add_variables = self
                .additional_effects
                .iter()
                .map(|site| {
                    prediction
                        .site(site)
                        .map(|v| (site.clone(), v.trunc() + 0.0))
                        .ok_or_else(|| SimulationError::MissingSite(site.clone()))
                })
                .collect::<Result<BTreeMap<_, _>, _>>()?;

            append_log_return(
                &mut history,
                log_ret,
                &self.inherit_vals,
                &add_variables,
                self.date_step,
            )?;
            trace!(step, log_ret, price = ?history.last_price(), "Simulated step");

            features = self.current_features(&history, &fixed)?;
        }

        Ok(history)
    }

    /// Simulates independent paths in parallel.
    ///
    /// Run `i` uses `SimRng::from_seed(seed).derive(i)`, so results are
    /// reproducible for a fixed seed and ordered by run id.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered by any run (see
    /// [`Self::simulate_path`]) or a configuration error.
    pub fn simulate_paths(
        &self,
        starting: &PriceFrame,
        posterior: &PosteriorSamples,
        config: &SimulationConfig,
    ) -> Result<SimulatedRuns, SimulationError> {
        config.validate()?;
        posterior.ensure_params(&self.model.param_names())?;

        let base = config
            .seed()
            .map_or_else(SimRng::from_entropy, SimRng::from_seed);
        info!(
            n_runs = config.n_runs(),
            n_steps = config.n_steps(),
            history = starting.len(),
            seed = base.seed(),
            "Simulating paths"
        );

        let runs = (0..config.n_runs())
            .into_par_iter()
            .map(|run_id| {
                let mut rng = base.derive(run_id as u64);
                self.simulate_path(config.n_steps(), starting, posterior, &mut rng)
                    .map(|frame| SimulatedRun { run_id, frame })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(n_runs = runs.len(), "Simulation complete");
        Ok(SimulatedRuns::new(runs, starting.len(), base.seed()))
    }
}
