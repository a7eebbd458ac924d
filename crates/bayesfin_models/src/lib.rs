//! # BayesFin Models (L2: Bayesian Return Model)
//!
//! Bayesian autoregressive model of daily log returns with a GARCH-like
//! conditional variance, fitted by random-walk Metropolis sampling.
//!
//! This crate provides:
//! - [`PredictiveModel`]: the seam between a probabilistic model and the
//!   sampler / simulator
//! - [`GarchArModel`]: AR mean, GARCH-like variance, optional jump mixture
//! - [`MetropolisSampler`]: adaptive random-walk Metropolis over parallel
//!   chains
//! - [`PosteriorSamples`]: named posterior draws with summaries and JSON
//!   persistence
//!
//! ## Static Dispatch
//!
//! Models are used through generics, never `Box<dyn PredictiveModel>`; the
//! trait carries a generic `predict` method.

#![warn(missing_docs)]

pub mod error;
pub mod garch;
pub mod mcmc;
pub mod model;
pub mod posterior;

pub use error::{ModelError, SamplerError};
pub use garch::{GarchArModel, ModelSpec, Priors, JUMP_SITE};
pub use mcmc::{MetropolisSampler, SamplerConfig, SamplerConfigBuilder};
pub use model::{PredictiveModel, Prediction};
pub use posterior::{ChainDraws, ParameterSummary, PosteriorSamples};
