//! # BayesFin Simulation (L3: Autoregressive Rollout)
//!
//! Forward simulation of price paths from a fitted posterior and Monte Carlo
//! estimation of option payoffs.
//!
//! # Architecture
//!
//! ```text
//! Simulator
//! ├── PredictiveModel    (posterior predictive step)
//! ├── FeatureEngineer    (lagged features of the growing history)
//! ├── SimRng             (per-run seeded streams)
//! └── Orchestration
//!     ├── simulate_path()   one rollout
//!     └── simulate_paths()  parallel runs → SimulatedRuns
//!
//! SimulatedRuns → OptionPayoff → PricingResult
//! ```
//!
//! Each simulated step recomputes the features from the history extended so
//! far, draws a posterior parameter vector, samples the next log return (and
//! any auxiliary sites), appends the new row and repeats.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod payoff;
pub mod rng;
pub mod runs;
pub mod simulator;
pub mod stats;

pub use config::{SimulationConfig, SimulationConfigBuilder};
pub use error::SimulationError;
pub use payoff::{OptionPayoff, PayoffStyle, PayoffType};
pub use rng::SimRng;
pub use runs::{SimulatedRun, SimulatedRuns};
pub use simulator::Simulator;
pub use stats::{discount_factor, price_option, PathStatistics, PricingResult};
