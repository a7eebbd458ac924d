//! # BayesFin Core (L1: Data Foundation)
//!
//! Price history handling for the Bayesian return model.
//!
//! This crate provides:
//! - [`PriceFrame`]: an append-only, date-ordered price history with
//!   optional aligned extra columns
//! - CSV loading and writing ([`io`])
//! - Lagged return/variance feature engineering ([`features`])
//! - Appending simulated log returns to a history ([`append`])
//!
//! ## Missing Values
//!
//! Extra columns use `f64::NAN` for missing entries. Feature construction
//! drops any row whose features are not all finite.

#![warn(missing_docs)]

pub mod append;
pub mod error;
pub mod features;
pub mod frame;
pub mod io;

pub use append::{append_from_log_ret, append_log_return, DateStep};
pub use error::DataError;
pub use features::{
    return_lag_name, rolling_variance, shift, variance_lag_name, FeatureConfig, FeatureEngineer,
    FeatureFrame, FeatureRow, TARGET_COLUMN,
};
pub use frame::{PriceFrame, Row};
pub use io::{load_csv, read_frame, write_csv, write_frame, CsvSchema, DEFAULT_DATE_FORMAT};
