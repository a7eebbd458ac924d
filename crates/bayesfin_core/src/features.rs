//! Lagged return and variance feature engineering.
//!
//! For a price history `p_0, ..., p_{n-1}` the engineered features at row
//! `t` are:
//!
//! ```text
//! log_ret          = ln(p_t / p_{t-1})                      (target)
//! log_ret_lag_k    = log_ret_{t-k}                          k = 1..=return_lags
//! var_lag_k        = Var(log_ret_{t-k-w+1..=t-k})           k = 1..=variance_lags
//! <exogenous>      = column value at row t
//! ```
//!
//! where `w` is the rolling variance window. Rows with any non-finite value
//! are dropped, mirroring a `drop_nulls` after shifting.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::frame::PriceFrame;

/// Name of the target column (one-step log return).
pub const TARGET_COLUMN: &str = "log_ret";

/// Feature values for a single row, keyed by feature name.
pub type FeatureRow = BTreeMap<String, f64>;

/// Shifts a series forward by `n` positions.
///
/// `output[i] = values[i - n]`; the first `n` entries are `NaN`.
///
/// # Examples
///
/// ```rust
/// use bayesfin_core::shift;
///
/// let shifted = shift(&[1.0, 2.0, 3.0], 1);
/// assert!(shifted[0].is_nan());
/// assert_eq!(&shifted[1..], &[1.0, 2.0]);
/// ```
pub fn shift(values: &[f64], n: usize) -> Vec<f64> {
    let n = n.min(values.len());
    let mut out = vec![f64::NAN; n];
    out.extend_from_slice(&values[..values.len() - n]);
    out
}

/// Trailing sample variance (denominator `window - 1`).
///
/// Entries whose window is not completely finite are `NaN`.
pub fn rolling_variance(values: &[f64], window: usize) -> Vec<f64> {
    if window < 2 {
        return vec![f64::NAN; values.len()];
    }
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if i + 1 < window {
                return f64::NAN;
            }
            sample_variance(&values[i + 1 - window..=i])
        })
        .collect()
}

fn sample_variance(window: &[f64]) -> f64 {
    if window.len() < 2 || window.iter().any(|v| !v.is_finite()) {
        return f64::NAN;
    }
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
}

/// Name of the `k`-th lagged return feature.
pub fn return_lag_name(k: usize) -> String {
    format!("{TARGET_COLUMN}_lag_{k}")
}

/// Name of the `k`-th lagged rolling variance feature.
pub fn variance_lag_name(k: usize) -> String {
    format!("var_lag_{k}")
}

/// Feature configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Number of lagged log returns (`>= 1`).
    pub return_lags: usize,
    /// Rolling variance window in rows (`>= 2`).
    pub variance_window: usize,
    /// Number of lagged rolling variances.
    pub variance_lags: usize,
    /// Extra frame columns passed through as features.
    pub exogenous: Vec<String>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            return_lags: 1,
            variance_window: 5,
            variance_lags: 1,
            exogenous: Vec::new(),
        }
    }
}

impl FeatureConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `DataError::InvalidFeatureConfig` if `return_lags == 0` or
    /// `variance_window < 2`.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.return_lags == 0 {
            return Err(DataError::InvalidFeatureConfig(
                "return_lags must be at least 1".to_string(),
            ));
        }
        if self.variance_window < 2 {
            return Err(DataError::InvalidFeatureConfig(format!(
                "variance_window must be at least 2, got {}",
                self.variance_window
            )));
        }
        if let Some(name) = self
            .exogenous
            .iter()
            .find(|name| name.as_str() == TARGET_COLUMN || name.starts_with("var_lag_"))
        {
            return Err(DataError::InvalidFeatureConfig(format!(
                "exogenous column '{name}' clashes with an engineered feature"
            )));
        }
        Ok(())
    }
}

/// Engineered features for every complete row of a history.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureFrame {
    dates: Vec<NaiveDate>,
    target: Vec<f64>,
    feature_names: Vec<String>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl FeatureFrame {
    /// Number of complete rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.target.len()
    }

    /// Returns `true` if no row has a complete feature set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Dates of the complete rows.
    #[inline]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Target log returns.
    #[inline]
    pub fn target(&self) -> &[f64] {
        &self.target
    }

    /// Feature names in model order (return lags, variance lags, exogenous).
    #[inline]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Returns a feature column by name.
    ///
    /// # Errors
    ///
    /// Returns `DataError::MissingColumn` if the feature does not exist.
    pub fn feature(&self, name: &str) -> Result<&[f64], DataError> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))
    }

    /// Row-major predictors for `names` and the target vector.
    ///
    /// # Errors
    ///
    /// Returns `DataError::MissingColumn` for an unknown feature.
    pub fn design_matrix(&self, names: &[String]) -> Result<(Vec<Vec<f64>>, &[f64]), DataError> {
        let columns = names
            .iter()
            .map(|name| self.feature(name))
            .collect::<Result<Vec<_>, _>>()?;
        let rows = (0..self.len())
            .map(|t| columns.iter().map(|c| c[t]).collect())
            .collect();
        Ok((rows, &self.target))
    }

    /// Materialises the features of row `index` (without the target).
    pub fn row(&self, index: usize) -> Option<FeatureRow> {
        if index >= self.len() {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|(name, values)| (name.clone(), values[index]))
                .collect(),
        )
    }

    /// Materialises the features of the last complete row.
    pub fn last_row(&self) -> Option<FeatureRow> {
        self.len().checked_sub(1).and_then(|i| self.row(i))
    }
}

/// Builds lagged features from a [`PriceFrame`].
///
/// # Examples
///
/// ```rust
/// use bayesfin_core::{FeatureConfig, FeatureEngineer, PriceFrame};
/// use chrono::{Days, NaiveDate};
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let dates: Vec<_> = (0..10).map(|i| start + Days::new(i)).collect();
/// let prices: Vec<f64> = (0..10).map(|i| 100.0 + (i % 3) as f64).collect();
/// let frame = PriceFrame::from_series(dates, prices).unwrap();
///
/// let engineer = FeatureEngineer::new(FeatureConfig::default()).unwrap();
/// let features = engineer.create_features(&frame).unwrap();
/// assert_eq!(features.len(), 10 - engineer.required_history());
///
/// let next = engineer.latest_features(&frame).unwrap();
/// assert!(next.contains_key("log_ret_lag_1"));
/// ```
#[derive(Clone, Debug)]
pub struct FeatureEngineer {
    config: FeatureConfig,
    feature_names: Vec<String>,
}

impl FeatureEngineer {
    /// Creates a feature engineer.
    ///
    /// # Errors
    ///
    /// Returns `DataError::InvalidFeatureConfig` if the config is invalid.
    pub fn new(config: FeatureConfig) -> Result<Self, DataError> {
        config.validate()?;
        let feature_names = (1..=config.return_lags)
            .map(return_lag_name)
            .chain((1..=config.variance_lags).map(variance_lag_name))
            .chain(config.exogenous.iter().cloned())
            .collect();
        Ok(Self {
            config,
            feature_names,
        })
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Feature names in model order.
    #[inline]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Minimum number of history rows needed by [`Self::latest_features`].
    ///
    /// This is also the number of leading rows [`Self::create_features`]
    /// drops from a history with no missing values.
    pub fn required_history(&self) -> usize {
        let returns = self.config.return_lags + 1;
        let variance = if self.config.variance_lags > 0 {
            self.config.variance_window + self.config.variance_lags
        } else {
            0
        };
        returns.max(variance)
    }

    /// Engineers features for every row of `frame` and drops incomplete rows.
    ///
    /// # Errors
    ///
    /// Returns `DataError::MissingColumn` if an exogenous column is absent.
    pub fn create_features(&self, frame: &PriceFrame) -> Result<FeatureFrame, DataError> {
        let returns = frame.log_returns();
        let variance = rolling_variance(&returns, self.config.variance_window);

        let mut columns: Vec<(String, Vec<f64>)> = Vec::with_capacity(self.feature_names.len());
        for k in 1..=self.config.return_lags {
            columns.push((return_lag_name(k), shift(&returns, k)));
        }
        for k in 1..=self.config.variance_lags {
            columns.push((variance_lag_name(k), shift(&variance, k)));
        }
        for name in &self.config.exogenous {
            let values = frame
                .column(name)
                .ok_or_else(|| DataError::MissingColumn(name.clone()))?;
            columns.push((name.clone(), values.to_vec()));
        }

        let keep: Vec<usize> = (0..frame.len())
            .filter(|&t| returns[t].is_finite() && columns.iter().all(|(_, c)| c[t].is_finite()))
            .collect();

        Ok(FeatureFrame {
            dates: keep.iter().map(|&t| frame.dates()[t]).collect(),
            target: keep.iter().map(|&t| returns[t]).collect(),
            feature_names: self.feature_names.clone(),
            columns: columns
                .into_iter()
                .map(|(name, values)| (name, keep.iter().map(|&t| values[t]).collect()))
                .collect(),
        })
    }

    /// Features that predict the next, not yet observed, log return.
    ///
    /// Lag 1 is the most recent observed return. Exogenous features take the
    /// value of the last row (possibly `NaN`). Only the tail of the history
    /// is read, so the cost does not grow with the history length.
    ///
    /// # Errors
    ///
    /// Returns `DataError::InsufficientHistory` if the frame is shorter than
    /// [`Self::required_history`] and `DataError::MissingColumn` if an
    /// exogenous column is absent.
    pub fn latest_features(&self, frame: &PriceFrame) -> Result<FeatureRow, DataError> {
        let needed = self.required_history();
        if frame.len() < needed {
            return Err(DataError::InsufficientHistory {
                needed,
                available: frame.len(),
            });
        }

        let tail = frame.tail(needed);
        let returns = tail.log_returns();
        let m = returns.len();
        let window = self.config.variance_window;

        let mut row = FeatureRow::new();
        for k in 1..=self.config.return_lags {
            row.insert(return_lag_name(k), returns[m - k]);
        }
        for k in 1..=self.config.variance_lags {
            let end = m - k;
            row.insert(
                variance_lag_name(k),
                sample_variance(&returns[end + 1 - window..=end]),
            );
        }
        for name in &self.config.exogenous {
            let values = frame
                .column(name)
                .ok_or_else(|| DataError::MissingColumn(name.clone()))?;
            row.insert(name.clone(), values[values.len() - 1]);
        }
        Ok(row)
    }
}
