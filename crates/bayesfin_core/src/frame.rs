//! Append-only price history.
//!
//! [`PriceFrame`] stores a strictly date-ordered series of prices together
//! with any number of aligned `f64` extra columns (exogenous covariates,
//! sampled indicator variables, ...). Missing extra values are `NaN`.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::DataError;

/// A single materialised row of a [`PriceFrame`].
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    /// Observation date.
    pub date: NaiveDate,
    /// Observed (or simulated) price.
    pub price: f64,
    /// Extra column values, keyed by column name.
    pub values: BTreeMap<String, f64>,
}

/// Date-ordered price history with aligned extra columns.
///
/// # Invariants
///
/// - `dates` is strictly increasing
/// - every price is finite and strictly positive
/// - every extra column has exactly `len()` entries
///
/// # Examples
///
/// ```rust
/// use bayesfin_core::PriceFrame;
/// use chrono::NaiveDate;
///
/// let d0 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
/// let d1 = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
/// let frame = PriceFrame::from_series(vec![d0, d1], vec![70.0, 71.4]).unwrap();
///
/// assert_eq!(frame.len(), 2);
/// assert_eq!(frame.last_price(), Some(71.4));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PriceFrame {
    dates: Vec<NaiveDate>,
    prices: Vec<f64>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl PriceFrame {
    /// Creates an empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a frame from parallel date and price vectors.
    ///
    /// # Errors
    ///
    /// Returns `DataError` if the lengths differ, the dates are not strictly
    /// increasing, or a price is not finite and positive.
    pub fn from_series(dates: Vec<NaiveDate>, prices: Vec<f64>) -> Result<Self, DataError> {
        if dates.len() != prices.len() {
            return Err(DataError::ColumnLength {
                name: "price".to_string(),
                expected: dates.len(),
                actual: prices.len(),
            });
        }

        let mut frame = Self {
            dates: Vec::with_capacity(dates.len()),
            prices: Vec::with_capacity(prices.len()),
            columns: BTreeMap::new(),
        };
        for (date, price) in dates.into_iter().zip(prices) {
            frame.push(date, price, &BTreeMap::new())?;
        }
        Ok(frame)
    }

    /// Adds (or replaces) an extra column.
    ///
    /// # Errors
    ///
    /// Returns `DataError::ColumnLength` if `values.len() != self.len()`.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self, DataError> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(DataError::ColumnLength {
                name,
                expected: self.len(),
                actual: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(self)
    }

    /// Appends one row.
    ///
    /// Extra columns absent from `extras` receive `NaN`. Names in `extras`
    /// that are not yet columns create a new column back-filled with `NaN`.
    ///
    /// # Errors
    ///
    /// Returns `DataError::InvalidPrice` for a non-finite or non-positive
    /// price and `DataError::NonMonotonicDate` if `date` does not come after
    /// the last date. The frame is left unchanged on error.
    pub fn push(
        &mut self,
        date: NaiveDate,
        price: f64,
        extras: &BTreeMap<String, f64>,
    ) -> Result<(), DataError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(DataError::InvalidPrice(price));
        }
        if let Some(&previous) = self.dates.last() {
            if date <= previous {
                return Err(DataError::NonMonotonicDate { date, previous });
            }
        }

        let existing = self.len();
        for name in extras.keys() {
            if !self.columns.contains_key(name) {
                self.columns.insert(name.clone(), vec![f64::NAN; existing]);
            }
        }
        for (name, values) in self.columns.iter_mut() {
            values.push(extras.get(name).copied().unwrap_or(f64::NAN));
        }

        self.dates.push(date);
        self.prices.push(price);
        Ok(())
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Returns `true` if the frame has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Observation dates.
    #[inline]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Prices.
    #[inline]
    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    /// Returns an extra column by name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Names of the extra columns, in sorted order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Last observation date.
    #[inline]
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Last price.
    #[inline]
    pub fn last_price(&self) -> Option<f64> {
        self.prices.last().copied()
    }

    /// Materialises row `index`.
    pub fn row(&self, index: usize) -> Option<Row> {
        let date = *self.dates.get(index)?;
        let price = self.prices[index];
        let values = self
            .columns
            .iter()
            .map(|(name, values)| (name.clone(), values[index]))
            .collect();
        Some(Row { date, price, values })
    }

    /// Materialises the last row.
    pub fn last_row(&self) -> Option<Row> {
        self.len().checked_sub(1).and_then(|i| self.row(i))
    }

    /// Returns the last `n` rows as a new frame (the whole frame if `n >= len`).
    pub fn tail(&self, n: usize) -> PriceFrame {
        let start = self.len().saturating_sub(n);
        PriceFrame {
            dates: self.dates[start..].to_vec(),
            prices: self.prices[start..].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(name, values)| (name.clone(), values[start..].to_vec()))
                .collect(),
        }
    }

    /// Log returns `ln(p_t / p_{t-1})`, aligned with the rows.
    ///
    /// The first entry is `NaN`.
    pub fn log_returns(&self) -> Vec<f64> {
        let mut returns = Vec::with_capacity(self.len());
        if self.is_empty() {
            return returns;
        }
        returns.push(f64::NAN);
        returns.extend(self.prices.windows(2).map(|w| (w[1] / w[0]).ln()));
        returns
    }
}
