//! Option payoffs evaluated on simulated price paths.

use serde::{Deserialize, Serialize};

/// Payoff type for option pricing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoffType {
    /// Call option: max(S - K, 0)
    #[default]
    Call,
    /// Put option: max(K - S, 0)
    Put,
}

/// Which price of the path settles the option.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoffStyle {
    /// Terminal price.
    #[default]
    European,
    /// Arithmetic mean of the path.
    AsianArithmetic,
}

/// Vanilla or arithmetic-Asian option payoff.
///
/// # Examples
///
/// ```rust
/// use bayesfin_simulation::{OptionPayoff, PayoffStyle};
///
/// let call = OptionPayoff::call(100.0);
/// assert_eq!(call.evaluate(&[95.0, 110.0]), 10.0);
///
/// let asian = OptionPayoff::put(100.0).with_style(PayoffStyle::AsianArithmetic);
/// assert_eq!(asian.evaluate(&[90.0, 100.0]), 5.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionPayoff {
    /// Strike price.
    pub strike: f64,
    /// Payoff type (Call or Put).
    pub payoff_type: PayoffType,
    /// Settlement style.
    pub style: PayoffStyle,
}

impl OptionPayoff {
    /// European call.
    #[inline]
    pub fn call(strike: f64) -> Self {
        Self {
            strike,
            payoff_type: PayoffType::Call,
            style: PayoffStyle::European,
        }
    }

    /// European put.
    #[inline]
    pub fn put(strike: f64) -> Self {
        Self {
            strike,
            payoff_type: PayoffType::Put,
            style: PayoffStyle::European,
        }
    }

    /// Sets the settlement style.
    #[inline]
    pub fn with_style(mut self, style: PayoffStyle) -> Self {
        self.style = style;
        self
    }

    /// Undiscounted payoff of one path; an empty path pays nothing.
    pub fn evaluate(&self, path: &[f64]) -> f64 {
        let underlying = match (self.style, path.last()) {
            (_, None) => return 0.0,
            (PayoffStyle::European, Some(&last)) => last,
            (PayoffStyle::AsianArithmetic, Some(_)) => path.iter().sum::<f64>() / path.len() as f64,
        };
        match self.payoff_type {
            PayoffType::Call => (underlying - self.strike).max(0.0),
            PayoffType::Put => (self.strike - underlying).max(0.0),
        }
    }
}
