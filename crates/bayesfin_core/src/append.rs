//! Extending a history with a simulated log return.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::frame::PriceFrame;

/// Date increment between consecutive appended rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateStep {
    /// Fixed number of calendar days.
    CalendarDays(u32),
    /// Next Monday-to-Friday date.
    Weekdays,
}

impl Default for DateStep {
    fn default() -> Self {
        DateStep::CalendarDays(1)
    }
}

impl DateStep {
    /// Largest accepted calendar-day step.
    pub const MAX_CALENDAR_DAYS: u32 = 3_660;

    /// Returns the date following `date`, or `None` past `NaiveDate::MAX`.
    ///
    /// A zero calendar-day step is treated as one day so the result is
    /// always strictly later than `date`.
    pub fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        match *self {
            DateStep::CalendarDays(days) => {
                date.checked_add_days(Days::new(u64::from(days.max(1))))
            }
            DateStep::Weekdays => {
                let mut next = date.checked_add_days(Days::new(1))?;
                while matches!(next.weekday(), Weekday::Sat | Weekday::Sun) {
                    next = next.checked_add_days(Days::new(1))?;
                }
                Some(next)
            }
        }
    }
}

/// Appends one row derived from a log return, in place.
///
/// The new row has:
/// - `price = last_price * exp(new_log_ret)`
/// - `date = step.advance(last_date)`
/// - the previous row's value for every column in `inherit_vals`
/// - the values in `add_variables` (these win over inherited values)
/// - `NaN` in every other extra column
///
/// # Errors
///
/// Returns `DataError::EmptyFrame` if `frame` has no rows,
/// `DataError::MissingColumn` for an unknown inherited column,
/// `DataError::DateOutOfRange` if the next date is not representable and
/// `DataError::InvalidPrice` if the log return is not finite or the new
/// price overflows.
pub fn append_log_return(
    frame: &mut PriceFrame,
    new_log_ret: f64,
    inherit_vals: &[String],
    add_variables: &BTreeMap<String, f64>,
    step: DateStep,
) -> Result<(), DataError> {
    let (last_date, last_price) = match (frame.last_date(), frame.last_price()) {
        (Some(date), Some(price)) => (date, price),
        _ => return Err(DataError::EmptyFrame),
    };
    if !new_log_ret.is_finite() {
        return Err(DataError::InvalidPrice(new_log_ret));
    }

    let mut extras = BTreeMap::new();
    for name in inherit_vals {
        let column = frame
            .column(name)
            .ok_or_else(|| DataError::MissingColumn(name.clone()))?;
        extras.insert(name.clone(), column[column.len() - 1]);
    }
    extras.extend(add_variables.iter().map(|(k, v)| (k.clone(), *v)));

    let date = step
        .advance(last_date)
        .ok_or(DataError::DateOutOfRange(last_date))?;
    let price = last_price * new_log_ret.exp();
    frame.push(date, price, &extras)
}

/// Returns a copy of `frame` extended by one row derived from a log return.
///
/// See [`append_log_return`] for the row contents and errors.
///
/// # Examples
///
/// ```rust
/// use std::collections::BTreeMap;
/// use bayesfin_core::{append_from_log_ret, DateStep, PriceFrame};
/// use chrono::NaiveDate;
///
/// let d0 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
/// let frame = PriceFrame::from_series(vec![d0], vec![100.0]).unwrap();
///
/// let next = append_from_log_ret(&frame, 0.0, &[], &BTreeMap::new(), DateStep::default()).unwrap();
/// assert_eq!(next.len(), 2);
/// assert_eq!(next.last_price(), Some(100.0));
/// ```
pub fn append_from_log_ret(
    frame: &PriceFrame,
    new_log_ret: f64,
    inherit_vals: &[String],
    add_variables: &BTreeMap<String, f64>,
    step: DateStep,
) -> Result<PriceFrame, DataError> {
    let mut next = frame.clone();
    append_log_return(&mut next, new_log_ret, inherit_vals, add_variables, step)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn friday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()
    }

    fn base_frame() -> PriceFrame {
        PriceFrame::from_series(vec![friday()], vec![50.0])
            .unwrap()
            .with_column("winter", vec![1.0])
            .unwrap()
            .with_column("jump", vec![0.0])
            .unwrap()
    }

    #[test]
    fn test_date_step_advance() {
        assert_eq!(
            DateStep::CalendarDays(1).advance(friday()),
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );
        assert_eq!(
            DateStep::CalendarDays(0).advance(friday()),
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );
        assert_eq!(
            DateStep::Weekdays.advance(friday()),
            NaiveDate::from_ymd_opt(2024, 3, 11)
        );
    }

    #[test]
    fn test_date_step_past_calendar_end() {
        assert_eq!(DateStep::CalendarDays(u32::MAX).advance(friday()), None);
        assert_eq!(DateStep::Weekdays.advance(NaiveDate::MAX), None);

        let err = append_from_log_ret(
            &base_frame(),
            0.0,
            &[],
            &BTreeMap::new(),
            DateStep::CalendarDays(u32::MAX),
        )
        .unwrap_err();
        assert!(matches!(err, DataError::DateOutOfRange(d) if d == friday()));
    }

    #[test]
    fn test_append_price_and_columns() {
        let frame = base_frame();
        let add = BTreeMap::from([("jump".to_string(), 1.0)]);
        let next = append_from_log_ret(
            &frame,
            0.1,
            &["winter".to_string()],
            &add,
            DateStep::Weekdays,
        )
        .unwrap();

        assert_eq!(frame.len(), 1);
        assert_eq!(next.len(), 2);
        assert_relative_eq!(next.last_price().unwrap(), 50.0 * 0.1_f64.exp(), epsilon = 1e-12);
        let row = next.last_row().unwrap();
        assert_eq!(row.values["winter"], 1.0);
        assert_eq!(row.values["jump"], 1.0);
        assert_eq!(row.date, NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
    }

    #[test]
    fn test_append_without_inherit_leaves_nan() {
        let next = append_from_log_ret(
            &base_frame(),
            0.0,
            &[],
            &BTreeMap::new(),
            DateStep::default(),
        )
        .unwrap();
        let row = next.last_row().unwrap();
        assert!(row.values["winter"].is_nan());
        assert!(row.values["jump"].is_nan());
    }

    #[test]
    fn test_append_errors() {
        let empty = PriceFrame::new();
        assert!(matches!(
            append_from_log_ret(&empty, 0.0, &[], &BTreeMap::new(), DateStep::default()),
            Err(DataError::EmptyFrame)
        ));
        assert!(matches!(
            append_from_log_ret(&base_frame(), f64::NAN, &[], &BTreeMap::new(), DateStep::default()),
            Err(DataError::InvalidPrice(_))
        ));
        assert!(matches!(
            append_from_log_ret(
                &base_frame(),
                0.0,
                &["missing".to_string()],
                &BTreeMap::new(),
                DateStep::default()
            ),
            Err(DataError::MissingColumn(_))
        ));
        assert!(matches!(
            append_from_log_ret(&base_frame(), 1e6, &[], &BTreeMap::new(), DateStep::default()),
            Err(DataError::InvalidPrice(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Appending a log return and taking the log return back recovers it.
        #[test]
        fn prop_append_recovers_log_return(r in -0.5f64..0.5) {
            let next = append_from_log_ret(&base_frame(), r, &[], &BTreeMap::new(), DateStep::default()).unwrap();
            let returns = next.log_returns();
            prop_assert!((returns[1] - r).abs() < 1e-12);
        }
    }
}
