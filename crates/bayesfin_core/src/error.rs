//! Error types for price history handling.

use thiserror::Error;

/// Errors raised while loading, validating or extending a price history.
#[derive(Debug, Error)]
pub enum DataError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding or encoding failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A date cell could not be parsed with the configured format.
    #[error("Invalid date '{value}' at row {row}: expected format {format}")]
    DateParse {
        /// Raw cell content.
        value: String,
        /// 1-based data row.
        row: usize,
        /// Expected `chrono` format string.
        format: String,
    },

    /// A numeric cell could not be parsed.
    #[error("Invalid number '{value}' in column '{column}' at row {row}")]
    NumberParse {
        /// Raw cell content.
        value: String,
        /// Column name.
        column: String,
        /// 1-based data row.
        row: usize,
    },

    /// A required column is absent.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// An extra column does not match the frame length.
    #[error("Column '{name}' has {actual} values, expected {expected}")]
    ColumnLength {
        /// Column name.
        name: String,
        /// Frame length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// Dates must be strictly increasing.
    #[error("Date {date} is not after previous date {previous}")]
    NonMonotonicDate {
        /// Offending date.
        date: chrono::NaiveDate,
        /// Last date already in the frame.
        previous: chrono::NaiveDate,
    },

    /// Prices must be finite and strictly positive.
    #[error("Invalid price: {0}")]
    InvalidPrice(f64),

    /// Advancing the date would leave the representable calendar.
    #[error("Date step from {0} is out of range")]
    DateOutOfRange(chrono::NaiveDate),

    /// The operation needs at least one row.
    #[error("Price frame is empty")]
    EmptyFrame,

    /// Not enough rows to build lagged features.
    #[error("Insufficient history: need {needed} rows, have {available}")]
    InsufficientHistory {
        /// Rows required by the feature configuration.
        needed: usize,
        /// Rows available.
        available: usize,
    },

    /// Feature configuration is inconsistent.
    #[error("Invalid feature config: {0}")]
    InvalidFeatureConfig(String),
}
