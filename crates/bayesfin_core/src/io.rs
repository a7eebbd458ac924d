//! CSV loading and writing for price histories.
//!
//! Input files need a date column and a price column; any further columns
//! named in [`CsvSchema::extra_columns`] are kept as extra frame columns.
//! Empty cells in extra columns become `NaN`. Rows with an empty price cell
//! are skipped with a warning.

use std::fs::File;
use std::io;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::DataError;
use crate::frame::PriceFrame;

/// Default `chrono` date format.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Column layout of a price CSV file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvSchema {
    /// Name of the date column.
    pub date_column: String,
    /// Name of the price column.
    pub price_column: String,
    /// `chrono` format of the date column.
    pub date_format: String,
    /// Additional numeric columns to keep.
    pub extra_columns: Vec<String>,
}

impl Default for CsvSchema {
    fn default() -> Self {
        Self {
            date_column: "date".to_string(),
            price_column: "price".to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            extra_columns: Vec::new(),
        }
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, DataError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| DataError::MissingColumn(name.to_string()))
}

fn parse_number(value: &str, column: &str, row: usize) -> Result<f64, DataError> {
    value.parse::<f64>().map_err(|_| DataError::NumberParse {
        value: value.to_string(),
        column: column.to_string(),
        row,
    })
}

/// Reads a price history from any CSV source.
///
/// Rows are sorted by date; duplicated dates are rejected.
///
/// # Errors
///
/// Returns `DataError` on CSV decoding failures, missing columns,
/// unparsable cells, duplicated dates or invalid prices.
pub fn read_frame<R: io::Read>(reader: R, schema: &CsvSchema) -> Result<PriceFrame, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let date_idx = column_index(&headers, &schema.date_column)?;
    let price_idx = column_index(&headers, &schema.price_column)?;
    let extra_idx = schema
        .extra_columns
        .iter()
        .map(|name| column_index(&headers, name))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows: Vec<(NaiveDate, f64, Vec<f64>)> = Vec::new();
    let mut skipped = 0usize;

    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;

        let raw_price = record.get(price_idx).unwrap_or("");
        if raw_price.is_empty() {
            skipped += 1;
            warn!(row, "Skipping row with empty price");
            continue;
        }
        let price = parse_number(raw_price, &schema.price_column, row)?;

        let raw_date = record.get(date_idx).unwrap_or("");
        let date = NaiveDate::parse_from_str(raw_date, &schema.date_format).map_err(|_| {
            DataError::DateParse {
                value: raw_date.to_string(),
                row,
                format: schema.date_format.clone(),
            }
        })?;

        let extras = extra_idx
            .iter()
            .zip(&schema.extra_columns)
            .map(|(&idx, name)| match record.get(idx).unwrap_or("") {
                "" => Ok(f64::NAN),
                value => parse_number(value, name, row),
            })
            .collect::<Result<Vec<_>, _>>()?;

        rows.push((date, price, extras));
    }

    rows.sort_by_key(|(date, _, _)| *date);

    let mut dates = Vec::with_capacity(rows.len());
    let mut prices = Vec::with_capacity(rows.len());
    let mut columns = vec![Vec::with_capacity(rows.len()); schema.extra_columns.len()];
    for (date, price, extras) in rows {
        dates.push(date);
        prices.push(price);
        for (column, value) in columns.iter_mut().zip(extras) {
            column.push(value);
        }
    }

    let mut frame = PriceFrame::from_series(dates, prices)?;
    for (name, values) in schema.extra_columns.iter().zip(columns) {
        frame = frame.with_column(name.clone(), values)?;
    }

    debug!(rows = frame.len(), skipped, "Parsed price CSV");
    Ok(frame)
}

/// Loads a price history from a CSV file.
///
/// # Errors
///
/// See [`read_frame`]; additionally fails if the file cannot be opened.
pub fn load_csv(path: impl AsRef<Path>, schema: &CsvSchema) -> Result<PriceFrame, DataError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let frame = read_frame(file, schema)?;
    info!(
        path = %path.display(),
        rows = frame.len(),
        first = ?frame.dates().first(),
        last = ?frame.last_date(),
        "Loaded price history"
    );
    Ok(frame)
}

/// Writes a price history as `date,price,<extra columns...>`.
///
/// `NaN` extra values are written as empty cells.
///
/// # Errors
///
/// Returns `DataError::Csv` on write failures.
pub fn write_frame<W: io::Write>(writer: W, frame: &PriceFrame) -> Result<(), DataError> {
    let mut writer = csv::Writer::from_writer(writer);
    let names: Vec<&str> = frame.column_names().collect();

    let mut header = vec!["date", "price"];
    header.extend(names.iter().copied());
    writer.write_record(&header)?;

    for i in 0..frame.len() {
        let mut record = vec![
            frame.dates()[i].format(DEFAULT_DATE_FORMAT).to_string(),
            frame.prices()[i].to_string(),
        ];
        for name in &names {
            let value = frame.column(name).map_or(f64::NAN, |c| c[i]);
            record.push(if value.is_nan() {
                String::new()
            } else {
                value.to_string()
            });
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes a price history to a CSV file.
///
/// # Errors
///
/// Returns `DataError` if the file cannot be created or written.
pub fn write_csv(path: impl AsRef<Path>, frame: &PriceFrame) -> Result<(), DataError> {
    let file = File::create(path.as_ref())?;
    write_frame(file, frame)
}
