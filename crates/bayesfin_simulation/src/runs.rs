//! Collections of simulated paths.

use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::Path;

use bayesfin_core::{DataError, PriceFrame};
use tracing::info;

use crate::error::SimulationError;

/// One simulated path tagged with its run id.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatedRun {
    /// Zero-based run index.
    pub run_id: usize,
    /// Starting history followed by the simulated rows.
    pub frame: PriceFrame,
}

impl SimulatedRun {
    /// Simulated rows only, excluding the starting history.
    pub fn simulated(&self, history_len: usize) -> PriceFrame {
        self.frame.tail(self.frame.len().saturating_sub(history_len))
    }
}

/// Output of [`crate::Simulator::simulate_paths`], ordered by run id.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatedRuns {
    runs: Vec<SimulatedRun>,
    history_len: usize,
    seed: u64,
}

impl SimulatedRuns {
    /// Wraps runs produced from a history of `history_len` rows.
    pub fn new(runs: Vec<SimulatedRun>, history_len: usize, seed: u64) -> Self {
        Self {
            runs,
            history_len,
            seed,
        }
    }

    /// All runs.
    #[inline]
    pub fn runs(&self) -> &[SimulatedRun] {
        &self.runs
    }

    /// Number of runs.
    #[inline]
    pub fn n_runs(&self) -> usize {
        self.runs.len()
    }

    /// Number of starting history rows at the head of every run.
    #[inline]
    pub fn history_len(&self) -> usize {
        self.history_len
    }

    /// Base seed the runs were derived from.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Simulated price path of every run.
    ///
    /// With `include_spot` the last observed price leads each path, which is
    /// what path-dependent payoffs averaging from today expect.
    pub fn paths(&self, include_spot: bool) -> Vec<Vec<f64>> {
        let start = if include_spot {
            self.history_len.saturating_sub(1)
        } else {
            self.history_len
        };
        self.runs
            .iter()
            .map(|run| run.frame.prices().get(start..).unwrap_or_default().to_vec())
            .collect()
    }

    /// Last price of every run.
    pub fn terminal_prices(&self) -> Vec<f64> {
        self.runs
            .iter()
            .filter_map(|run| run.frame.last_price())
            .collect()
    }

    /// Writes all runs in long format: `run_id,date,price,<extras>`.
    ///
    /// Without `include_history` only the simulated rows are written.
    /// Missing values are written as empty fields.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError::Data` on I/O or CSV failures.
    pub fn write_long<W: io::Write>(
        &self,
        writer: W,
        include_history: bool,
    ) -> Result<(), SimulationError> {
        let columns: BTreeSet<&str> = self
            .runs
            .iter()
            .flat_map(|run| run.frame.column_names())
            .collect();

        let mut csv = csv::Writer::from_writer(writer);
        let mut header = vec!["run_id", "date", "price"];
        header.extend(columns.iter().copied());
        csv.write_record(&header).map_err(DataError::from)?;

        let skip = if include_history { 0 } else { self.history_len };
        for run in &self.runs {
            let run_id = run.run_id.to_string();
            for (i, (date, price)) in run
                .frame
                .dates()
                .iter()
                .zip(run.frame.prices())
                .enumerate()
                .skip(skip)
            {
                let mut record = vec![run_id.clone(), date.to_string(), price.to_string()];
                for name in &columns {
                    let value = run.frame.column(name).map_or(f64::NAN, |c| c[i]);
                    record.push(if value.is_nan() {
                        String::new()
                    } else {
                        value.to_string()
                    });
                }
                csv.write_record(&record).map_err(DataError::from)?;
            }
        }
        csv.flush().map_err(DataError::from)?;
        Ok(())
    }

    /// Writes [`Self::write_long`] output to `path`.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError::Data` if the file cannot be created or
    /// written.
    pub fn write_csv(&self, path: impl AsRef<Path>, include_history: bool) -> Result<(), SimulationError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(DataError::from)?;
        self.write_long(io::BufWriter::new(file), include_history)?;
        info!(path = %path.display(), n_runs = self.n_runs(), "Wrote simulated runs");
        Ok(())
    }
}
