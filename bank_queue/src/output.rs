//! Export of run results to CSV and JSON for external analysis and plotting.

use std::fs;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::config::SimulationConfig;
use crate::stats::{SimulationResult, Summary};

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct RunReport<'a> {
    config: &'a SimulationConfig,
    arrivals: usize,
    finished_count: usize,
    atm_busy_accum: f64,
    cashier_busy_accum: f64,
    summary: Summary,
}

impl SimulationResult {
    /// One row per monitor sample.
    pub fn write_samples_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), OutputError> {
        let mut wtr = csv::Writer::from_path(path)?;
        for sample in &self.samples {
            wtr.serialize(sample)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// One row per finished customer, in departure order.
    pub fn write_sojourn_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), OutputError> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(["departure", "sojourn_time"])?;
        for (i, sojourn) in self.sojourn_times.iter().enumerate() {
            wtr.write_record(&[i.to_string(), sojourn.to_string()])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// One row per granted request, in grant order.
    pub fn write_wait_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), OutputError> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(["grant", "wait_time"])?;
        for (i, wait) in self.wait_times.iter().enumerate() {
            wtr.write_record(&[i.to_string(), wait.to_string()])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Configuration, counters and summary, without the raw series.
    pub fn write_summary_json<P: AsRef<Path>>(&self, path: P) -> Result<(), OutputError> {
        let report = RunReport {
            config: &self.config,
            arrivals: self.arrivals,
            finished_count: self.finished_count,
            atm_busy_accum: self.atm_busy_accum,
            cashier_busy_accum: self.cashier_busy_accum,
            summary: self.summary(),
        };
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        Ok(())
    }

    /// Write all outputs to a directory
    ///
    /// Creates:
    /// - samples.csv
    /// - sojourn_times.csv
    /// - wait_times.csv
    /// - summary.json
    pub fn write_all<P: AsRef<Path>>(&self, dir: P) -> Result<(), OutputError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        self.write_samples_csv(dir.join("samples.csv"))?;
        self.write_sojourn_csv(dir.join("sojourn_times.csv"))?;
        self.write_wait_csv(dir.join("wait_times.csv"))?;
        self.write_summary_json(dir.join("summary.json"))?;
        Ok(())
    }
}
