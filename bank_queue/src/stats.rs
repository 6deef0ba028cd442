//! Accumulators filled during a run and the read-only result built from them.

use serde::Serialize;

use crate::config::SimulationConfig;
use crate::resource::Resource;
use crate::Station;

/// Instantaneous snapshot of both resources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleRecord {
    pub timestamp: f64,
    pub atm_queue_len: usize,
    pub cashier_queue_len: usize,
    pub atm_in_service: usize,
    pub cashier_in_service: usize,
}

impl SampleRecord {
    pub fn capture(timestamp: f64, atm: &Resource, cashiers: &Resource) -> Self {
        SampleRecord {
            timestamp,
            atm_queue_len: atm.queue_len(),
            cashier_queue_len: cashiers.queue_len(),
            atm_in_service: atm.in_service(),
            cashier_in_service: cashiers.in_service(),
        }
    }

    /// Customers queued or in service anywhere in the bank.
    pub fn in_system(&self) -> usize {
        self.atm_queue_len + self.cashier_queue_len + self.atm_in_service + self.cashier_in_service
    }
}

/// Append-only accumulators owned by the run context.
#[derive(Debug, Default)]
pub struct StatisticsCollector {
    sojourn_times: Vec<f64>,
    wait_times: Vec<f64>,
    atm_busy_accum: f64,
    cashier_busy_accum: f64,
    finished_count: usize,
    arrivals: usize,
    samples: Vec<SampleRecord>,
}

impl StatisticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_arrival(&mut self) {
        self.arrivals += 1;
    }

    pub fn record_wait(&mut self, wait: f64) {
        self.wait_times.push(wait);
    }

    pub fn record_busy(&mut self, station: Station, held: f64) {
        match station {
            Station::Atm => self.atm_busy_accum += held,
            Station::Cashier => self.cashier_busy_accum += held,
        }
    }

    pub fn record_departure(&mut self, sojourn: f64) {
        self.sojourn_times.push(sojourn);
        self.finished_count += 1;
    }

    pub fn record_sample(&mut self, record: SampleRecord) {
        self.samples.push(record);
    }

    pub fn sojourn_times(&self) -> &[f64] {
        &self.sojourn_times
    }

    pub fn wait_times(&self) -> &[f64] {
        &self.wait_times
    }

    pub fn samples(&self) -> &[SampleRecord] {
        &self.samples
    }

    pub fn busy_time(&self, station: Station) -> f64 {
        match station {
            Station::Atm => self.atm_busy_accum,
            Station::Cashier => self.cashier_busy_accum,
        }
    }

    pub fn finished_count(&self) -> usize {
        self.finished_count
    }

    pub fn arrivals(&self) -> usize {
        self.arrivals
    }

    /// Freeze the accumulators. Nothing can be recorded afterwards.
    pub fn into_result(self, config: &SimulationConfig) -> SimulationResult {
        SimulationResult {
            config: config.clone(),
            arrivals: self.arrivals,
            finished_count: self.finished_count,
            sojourn_times: self.sojourn_times,
            wait_times: self.wait_times,
            atm_busy_accum: self.atm_busy_accum,
            cashier_busy_accum: self.cashier_busy_accum,
            samples: self.samples,
        }
    }
}

/// Everything a run produced, for display and analysis.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub config: SimulationConfig,
    pub arrivals: usize,
    pub finished_count: usize,
    pub sojourn_times: Vec<f64>,
    pub wait_times: Vec<f64>,
    pub atm_busy_accum: f64,
    pub cashier_busy_accum: f64,
    pub samples: Vec<SampleRecord>,
}

/// Headline figures of a run with at least one finished customer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub finished_count: usize,
    pub mean_sojourn: f64,
    pub median_sojourn: f64,
    pub p95_sojourn: f64,
    pub mean_wait: f64,
    pub p95_wait: f64,
    pub atm_utilization: f64,
    pub cashier_utilization: f64,
    pub mean_atm_queue: f64,
    pub mean_cashier_queue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Summary {
    /// No customer finished, so means and ratios are undefined.
    Empty { arrivals: usize },
    Complete(Kpis),
}

impl SimulationResult {
    pub fn is_empty(&self) -> bool {
        self.finished_count == 0
    }

    /// Customers still queued or in service when the horizon was reached.
    pub fn in_flight(&self) -> usize {
        self.arrivals.saturating_sub(self.finished_count)
    }

    pub fn mean_sojourn(&self) -> Option<f64> {
        mean(&self.sojourn_times)
    }

    pub fn mean_wait(&self) -> Option<f64> {
        mean(&self.wait_times)
    }

    /// `q` in `[0, 100]`, linearly interpolated between order statistics.
    pub fn sojourn_percentile(&self, q: f64) -> Option<f64> {
        percentile(&self.sojourn_times, q)
    }

    pub fn wait_percentile(&self, q: f64) -> Option<f64> {
        percentile(&self.wait_times, q)
    }

    pub fn busy_time(&self, station: Station) -> f64 {
        match station {
            Station::Atm => self.atm_busy_accum,
            Station::Cashier => self.cashier_busy_accum,
        }
    }

    pub fn capacity(&self, station: Station) -> usize {
        match station {
            Station::Atm => self.config.num_atms,
            Station::Cashier => self.config.num_cashiers,
        }
    }

    /// Completed service time over the total server time available.
    ///
    /// `None` when nobody finished, like every other ratio of an empty run.
    pub fn utilization(&self, station: Station) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.busy_time(station) / (self.config.horizon * self.capacity(station) as f64))
    }

    pub fn atm_utilization(&self) -> Option<f64> {
        self.utilization(Station::Atm)
    }

    pub fn cashier_utilization(&self) -> Option<f64> {
        self.utilization(Station::Cashier)
    }

    pub fn mean_atm_queue(&self) -> Option<f64> {
        self.mean_sampled(|s| s.atm_queue_len)
    }

    pub fn mean_cashier_queue(&self) -> Option<f64> {
        self.mean_sampled(|s| s.cashier_queue_len)
    }

    pub fn mean_in_system(&self) -> Option<f64> {
        self.mean_sampled(|s| s.in_system())
    }

    /// Mean busy cashiers across samples divided by the pool size.
    pub fn sampled_cashier_utilization(&self) -> Option<f64> {
        self.mean_sampled(|s| s.cashier_in_service)
            .map(|busy| busy / self.config.num_cashiers as f64)
    }

    fn mean_sampled(&self, f: impl Fn(&SampleRecord) -> usize) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let total: usize = self.samples.iter().map(f).sum();
        Some(total as f64 / self.samples.len() as f64)
    }

    pub fn summary(&self) -> Summary {
        match self.kpis() {
            Some(kpis) => Summary::Complete(kpis),
            None => Summary::Empty {
                arrivals: self.arrivals,
            },
        }
    }

    fn kpis(&self) -> Option<Kpis> {
        if self.is_empty() {
            return None;
        }
        Some(Kpis {
            finished_count: self.finished_count,
            mean_sojourn: self.mean_sojourn()?,
            median_sojourn: self.sojourn_percentile(50.0)?,
            p95_sojourn: self.sojourn_percentile(95.0)?,
            mean_wait: self.mean_wait()?,
            p95_wait: self.wait_percentile(95.0)?,
            atm_utilization: self.atm_utilization()?,
            cashier_utilization: self.cashier_utilization()?,
            mean_atm_queue: self.mean_atm_queue()?,
            mean_cashier_queue: self.mean_cashier_queue()?,
        })
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=100.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64))
}
