//! Run parameters, TOML loading and validation.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on expected arrivals, and on monitor samples, in one run.
/// Beyond it the clock can stall on increments lost to `f64` rounding.
pub const MAX_EVENTS_PER_KIND: f64 = 1e7;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be a positive finite number, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} must be at least 1")]
    ZeroCapacity { field: &'static str },
    #[error("{field} must satisfy 0 <= low <= mode <= high, got ({low}, {mode}, {high})")]
    MalformedTriangular {
        field: &'static str,
        low: f64,
        mode: f64,
        high: f64,
    },
    #[error("{field} would need about {expected:.0} events over the horizon, limit is {limit}")]
    ExcessiveWorkload {
        field: &'static str,
        expected: f64,
        limit: f64,
    },
    #[error("{field} must be a probability in [0, 1], got {value}")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Minimum, most likely and maximum service time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriangularParams {
    pub low: f64,
    pub mode: f64,
    pub high: f64,
}

impl TriangularParams {
    pub const fn new(low: f64, mode: f64, high: f64) -> Self {
        TriangularParams { low, mode, high }
    }

    pub fn mean(&self) -> f64 {
        (self.low + self.mode + self.high) / 3.0
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        let ordered = self.low >= 0.0 && self.low <= self.mode && self.mode <= self.high;
        if !ordered || !self.high.is_finite() {
            return Err(ConfigError::MalformedTriangular {
                field,
                low: self.low,
                mode: self.mode,
                high: self.high,
            });
        }
        Ok(())
    }
}

/// How a wait is measured when a request is granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitAccounting {
    /// From the moment the customer joined this resource's queue.
    #[default]
    PerVisit,
    /// From the customer's arrival at the bank, so a cashier wait after an
    /// ATM visit includes the time spent at the ATM.
    SinceArrival,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Exclusive end of simulated time.
    pub horizon: f64,
    #[serde(default = "default_num_atms")]
    pub num_atms: usize,
    pub num_cashiers: usize,
    /// Customers per time unit.
    pub arrival_rate: f64,
    pub atm_service: TriangularParams,
    pub cashier_service: TriangularParams,
    /// Probability that a customer uses the ATM before anything else.
    pub p_atm_first: f64,
    /// Probability that an ATM customer also visits a cashier afterwards.
    pub p_secondary_cashier: f64,
    #[serde(default = "default_sample_interval")]
    pub sample_interval: f64,
    #[serde(default)]
    pub wait_accounting: WaitAccounting,
    /// Unseeded runs draw their random stream from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_num_atms() -> usize {
    1
}

fn default_sample_interval() -> f64 {
    1.0
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::baseline()
    }
}

impl SimulationConfig {
    pub fn new(
        horizon: f64,
        num_cashiers: usize,
        arrival_rate: f64,
        atm_service: TriangularParams,
        cashier_service: TriangularParams,
        p_atm_first: f64,
        p_secondary_cashier: f64,
    ) -> Self {
        SimulationConfig {
            horizon,
            num_atms: default_num_atms(),
            num_cashiers,
            arrival_rate,
            atm_service,
            cashier_service,
            p_atm_first,
            p_secondary_cashier,
            sample_interval: default_sample_interval(),
            wait_accounting: WaitAccounting::default(),
            seed: None,
        }
    }

    /// Half the customers start at the ATM, 30% of those continue to a
    /// cashier; cashier service is slow with a long tail.
    pub fn baseline() -> Self {
        Self::new(
            50_000.0,
            5,
            0.75,
            TriangularParams::new(1.0, 2.0, 4.0),
            TriangularParams::new(3.0, 5.0, 20.0),
            0.5,
            0.3,
        )
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_num_atms(mut self, num_atms: usize) -> Self {
        self.num_atms = num_atms;
        self
    }

    pub fn with_sample_interval(mut self, sample_interval: f64) -> Self {
        self.sample_interval = sample_interval;
        self
    }

    pub fn with_wait_accounting(mut self, wait_accounting: WaitAccounting) -> Self {
        self.wait_accounting = wait_accounting;
        self
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Reject anything that would make the run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("horizon", self.horizon)?;
        positive("arrival_rate", self.arrival_rate)?;
        positive("sample_interval", self.sample_interval)?;
        bounded("arrival_rate", self.horizon * self.arrival_rate)?;
        bounded("sample_interval", self.horizon / self.sample_interval)?;
        if self.num_atms == 0 {
            return Err(ConfigError::ZeroCapacity { field: "num_atms" });
        }
        if self.num_cashiers == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "num_cashiers",
            });
        }
        self.atm_service.validate("atm_service")?;
        self.cashier_service.validate("cashier_service")?;
        probability("p_atm_first", self.p_atm_first)?;
        probability("p_secondary_cashier", self.p_secondary_cashier)?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn bounded(field: &'static str, expected: f64) -> Result<(), ConfigError> {
    if expected <= MAX_EVENTS_PER_KIND {
        Ok(())
    } else {
        Err(ConfigError::ExcessiveWorkload {
            field,
            expected,
            limit: MAX_EVENTS_PER_KIND,
        })
    }
}

fn probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ProbabilityOutOfRange { field, value })
    }
}
