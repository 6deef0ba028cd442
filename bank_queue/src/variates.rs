//! Random variates for arrivals, service times and routing.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Triangular};

use crate::config::{ConfigError, SimulationConfig, TriangularParams};
use crate::Station;

/// Owns the run's random stream and the distributions drawn from it.
pub struct RandomVariateSource {
    rng: StdRng,
    interarrival: Exp<f64>,
    atm_service: Triangular<f64>,
    cashier_service: Triangular<f64>,
}

impl RandomVariateSource {
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let interarrival = Exp::new(config.arrival_rate).map_err(|_| ConfigError::NonPositive {
            field: "arrival_rate",
            value: config.arrival_rate,
        })?;

        Ok(RandomVariateSource {
            rng,
            interarrival,
            atm_service: triangular("atm_service", config.atm_service)?,
            cashier_service: triangular("cashier_service", config.cashier_service)?,
        })
    }

    /// Gap until the next arrival.
    pub fn interarrival(&mut self) -> f64 {
        self.interarrival.sample(&mut self.rng)
    }

    pub fn service_time(&mut self, station: Station) -> f64 {
        match station {
            Station::Atm => self.atm_service.sample(&mut self.rng),
            Station::Cashier => self.cashier_service.sample(&mut self.rng),
        }
    }

    /// Bernoulli draw; `p` must already be validated to lie in `[0, 1]`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.random_bool(p)
    }
}

fn triangular(field: &'static str, params: TriangularParams) -> Result<Triangular<f64>, ConfigError> {
    Triangular::new(params.low, params.high, params.mode).map_err(|_| {
        ConfigError::MalformedTriangular {
            field,
            low: params.low,
            mode: params.mode,
            high: params.high,
        }
    })
}
