//! Run-scoped state shared by every process in one simulation.

use crate::config::{ConfigError, SimulationConfig, WaitAccounting};
use crate::resource::Resource;
use crate::stats::StatisticsCollector;
use crate::variates::RandomVariateSource;
use crate::Station;

/// Routing and accounting rules applied to every customer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Routing {
    pub p_atm_first: f64,
    pub p_secondary_cashier: f64,
    pub wait_accounting: WaitAccounting,
}

impl From<&SimulationConfig> for Routing {
    fn from(config: &SimulationConfig) -> Self {
        Routing {
            p_atm_first: config.p_atm_first,
            p_secondary_cashier: config.p_secondary_cashier,
            wait_accounting: config.wait_accounting,
        }
    }
}

pub struct RunContext {
    pub atm: Resource,
    pub cashiers: Resource,
    pub stats: StatisticsCollector,
    pub variates: RandomVariateSource,
    pub routing: Routing,
}

impl RunContext {
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigError> {
        Ok(RunContext {
            atm: Resource::new(Station::Atm, config.num_atms),
            cashiers: Resource::new(Station::Cashier, config.num_cashiers),
            stats: StatisticsCollector::new(),
            variates: RandomVariateSource::new(config)?,
            routing: Routing::from(config),
        })
    }

    pub fn resource(&self, station: Station) -> &Resource {
        match station {
            Station::Atm => &self.atm,
            Station::Cashier => &self.cashiers,
        }
    }

    pub fn resource_mut(&mut self, station: Station) -> &mut Resource {
        match station {
            Station::Atm => &mut self.atm,
            Station::Cashier => &mut self.cashiers,
        }
    }
}
