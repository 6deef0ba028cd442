//! Bank queueing network on top of the `des` engine.
//!
//! Customers arrive as a Poisson process, optionally visit a single ATM,
//! then queue for a pool of cashiers before leaving. Every run owns its
//! resources, random stream and statistics in a [`RunContext`], so
//! independent runs never share state.
//!
//! Processes:
//! - [`ArrivalGenerator`]: sleeps for exponential gaps and spawns customers
//! - [`Customer`]: state machine through ATM and cashier visits
//! - [`Monitor`]: samples queue lengths and in-service counts every interval
//!
//! ```no_run
//! use bank_queue::{run_simulation, SimulationConfig};
//!
//! let config = SimulationConfig::baseline().with_seed(7);
//! let result = run_simulation(&config).expect("valid configuration");
//! println!("{:?}", result.summary());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub mod arrivals;
pub mod config;
pub mod context;
pub mod customer;
pub mod monitor;
pub mod output;
pub mod resource;
pub mod stats;
pub mod variates;

pub use arrivals::ArrivalGenerator;
pub use config::{ConfigError, SimulationConfig, TriangularParams, WaitAccounting};
pub use context::{Routing, RunContext};
pub use customer::{Customer, CustomerState};
pub use monitor::Monitor;
pub use output::OutputError;
pub use resource::{Admission, Grant, Resource, ResourceError, ResourceStats};
pub use stats::{Kpis, SampleRecord, SimulationResult, StatisticsCollector, Summary};
pub use variates::RandomVariateSource;

pub use des::{ProcessId, SchedulingViolation};

/// Response type shared by every process in the bank model.
pub type Reply = des::Response<Event, RunContext>;

/// Messages delivered to processes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// First delivery to a freshly spawned process.
    Start,
    /// Arrival generator wake-up: a customer walks in.
    Arrival,
    /// Monitor wake-up.
    Sample,
    /// The station's resource has admitted the addressed customer.
    Granted(Station),
    /// The addressed customer's service at the station has ended.
    ServiceComplete(Station),
}

/// The two capacity-limited resources in the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Station {
    Atm,
    Cashier,
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Station::Atm => f.write_str("ATM"),
            Station::Cashier => f.write_str("cashier"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("scheduling violation: {0}")]
    Scheduling(#[from] SchedulingViolation),
}

/// Run one independent simulation up to (but excluding) `config.horizon`.
///
/// The configuration is validated before any event executes. Customers still
/// queued or in service at the horizon are not counted as finished.
pub fn run_simulation(config: &SimulationConfig) -> Result<SimulationResult, SimError> {
    config.validate()?;
    let ctx = RunContext::new(config)?;

    let mut event_loop: des::EventLoop<Event, RunContext> = des::EventLoop::new(ctx);
    event_loop.spawn(Box::new(Monitor::new(config.sample_interval)), Event::Start);
    event_loop.spawn(Box::new(ArrivalGenerator::new()), Event::Start);

    info!(
        horizon = config.horizon,
        arrival_rate = config.arrival_rate,
        num_atms = config.num_atms,
        num_cashiers = config.num_cashiers,
        seed = ?config.seed,
        "starting bank simulation"
    );

    let dispatched = event_loop.run(config.horizon)?;
    let result = event_loop.into_context().stats.into_result(config);

    if result.finished_count == 0 {
        warn!(
            horizon = config.horizon,
            arrivals = result.arrivals,
            "no customer finished before the horizon; aggregate statistics are undefined"
        );
    }
    info!(
        events = dispatched,
        arrivals = result.arrivals,
        finished = result.finished_count,
        in_flight = result.in_flight(),
        "simulation complete"
    );

    Ok(result)
}
