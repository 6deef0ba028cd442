use des::{Agent, ProcessFault, ProcessId};
use tracing::debug;

use crate::context::RunContext;
use crate::customer::Customer;
use crate::{Event, Reply};

/// Poisson arrival process. Never finishes; the horizon stops it.
#[derive(Default)]
pub struct ArrivalGenerator {
    spawned: usize,
}

impl ArrivalGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawned(&self) -> usize {
        self.spawned
    }
}

impl Agent<Event, RunContext> for ArrivalGenerator {
    fn act(
        &mut self,
        me: ProcessId,
        current_t: f64,
        data: &Event,
        ctx: &mut RunContext,
    ) -> Result<Reply, ProcessFault> {
        match data {
            Event::Start => Ok(Reply::event(ctx.variates.interarrival(), Event::Arrival)),
            Event::Arrival => {
                self.spawned += 1;
                ctx.stats.record_arrival();
                debug!(t = current_t, arrivals = self.spawned, "customer arrived");
                Ok(Reply::event(ctx.variates.interarrival(), Event::Arrival)
                    .spawn(Box::new(Customer::new(current_t)), Event::Start))
            }
            other => Err(ProcessFault::new(format!(
                "arrival generator {me} cannot handle {other:?}"
            ))),
        }
    }
}
