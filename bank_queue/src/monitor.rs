use des::{Agent, ProcessFault, ProcessId};

use crate::context::RunContext;
use crate::stats::SampleRecord;
use crate::{Event, Reply};

/// Samples both resources at a fixed period, starting at the first event it
/// receives. Sampling never touches resource capacity.
pub struct Monitor {
    interval: f64,
}

impl Monitor {
    pub fn new(interval: f64) -> Self {
        Monitor { interval }
    }
}

impl Agent<Event, RunContext> for Monitor {
    fn act(
        &mut self,
        me: ProcessId,
        current_t: f64,
        data: &Event,
        ctx: &mut RunContext,
    ) -> Result<Reply, ProcessFault> {
        match data {
            Event::Start | Event::Sample => {
                let record = SampleRecord::capture(current_t, &ctx.atm, &ctx.cashiers);
                ctx.stats.record_sample(record);
                Ok(Reply::event(self.interval, Event::Sample))
            }
            other => Err(ProcessFault::new(format!("monitor {me} cannot handle {other:?}"))),
        }
    }
}
