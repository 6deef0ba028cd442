//! One customer's journey through the bank.
//!
//! The journey is an explicit state machine resumed by the scheduler:
//!
//! ```text
//! Arriving -> WaitingForResource(s) -> InService(s) -> ... -> Done
//! ```
//!
//! A request that is granted on the spot skips `WaitingForResource`. The
//! route (ATM first or straight to a cashier, and whether an ATM visit is
//! followed by a cashier visit) and every service time are drawn when the
//! customer first acts.

use std::collections::VecDeque;

use des::{Agent, ProcessFault, ProcessId};
use tracing::debug;

use crate::config::WaitAccounting;
use crate::context::RunContext;
use crate::resource::Admission;
use crate::{Event, Reply, Station};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CustomerState {
    Arriving,
    WaitingForResource(Station),
    InService(Station),
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Visit {
    station: Station,
    service_time: f64,
}

pub struct Customer {
    arrival_time: f64,
    state: CustomerState,
    itinerary: VecDeque<Visit>,
    current: Option<Visit>,
    requested_at: f64,
}

impl Customer {
    pub fn new(arrival_time: f64) -> Self {
        Customer {
            arrival_time,
            state: CustomerState::Arriving,
            itinerary: VecDeque::new(),
            current: None,
            requested_at: arrival_time,
        }
    }

    pub fn state(&self) -> CustomerState {
        self.state
    }

    pub fn arrival_time(&self) -> f64 {
        self.arrival_time
    }

    fn plan(ctx: &mut RunContext) -> VecDeque<Visit> {
        let routing = ctx.routing;
        let variates = &mut ctx.variates;

        let mut stations = Vec::with_capacity(2);
        if variates.chance(routing.p_atm_first) {
            stations.push(Station::Atm);
            if variates.chance(routing.p_secondary_cashier) {
                stations.push(Station::Cashier);
            }
        } else {
            stations.push(Station::Cashier);
        }

        stations
            .into_iter()
            .map(|station| Visit {
                station,
                service_time: variates.service_time(station),
            })
            .collect()
    }

    /// Request the next resource on the itinerary, or leave the bank.
    fn next_visit(
        &mut self,
        reply: Reply,
        me: ProcessId,
        now: f64,
        ctx: &mut RunContext,
    ) -> Result<Reply, ProcessFault> {
        let Some(visit) = self.itinerary.pop_front() else {
            self.state = CustomerState::Done;
            ctx.stats.record_departure(now - self.arrival_time);
            return Ok(reply.finish());
        };

        self.current = Some(visit);
        self.requested_at = now;
        match ctx.resource_mut(visit.station).request(me, now)? {
            Admission::Granted => Ok(self.begin_service(reply, visit, now, ctx)),
            Admission::Queued { position } => {
                debug!(t = now, customer = me, station = %visit.station, position, "queued");
                self.state = CustomerState::WaitingForResource(visit.station);
                Ok(reply)
            }
        }
    }

    fn begin_service(&mut self, reply: Reply, visit: Visit, now: f64, ctx: &mut RunContext) -> Reply {
        let since = match ctx.routing.wait_accounting {
            WaitAccounting::PerVisit => self.requested_at,
            WaitAccounting::SinceArrival => self.arrival_time,
        };
        ctx.stats.record_wait(now - since);
        self.state = CustomerState::InService(visit.station);
        reply.after(visit.service_time, Event::ServiceComplete(visit.station))
    }

    fn finish_service(
        &mut self,
        me: ProcessId,
        station: Station,
        now: f64,
        ctx: &mut RunContext,
    ) -> Result<Reply, ProcessFault> {
        let visit = self
            .current
            .take()
            .ok_or_else(|| ProcessFault::new(format!("customer {me} finished service it never began")))?;
        ctx.stats.record_busy(station, visit.service_time);

        let mut reply = Reply::new();
        if let Some(grant) = ctx.resource_mut(station).release(me)? {
            debug!(t = now, customer = grant.process, station = %station, "granted on release");
            reply = reply.wake(grant.process, 0.0, Event::Granted(station));
        }
        self.next_visit(reply, me, now, ctx)
    }
}

impl Agent<Event, RunContext> for Customer {
    fn act(
        &mut self,
        me: ProcessId,
        current_t: f64,
        data: &Event,
        ctx: &mut RunContext,
    ) -> Result<Reply, ProcessFault> {
        match (self.state, *data) {
            (CustomerState::Arriving, Event::Start) => {
                self.itinerary = Self::plan(ctx);
                self.next_visit(Reply::new(), me, current_t, ctx)
            }
            (CustomerState::WaitingForResource(waiting), Event::Granted(station)) if waiting == station => {
                let visit = self
                    .current
                    .ok_or_else(|| ProcessFault::new(format!("customer {me} granted with no pending visit")))?;
                Ok(self.begin_service(Reply::new(), visit, current_t, ctx))
            }
            (CustomerState::InService(serving), Event::ServiceComplete(station)) if serving == station => {
                self.finish_service(me, station, current_t, ctx)
            }
            (state, event) => Err(ProcessFault::new(format!(
                "customer {me} in state {state:?} cannot handle {event:?}"
            ))),
        }
    }
}
