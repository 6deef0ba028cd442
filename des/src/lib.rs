//! Discrete-event simulation engine.
//!
//! An [`EventLoop`] owns a time-ordered queue of pending events, an arena of
//! live processes ([`Agent`]s) keyed by [`ProcessId`], and a run-scoped
//! context `C` that is handed to every process when it acts. Each event is
//! addressed to exactly one process; acting on it returns a [`Response`] that
//! may schedule further events, spawn new processes, or finish the caller.
//!
//! Events are ordered by `(due_time, sequence)`. The sequence number is
//! assigned when the event is scheduled, so events due at the same instant
//! run in the order they were scheduled.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

use thiserror::Error;
use tracing::{debug, trace};

/// Stable identifier of a process in the arena.
pub type ProcessId = usize;

struct Event<T> {
    t: f64,
    seq: u64,
    target: ProcessId,
    data: T,
}

impl<T> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.t.total_cmp(&other.t) == Ordering::Equal && self.seq == other.seq
    }
}

impl<T> Eq for Event<T> {}

impl<T> Ord for Event<T> {
    // Reversed so that the max-heap pops the earliest (t, seq) first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .t
            .total_cmp(&self.t)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Who an event scheduled from a [`Response`] is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The process that produced the response.
    Myself,
    /// Another live process.
    Process(ProcessId),
}

/// Fatal breach of the scheduling contract. The run stops at the first one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulingViolation {
    #[error("invalid delay {delay} requested at t={at} for process {process}")]
    InvalidDelay {
        at: f64,
        delay: f64,
        process: ProcessId,
    },
    #[error("event at t={at} addressed to terminated process {process}")]
    TerminatedProcess { at: f64, process: ProcessId },
    #[error("process {process} failed at t={at}: {reason}")]
    Fault {
        at: f64,
        process: ProcessId,
        reason: String,
    },
}

/// Failure reported by a process while acting on an event.
///
/// Any `std::error::Error` converts into a fault, so processes can use `?`
/// on their own error types.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessFault(pub String);

impl ProcessFault {
    pub fn new(reason: impl Into<String>) -> Self {
        ProcessFault(reason.into())
    }
}

impl fmt::Display for ProcessFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<E: std::error::Error> From<E> for ProcessFault {
    fn from(err: E) -> Self {
        ProcessFault(err.to_string())
    }
}

/// What a process wants to happen after acting on an event.
///
/// Delays are relative to the current simulated time and must be `>= 0`.
pub struct Response<T, C> {
    pub events: Vec<(f64, Target, T)>,
    pub agents: Vec<(Box<dyn Agent<T, C>>, T)>,
    pub finished: bool,
}

impl<T, C> Default for Response<T, C> {
    fn default() -> Self {
        Response {
            events: Vec::new(),
            agents: Vec::new(),
            finished: false,
        }
    }
}

impl<T, C> Response<T, C> {
    pub fn new() -> Response<T, C> {
        Response::default()
    }

    /// Wake the calling process again after `delay`.
    pub fn event(delay: f64, data: T) -> Response<T, C> {
        Response::new().after(delay, data)
    }

    /// Wake the calling process once per `(delay, data)` pair, in order.
    pub fn events(events: Vec<(f64, T)>) -> Response<T, C> {
        Response {
            events: events
                .into_iter()
                .map(|(delay, data)| (delay, Target::Myself, data))
                .collect(),
            ..Response::default()
        }
    }

    pub fn after(mut self, delay: f64, data: T) -> Self {
        self.events.push((delay, Target::Myself, data));
        self
    }

    pub fn wake(mut self, process: ProcessId, delay: f64, data: T) -> Self {
        self.events.push((delay, Target::Process(process), data));
        self
    }

    /// Start a new process; `data` is delivered to it at the current instant.
    pub fn spawn(mut self, agent: Box<dyn Agent<T, C>>, data: T) -> Self {
        self.agents.push((agent, data));
        self
    }

    /// Remove the calling process from the arena once the response is applied.
    pub fn finish(mut self) -> Self {
        self.finished = true;
        self
    }
}

/// A suspendable unit of simulation logic.
///
/// `act` runs only when an event addressed to `me` is popped; it sees the
/// run-scoped context exclusively for the duration of the call.
pub trait Agent<T, C> {
    fn act(
        &mut self,
        me: ProcessId,
        current_t: f64,
        data: &T,
        ctx: &mut C,
    ) -> Result<Response<T, C>, ProcessFault>;
}

pub struct EventLoop<T, C> {
    queue: BinaryHeap<Event<T>>,
    current_t: f64,
    next_seq: u64,
    next_pid: ProcessId,
    agents: HashMap<ProcessId, Box<dyn Agent<T, C>>>,
    ctx: C,
}

impl<T, C> EventLoop<T, C> {
    pub fn new(ctx: C) -> EventLoop<T, C> {
        EventLoop {
            queue: BinaryHeap::new(),
            current_t: 0.0,
            next_seq: 0,
            next_pid: 0,
            agents: HashMap::new(),
            ctx,
        }
    }

    /// Add a process to the arena and deliver `data` to it at the current time.
    pub fn spawn(&mut self, agent: Box<dyn Agent<T, C>>, data: T) -> ProcessId {
        let pid = self.next_pid;
        self.next_pid += 1;
        self.agents.insert(pid, agent);
        let seq = self.next_sequence();
        self.queue.push(Event {
            t: self.current_t,
            seq,
            target: pid,
            data,
        });
        debug!(t = self.current_t, process = pid, "spawned process");
        pid
    }

    /// Schedule `data` for `target` at `now + delay`.
    pub fn schedule(
        &mut self,
        delay: f64,
        target: ProcessId,
        data: T,
    ) -> Result<(), SchedulingViolation> {
        if !(delay >= 0.0) {
            return Err(SchedulingViolation::InvalidDelay {
                at: self.current_t,
                delay,
                process: target,
            });
        }
        let seq = self.next_sequence();
        self.queue.push(Event {
            t: self.current_t + delay,
            seq,
            target,
            data,
        });
        Ok(())
    }

    /// Process events strictly before `until`.
    ///
    /// Returns the number of events dispatched. An empty queue ends the run
    /// early without error; events at or beyond `until` stay queued.
    pub fn run(&mut self, until: f64) -> Result<usize, SchedulingViolation> {
        let mut dispatched = 0;
        while self.queue.peek().is_some_and(|next| next.t < until) {
            if let Some(event) = self.queue.pop() {
                self.dispatch(event)?;
                dispatched += 1;
            }
        }
        Ok(dispatched)
    }

    fn dispatch(&mut self, event: Event<T>) -> Result<(), SchedulingViolation> {
        self.current_t = event.t;
        let pid = event.target;
        trace!(t = event.t, seq = event.seq, process = pid, "dispatch");

        let agent = self
            .agents
            .get_mut(&pid)
            .ok_or(SchedulingViolation::TerminatedProcess {
                at: event.t,
                process: pid,
            })?;
        let response = agent
            .act(pid, event.t, &event.data, &mut self.ctx)
            .map_err(|fault| SchedulingViolation::Fault {
                at: event.t,
                process: pid,
                reason: fault.0,
            })?;
        self.apply(pid, response)
    }

    fn apply(&mut self, pid: ProcessId, response: Response<T, C>) -> Result<(), SchedulingViolation> {
        let Response {
            events,
            agents,
            finished,
        } = response;

        for (delay, target, data) in events {
            let target = match target {
                Target::Myself => pid,
                Target::Process(other) => other,
            };
            self.schedule(delay, target, data)?;
        }
        for (agent, data) in agents {
            self.spawn(agent, data);
        }
        if finished {
            self.agents.remove(&pid);
            debug!(t = self.current_t, process = pid, "process finished");
        }
        Ok(())
    }

    fn next_sequence(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    pub fn current_t(&self) -> f64 {
        self.current_t
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn active_processes(&self) -> usize {
        self.agents.len()
    }

    pub fn is_active(&self, pid: ProcessId) -> bool {
        self.agents.contains_key(&pid)
    }

    pub fn context(&self) -> &C {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    pub fn into_context(self) -> C {
        self.ctx
    }
}
