//! Capacity-limited server with a FIFO waiting line.

use std::collections::{HashSet, VecDeque};

use des::ProcessId;
use thiserror::Error;

use crate::Station;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("process {process} released the {station} without holding it")]
    NotHolder { station: Station, process: ProcessId },
    #[error("process {process} requested the {station} twice")]
    DuplicateRequest { station: Station, process: ProcessId },
}

/// Outcome of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Granted,
    /// Zero-based position in the waiting line.
    Queued { position: usize },
}

/// A waiter admitted on release. The releasing process is responsible for
/// waking it through the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grant {
    pub process: ProcessId,
    pub requested_at: f64,
}

/// Lifetime counters for one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceStats {
    pub total_requests: usize,
    pub total_granted: usize,
    pub total_queued: usize,
    pub total_released: usize,
    pub peak_queue_length: usize,
}

#[derive(Debug, Clone)]
pub struct Resource {
    station: Station,
    capacity: usize,
    holders: HashSet<ProcessId>,
    waiting: VecDeque<(ProcessId, f64)>,
    stats: ResourceStats,
}

impl Resource {
    pub fn new(station: Station, capacity: usize) -> Resource {
        Resource {
            station,
            capacity,
            holders: HashSet::with_capacity(capacity),
            waiting: VecDeque::new(),
            stats: ResourceStats::default(),
        }
    }

    /// Admit `process` if a server is free, otherwise append it to the line.
    pub fn request(&mut self, process: ProcessId, now: f64) -> Result<Admission, ResourceError> {
        if self.holders.contains(&process) || self.waiting.iter().any(|(p, _)| *p == process) {
            return Err(ResourceError::DuplicateRequest {
                station: self.station,
                process,
            });
        }
        self.stats.total_requests += 1;

        if self.holders.len() < self.capacity {
            self.admit(process);
            Ok(Admission::Granted)
        } else {
            self.waiting.push_back((process, now));
            self.stats.total_queued += 1;
            self.stats.peak_queue_length = self.stats.peak_queue_length.max(self.waiting.len());
            Ok(Admission::Queued {
                position: self.waiting.len() - 1,
            })
        }
    }

    /// Free the server held by `process` and hand it to the head of the line.
    pub fn release(&mut self, process: ProcessId) -> Result<Option<Grant>, ResourceError> {
        if !self.holders.remove(&process) {
            return Err(ResourceError::NotHolder {
                station: self.station,
                process,
            });
        }
        self.stats.total_released += 1;

        Ok(self.waiting.pop_front().map(|(next, requested_at)| {
            self.admit(next);
            Grant {
                process: next,
                requested_at,
            }
        }))
    }

    fn admit(&mut self, process: ProcessId) {
        self.holders.insert(process);
        self.stats.total_granted += 1;
        debug_assert!(
            self.holders.len() <= self.capacity,
            "{} over capacity",
            self.station
        );
    }

    pub fn station(&self) -> Station {
        self.station
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn queue_len(&self) -> usize {
        self.waiting.len()
    }

    pub fn in_service(&self) -> usize {
        self.holders.len()
    }

    pub fn is_at_capacity(&self) -> bool {
        self.holders.len() == self.capacity
    }

    pub fn holds(&self, process: ProcessId) -> bool {
        self.holders.contains(&process)
    }

    pub fn stats(&self) -> &ResourceStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_while_capacity_remains() {
        let mut resource = Resource::new(Station::Cashier, 2);

        assert_eq!(resource.request(1, 0.0), Ok(Admission::Granted));
        assert_eq!(resource.request(2, 0.5), Ok(Admission::Granted));
        assert_eq!(resource.request(3, 1.0), Ok(Admission::Queued { position: 0 }));

        assert_eq!(resource.in_service(), 2);
        assert_eq!(resource.queue_len(), 1);
        assert!(resource.is_at_capacity());
    }

    #[test]
    fn release_hands_server_to_head_of_line() {
        let mut resource = Resource::new(Station::Atm, 1);
        resource.request(1, 0.0).unwrap();
        resource.request(2, 1.0).unwrap();
        resource.request(3, 2.0).unwrap();

        let grant = resource.release(1).unwrap();

        assert_eq!(
            grant,
            Some(Grant {
                process: 2,
                requested_at: 1.0
            })
        );
        assert!(resource.holds(2));
        assert_eq!(resource.in_service(), 1);
        assert_eq!(resource.queue_len(), 1);
    }

    #[test]
    fn release_without_waiters_frees_a_server() {
        let mut resource = Resource::new(Station::Atm, 1);
        resource.request(1, 0.0).unwrap();

        assert_eq!(resource.release(1), Ok(None));
        assert_eq!(resource.in_service(), 0);
        assert!(!resource.is_at_capacity());
    }

    #[test]
    fn releasing_a_non_holder_is_an_error() {
        let mut resource = Resource::new(Station::Cashier, 1);
        resource.request(1, 0.0).unwrap();
        resource.request(2, 0.0).unwrap();

        assert_eq!(
            resource.release(2),
            Err(ResourceError::NotHolder {
                station: Station::Cashier,
                process: 2
            })
        );
    }

    #[test]
    fn duplicate_requests_are_rejected() {
        let mut resource = Resource::new(Station::Cashier, 1);
        resource.request(1, 0.0).unwrap();
        resource.request(2, 0.0).unwrap();

        assert!(resource.request(1, 1.0).is_err());
        assert!(resource.request(2, 1.0).is_err());
        assert_eq!(resource.stats().total_requests, 2);
    }

    #[test]
    fn counters_track_lifetime_activity() {
        let mut resource = Resource::new(Station::Cashier, 1);
        for p in 0..4 {
            resource.request(p, p as f64).unwrap();
        }
        resource.release(0).unwrap();

        assert_eq!(
            resource.stats(),
            &ResourceStats {
                total_requests: 4,
                total_granted: 2,
                total_queued: 3,
                total_released: 1,
                peak_queue_length: 3,
            }
        );
    }
}
