//! Simulation clock. Advances every registered tick-consumer one minute at a time.
//!
//! The clock never owns its consumers. Registration hands out a
//! [`ConsumerId`]; the consumer itself lives wherever its owner keeps it
//! (a maintenance schedule lives inside its floor). On each
//! [`SimulationClock::advance_one_minute`] the ids are resolved against a
//! [`TickTarget`] in registration order.
//!
//! An id whose consumer no longer exists (for example a maintenance schedule
//! that was replaced) is reported as orphaned and skipped. A consumer that
//! fails its tick is reported as a fault; the remaining consumers still tick.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Handle to a registered tick-consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConsumerId(u64);

impl ConsumerId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A failure while ticking one consumer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickFault {
    #[error("room {room} is no longer on the floor that schedules it")]
    MissingRoom { room: u32 },
}

/// Anything that can resolve consumer ids and tick them.
pub trait TickTarget {
    /// Advance the consumer registered as `id` by one minute.
    ///
    /// Returns `None` when nothing in this target answers to `id`.
    fn tick_consumer(&mut self, id: ConsumerId) -> Option<Result<(), TickFault>>;
}

/// Outcome of one clock step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Minute number this step advanced to (1-based).
    pub minute: u64,
    pub ticked: usize,
    pub orphaned: usize,
    pub faults: Vec<(ConsumerId, TickFault)>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Registry of tick-consumers, owned by the simulation driver.
#[derive(Debug, Clone, Default)]
pub struct SimulationClock {
    consumers: Vec<ConsumerId>,
    next_id: u64,
    minutes: u64,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new consumer and return its handle.
    pub fn register(&mut self) -> ConsumerId {
        let id = ConsumerId(self.next_id);
        self.next_id += 1;
        self.consumers.push(id);
        id
    }

    /// Registered ids in registration order.
    pub fn consumers(&self) -> &[ConsumerId] {
        &self.consumers
    }

    /// Total minutes advanced so far.
    pub fn minutes(&self) -> u64 {
        self.minutes
    }

    /// Tick every registered consumer once, in registration order.
    pub fn advance_one_minute<T: TickTarget + ?Sized>(&mut self, target: &mut T) -> TickReport {
        self.minutes += 1;
        let mut report = TickReport {
            minute: self.minutes,
            ..TickReport::default()
        };
        for &id in &self.consumers {
            match target.tick_consumer(id) {
                Some(Ok(())) => report.ticked += 1,
                Some(Err(fault)) => {
                    log::warn!("minute {}: consumer {} faulted: {}", self.minutes, id.0, fault);
                    report.faults.push((id, fault));
                }
                None => report.orphaned += 1,
            }
        }
        report
    }

    /// Advance `minutes` times, returning one report per step.
    pub fn advance<T: TickTarget + ?Sized>(&mut self, target: &mut T, minutes: u64) -> Vec<TickReport> {
        let mut reports = Vec::with_capacity(minutes as usize);
        for _ in 0..minutes {
            reports.push(self.advance_one_minute(&mut *target));
        }
        reports
    }
}
