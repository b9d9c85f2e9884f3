//! Per-link retry and latency counters

use std::time::Duration;

use super::Fault;

const NANOSECONDS_PER_MICROSECOND: u128 = 1_000;

/// Per-link counters.
///
/// A link is driven through `&mut self`, so plain integers are enough.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStats {
    /// Calls that reached the bus
    pub exchanges: u64,
    /// Calls that ended with a validated reply, or a clean write when none was expected
    pub completed: u64,
    /// Attempts across all calls, first tries included
    pub attempts: u64,
    /// Attempts after the first within a call
    pub retries: u64,
    /// Faults that were timeouts
    pub timeouts: u64,
    /// Faults from reply validation
    pub framing_faults: u64,
    /// Partial writes, short reads and echo mismatches
    pub line_faults: u64,
    /// Valid replies carrying error flags
    pub actuator_errors: u64,
    /// Calls that ran out of attempts or time
    pub exhausted: u64,
    /// Calls aborted by an unrecoverable channel error
    pub fatal_errors: u64,
    /// Sum of completed exchange durations
    pub latency_total_ns: u64,
    /// Longest completed exchange
    pub latency_max_ns: u64,
}

impl LinkStats {
    pub(crate) fn record_fault(&mut self, fault: &Fault) {
        match fault {
            Fault::Timeout { .. } => self.timeouts += 1,
            Fault::Protocol(_) => self.framing_faults += 1,
            Fault::ShortRead { .. } | Fault::PartialWrite { .. } | Fault::EchoMismatch => {
                self.line_faults += 1;
            }
        }
    }

    pub(crate) fn record_completed(&mut self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.completed += 1;
        self.latency_total_ns = self.latency_total_ns.saturating_add(nanos);
        self.latency_max_ns = self.latency_max_ns.max(nanos);
    }

    /// Average completed exchange latency in microseconds.
    #[must_use]
    pub fn avg_latency_us(&self) -> Option<u64> {
        if self.completed == 0 {
            return None;
        }
        let average = u128::from(self.latency_total_ns)
            / (u128::from(self.completed) * NANOSECONDS_PER_MICROSECOND);
        Some(u64::try_from(average).unwrap_or(u64::MAX))
    }

    /// Fraction of attempts that were retries
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn retry_ratio(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.retries as f64 / self.attempts as f64
        }
    }
}
