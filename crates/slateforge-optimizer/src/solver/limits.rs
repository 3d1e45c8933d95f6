// Per-solve search budget: wall-clock and node limits.

use std::time::{Duration, Instant};

/// Nodes between clock reads.
const TIME_CHECK_INTERVAL: u64 = 1024;

/// Budget for a single solve call. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverLimits {
    pub time_limit: Option<Duration>,
    pub node_limit: Option<u64>,
}

impl SolverLimits {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_node_limit(mut self, limit: u64) -> Self {
        self.node_limit = Some(limit);
        self
    }
}

/// Tracks a running solve against its limits.
///
/// The clock is only read every `TIME_CHECK_INTERVAL` calls, so a solve may
/// overrun its time limit by that many nodes.
#[derive(Debug)]
pub(crate) struct LimitTracker {
    limits: SolverLimits,
    start: Instant,
    since_last_check: u64,
}

impl LimitTracker {
    pub(crate) fn start(limits: SolverLimits) -> Self {
        LimitTracker {
            limits,
            start: Instant::now(),
            since_last_check: 0,
        }
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Returns the abort reason once a limit has been crossed.
    pub(crate) fn check(&mut self, nodes_explored: u64) -> Option<String> {
        if let Some(limit) = self.limits.node_limit {
            if nodes_explored >= limit {
                return Some(format!("node limit of {limit} reached"));
            }
        }

        let time_limit = self.limits.time_limit?;
        self.since_last_check += 1;
        if self.since_last_check < TIME_CHECK_INTERVAL {
            return None;
        }
        self.since_last_check = 0;
        if self.start.elapsed() > time_limit {
            return Some(format!("time limit of {time_limit:?} exceeded"));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_never_aborts() {
        let mut tracker = LimitTracker::start(SolverLimits::unlimited());
        for nodes in 0..10_000 {
            assert!(tracker.check(nodes).is_none());
        }
    }

    #[test]
    fn node_limit_aborts_at_threshold() {
        let mut tracker = LimitTracker::start(SolverLimits::unlimited().with_node_limit(5));
        assert!(tracker.check(4).is_none());
        let reason = tracker.check(5).expect("limit reached");
        assert!(reason.contains("node limit"));
    }

    #[test]
    fn zero_time_limit_aborts_after_check_interval() {
        let mut tracker =
            LimitTracker::start(SolverLimits::unlimited().with_time_limit(Duration::ZERO));
        std::thread::sleep(Duration::from_millis(1));
        let mut reason = None;
        for nodes in 0..=TIME_CHECK_INTERVAL {
            reason = tracker.check(nodes);
            if reason.is_some() {
                break;
            }
        }
        assert!(reason.expect("time limit hit").contains("time limit"));
    }
}
