//! Coordinator counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Coordinator metrics for observability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorMetrics {
    pub participants: usize,
    pub rounds: u64,
    pub commits: u64,
    pub aborts: u64,
    #[serde(rename = "vote-timeouts")]
    pub vote_timeouts: u64,
    #[serde(rename = "transport-failures")]
    pub transport_failures: u64,
    #[serde(rename = "broadcast-failures")]
    pub broadcast_failures: u64,
}

/// Live counters, updated without taking the membership lock
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub rounds: AtomicU64,
    pub commits: AtomicU64,
    pub aborts: AtomicU64,
    pub vote_timeouts: AtomicU64,
    pub transport_failures: AtomicU64,
    pub broadcast_failures: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self, participants: usize) -> CoordinatorMetrics {
        CoordinatorMetrics {
            participants,
            rounds: self.rounds.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
            vote_timeouts: self.vote_timeouts.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            broadcast_failures: self.broadcast_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let counters = Counters::default();
        Counters::bump(&counters.rounds);
        Counters::bump(&counters.commits);
        Counters::add(&counters.broadcast_failures, 3);

        let metrics = counters.snapshot(5);
        assert_eq!(metrics.participants, 5);
        assert_eq!(metrics.rounds, 1);
        assert_eq!(metrics.commits, 1);
        assert_eq!(metrics.aborts, 0);
        assert_eq!(metrics.broadcast_failures, 3);
    }

    #[test]
    fn test_metrics_serialization() {
        let json = serde_json::to_string(&CoordinatorMetrics::default()).unwrap();
        assert!(json.contains("vote-timeouts"));
        assert!(json.contains("transport-failures"));
    }
}
