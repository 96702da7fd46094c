//! Hub-wide counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Live counters shared by the hub and subscriber tasks
#[derive(Debug)]
pub struct HubStats {
    started_at: Instant,
    reconfigurations: AtomicU64,
    failed_reconfigurations: AtomicU64,
    aborted_sessions: AtomicU64,
    subscribers_admitted: AtomicU64,
    subscribers_rejected: AtomicU64,
    subscribers_removed: AtomicU64,
    notices_sent: AtomicU64,
    snapshots_sent: AtomicU64,
}

impl Default for HubStats {
    fn default() -> Self {
        Self {
            started_at: Instant::now(),
            reconfigurations: AtomicU64::new(0),
            failed_reconfigurations: AtomicU64::new(0),
            aborted_sessions: AtomicU64::new(0),
            subscribers_admitted: AtomicU64::new(0),
            subscribers_rejected: AtomicU64::new(0),
            subscribers_removed: AtomicU64::new(0),
            notices_sent: AtomicU64::new(0),
            snapshots_sent: AtomicU64::new(0),
        }
    }
}

impl HubStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_reconfiguration(&self, ok: bool) {
        if ok {
            self.reconfigurations.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_reconfigurations.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_aborted_session(&self) {
        self.aborted_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_admitted(&self) {
        self.subscribers_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.subscribers_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_removed(&self, count: u64) {
        self.subscribers_removed.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_notice_sent(&self) {
        self.notices_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_snapshot_sent(&self) {
        self.snapshots_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Time since the hub was created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Copy the counters
    pub fn snapshot(&self) -> HubStatsSnapshot {
        HubStatsSnapshot {
            uptime_secs: self.uptime().as_secs(),
            reconfigurations: self.reconfigurations.load(Ordering::Relaxed),
            failed_reconfigurations: self.failed_reconfigurations.load(Ordering::Relaxed),
            aborted_sessions: self.aborted_sessions.load(Ordering::Relaxed),
            subscribers_admitted: self.subscribers_admitted.load(Ordering::Relaxed),
            subscribers_rejected: self.subscribers_rejected.load(Ordering::Relaxed),
            subscribers_removed: self.subscribers_removed.load(Ordering::Relaxed),
            notices_sent: self.notices_sent.load(Ordering::Relaxed),
            snapshots_sent: self.snapshots_sent.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`HubStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HubStatsSnapshot {
    pub uptime_secs: u64,
    pub reconfigurations: u64,
    pub failed_reconfigurations: u64,
    pub aborted_sessions: u64,
    pub subscribers_admitted: u64,
    pub subscribers_rejected: u64,
    pub subscribers_removed: u64,
    pub notices_sent: u64,
    pub snapshots_sent: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_stats_new() {
        let stats = HubStats::new().snapshot();
        assert_eq!(stats.reconfigurations, 0);
        assert_eq!(stats.subscribers_admitted, 0);
        assert_eq!(stats.snapshots_sent, 0);
    }

    #[test]
    fn test_hub_stats_counters() {
        let stats = HubStats::new();
        stats.record_reconfiguration(true);
        stats.record_reconfiguration(false);
        stats.record_admitted();
        stats.record_admitted();
        stats.record_removed(1);
        stats.record_snapshot_sent();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.reconfigurations, 1);
        assert_eq!(snapshot.failed_reconfigurations, 1);
        assert_eq!(snapshot.subscribers_admitted, 2);
        assert_eq!(snapshot.subscribers_removed, 1);
        assert_eq!(snapshot.snapshots_sent, 1);
    }
}
