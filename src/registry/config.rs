//! Hub configuration

use std::time::Duration;

/// Default interval between snapshot writes to each subscriber
pub const DEFAULT_STREAM_INTERVAL: Duration = Duration::from_millis(10);

/// Default bound on how long a replaced session may take to stop
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Default number of notices queued per subscriber
pub const DEFAULT_NOTICE_CAPACITY: usize = 16;

/// Tunables for the telemetry hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Interval between snapshot writes on each subscriber connection
    pub stream_interval: Duration,

    /// Time a replaced session gets to exit before its task is aborted
    pub stop_timeout: Duration,

    /// Per-subscriber notice queue capacity
    pub notice_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            stream_interval: DEFAULT_STREAM_INTERVAL,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            notice_capacity: DEFAULT_NOTICE_CAPACITY,
        }
    }
}

impl HubConfig {
    /// Set the stream interval
    pub fn stream_interval(mut self, interval: Duration) -> Self {
        self.stream_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the session stop timeout
    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Set the per-subscriber notice capacity
    pub fn notice_capacity(mut self, capacity: usize) -> Self {
        self.notice_capacity = capacity.max(1);
        self
    }
}
