//! Subscriber state machine
//!
//! Tracks a subscriber connection from admission to close.

use std::time::{Duration, Instant};

/// Subscriber lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberPhase {
    /// Added to the subscriber set, nothing written yet
    Admitted,
    /// Snapshots are being written
    Streaming,
    /// Connection closed and subscriber removed (terminal)
    Closed,
}

/// Why a subscriber stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// A write to the connection failed
    WriteFailed(String),
    /// The peer closed the connection
    PeerClosed,
    /// The hub dropped the subscriber (failed notice or shutdown)
    Evicted,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::WriteFailed(e) => write!(f, "write failed: {}", e),
            CloseReason::PeerClosed => write!(f, "peer closed"),
            CloseReason::Evicted => write!(f, "evicted by hub"),
        }
    }
}

/// Per-subscriber state
#[derive(Debug)]
pub struct SubscriberState {
    /// Current phase
    pub phase: SubscriberPhase,

    /// Admission time
    pub admitted_at: Instant,

    /// Snapshots written
    pub snapshots_sent: u64,

    /// Notices written
    pub notices_sent: u64,

    /// Reason the stream ended, once closed
    pub close_reason: Option<CloseReason>,
}

impl SubscriberState {
    /// Create state for a freshly admitted subscriber
    pub fn new() -> Self {
        Self {
            phase: SubscriberPhase::Admitted,
            admitted_at: Instant::now(),
            snapshots_sent: 0,
            notices_sent: 0,
            close_reason: None,
        }
    }

    /// Begin streaming
    pub fn start_streaming(&mut self) {
        if self.phase == SubscriberPhase::Admitted {
            self.phase = SubscriberPhase::Streaming;
        }
    }

    /// Enter the terminal phase
    ///
    /// The first reason wins; later calls are ignored.
    pub fn close(&mut self, reason: CloseReason) {
        if self.phase != SubscriberPhase::Closed {
            self.phase = SubscriberPhase::Closed;
            self.close_reason = Some(reason);
        }
    }

    /// Time since admission
    pub fn duration(&self) -> Duration {
        self.admitted_at.elapsed()
    }
}

impl Default for SubscriberState {
    fn default() -> Self {
        Self::new()
    }
}
