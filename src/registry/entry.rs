//! Session and subscriber entries
//!
//! This module defines the per-session and per-subscriber state stored in the hub.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::frame::{Notice, SourceAddress};

/// The active telemetry session
///
/// Owns the spawned run loop; dropping the entry without calling
/// [`stop`](Self::stop) leaves the task detached.
pub struct SessionEntry {
    /// Address the session is bound to
    pub address: SourceAddress,

    /// Generation assigned at creation
    pub generation: u64,

    /// When the session was started
    pub started_at: Instant,

    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// How a session ended when it was stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Run loop exited on its own (stop signal or earlier upstream failure)
    Graceful,
    /// Run loop ignored the stop signal and was aborted
    Aborted,
}

impl SessionEntry {
    pub(super) fn new(
        address: SourceAddress,
        generation: u64,
        shutdown: watch::Sender<bool>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            address,
            generation,
            started_at: Instant::now(),
            shutdown,
            task,
        }
    }

    /// Check if the run loop has already exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the session, waiting at most `timeout` for the run loop to exit
    ///
    /// Consumes the entry, so a session cannot be stopped twice.
    pub(super) async fn stop(self, timeout: Duration) -> StopOutcome {
        let Self {
            address,
            generation,
            shutdown,
            mut task,
            ..
        } = self;

        let _ = shutdown.send(true);

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(_) => StopOutcome::Graceful,
            Err(_) => {
                tracing::warn!(
                    source = %address,
                    generation = generation,
                    timeout_ms = timeout.as_millis() as u64,
                    "Session did not stop in time, aborting"
                );
                task.abort();
                let _ = task.await;
                StopOutcome::Aborted
            }
        }
    }
}

/// Unique identity of a subscriber connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriberId(pub u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entry for a single subscriber in the hub
#[derive(Debug, Clone)]
pub struct SubscriberEntry {
    /// Subscriber identity
    pub id: SubscriberId,

    /// Remote peer address, if known
    pub peer_addr: Option<SocketAddr>,

    /// When the subscriber was admitted
    pub connected_at: Instant,

    notices: mpsc::Sender<Notice>,
}

/// Why a notice could not be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyError {
    /// The subscriber's queue is full
    Full,
    /// The subscriber's stream has ended
    Closed,
}

impl SubscriberEntry {
    pub(super) fn new(
        id: SubscriberId,
        peer_addr: Option<SocketAddr>,
        notices: mpsc::Sender<Notice>,
    ) -> Self {
        Self {
            id,
            peer_addr,
            connected_at: Instant::now(),
            notices,
        }
    }

    /// Queue a notice without waiting
    ///
    /// The socket write happens later in the subscriber's own task.
    pub fn notify(&self, notice: Notice) -> Result<(), NotifyError> {
        self.notices.try_send(notice).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => NotifyError::Full,
            mpsc::error::TrySendError::Closed(_) => NotifyError::Closed,
        })
    }

    /// Public view of this entry
    pub fn info(&self) -> SubscriberInfo {
        SubscriberInfo {
            id: self.id,
            peer_addr: self.peer_addr,
            connected_secs: self.connected_at.elapsed().as_secs(),
        }
    }
}

/// Serializable summary of a subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriberInfo {
    pub id: SubscriberId,
    pub peer_addr: Option<SocketAddr>,
    pub connected_secs: u64,
}
