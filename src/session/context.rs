//! Session context
//!
//! Everything a telemetry session needs from the hub: the address it is bound
//! to, a publisher for its snapshots, and the signal telling it to stop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;

use crate::registry::{Snapshot, SourceAddress};

/// Context handed to a [`SessionFactory`](super::SessionFactory) when a
/// session is started
#[derive(Debug)]
pub struct SessionContext {
    /// Address the session must connect to
    pub address: SourceAddress,

    /// Generation assigned by the hub
    pub generation: u64,

    /// Publishes decoded snapshots to subscribers
    pub publisher: SnapshotPublisher,

    /// Resolves when the hub stops this session
    pub shutdown: ShutdownSignal,
}

impl SessionContext {
    /// Create a new context
    pub fn new(
        address: SourceAddress,
        generation: u64,
        publisher: SnapshotPublisher,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            address,
            generation,
            publisher,
            shutdown,
        }
    }
}

/// Write side of the shared snapshot
///
/// Each publisher is tied to one generation. Once the hub moves to a newer
/// generation, publishing becomes a no-op, so a session that is still
/// winding down cannot overwrite its successor's data.
#[derive(Debug)]
pub struct SnapshotPublisher {
    generation: u64,
    active: Arc<AtomicU64>,
    tx: Arc<watch::Sender<Arc<Snapshot>>>,
}

impl SnapshotPublisher {
    pub(crate) fn new(
        generation: u64,
        active: Arc<AtomicU64>,
        tx: Arc<watch::Sender<Arc<Snapshot>>>,
    ) -> Self {
        Self {
            generation,
            active,
            tx,
        }
    }

    /// Generation this publisher belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the shared snapshot with a newly decoded record
    ///
    /// Returns `false` if the publisher's generation has been superseded.
    pub fn publish(&self, data: Value) -> bool {
        let generation = self.generation;
        let active = &self.active;

        self.tx.send_if_modified(move |current| {
            if active.load(Ordering::Acquire) != generation {
                return false;
            }

            let sequence = if current.generation == generation {
                current.sequence + 1
            } else {
                1
            };
            *current = Arc::new(Snapshot::new(generation, sequence, data));
            true
        })
    }
}

/// Create a linked shutdown trigger and signal
pub(crate) fn shutdown_channel() -> (watch::Sender<bool>, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (tx, ShutdownSignal { rx })
}

/// Stop request observed by a running session
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait until the hub asks the session to stop
    ///
    /// A dropped trigger counts as a stop request. Cancel safe, so it can
    /// sit in a `select!` next to the session's I/O.
    pub async fn wait(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
