//! Telemetry hub implementation
//!
//! The central registry that owns the active telemetry session and the set of
//! subscribers receiving its snapshots.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch, Mutex};

use crate::session::context::shutdown_channel;
use crate::session::{SessionContext, SessionFactory, SnapshotPublisher};
use crate::stats::{HubStats, HubStatsSnapshot};

use super::config::HubConfig;
use super::entry::{SessionEntry, StopOutcome, SubscriberEntry, SubscriberId, SubscriberInfo};
use super::error::HubError;
use super::frame::{Notice, Snapshot, SourceAddress};
use super::subscribers::SubscriberSet;

/// State guarded by the registry lock
struct HubState {
    address: SourceAddress,
    generation: u64,
    session: Option<SessionEntry>,
    subscribers: SubscriberSet,
}

/// Result of a successful [`TelemetryHub::configure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureOutcome {
    /// Address matched the current one; nothing was restarted
    Unchanged,
    /// A new session was launched
    Started {
        /// Generation of the new session
        generation: u64,
    },
    /// Empty address: the old session was stopped and none was started
    Cleared,
}

/// Handle returned to an admitted subscriber
#[derive(Debug)]
pub struct Subscription {
    /// Identity in the subscriber set
    pub id: SubscriberId,

    /// Notices pushed by the hub; closed when the hub evicts the subscriber
    pub notices: mpsc::Receiver<Notice>,
}

/// Serializable summary of the hub
#[derive(Debug, Clone, Serialize)]
pub struct HubStatus {
    pub configured: bool,
    pub ps5_ip: String,
    pub generation: u64,
    pub session_running: bool,
    pub session_uptime_secs: Option<u64>,
    pub subscribers: Vec<SubscriberInfo>,
    pub stats: HubStatsSnapshot,
}

/// Broadcast hub for one upstream source and many subscribers
///
/// One mutex guards the session pointer and subscriber membership. Snapshot
/// reads bypass it entirely: sessions publish into a `watch` channel and
/// readers clone the current `Arc<Snapshot>`.
pub struct TelemetryHub {
    state: Mutex<HubState>,
    factory: Arc<dyn SessionFactory>,
    snapshot_tx: Arc<watch::Sender<Arc<Snapshot>>>,
    snapshot_rx: watch::Receiver<Arc<Snapshot>>,
    active_generation: Arc<AtomicU64>,
    next_subscriber_id: AtomicU64,
    stats: HubStats,
    config: HubConfig,
}

impl TelemetryHub {
    /// Create a hub with default configuration
    pub fn new(factory: impl SessionFactory) -> Self {
        Self::with_config(factory, HubConfig::default())
    }

    /// Create a hub with custom configuration
    pub fn with_config(factory: impl SessionFactory, config: HubConfig) -> Self {
        Self::with_shared_factory(Arc::new(factory), config)
    }

    /// Create a hub around an already shared factory
    pub fn with_shared_factory(factory: Arc<dyn SessionFactory>, config: HubConfig) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(Snapshot::unconfigured()));

        Self {
            state: Mutex::new(HubState {
                address: SourceAddress::unconfigured(),
                generation: 0,
                session: None,
                subscribers: SubscriberSet::new(),
            }),
            factory,
            snapshot_tx: Arc::new(snapshot_tx),
            snapshot_rx,
            active_generation: Arc::new(AtomicU64::new(0)),
            next_subscriber_id: AtomicU64::new(1),
            stats: HubStats::new(),
            config,
        }
    }

    /// Get the hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Get the hub counters
    pub fn stats(&self) -> &HubStats {
        &self.stats
    }

    /// Point the hub at a new upstream source
    ///
    /// Same address: no-op. Otherwise, under the registry lock: the old
    /// session is muted and stopped (bounded by `stop_timeout`), the shared
    /// snapshot is reset, the new session is created, every subscriber is
    /// sent [`Notice::SourceChanged`], and the session is spawned. Returns
    /// once the session is launched, not once it has reached the device.
    ///
    /// On failure the old session stays stopped, the hub is left
    /// unconfigured and no notice is sent.
    pub async fn configure(
        &self,
        address: impl Into<SourceAddress>,
    ) -> Result<ConfigureOutcome, HubError> {
        let address = address.into();
        let mut state = self.state.lock().await;

        if state.address == address {
            tracing::debug!(source = %address, "Source unchanged");
            return Ok(ConfigureOutcome::Unchanged);
        }

        let previous = std::mem::take(&mut state.address);
        let generation = state.generation + 1;
        state.generation = generation;

        // Mute the old publisher before anything else
        self.active_generation.store(generation, Ordering::Release);

        if let Some(old) = state.session.take() {
            let old_generation = old.generation;
            let outcome = old.stop(self.config.stop_timeout).await;
            if outcome == StopOutcome::Aborted {
                self.stats.record_aborted_session();
            }
            tracing::info!(
                source = %previous,
                generation = old_generation,
                outcome = ?outcome,
                "Session stopped"
            );
        }

        self.snapshot_tx.send_replace(Arc::new(Snapshot::empty(generation)));

        if !address.is_configured() {
            self.notify_source_changed(&mut state.subscribers, &address);
            self.stats.record_reconfiguration(true);
            tracing::info!(previous = %previous, "Source cleared");
            return Ok(ConfigureOutcome::Cleared);
        }

        let (shutdown_tx, shutdown) = shutdown_channel();
        let publisher = SnapshotPublisher::new(
            generation,
            Arc::clone(&self.active_generation),
            Arc::clone(&self.snapshot_tx),
        );
        let ctx = SessionContext::new(address.clone(), generation, publisher, shutdown);

        let run = match self.factory.start(ctx) {
            Ok(run) => run,
            Err(e) => {
                self.stats.record_reconfiguration(false);
                tracing::warn!(source = %address, error = %e, "Session failed to start");
                return Err(HubError::SessionStart(e));
            }
        };

        // Queued before the session can publish, so every subscriber reads
        // the notice ahead of the new session's data
        self.notify_source_changed(&mut state.subscribers, &address);

        let task = tokio::spawn(run);
        state.session = Some(SessionEntry::new(address.clone(), generation, shutdown_tx, task));
        state.address = address;
        self.stats.record_reconfiguration(true);

        tracing::info!(
            source = %state.address,
            previous = %previous,
            generation = generation,
            subscribers = state.subscribers.len(),
            "Session started"
        );

        Ok(ConfigureOutcome::Started { generation })
    }

    /// Queue a notice for every subscriber, evicting those that cannot take it
    fn notify_source_changed(&self, subscribers: &mut SubscriberSet, address: &SourceAddress) {
        let notice = Notice::SourceChanged {
            address: address.clone(),
        };
        let mut evicted = 0;

        for subscriber in subscribers.snapshot_list() {
            match subscriber.notify(notice.clone()) {
                Ok(()) => {}
                Err(e) => {
                    subscribers.remove(subscriber.id);
                    evicted += 1;
                    tracing::debug!(
                        subscriber = %subscriber.id,
                        reason = ?e,
                        "Subscriber evicted on notify"
                    );
                }
            }
        }

        if evicted > 0 {
            self.stats.record_removed(evicted);
        }
    }

    /// Latest snapshot from the active session
    ///
    /// Never waits on the registry lock or on session I/O. Returns an empty
    /// sentinel when no data has been received for the current generation.
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot_rx.borrow())
    }

    /// Check if a source address is set
    pub async fn is_configured(&self) -> bool {
        self.state.lock().await.address.is_configured()
    }

    /// Currently configured source address
    pub async fn address(&self) -> SourceAddress {
        self.state.lock().await.address.clone()
    }

    /// Generation of the most recent reconfiguration
    pub fn generation(&self) -> u64 {
        self.active_generation.load(Ordering::Acquire)
    }

    /// Admit a subscriber
    ///
    /// Rejected with [`HubError::NotConfigured`] when no source is set.
    pub async fn admit(&self, peer_addr: Option<SocketAddr>) -> Result<Subscription, HubError> {
        let mut state = self.state.lock().await;

        if !state.address.is_configured() {
            self.stats.record_rejected();
            return Err(HubError::NotConfigured);
        }

        let id = SubscriberId(self.next_subscriber_id.fetch_add(1, Ordering::Relaxed));
        let (tx, notices) = mpsc::channel(self.config.notice_capacity);
        state.subscribers.add(SubscriberEntry::new(id, peer_addr, tx));
        self.stats.record_admitted();

        tracing::info!(
            subscriber = %id,
            peer = ?peer_addr,
            subscribers = state.subscribers.len(),
            "Subscriber added"
        );

        Ok(Subscription { id, notices })
    }

    /// Remove a subscriber by identity; no-op if already gone
    pub async fn remove_subscriber(&self, id: SubscriberId) -> bool {
        let mut state = self.state.lock().await;

        if state.subscribers.remove(id).is_some() {
            self.stats.record_removed(1);
            tracing::info!(
                subscriber = %id,
                subscribers = state.subscribers.len(),
                "Subscriber removed"
            );
            true
        } else {
            false
        }
    }

    /// Check if a subscriber is registered
    pub async fn has_subscriber(&self, id: SubscriberId) -> bool {
        self.state.lock().await.subscribers.contains(id)
    }

    /// Number of registered subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.state.lock().await.subscribers.len()
    }

    /// Point-in-time list of subscribers
    pub async fn subscribers(&self) -> Vec<SubscriberInfo> {
        let list = self.state.lock().await.subscribers.snapshot_list();
        let mut infos: Vec<SubscriberInfo> = list.iter().map(SubscriberEntry::info).collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    /// Summary for the status endpoint
    pub async fn status(&self) -> HubStatus {
        let (address, generation, session, list) = {
            let state = self.state.lock().await;
            let session = state
                .session
                .as_ref()
                .map(|s| (!s.is_finished(), s.started_at.elapsed().as_secs()));
            (
                state.address.clone(),
                state.generation,
                session,
                state.subscribers.snapshot_list(),
            )
        };

        let mut subscribers: Vec<SubscriberInfo> = list.iter().map(SubscriberEntry::info).collect();
        subscribers.sort_by_key(|info| info.id);

        HubStatus {
            configured: address.is_configured(),
            ps5_ip: address.as_str().to_string(),
            generation,
            session_running: session.is_some_and(|(running, _)| running),
            session_uptime_secs: session.map(|(_, uptime)| uptime),
            subscribers,
            stats: self.stats.snapshot(),
        }
    }

    /// Stop the session and evict every subscriber
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;

        let generation = state.generation + 1;
        state.generation = generation;
        self.active_generation.store(generation, Ordering::Release);

        if let Some(session) = state.session.take() {
            if session.stop(self.config.stop_timeout).await == StopOutcome::Aborted {
                self.stats.record_aborted_session();
            }
        }
        state.address = SourceAddress::unconfigured();

        // Dropping the entries closes each subscriber's notice channel
        let evicted = state.subscribers.clear();
        self.stats.record_removed(evicted as u64);
        self.snapshot_tx.send_replace(Arc::new(Snapshot::empty(generation)));

        tracing::info!(evicted = evicted, "Hub shut down");
    }
}
