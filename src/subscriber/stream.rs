//! Per-subscriber broadcast loop
//!
//! Every tick the loop reads the hub's current snapshot, flushes any queued
//! notices, and writes the snapshot. Notices are drained after the read: data
//! from a new session is only visible once the hub has queued the matching
//! `SourceChanged` notice, so the notice always goes out first.
//!
//! Any failure ends the stream. There is no retry; the peer reconnects to
//! rejoin.

use std::sync::Arc;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::MissedTickBehavior;

use crate::registry::{Subscription, TelemetryHub};

use super::sink::SubscriberSink;
use super::state::{CloseReason, SubscriberState};

/// Broadcast loop for one admitted subscriber
pub struct SubscriberStream<S: SubscriberSink> {
    hub: Arc<TelemetryHub>,
    sink: S,
    subscription: Subscription,
    state: SubscriberState,
}

impl<S: SubscriberSink> SubscriberStream<S> {
    /// Create a stream for an admitted subscriber
    pub fn new(hub: Arc<TelemetryHub>, sink: S, subscription: Subscription) -> Self {
        Self {
            hub,
            sink,
            subscription,
            state: SubscriberState::new(),
        }
    }

    /// Stream until the connection fails, then close it and leave the set
    pub async fn run(mut self) -> CloseReason {
        let id = self.subscription.id;
        self.state.start_streaming();

        let mut ticker = tokio::time::interval(self.hub.config().stream_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let reason = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(reason) = self.push_current().await {
                        break reason;
                    }
                }
                _ = self.sink.closed() => break CloseReason::PeerClosed,
            }
        };

        self.state.close(reason.clone());

        let Self { hub, sink, state, .. } = self;
        sink.close().await;
        hub.remove_subscriber(id).await;

        tracing::debug!(
            subscriber = %id,
            reason = %reason,
            snapshots = state.snapshots_sent,
            notices = state.notices_sent,
            duration_ms = state.duration().as_millis() as u64,
            "Subscriber stream closed"
        );

        reason
    }

    async fn push_current(&mut self) -> Result<(), CloseReason> {
        let snapshot = self.hub.current_snapshot();

        loop {
            match self.subscription.notices.try_recv() {
                Ok(notice) => {
                    self.write(notice.to_json()).await?;
                    self.state.notices_sent += 1;
                    self.hub.stats().record_notice_sent();
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err(CloseReason::Evicted),
            }
        }

        self.write(snapshot.to_json()).await?;
        self.state.snapshots_sent += 1;
        self.hub.stats().record_snapshot_sent();

        Ok(())
    }

    async fn write(&mut self, text: String) -> Result<(), CloseReason> {
        self.sink
            .send_text(text)
            .await
            .map_err(|e| CloseReason::WriteFailed(e.to_string()))
    }
}
