//! Telemetry hub: session registry and subscriber set
//!
//! The hub owns the single active telemetry session and the set of connected
//! subscribers. One mutex guards both; snapshot reads go through a
//! `tokio::sync::watch` channel and never touch it.
//!
//! # Architecture
//!
//! ```text
//!                           Arc<TelemetryHub>
//!                   ┌──────────────────────────────┐
//!  POST /configure  │ Mutex<HubState> {            │
//!  ────────────────►│   address, generation,       │
//!   configure()     │   session: SessionEntry,     │
//!                   │   subscribers: SubscriberSet │
//!                   │ }                            │
//!                   │ watch<Arc<Snapshot>> ◄───────┼──── session run loop
//!                   └──────────────┬───────────────┘      publisher.publish()
//!                                  │
//!          ┌───────────────────────┼───────────────────────┐
//!          ▼                       ▼                       ▼
//!   [SubscriberStream]      [SubscriberStream]      [SubscriberStream]
//!   current_snapshot()      current_snapshot()      current_snapshot()
//!          │                       │                       │
//!          └──► every 10ms: notices, then snapshot ──► WebSocket
//! ```
//!
//! # Reconfiguration
//!
//! Each reconfiguration bumps a generation counter. A session's publisher is
//! tied to its generation and goes silent as soon as the counter moves on, so
//! the stopping session can never overwrite its successor's snapshot.
//! Notices are queued once the new session has been created and before it is
//! spawned, which lets each subscriber deliver the notice ahead of any
//! new-session data. A session that fails to start sends no notice.

pub mod config;
pub mod entry;
pub mod error;
pub mod frame;
pub mod store;
pub mod subscribers;

pub use config::HubConfig;
pub use entry::{
    NotifyError, SessionEntry, StopOutcome, SubscriberEntry, SubscriberId, SubscriberInfo,
};
pub use error::HubError;
pub use frame::{Notice, Snapshot, SourceAddress};
pub use store::{ConfigureOutcome, HubStatus, Subscription, TelemetryHub};
pub use subscribers::SubscriberSet;
