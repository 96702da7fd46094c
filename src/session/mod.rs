//! Telemetry sessions
//!
//! A session owns the connection to the upstream device and keeps the shared
//! snapshot current. Sessions are created through a [`SessionFactory`] and
//! driven by the hub: it spawns the run loop, and stops it through the
//! [`ShutdownSignal`] when the source is reconfigured.

pub mod context;
pub mod error;
pub mod source;
pub mod udp;

pub use context::{SessionContext, ShutdownSignal, SnapshotPublisher};
pub use error::SessionError;
pub use source::{SessionFactory, SessionFuture};
pub use udp::{PacketDecoder, RawPacketDecoder, UdpSessionFactory, UdpSourceConfig};
