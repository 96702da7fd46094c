//! Hot-reconfigurable telemetry relay
//!
//! Relays the latest telemetry snapshot from one upstream device (a game
//! console streaming over UDP) to any number of WebSocket subscribers. The
//! upstream source can be replaced at runtime with `POST /configure` without
//! dropping connected subscribers.
//!
//! # Example
//!
//! ```no_run
//! use telemetry_relay::{RelayServer, ServerConfig};
//!
//! # async fn example() -> telemetry_relay::Result<()> {
//! let config = ServerConfig::default().initial_source("192.168.1.20");
//! let server = RelayServer::new(config);
//!
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`registry`]: the hub, holding the active session and subscriber set
//! - [`session`]: session factory seam and the UDP heartbeat session
//! - [`subscriber`]: per-connection broadcast loop
//! - [`server`]: axum router, configuration, listener

pub mod error;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;
pub mod subscriber;

pub use error::{Error, Result};
pub use registry::{ConfigureOutcome, HubConfig, HubError, Snapshot, SourceAddress, TelemetryHub};
pub use server::{ConfigFile, RelayServer, ServerConfig};
pub use session::{PacketDecoder, SessionFactory, UdpSessionFactory, UdpSourceConfig};
