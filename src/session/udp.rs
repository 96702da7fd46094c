//! UDP heartbeat session
//!
//! Consoles that stream telemetry over UDP only do so while a client keeps
//! sending them a heartbeat. The session binds a local port, sends the
//! heartbeat to the console, and hands every datagram from that host to a
//! [`PacketDecoder`]. Decoded records are published as the current snapshot.
//!
//! The listen socket is bound when the session is started, so a busy port is
//! reported to the hub as a start failure. Once running, upstream failures
//! are logged and retried on the next heartbeat.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use serde_json::Value;
use tokio::net::UdpSocket;

use super::context::{SessionContext, ShutdownSignal, SnapshotPublisher};
use super::error::SessionError;
use super::source::{SessionFactory, SessionFuture};

/// Port the console listens on for heartbeats
pub const DEFAULT_HEARTBEAT_PORT: u16 = 33739;

/// Port the console sends telemetry to
pub const DEFAULT_LISTEN_PORT: u16 = 33740;

/// Turns raw datagrams into telemetry records
pub trait PacketDecoder: Send + Sync + 'static {
    /// Decode one datagram, or `None` to drop it
    fn decode(&self, packet: Bytes) -> Option<Value>;
}

/// Decoder that publishes only the datagram length
///
/// Useful to check that the console is streaming before a real decoder is
/// plugged in.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawPacketDecoder;

impl PacketDecoder for RawPacketDecoder {
    fn decode(&self, packet: Bytes) -> Option<Value> {
        Some(serde_json::json!({ "length": packet.len() }))
    }
}

/// UDP session options
#[derive(Debug, Clone)]
pub struct UdpSourceConfig {
    /// Remote port heartbeats are sent to
    pub heartbeat_port: u16,

    /// Local port telemetry is received on
    pub listen_port: u16,

    /// Heartbeat payload
    pub heartbeat: Bytes,

    /// Resend the heartbeat after this many packets
    pub heartbeat_every: u32,

    /// Resend the heartbeat if nothing arrives within this time
    pub recv_timeout: Duration,

    /// Receive buffer size
    pub buffer_size: usize,
}

impl Default for UdpSourceConfig {
    fn default() -> Self {
        Self {
            heartbeat_port: DEFAULT_HEARTBEAT_PORT,
            listen_port: DEFAULT_LISTEN_PORT,
            heartbeat: Bytes::from_static(b"A"),
            heartbeat_every: 100,
            recv_timeout: Duration::from_secs(2),
            buffer_size: 4096,
        }
    }
}

impl UdpSourceConfig {
    /// Set the remote heartbeat port
    pub fn heartbeat_port(mut self, port: u16) -> Self {
        self.heartbeat_port = port;
        self
    }

    /// Set the local listen port (0 = ephemeral)
    pub fn listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    /// Set the heartbeat interval in packets
    pub fn heartbeat_every(mut self, packets: u32) -> Self {
        self.heartbeat_every = packets.max(1);
        self
    }

    /// Set the receive timeout
    pub fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout.max(Duration::from_millis(1));
        self
    }
}

/// Factory for UDP heartbeat sessions
pub struct UdpSessionFactory<D: PacketDecoder = RawPacketDecoder> {
    config: UdpSourceConfig,
    decoder: Arc<D>,
}

impl UdpSessionFactory<RawPacketDecoder> {
    /// Create a factory with the raw pass-through decoder
    pub fn new(config: UdpSourceConfig) -> Self {
        Self::with_decoder(config, RawPacketDecoder)
    }
}

impl<D: PacketDecoder> UdpSessionFactory<D> {
    /// Create a factory with a custom decoder
    pub fn with_decoder(config: UdpSourceConfig, decoder: D) -> Self {
        Self {
            config,
            decoder: Arc::new(decoder),
        }
    }
}

impl<D: PacketDecoder> SessionFactory for UdpSessionFactory<D> {
    fn start(&self, ctx: SessionContext) -> Result<SessionFuture, SessionError> {
        let ip: IpAddr = ctx
            .address
            .as_str()
            .parse()
            .map_err(|_| SessionError::InvalidAddress(ctx.address.as_str().to_string()))?;

        // A busy port must fail the reconfiguration, not the spawned task
        let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.config.listen_port);
        let socket = std::net::UdpSocket::bind(bind_addr)?;
        socket.set_nonblocking(true)?;
        let socket = UdpSocket::from_std(socket)?;

        let session = UdpSession {
            socket,
            target: SocketAddr::new(ip, self.config.heartbeat_port),
            config: self.config.clone(),
            decoder: Arc::clone(&self.decoder),
            publisher: ctx.publisher,
            shutdown: ctx.shutdown,
        };

        Ok(Box::pin(session.run()))
    }
}

struct UdpSession<D: PacketDecoder> {
    socket: UdpSocket,
    target: SocketAddr,
    config: UdpSourceConfig,
    decoder: Arc<D>,
    publisher: SnapshotPublisher,
    shutdown: ShutdownSignal,
}

impl<D: PacketDecoder> UdpSession<D> {
    async fn run(self) {
        let Self {
            socket,
            target,
            config,
            decoder,
            publisher,
            mut shutdown,
        } = self;
        let generation = publisher.generation();

        tracing::info!(
            generation = generation,
            target = %target,
            local = ?socket.local_addr().ok(),
            "Telemetry session started"
        );

        let mut packets_since_heartbeat = config.heartbeat_every;
        let mut received: u64 = 0;
        let mut buf = BytesMut::with_capacity(config.buffer_size);

        loop {
            if packets_since_heartbeat >= config.heartbeat_every {
                if let Err(e) = socket.send_to(&config.heartbeat, target).await {
                    tracing::warn!(
                        generation = generation,
                        target = %target,
                        error = %e,
                        "Heartbeat send failed"
                    );
                }
                packets_since_heartbeat = 0;
            }

            buf.clear();
            buf.reserve(config.buffer_size);

            let recv = tokio::time::timeout(config.recv_timeout, socket.recv_buf_from(&mut buf));
            let result = tokio::select! {
                _ = shutdown.wait() => break,
                result = recv => result,
            };

            match result {
                Err(_) => {
                    tracing::debug!(
                        generation = generation,
                        target = %target,
                        "No telemetry received, resending heartbeat"
                    );
                    packets_since_heartbeat = config.heartbeat_every;
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        generation = generation,
                        error = %e,
                        "Telemetry receive failed"
                    );
                    packets_since_heartbeat = config.heartbeat_every;
                }
                Ok(Ok((_, from))) if from.ip() != target.ip() => {
                    tracing::trace!(from = %from, "Ignoring datagram from unexpected host");
                }
                Ok(Ok((len, _))) => {
                    packets_since_heartbeat += 1;
                    received += 1;

                    let packet = buf.split_to(len).freeze();
                    if let Some(record) = decoder.decode(packet) {
                        if !publisher.publish(record) {
                            // Superseded; the hub is about to stop us
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!(
            generation = generation,
            target = %target,
            packets = received,
            "Telemetry session stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;

    use tokio::sync::watch;
    use tokio_test::assert_err;

    use super::*;
    use crate::registry::{HubError, Snapshot, SourceAddress, TelemetryHub};
    use crate::session::context::shutdown_channel;

    struct Harness {
        active: Arc<AtomicU64>,
        rx: watch::Receiver<Arc<Snapshot>>,
        tx: Arc<watch::Sender<Arc<Snapshot>>>,
    }

    impl Harness {
        fn new() -> Self {
            let (tx, rx) = watch::channel(Arc::new(Snapshot::unconfigured()));
            Self {
                active: Arc::new(AtomicU64::new(1)),
                rx,
                tx: Arc::new(tx),
            }
        }

        fn context(&self, address: &str) -> (watch::Sender<bool>, SessionContext) {
            let (trigger, shutdown) = shutdown_channel();
            let publisher =
                SnapshotPublisher::new(1, Arc::clone(&self.active), Arc::clone(&self.tx));
            let ctx = SessionContext::new(SourceAddress::new(address), 1, publisher, shutdown);
            (trigger, ctx)
        }
    }

    #[test]
    fn test_raw_decoder() {
        let record = RawPacketDecoder.decode(Bytes::from_static(&[0u8; 296])).unwrap();
        assert_eq!(record["length"], 296);
    }

    #[test]
    fn test_rejects_non_ip_address() {
        let harness = Harness::new();
        let factory = UdpSessionFactory::new(UdpSourceConfig::default());
        let (_trigger, ctx) = harness.context("not-an-ip");

        let result = factory.start(ctx);
        assert!(matches!(result, Err(SessionError::InvalidAddress(_))));
    }

    #[test]
    fn test_recv_timeout_clamped() {
        let config = UdpSourceConfig::default().recv_timeout(Duration::ZERO);
        assert_eq!(config.recv_timeout, Duration::from_millis(1));
    }

    #[tokio::test]
    async fn test_busy_listen_port_fails_start() {
        let held = std::net::UdpSocket::bind("0.0.0.0:0").unwrap();
        let port = held.local_addr().unwrap().port();

        let harness = Harness::new();
        let factory = UdpSessionFactory::new(UdpSourceConfig::default().listen_port(port));
        let (_trigger, ctx) = harness.context("127.0.0.1");

        let result = factory.start(ctx);
        assert!(matches!(result, Err(SessionError::Io(_))));
    }

    #[tokio::test]
    async fn test_busy_listen_port_leaves_hub_unconfigured() {
        let held = std::net::UdpSocket::bind("0.0.0.0:0").unwrap();
        let port = held.local_addr().unwrap().port();

        let factory = UdpSessionFactory::new(UdpSourceConfig::default().listen_port(port));
        let hub = TelemetryHub::new(factory);

        let err = assert_err!(hub.configure("127.0.0.1").await);
        assert!(matches!(err, HubError::SessionStart(SessionError::Io(_))));
        assert!(!hub.is_configured().await);
        assert!(!hub.status().await.session_running);

        // Freeing the port lets the same address be retried
        drop(held);
        hub.configure("127.0.0.1").await.unwrap();
        assert!(hub.is_configured().await);
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_heartbeat_and_publish() {
        // Fake console on loopback
        let console = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let console_port = console.local_addr().unwrap().port();

        let config = UdpSourceConfig::default()
            .heartbeat_port(console_port)
            .listen_port(0)
            .recv_timeout(Duration::from_millis(200));
        let factory = UdpSessionFactory::new(config);

        let mut harness = Harness::new();
        let (trigger, ctx) = harness.context("127.0.0.1");
        let task = tokio::spawn(factory.start(ctx).unwrap());

        let mut heartbeat = [0u8; 8];
        let (len, session_addr) =
            tokio::time::timeout(Duration::from_secs(2), console.recv_from(&mut heartbeat))
                .await
                .unwrap()
                .unwrap();
        assert_eq!(&heartbeat[..len], b"A");

        console.send_to(&[7u8; 42], session_addr).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), harness.rx.changed())
            .await
            .unwrap()
            .unwrap();
        let snapshot = harness.rx.borrow().clone();
        assert_eq!(snapshot.sequence, 1);
        assert_eq!(snapshot.data["length"], 42);

        trigger.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
    }
}
