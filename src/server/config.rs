//! Server configuration
//!
//! [`ServerConfig`] is the runtime configuration, built in code with chained
//! setters. [`ConfigFile`] is its on-disk TOML form; every field is optional
//! and falls back to the defaults.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::registry::HubConfig;
use crate::session::UdpSourceConfig;

/// Default HTTP/WebSocket port
pub const DEFAULT_PORT: u16 = 8080;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Source to configure at startup (None = wait for POST /configure)
    pub initial_source: Option<String>,

    /// Hub tunables
    pub hub: HubConfig,

    /// UDP session options
    pub source: UdpSourceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            initial_source: None,
            hub: HubConfig::default(),
            source: UdpSourceConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the source configured at startup
    pub fn initial_source(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        self.initial_source = if source.trim().is_empty() {
            None
        } else {
            Some(source)
        };
        self
    }

    /// Set hub tunables
    pub fn hub(mut self, hub: HubConfig) -> Self {
        self.hub = hub;
        self
    }

    /// Set UDP session options
    pub fn source(mut self, source: UdpSourceConfig) -> Self {
        self.source = source;
        self
    }
}

/// TOML configuration file
///
/// ```toml
/// bind = "0.0.0.0:8080"
/// source = "192.168.1.20"
///
/// [hub]
/// stream_interval_ms = 10
/// stop_timeout_ms = 2000
///
/// [udp]
/// listen_port = 33740
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Address to bind to
    pub bind: String,
    /// Source to configure at startup (empty = none)
    pub source: String,
    pub hub: HubSection,
    pub udp: UdpSection,
}

/// `[hub]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSection {
    pub stream_interval_ms: u64,
    pub stop_timeout_ms: u64,
    pub notice_capacity: usize,
}

/// `[udp]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpSection {
    pub heartbeat_port: u16,
    pub listen_port: u16,
    pub heartbeat_every: u32,
    pub recv_timeout_ms: u64,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            bind: format!("0.0.0.0:{}", DEFAULT_PORT),
            source: String::new(),
            hub: HubSection::default(),
            udp: UdpSection::default(),
        }
    }
}

impl Default for HubSection {
    fn default() -> Self {
        let hub = HubConfig::default();
        Self {
            stream_interval_ms: hub.stream_interval.as_millis() as u64,
            stop_timeout_ms: hub.stop_timeout.as_millis() as u64,
            notice_capacity: hub.notice_capacity,
        }
    }
}

impl Default for UdpSection {
    fn default() -> Self {
        let udp = UdpSourceConfig::default();
        Self {
            heartbeat_port: udp.heartbeat_port,
            listen_port: udp.listen_port,
            heartbeat_every: udp.heartbeat_every,
            recv_timeout_ms: udp.recv_timeout.as_millis() as u64,
        }
    }
}

impl ConfigFile {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config = Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        tracing::info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Convert into the runtime configuration
    pub fn into_server_config(self) -> Result<ServerConfig> {
        let bind_addr: SocketAddr = self
            .bind
            .parse()
            .map_err(|e| Error::Config(format!("invalid bind address {:?}: {}", self.bind, e)))?;

        let hub = HubConfig::default()
            .stream_interval(Duration::from_millis(self.hub.stream_interval_ms))
            .stop_timeout(Duration::from_millis(self.hub.stop_timeout_ms))
            .notice_capacity(self.hub.notice_capacity);

        let source = UdpSourceConfig::default()
            .heartbeat_port(self.udp.heartbeat_port)
            .listen_port(self.udp.listen_port)
            .heartbeat_every(self.udp.heartbeat_every)
            .recv_timeout(Duration::from_millis(self.udp.recv_timeout_ms));

        Ok(ServerConfig::with_addr(bind_addr)
            .initial_source(self.source)
            .hub(hub)
            .source(source))
    }
}
