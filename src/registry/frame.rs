//! Snapshot and source types for the hub
//!
//! This module defines the address identifying the upstream device, the
//! snapshot records that are fanned out to subscribers, and the out-of-band
//! notices pushed when the source changes.

use serde_json::{Map, Value};

/// Address of the upstream telemetry device
///
/// An empty address means the hub is unconfigured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SourceAddress(String);

impl SourceAddress {
    /// Create a source address, trimming surrounding whitespace
    pub fn new(addr: impl Into<String>) -> Self {
        let addr = addr.into();
        let trimmed = addr.trim();
        if trimmed.len() == addr.len() {
            Self(addr)
        } else {
            Self(trimmed.to_string())
        }
    }

    /// The "no source" address
    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// Check if this address names a source
    pub fn is_configured(&self) -> bool {
        !self.0.is_empty()
    }

    /// Get the address as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_configured() {
            f.write_str(&self.0)
        } else {
            f.write_str("<unconfigured>")
        }
    }
}

impl From<&str> for SourceAddress {
    fn from(addr: &str) -> Self {
        Self::new(addr)
    }
}

impl From<String> for SourceAddress {
    fn from(addr: String) -> Self {
        Self::new(addr)
    }
}

/// The most recently decoded telemetry record
///
/// Snapshots are published whole and shared behind an `Arc`; readers never
/// mutate them.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Generation of the session that produced this snapshot
    pub generation: u64,
    /// Position within the generation (0 = nothing received yet)
    pub sequence: u64,
    /// Decoded record, opaque to the hub
    pub data: Value,
}

impl Snapshot {
    /// Create a snapshot
    pub fn new(generation: u64, sequence: u64, data: Value) -> Self {
        Self {
            generation,
            sequence,
            data,
        }
    }

    /// Sentinel returned while no session has produced data
    pub fn unconfigured() -> Self {
        Self::empty(0)
    }

    /// Sentinel for a generation that has not received data yet
    pub fn empty(generation: u64) -> Self {
        Self::new(generation, 0, Value::Object(Map::new()))
    }

    /// Check if this is a sentinel rather than received data
    pub fn is_empty(&self) -> bool {
        self.sequence == 0
    }

    /// Encode the record as sent to subscribers
    pub fn to_json(&self) -> String {
        self.data.to_string()
    }
}

/// Out-of-band message pushed to every subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The upstream source was replaced
    SourceChanged {
        /// New source address (empty when the hub was cleared)
        address: SourceAddress,
    },
}

/// Status text dashboards match on when the source changes
pub const SOURCE_CHANGED_STATUS: &str = "PS5 IP updated";

impl Notice {
    /// Encode the notice as sent to subscribers
    ///
    /// `ps5_ip` rides alongside the status text; clients that only look at
    /// `status` are unaffected.
    pub fn to_json(&self) -> String {
        match self {
            Notice::SourceChanged { address } => serde_json::json!({
                "status": SOURCE_CHANGED_STATUS,
                "ps5_ip": address.as_str(),
            })
            .to_string(),
        }
    }
}
