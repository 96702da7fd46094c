//! Statistics for the relay

pub mod metrics;

pub use metrics::{HubStats, HubStatsSnapshot};
