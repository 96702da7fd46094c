//! HTTP and WebSocket server

pub mod config;
pub mod handler;
pub mod listener;

pub use config::{ConfigFile, ServerConfig, DEFAULT_PORT};
pub use handler::build_router;
pub use listener::RelayServer;
