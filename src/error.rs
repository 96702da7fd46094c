//! Crate-level error type

use crate::registry::HubError;
use crate::session::SessionError;

/// Error type for relay operations
#[derive(Debug)]
pub enum Error {
    /// Socket or filesystem failure
    Io(std::io::Error),
    /// Invalid or unreadable configuration
    Config(String),
    /// Hub rejected an operation
    Hub(HubError),
    /// Telemetry session failed to start
    Session(SessionError),
    /// Write to a subscriber connection failed
    Connection(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Hub(e) => write!(f, "Hub error: {}", e),
            Error::Session(e) => write!(f, "Session error: {}", e),
            Error::Connection(msg) => write!(f, "Connection error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Hub(e) => Some(e),
            Error::Session(e) => Some(e),
            Error::Config(_) | Error::Connection(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<HubError> for Error {
    fn from(e: HubError) -> Self {
        Error::Hub(e)
    }
}

impl From<SessionError> for Error {
    fn from(e: SessionError) -> Self {
        Error::Session(e)
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
