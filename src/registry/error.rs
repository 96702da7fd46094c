//! Hub error types
//!
//! Error types for session registry and subscriber set operations.

use crate::session::SessionError;

/// Error type for hub operations
#[derive(Debug)]
pub enum HubError {
    /// No source address has been configured yet
    NotConfigured,
    /// The session factory refused to start a session
    SessionStart(SessionError),
}

impl std::fmt::Display for HubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HubError::NotConfigured => write!(f, "Source address is not configured"),
            HubError::SessionStart(e) => write!(f, "Failed to start session: {}", e),
        }
    }
}

impl std::error::Error for HubError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HubError::NotConfigured => None,
            HubError::SessionStart(e) => Some(e),
        }
    }
}
