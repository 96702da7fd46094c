//! Session error types

/// Error type for starting a telemetry session
#[derive(Debug)]
pub enum SessionError {
    /// The address cannot name an upstream device
    InvalidAddress(String),
    /// Socket setup failed before the session could be launched
    Io(std::io::Error),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InvalidAddress(addr) => write!(f, "Invalid source address: {:?}", addr),
            SessionError::Io(e) => write!(f, "Session I/O error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::InvalidAddress(_) => None,
            SessionError::Io(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        SessionError::Io(e)
    }
}
