use thiserror::Error;

/// Main error type for the TCMP client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TcmpError {
    /// A frame could not be decoded (malformed payload, missing tag)
    #[error("Parse error: {0}")]
    Parse(String),

    /// The peer sent a `bad` frame or an unknown message type
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Connection-level failure surfaced by the transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// The session-ready subscription failed
    #[error("Notification error: {0}")]
    Notification(String),

    /// The session terminated with a close code and reason
    #[error("Session closed {code}: {reason}")]
    SessionClosed { code: u16, reason: String },
}

impl TcmpError {
    /// The close code, when this error describes a session termination.
    pub fn close_code(&self) -> Option<u16> {
        match self {
            TcmpError::SessionClosed { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type for TCMP client operations
pub type Result<T> = std::result::Result<T, TcmpError>;
