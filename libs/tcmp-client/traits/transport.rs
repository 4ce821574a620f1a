use crate::traits::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Headers attached to outbound session-scoped requests
pub type Headers = HashMap<String, String>;

/// Default headers for TCMP JSON frames
pub fn json_headers() -> Headers {
    let mut headers = HashMap::new();
    headers.insert(
        "Accept".to_string(),
        "application/json; charset=utf-8".to_string(),
    );
    headers.insert(
        "Content-Type".to_string(),
        "application/json; charset=utf-8".to_string(),
    );
    headers
}

/// Low-level events emitted by a transport implementation
///
/// The connection core consumes these over a single channel; the transport
/// implementation owns the sender half and feeds it from its own I/O loop.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Transport-level connectivity established; the protocol session is not
    /// yet usable
    Established,
    /// The protocol session can now accept the handshake request
    SessionReady,
    /// A raw frame arrived from the peer
    Frame(String),
    /// The session ended, with the transport-supplied code and reason
    SessionEnded { code: u16, reason: String },
    /// A connection-level error (not necessarily fatal)
    Error(String),
}

/// External transport collaborator
///
/// Implementations provide the persistent bidirectional channel the TCMP
/// session runs over. Socket-level concerns (TLS, framing, low-level retries)
/// live entirely behind this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Begin connecting to the given server URL.
    ///
    /// Readiness is reported asynchronously via [`TransportEvent`]s; an `Err`
    /// here means the attempt could not even be started.
    async fn connect(&self, url: &str) -> Result<()>;

    /// Send a frame on the given channel.
    async fn send(&self, channel: &str, headers: &Headers, body: &str) -> Result<()>;

    /// Terminate the session with the given close code.
    fn disconnect(&self, code: u16);
}
