//! Connection configuration

use std::time::Duration;

/// Default heartbeat cadence requested from the server
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_millis(5000);
/// Default number of consecutive missed heartbeats tolerated
pub const DEFAULT_MAX_CONSECUTIVE_MISSED_HEARTBEATS: u32 = 5;
/// Default deadline for the `welcome` acknowledgment
pub const DEFAULT_WELCOME_TIMEOUT: Duration = Duration::from_millis(5000);

/// Options for a [`Connection`](crate::core::connection::Connection)
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Heartbeat cadence the client requests from the server; the server may
    /// negotiate a different one in its `welcome`
    pub requested_heartbeat_timeout: Duration,

    /// Consecutive missed heartbeat intervals before the connection is
    /// considered dead
    pub max_consecutive_missed_heartbeats: u32,

    /// How long to wait for the `welcome` acknowledgment once the handshake
    /// begins
    pub welcome_timeout: Duration,

    /// Opaque identity tagging session-scoped requests; generated at
    /// construction when absent
    pub identity: Option<String>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            requested_heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            max_consecutive_missed_heartbeats: DEFAULT_MAX_CONSECUTIVE_MISSED_HEARTBEATS,
            welcome_timeout: DEFAULT_WELCOME_TIMEOUT,
            identity: None,
        }
    }
}
