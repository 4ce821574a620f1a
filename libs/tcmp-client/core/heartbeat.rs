//! Heartbeat liveness monitor
//!
//! The peer is expected to send a `heartbeat` frame at least once per cadence
//! interval while the connection is open. The monitor counts consecutive
//! missed intervals; the connection's event loop drives it from a tokio
//! interval and resets that interval on every on-time heartbeat.

/// Tracks consecutive missed heartbeat intervals against a threshold
#[derive(Debug)]
pub struct HeartbeatMonitor {
    consecutive_misses: u32,
    max_consecutive_misses: u32,
}

impl HeartbeatMonitor {
    /// Create a monitor that trips after `max_consecutive_misses` misses
    pub fn new(max_consecutive_misses: u32) -> Self {
        Self {
            consecutive_misses: 0,
            max_consecutive_misses,
        }
    }

    /// An on-time heartbeat arrived; the miss count starts over.
    pub fn record_heartbeat(&mut self) {
        self.consecutive_misses = 0;
    }

    /// An interval elapsed without a heartbeat.
    ///
    /// Returns `true` when the threshold is reached and the connection must
    /// be closed.
    pub fn record_miss(&mut self) -> bool {
        self.consecutive_misses += 1;
        self.consecutive_misses >= self.max_consecutive_misses
    }

    /// Current consecutive miss count
    pub fn consecutive_misses(&self) -> u32 {
        self.consecutive_misses
    }
}
