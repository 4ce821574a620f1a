//! Connection states and their permitted transitions
//!
//! ```text
//! +--------------+       +----------+
//! |  connecting  | ----> |  closed  |
//! +--------------+       +----------+
//!        |                    ^
//!        v                    |
//!    +--------+               |
//!    |  open  | ---------------
//!    +--------+
//! ```

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a TCMP connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// Handshake in progress; outbound messages are queued
    Connecting = 0,
    /// Handshake complete; messages flow directly
    Open = 1,
    /// Terminal; no outgoing transitions
    Closed = 2,
}

/// Permitted next states for each state
pub fn permitted(state: ConnectionState) -> &'static [ConnectionState] {
    match state {
        ConnectionState::Connecting => &[ConnectionState::Open, ConnectionState::Closed],
        ConnectionState::Open => &[ConnectionState::Closed],
        ConnectionState::Closed => &[],
    }
}

/// Lock-free connection state cell
///
/// Mirrors the authoritative state held by the connection's event loop so
/// that handles on other tasks can read it cheaply.
pub struct AtomicConnectionState(AtomicU8);

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        match self.0.load(Ordering::Acquire) {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            _ => ConnectionState::Closed,
        }
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_connecting(&self) -> bool {
        self.get() == ConnectionState::Connecting
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.get() == ConnectionState::Open
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.get() == ConnectionState::Closed
    }
}
