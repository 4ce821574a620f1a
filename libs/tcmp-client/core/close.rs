//! Close code taxonomy
//!
//! Wire-level close codes; these values are an interop contract and must not
//! change.

use crate::traits::TcmpError;

/// Normal, locally-initiated close
pub const CLOSE_NORMAL: u16 = 1000;
/// No `welcome` arrived before the handshake deadline
pub const CLOSE_WELCOME_TIMEOUT: u16 = 3000;
/// Too many consecutive heartbeat intervals elapsed without a frame
pub const CLOSE_HEARTBEATS_MISSED: u16 = 3001;
/// The peer rejected the handshake
pub const CLOSE_HELLO_FAILED: u16 = 3002;
/// An immediate outbound send was rejected by the transport
pub const CLOSE_SEND_FAILED: u16 = 3003;

/// A classified connection termination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    pub code: u16,
    pub reason: String,
}

impl CloseEvent {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// A normal, locally-initiated close
    pub fn normal() -> Self {
        Self::new(CLOSE_NORMAL, "closed by application")
    }

    pub fn is_normal(&self) -> bool {
        self.code == CLOSE_NORMAL
    }

    /// The descriptive cause carried by the public `Closed` notification:
    /// `None` exactly when the close was normal.
    pub fn into_error(self) -> Option<TcmpError> {
        if self.is_normal() {
            None
        } else {
            Some(TcmpError::SessionClosed {
                code: self.code,
                reason: self.reason,
            })
        }
    }
}
