//! # tcmp-client
//!
//! Client side of the TCMP session protocol: a connection lifecycle manager
//! layered over a persistent bidirectional transport.
//!
//! ## Features
//!
//! - **Fixed state discipline**: `connecting -> open -> closed`, enforced by a
//!   reusable transition engine with synchronous observers
//! - **Handshake management**: hello/welcome exchange with a single-shot
//!   welcome deadline
//! - **Liveness monitoring**: consecutive-miss heartbeat tracking while open
//! - **Ordered delivery**: messages composed before the handshake completes
//!   are queued and flushed in FIFO order the instant the connection opens
//! - **Typed close taxonomy**: every termination is classified into a close
//!   code and reason, surfaced through a single close path
//!
//! The transport itself (sockets, TLS, framing, retries) is an external
//! collaborator behind the [`Transport`] trait; this crate carries no socket
//! code.

pub mod core;
pub mod traits;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use self::core::{
    close::{
        CloseEvent, CLOSE_HEARTBEATS_MISSED, CLOSE_HELLO_FAILED, CLOSE_NORMAL, CLOSE_SEND_FAILED,
        CLOSE_WELCOME_TIMEOUT,
    },
    config::ConnectionOptions,
    connection::{Connection, ConnectionEvent},
    connection_state::{permitted, AtomicConnectionState, ConnectionState},
    heartbeat::HeartbeatMonitor,
    message::ProtocolMessage,
    queue::OutgoingQueue,
    state::StateMachine,
};

/// Type alias for Result with TcmpError
pub type Result<T> = std::result::Result<T, traits::TcmpError>;
