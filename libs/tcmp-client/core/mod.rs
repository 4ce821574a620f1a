//! Connection core: transition engine, wire codec, timers, queue, and the
//! orchestrator that ties them together.

pub mod close;
pub mod config;
pub mod connection;
pub mod connection_state;
pub mod heartbeat;
pub mod message;
pub mod queue;
pub mod state;

// Re-export main types
pub use close::{
    CloseEvent, CLOSE_HEARTBEATS_MISSED, CLOSE_HELLO_FAILED, CLOSE_NORMAL, CLOSE_SEND_FAILED,
    CLOSE_WELCOME_TIMEOUT,
};
pub use config::ConnectionOptions;
pub use connection::{Connection, ConnectionEvent};
pub use connection_state::{permitted, AtomicConnectionState, ConnectionState};
pub use heartbeat::HeartbeatMonitor;
pub use message::ProtocolMessage;
pub use queue::OutgoingQueue;
pub use state::StateMachine;
