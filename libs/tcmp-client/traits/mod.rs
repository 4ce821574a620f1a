//! Collaborator seams and shared types for the TCMP client.
//!
//! The connection core consumes two external collaborators, both modeled as
//! object-safe async traits:
//!
//! - [`Transport`]: connect/send/disconnect plus low-level connectivity events
//! - [`NotificationService`]: one-shot subscription used during the handshake
//!   to learn the session is ready

pub mod error;
pub mod notify;
pub mod transport;

// Re-export commonly used types
pub use error::{Result, TcmpError};
pub use notify::{NoNotifications, NotificationService};
pub use transport::{json_headers, Headers, Transport, TransportEvent};
