use crate::traits::error::Result;
use async_trait::async_trait;

/// External pub/sub notification collaborator
///
/// Used exactly once during the handshake to subscribe to the session-ready
/// topic; the connection core does not use it afterwards.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Subscribe to a topic on the given channel.
    async fn subscribe(&self, topic: &str, channel: &str) -> Result<()>;
}

/// A no-op service for transports that signal readiness on their own
pub struct NoNotifications;

#[async_trait]
impl NotificationService for NoNotifications {
    async fn subscribe(&self, _topic: &str, _channel: &str) -> Result<()> {
        Ok(())
    }
}
