// Transport trait for the outbound half of a robot data channel
use crate::domain::message::Command;
use crate::errors::BridgeError;
use async_trait::async_trait;

#[async_trait]
pub trait DataChannelTransport: Send + Sync {
    /// Send a command verbatim. No acknowledgment is awaited.
    async fn send(&self, command: &Command) -> Result<(), BridgeError>;
}

/// What happened to a command handed to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dispatch {
    Sent,
    /// The bridge was not connected; nothing was sent.
    Dropped,
}
