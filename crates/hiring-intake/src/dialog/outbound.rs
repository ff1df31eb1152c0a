use async_trait::async_trait;

use super::domain::{ChatRef, OutboundMessage};

/// Outbound half of the chat transport.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send(&self, chat: ChatRef, message: OutboundMessage) -> Result<(), OutboundError>;
}

#[derive(Debug, thiserror::Error)]
pub enum OutboundError {
    #[error("chat transport unavailable: {0}")]
    Transport(String),
}

/// Delivers finalized applications to the staff channel. Failures are
/// logged by the caller and never surface to the applicant.
#[async_trait]
pub trait ApplicationNotifier: Send + Sync {
    async fn deliver(&self, notice: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("staff channel is not configured")]
    ChannelUnconfigured,
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
