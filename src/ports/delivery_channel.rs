//! Delivery Channel Port - Outbound messages to the lead.

use async_trait::async_trait;

use crate::domain::foundation::LeadId;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Delivery rejected by channel: {0}")]
    Rejected(String),

    #[error("Channel unreachable: {0}")]
    Unreachable(String),

    #[error("Channel not configured: {0}")]
    NotConfigured(String),
}

/// Port for sending text to a lead. Failures are reported, never retried here.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Sends text to the lead; returns whether the channel accepted it.
    async fn send(&self, to: &LeadId, text: &str) -> Result<bool, DeliveryError>;
}
