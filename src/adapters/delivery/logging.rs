//! Delivery channel that only logs, for local runs without channel credentials.

use async_trait::async_trait;

use crate::domain::foundation::LeadId;
use crate::ports::{DeliveryChannel, DeliveryError};

#[derive(Debug, Clone, Default)]
pub struct LoggingDeliveryChannel;

impl LoggingDeliveryChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DeliveryChannel for LoggingDeliveryChannel {
    async fn send(&self, to: &LeadId, text: &str) -> Result<bool, DeliveryError> {
        tracing::info!(lead_id = %to, chars = text.chars().count(), "outbound message (not sent)");
        Ok(true)
    }
}
