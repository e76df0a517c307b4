//! CRM sync that only logs, used when no CRM is configured.

use async_trait::async_trait;

use crate::domain::conversation::Conversation;
use crate::ports::{CrmSync, SyncError};

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingCrmSync;

#[async_trait]
impl CrmSync for LoggingCrmSync {
    async fn sync(&self, snapshot: &Conversation) -> Result<(), SyncError> {
        tracing::debug!(
            lead_id = %snapshot.id(),
            filled = snapshot.fields().filled_count(),
            complete = snapshot.is_complete(),
            "CRM sync skipped (no CRM configured)"
        );
        Ok(())
    }
}
