//! CRM Sync Port - Best-effort mirror of lead data.

use async_trait::async_trait;

use crate::domain::conversation::Conversation;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("CRM request failed: {0}")]
    Request(String),

    #[error("CRM rejected the update: {0}")]
    Rejected(String),
}

/// Port for mirroring a conversation snapshot into a CRM.
///
/// Called from a background queue; errors are logged and dropped.
#[async_trait]
pub trait CrmSync: Send + Sync {
    async fn sync(&self, snapshot: &Conversation) -> Result<(), SyncError>;
}
