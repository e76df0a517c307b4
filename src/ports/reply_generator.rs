//! Reply Generator Port - Automated bot replies.

use async_trait::async_trait;

use crate::domain::conversation::Conversation;

#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("Reply generation failed: {0}")]
    Failed(String),
}

/// Port for producing the next bot message of a conversation.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, conversation: &Conversation) -> Result<String, ReplyError>;
}
