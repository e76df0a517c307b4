//! GetConversation query handler.

use crate::application::orchestrator::{ConversationOrchestrator, OrchestratorError};
use crate::domain::conversation::ConversationSummary;
use crate::domain::foundation::LeadId;

impl ConversationOrchestrator {
    /// Read-only summary of a conversation.
    pub async fn get_conversation(
        &self,
        lead_id: &str,
    ) -> Result<ConversationSummary, OrchestratorError> {
        let lead_id = LeadId::new(lead_id)?;
        let (conversation, _) = self.load_existing(&lead_id).await?;
        Ok(ConversationSummary::from_conversation(
            &conversation,
            self.settings.recent_messages,
        ))
    }
}
