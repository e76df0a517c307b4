//! HandleAgentMessage command handler.
//!
//! An agent message in bot mode takes the conversation over. In agent mode
//! it only refreshes the inactivity clock. The text is delivered to the lead
//! and appended to the history either way.

use crate::application::orchestrator::{ConversationOrchestrator, OrchestratorError};
use crate::domain::conversation::{ConversationMode, Message, ModeEvent, TransitionTrigger};
use crate::domain::foundation::{LeadId, MessageId, OperatorId, Timestamp, ValidationError};

/// A message written by a human operator for a lead.
#[derive(Debug, Clone)]
pub struct AgentMessageCommand {
    pub lead_id: String,
    pub text: String,
    pub timestamp: Timestamp,
    pub operator: Option<String>,
    /// Explicit takeover flag. Idempotent in agent mode.
    pub takeover: bool,
}

impl AgentMessageCommand {
    pub fn new(lead_id: impl Into<String>, text: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            lead_id: lead_id.into(),
            text: text.into(),
            timestamp,
            operator: None,
            takeover: false,
        }
    }

    pub fn from_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn as_takeover(mut self) -> Self {
        self.takeover = true;
        self
    }

    fn validate(&self) -> Result<(LeadId, Option<OperatorId>), ValidationError> {
        let lead_id = LeadId::new(self.lead_id.as_str())?;
        if self.text.trim().is_empty() {
            return Err(ValidationError::empty_field("text"));
        }
        let operator = self.operator.as_deref().map(OperatorId::new).transpose()?;
        Ok((lead_id, operator))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentMessageOutcome {
    pub lead_id: LeadId,
    pub message_id: MessageId,
    pub mode: ConversationMode,
    pub transition: Option<TransitionTrigger>,
    pub delivered: bool,
}

impl ConversationOrchestrator {
    /// Handles one message from an agent to a lead.
    pub async fn handle_agent_message(
        &self,
        cmd: AgentMessageCommand,
    ) -> Result<AgentMessageOutcome, OrchestratorError> {
        let (lead_id, operator) = cmd.validate()?;
        let at = cmd.timestamp;

        let (mut conversation, tracker) = self.load_or_create(&lead_id, at).await?;

        let evaluation = self.modes.evaluate(
            &mut conversation,
            &ModeEvent::AgentMessage {
                at,
                operator,
                takeover: cmd.takeover,
            },
        )?;

        let text = cmd.text.trim();
        let attempt = self.deliver(&lead_id, text).await;
        let message = Message::from_agent(text, at).with_delivery(attempt.delivered);
        let message_id = message.id;
        conversation.append_message(message);

        self.commit(&tracker, &conversation).await?;

        if let Some(reason) = attempt.failure {
            return Err(OrchestratorError::Delivery {
                lead_id,
                message_id,
                reason,
            });
        }

        Ok(AgentMessageOutcome {
            lead_id,
            message_id,
            mode: evaluation.effective_mode,
            transition: evaluation.transition.map(|t| t.trigger),
            delivered: attempt.delivered,
        })
    }
}
