//! HandleLeadMessage command handler.
//!
//! Order of operations for one inbound lead message:
//! 1. Validate the payload (nothing is loaded on failure)
//! 2. Load or create the conversation; acknowledge redelivered events
//! 3. Evaluate the agent inactivity timeout
//! 4. Append the lead message
//! 5. Run extraction against the latest bot/agent message as context
//! 6. In bot mode, generate, deliver and append a reply
//! 7. Commit once and schedule the CRM mirror

use crate::application::orchestrator::{outbound_time, ConversationOrchestrator, OrchestratorError};
use crate::domain::conversation::{
    ConversationMode, FieldName, Message, ModeEvent, TransitionTrigger,
};
use crate::domain::foundation::{LeadId, Timestamp, ValidationError};

/// Inbound lead message, already normalised by the channel adapter.
#[derive(Debug, Clone)]
pub struct LeadMessageCommand {
    pub lead_id: String,
    pub text: String,
    pub timestamp: Timestamp,
    /// Channel message id used to recognise redelivered events.
    pub event_id: Option<String>,
}

impl LeadMessageCommand {
    pub fn new(lead_id: impl Into<String>, text: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            lead_id: lead_id.into(),
            text: text.into(),
            timestamp,
            event_id: None,
        }
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    fn validate(&self) -> Result<(LeadId, Option<String>), ValidationError> {
        let lead_id = LeadId::new(self.lead_id.as_str())?;
        if self.text.trim().is_empty() {
            return Err(ValidationError::empty_field("text"));
        }
        let event_id = match &self.event_id {
            Some(id) if id.trim().is_empty() => {
                return Err(ValidationError::empty_field("event_id"));
            }
            Some(id) => Some(id.trim().to_string()),
            None => None,
        };
        Ok((lead_id, event_id))
    }
}

/// What happened while handling a lead message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadMessageOutcome {
    pub lead_id: LeadId,
    /// The event was already in the history; nothing was changed.
    pub duplicate: bool,
    pub mode: ConversationMode,
    /// Set when the message caused a mode transition.
    pub transition: Option<TransitionTrigger>,
    pub filled_fields: Vec<FieldName>,
    /// Automated reply appended this turn, if any.
    pub reply: Option<String>,
    pub complete: bool,
}

impl ConversationOrchestrator {
    /// Handles one message from a lead.
    ///
    /// # Errors
    ///
    /// - `Validation` for malformed payloads, before any state is touched
    /// - `Delivery` when the bot reply could not be delivered (state is committed)
    /// - `Persistence` when the commit failed on both paths
    pub async fn handle_lead_message(
        &self,
        cmd: LeadMessageCommand,
    ) -> Result<LeadMessageOutcome, OrchestratorError> {
        let (lead_id, event_id) = cmd.validate()?;
        let at = cmd.timestamp;

        let (mut conversation, tracker) = self.load_or_create(&lead_id, at).await?;

        if let Some(event_id) = &event_id {
            if conversation.contains_external_id(event_id) {
                tracing::info!(
                    lead_id = %lead_id,
                    event_id = %event_id,
                    "duplicate lead event ignored"
                );
                return Ok(LeadMessageOutcome {
                    lead_id,
                    duplicate: true,
                    mode: conversation.mode(),
                    transition: None,
                    filled_fields: Vec::new(),
                    reply: None,
                    complete: conversation.is_complete(),
                });
            }
        }

        let evaluation = self
            .modes
            .evaluate(&mut conversation, &ModeEvent::LeadMessage { at })?;

        let mut message = Message::from_lead(cmd.text.trim(), at);
        if let Some(event_id) = event_id {
            message = message.with_external_id(event_id);
        }
        conversation.append_message(message);

        let extracted = self.extract(&conversation).await;
        let filled_fields = conversation.fields_mut().fill_unfilled(&extracted);
        if !filled_fields.is_empty() {
            tracing::debug!(lead_id = %lead_id, fields = ?filled_fields, "lead fields filled");
        }

        let mut reply = None;
        let mut delivery_failure = None;
        if evaluation.effective_mode.replies_automatically() {
            let text = self.generate_reply(&conversation).await;
            let attempt = self.deliver(&lead_id, &text).await;
            let bot_message =
                Message::from_bot(text.clone(), outbound_time(at)).with_delivery(attempt.delivered);
            if let Some(reason) = attempt.failure {
                delivery_failure = Some((bot_message.id, reason));
            }
            conversation.append_message(bot_message);
            reply = Some(text);
        } else {
            tracing::debug!(lead_id = %lead_id, "agent mode, automated reply suppressed");
        }

        self.commit(&tracker, &conversation).await?;

        if let Some((message_id, reason)) = delivery_failure {
            return Err(OrchestratorError::Delivery {
                lead_id,
                message_id,
                reason,
            });
        }

        Ok(LeadMessageOutcome {
            lead_id,
            duplicate: false,
            mode: evaluation.effective_mode,
            transition: evaluation.transition.map(|t| t.trigger),
            filled_fields,
            reply,
            complete: conversation.is_complete(),
        })
    }
}
