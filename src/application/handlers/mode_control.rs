//! TakeControl and ReleaseControl command handlers.

use crate::application::orchestrator::{outbound_time, ConversationOrchestrator, OrchestratorError};
use crate::domain::conversation::{
    ConversationMode, Message, ModeEvent, SenderRole, TransitionTrigger,
};
use crate::domain::foundation::{LeadId, OperatorId, Timestamp};

/// Explicit operator takeover of a conversation.
#[derive(Debug, Clone)]
pub struct TakeControlCommand {
    pub lead_id: String,
    pub operator: String,
    pub timestamp: Timestamp,
}

/// Hands a conversation back to the bot.
#[derive(Debug, Clone)]
pub struct ReleaseControlCommand {
    pub lead_id: String,
    pub timestamp: Timestamp,
    /// When the lead spoke last, answer that message right away.
    pub respond_to_pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeControlOutcome {
    pub lead_id: LeadId,
    pub mode: ConversationMode,
    pub transition: Option<TransitionTrigger>,
    /// Bot reply sent on release, if any.
    pub reply: Option<String>,
}

impl ConversationOrchestrator {
    /// Switches the conversation to agent mode. A no-op when already there.
    pub async fn take_control(
        &self,
        cmd: TakeControlCommand,
    ) -> Result<ModeControlOutcome, OrchestratorError> {
        let lead_id = LeadId::new(cmd.lead_id.as_str())?;
        let operator = OperatorId::new(cmd.operator.as_str())?;

        let (mut conversation, tracker) = self.load_existing(&lead_id).await?;
        let evaluation = self.modes.evaluate(
            &mut conversation,
            &ModeEvent::TakeControl {
                at: cmd.timestamp,
                operator,
            },
        )?;

        self.commit(&tracker, &conversation).await?;

        Ok(ModeControlOutcome {
            lead_id,
            mode: evaluation.effective_mode,
            transition: evaluation.transition.map(|t| t.trigger),
            reply: None,
        })
    }

    /// Returns the conversation to bot mode.
    ///
    /// With `respond_to_pending`, a lead message left unanswered during the
    /// agent session gets an immediate bot reply.
    pub async fn release_control(
        &self,
        cmd: ReleaseControlCommand,
    ) -> Result<ModeControlOutcome, OrchestratorError> {
        let lead_id = LeadId::new(cmd.lead_id.as_str())?;
        let at = cmd.timestamp;

        let (mut conversation, tracker) = self.load_existing(&lead_id).await?;
        let evaluation = self
            .modes
            .evaluate(&mut conversation, &ModeEvent::ReleaseControl { at })?;

        let lead_waiting = conversation.lead_awaits_reply();

        let mut reply = None;
        let mut delivery_failure = None;
        let bot_replies = evaluation.effective_mode.replies_automatically();
        if cmd.respond_to_pending && lead_waiting && bot_replies {
            let text = self.generate_reply(&conversation).await;
            let attempt = self.deliver(&lead_id, &text).await;
            let message =
                Message::from_bot(text.clone(), outbound_time(at)).with_delivery(attempt.delivered);
            if let Some(reason) = attempt.failure {
                delivery_failure = Some((message.id, reason));
            }
            conversation.append_message(message);
            reply = Some(text);
        }

        self.commit(&tracker, &conversation).await?;

        if let Some((message_id, reason)) = delivery_failure {
            return Err(OrchestratorError::Delivery {
                lead_id,
                message_id,
                reason,
            });
        }

        Ok(ModeControlOutcome {
            lead_id,
            mode: evaluation.effective_mode,
            transition: evaluation.transition.map(|t| t.trigger),
            reply,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::{AgentMessageCommand, LeadMessageCommand};
    use crate::application::test_support::*;

    fn take(at: Timestamp) -> TakeControlCommand {
        TakeControlCommand {
            lead_id: LEAD.to_string(),
            operator: "asesor-7".to_string(),
            timestamp: at,
        }
    }

    fn release(at: Timestamp, respond_to_pending: bool) -> ReleaseControlCommand {
        ReleaseControlCommand {
            lead_id: LEAD.to_string(),
            timestamp: at,
            respond_to_pending,
        }
    }

    async fn started(harness: &Harness) {
        harness
            .orchestrator()
            .handle_lead_message(LeadMessageCommand::new(LEAD, "Hola", t(0)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn take_control_of_unknown_conversation_is_not_found() {
        let harness = Harness::new();

        let result = harness.orchestrator().take_control(take(t(0))).await;

        assert!(matches!(result, Err(OrchestratorError::ConversationNotFound(_))));
    }

    #[tokio::test]
    async fn repeated_takeover_keeps_a_single_transition() {
        let harness = Harness::new();
        started(&harness).await;

        let first = harness.orchestrator().take_control(take(t(1))).await.unwrap();
        let stored = harness.stored().await;
        let second = harness.orchestrator().take_control(take(t(2))).await.unwrap();

        assert_eq!(first.transition, Some(TransitionTrigger::ManualTakeover));
        assert_eq!(second.transition, None);
        assert_eq!(second.mode, ConversationMode::Agent);
        assert_eq!(harness.stored().await, stored);
        assert_eq!(stored.control().last_transition.at, t(1));
    }

    #[tokio::test]
    async fn release_returns_to_bot_mode() {
        let harness = Harness::new();
        started(&harness).await;
        harness.orchestrator().take_control(take(t(1))).await.unwrap();

        let outcome = harness.orchestrator().release_control(release(t(2), false)).await.unwrap();

        assert_eq!(outcome.mode, ConversationMode::Bot);
        assert_eq!(outcome.transition, Some(TransitionTrigger::ManualRelease));
        assert!(outcome.reply.is_none());
    }

    #[tokio::test]
    async fn release_answers_a_waiting_lead() {
        let harness = Harness::new();
        started(&harness).await;
        harness
            .orchestrator()
            .handle_agent_message(AgentMessageCommand::new(LEAD, "Dame un momento", t(1)))
            .await
            .unwrap();
        harness
            .orchestrator()
            .handle_lead_message(LeadMessageCommand::new(LEAD, "Ok, aquí espero", t(2)))
            .await
            .unwrap();
        let sent_before = harness.delivery.sent_texts().len();

        let outcome = harness.orchestrator().release_control(release(t(3), true)).await.unwrap();

        assert!(outcome.reply.is_some());
        assert_eq!(harness.delivery.sent_texts().len(), sent_before + 1);
        let stored = harness.stored().await;
        assert_eq!(stored.messages().last().unwrap().sender, SenderRole::Bot);
    }

    #[tokio::test]
    async fn release_answers_lead_when_an_older_agent_message_arrives_last() {
        let harness = Harness::new();
        started(&harness).await;
        harness.orchestrator().take_control(take(t(1))).await.unwrap();
        harness
            .orchestrator()
            .handle_lead_message(LeadMessageCommand::new(LEAD, "¿Sigues ahí?", t(4)))
            .await
            .unwrap();
        harness
            .orchestrator()
            .handle_agent_message(AgentMessageCommand::new(LEAD, "Reviso inventario", t(3)))
            .await
            .unwrap();

        let outcome = harness.orchestrator().release_control(release(t(5), true)).await.unwrap();

        assert!(outcome.reply.is_some());
    }

    #[tokio::test]
    async fn release_stays_quiet_when_an_older_lead_message_arrives_last() {
        let harness = Harness::new();
        started(&harness).await;
        harness.orchestrator().take_control(take(t(1))).await.unwrap();
        harness
            .orchestrator()
            .handle_agent_message(AgentMessageCommand::new(LEAD, "Ya quedó tu cotización", t(4)))
            .await
            .unwrap();
        harness
            .orchestrator()
            .handle_lead_message(LeadMessageCommand::new(LEAD, "Gracias", t(3)))
            .await
            .unwrap();
        let sent_before = harness.delivery.sent_texts().len();

        let outcome = harness.orchestrator().release_control(release(t(5), true)).await.unwrap();

        assert!(outcome.reply.is_none());
        assert_eq!(harness.delivery.sent_texts().len(), sent_before);
    }
}
