//! Read view of a conversation for operators.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::foundation::{LeadId, OperatorId, Timestamp};

use super::aggregate::Conversation;
use super::fields::FieldName;
use super::message::Message;
use super::mode::{ConversationMode, ModeTransition};

/// Messages included in a summary by default.
pub const DEFAULT_RECENT_MESSAGES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationSummary {
    pub lead_id: LeadId,
    pub channel: String,
    pub mode: ConversationMode,
    pub advisor: Option<OperatorId>,
    pub last_transition: ModeTransition,
    pub last_agent_activity: Option<Timestamp>,
    pub filled_fields: BTreeMap<FieldName, String>,
    pub complete: bool,
    pub message_count: usize,
    /// Most recent messages, oldest first.
    pub recent_messages: Vec<Message>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ConversationSummary {
    pub fn from_conversation(conversation: &Conversation, recent: usize) -> Self {
        let messages = conversation.messages();
        let start = messages.len().saturating_sub(recent);
        let control = conversation.control();

        Self {
            lead_id: conversation.id().clone(),
            channel: conversation.channel().to_string(),
            mode: control.mode,
            advisor: control.advisor.clone(),
            last_transition: control.last_transition,
            last_agent_activity: control.last_agent_activity,
            filled_fields: conversation
                .fields()
                .iter()
                .filter_map(|f| f.value.clone().map(|v| (f.name, v)))
                .collect(),
            complete: conversation.is_complete(),
            message_count: messages.len(),
            recent_messages: messages[start..].to_vec(),
            created_at: conversation.created_at(),
            updated_at: conversation.updated_at(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn summary_keeps_only_recent_messages() {
        let start = Timestamp::from_unix_secs(1_700_000_000);
        let mut conv = Conversation::new(LeadId::new("5215512345678").unwrap(), start);
        for i in 0..5 {
            conv.append_message(Message::from_lead(format!("mensaje {}", i), start.plus_secs(i)));
        }
        conv.fields_mut()
            .fill_unfilled(&HashMap::from([("nombre".to_string(), "Ana".to_string())]));

        let summary = ConversationSummary::from_conversation(&conv, 2);

        assert_eq!(summary.message_count, 5);
        assert_eq!(summary.recent_messages.len(), 2);
        assert_eq!(summary.recent_messages[0].text, "mensaje 3");
        assert_eq!(summary.filled_fields.len(), 1);
        assert!(!summary.complete);
        assert_eq!(summary.mode, ConversationMode::Bot);
    }
}
