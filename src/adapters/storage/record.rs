//! Durable conversation record and its mapping to the domain aggregate.
//!
//! Every store backend persists this shape: identity, channel, timestamps,
//! an embedded state (control + fields) and the ordered message list.
//! `From<&Conversation>` and `TryFrom<ConversationRecord>` are the only
//! conversions between the two representations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::conversation::{
    ChangeSet, ControlState, Conversation, ConversationMode, FieldName, LeadFields, Message,
    ModeTransition, SenderRole,
};
use crate::domain::foundation::{LeadId, MessageId, OperatorId, Timestamp};
use crate::ports::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub lead_id: String,
    pub channel: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state: StateRecord,
    pub messages: Vec<MessageRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub control: ControlRecord,
    /// Keyed by field name.
    pub fields: BTreeMap<String, FieldRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRecord {
    pub mode: ConversationMode,
    pub advisor: Option<String>,
    pub mode_since: DateTime<Utc>,
    pub last_agent_activity: Option<DateTime<Utc>>,
    pub last_transition: ModeTransition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub value: Option<String>,
    pub filled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub sender: SenderRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub delivered: bool,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl ConversationRecord {
    /// Applies a change-set in place: appends messages, sets changed fields
    /// and replaces the control sub-record.
    pub fn apply(&mut self, changes: &ChangeSet) {
        self.messages
            .extend(changes.appended_messages.iter().map(MessageRecord::from));
        for (name, value) in &changes.changed_fields {
            self.state.fields.insert(
                name.as_str().to_string(),
                FieldRecord {
                    value: Some(value.clone()),
                    filled: true,
                },
            );
        }
        if let Some(control) = &changes.control {
            self.state.control = ControlRecord::from(control);
        }
        let updated_at = *changes.updated_at.as_datetime();
        if updated_at > self.updated_at {
            self.updated_at = updated_at;
        }
    }
}

impl From<&Conversation> for ConversationRecord {
    fn from(conversation: &Conversation) -> Self {
        Self {
            lead_id: conversation.id().to_string(),
            channel: conversation.channel().to_string(),
            created_at: *conversation.created_at().as_datetime(),
            updated_at: *conversation.updated_at().as_datetime(),
            state: StateRecord {
                control: ControlRecord::from(conversation.control()),
                fields: conversation
                    .fields()
                    .iter()
                    .map(|f| {
                        (
                            f.name.as_str().to_string(),
                            FieldRecord {
                                value: f.value.clone(),
                                filled: f.is_filled(),
                            },
                        )
                    })
                    .collect(),
            },
            messages: conversation.messages().iter().map(MessageRecord::from).collect(),
        }
    }
}

impl From<&ControlState> for ControlRecord {
    fn from(control: &ControlState) -> Self {
        Self {
            mode: control.mode,
            advisor: control.advisor.as_ref().map(|a| a.to_string()),
            mode_since: *control.mode_since.as_datetime(),
            last_agent_activity: control.last_agent_activity.map(|t| *t.as_datetime()),
            last_transition: control.last_transition,
        }
    }
}

impl From<&Message> for MessageRecord {
    fn from(message: &Message) -> Self {
        Self {
            id: *message.id.as_uuid(),
            sender: message.sender,
            text: message.text.clone(),
            timestamp: *message.timestamp.as_datetime(),
            delivered: message.delivered,
            read: message.read,
            external_id: message.external_id.clone(),
        }
    }
}

impl TryFrom<ConversationRecord> for Conversation {
    type Error = StoreError;

    fn try_from(record: ConversationRecord) -> Result<Self, Self::Error> {
        let lead_id = LeadId::new(record.lead_id).map_err(corrupt)?;
        let control = record.state.control;
        let advisor = control.advisor.map(OperatorId::new).transpose().map_err(corrupt)?;

        let mut fields = LeadFields::new();
        for (name, field) in record.state.fields {
            match name.parse::<FieldName>() {
                Ok(name) => {
                    let value = if field.filled { field.value } else { None };
                    fields.restore(name, value);
                }
                Err(_) => {
                    tracing::warn!(lead_id = %lead_id, field = %name, "dropping unknown stored field")
                }
            }
        }

        let messages = record
            .messages
            .into_iter()
            .map(|m| Message {
                id: MessageId::from_uuid(m.id),
                sender: m.sender,
                text: m.text,
                timestamp: Timestamp::from_datetime(m.timestamp),
                delivered: m.delivered,
                read: m.read,
                external_id: m.external_id,
            })
            .collect();

        Ok(Conversation::restore(
            lead_id,
            record.channel,
            Timestamp::from_datetime(record.created_at),
            Timestamp::from_datetime(record.updated_at),
            ControlState {
                mode: control.mode,
                advisor,
                mode_since: Timestamp::from_datetime(control.mode_since),
                last_agent_activity: control.last_agent_activity.map(Timestamp::from_datetime),
                last_transition: control.last_transition,
            },
            fields,
            messages,
        ))
    }
}

fn corrupt(err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(err.to_string())
}
