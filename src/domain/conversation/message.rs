//! Messages exchanged with a lead.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{MessageId, Timestamp};

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Lead,
    Bot,
    Agent,
}

impl fmt::Display for SenderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SenderRole::Lead => "lead",
            SenderRole::Bot => "bot",
            SenderRole::Agent => "agent",
        };
        write!(f, "{}", s)
    }
}

/// A single message in a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: SenderRole,
    pub text: String,
    pub timestamp: Timestamp,
    pub delivered: bool,
    pub read: bool,
    /// Channel-assigned identifier, used to recognise redelivered events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl Message {
    fn new(sender: SenderRole, text: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            id: MessageId::new(),
            sender,
            text: text.into(),
            timestamp,
            delivered: false,
            read: false,
            external_id: None,
        }
    }

    /// A message received from the lead. Inbound messages are delivered by definition.
    pub fn from_lead(text: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            delivered: true,
            ..Self::new(SenderRole::Lead, text, timestamp)
        }
    }

    /// An automated reply.
    pub fn from_bot(text: impl Into<String>, timestamp: Timestamp) -> Self {
        Self::new(SenderRole::Bot, text, timestamp)
    }

    /// A message written by a human operator.
    pub fn from_agent(text: impl Into<String>, timestamp: Timestamp) -> Self {
        Self::new(SenderRole::Agent, text, timestamp)
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// Records the outcome of outbound delivery.
    pub fn with_delivery(mut self, delivered: bool) -> Self {
        self.delivered = delivered;
        self
    }

    pub fn is_from(&self, role: SenderRole) -> bool {
        self.sender == role
    }
}
