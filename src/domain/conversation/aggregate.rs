//! Conversation aggregate.
//!
//! A conversation is keyed by the lead's channel identity and owns its
//! messages, lead fields and control state exclusively.
//!
//! # Aggregate Boundary
//!
//! - Messages are appended through the conversation and never reordered
//! - Fields are written through `fields_mut`, which only fills unfilled slots
//! - Mode changes go through the `ModeController`

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{LeadId, Timestamp};

use super::fields::LeadFields;
use super::message::{Message, SenderRole};
use super::mode::{ControlState, ConversationMode};

/// Channel used when none is specified.
pub const DEFAULT_CHANNEL: &str = "whatsapp";

/// Conversation aggregate.
///
/// # Invariants
///
/// - `id` is immutable
/// - `messages` keep arrival order; business logic filters by role
/// - `updated_at` is never before `created_at`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    id: LeadId,
    channel: String,
    created_at: Timestamp,
    updated_at: Timestamp,
    control: ControlState,
    fields: LeadFields,
    messages: Vec<Message>,
}

impl Conversation {
    /// Starts an empty conversation in bot mode.
    pub fn new(id: LeadId, at: Timestamp) -> Self {
        Self {
            id,
            channel: DEFAULT_CHANNEL.to_string(),
            created_at: at,
            updated_at: at,
            control: ControlState::new(at),
            fields: LeadFields::new(),
            messages: Vec::new(),
        }
    }

    /// Reconstitutes a conversation from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: LeadId,
        channel: String,
        created_at: Timestamp,
        updated_at: Timestamp,
        control: ControlState,
        fields: LeadFields,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            id,
            channel,
            created_at,
            updated_at,
            control,
            fields,
            messages,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &LeadId {
        &self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn control(&self) -> &ControlState {
        &self.control
    }

    pub fn mode(&self) -> ConversationMode {
        self.control.mode
    }

    pub fn fields(&self) -> &LeadFields {
        &self.fields
    }

    /// Messages in arrival order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_complete(&self) -> bool {
        self.fields.is_complete()
    }

    /// Most recent message sent by the bot or an agent.
    ///
    /// This is the context the lead is most likely answering, whether or not
    /// it was phrased as a question.
    pub fn last_non_lead_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| !m.is_from(SenderRole::Lead))
    }

    pub fn last_message_from(&self, role: SenderRole) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_from(role))
    }

    /// True when the lead spoke after the last bot or agent message.
    ///
    /// Compares by timestamp within each role, since arrival order across
    /// roles can differ from the order events happened in.
    pub fn lead_awaits_reply(&self) -> bool {
        match (self.last_message_from(SenderRole::Lead), self.last_non_lead_message()) {
            (Some(lead), Some(other)) => lead.timestamp.is_after(&other.timestamp),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// True when a message with this channel id is already in the history.
    pub fn contains_external_id(&self, external_id: &str) -> bool {
        self.messages
            .iter()
            .any(|m| m.external_id.as_deref() == Some(external_id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Appends a message at the end of the history.
    ///
    /// Out-of-order timestamps are kept as they arrive.
    pub fn append_message(&mut self, message: Message) {
        if let Some(last) = self.messages.last() {
            if message.timestamp.is_before(&last.timestamp) {
                tracing::debug!(
                    lead_id = %self.id,
                    message_id = %message.id,
                    "appending message with timestamp earlier than history tail"
                );
            }
        }
        self.touch(message.timestamp);
        self.messages.push(message);
    }

    pub fn fields_mut(&mut self) -> &mut LeadFields {
        &mut self.fields
    }

    pub(crate) fn control_mut(&mut self) -> &mut ControlState {
        &mut self.control
    }

    /// Advances `updated_at`; never moves it backwards.
    pub fn touch(&mut self, at: Timestamp) {
        if at.is_after(&self.updated_at) {
            self.updated_at = at;
        }
    }
}
