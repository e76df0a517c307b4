//! Delta tracking between a persisted snapshot and the mutated conversation.
//!
//! The tracker remembers only what it needs to describe a mutation: the
//! history length and tail, the field values and the control state. The
//! resulting change-set is proportional to the mutation, not to the history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{LeadId, MessageId, Timestamp};

use super::aggregate::Conversation;
use super::fields::{FieldName, LeadFields};
use super::message::Message;
use super::mode::ControlState;

/// Everything that changed in one handling cycle, dispatched as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub lead_id: LeadId,
    /// New messages in arrival order, to be appended after the stored history.
    pub appended_messages: Vec<Message>,
    /// Fields filled during this cycle.
    pub changed_fields: BTreeMap<FieldName, String>,
    pub mode_changed: bool,
    pub advisor_changed: bool,
    /// Full control sub-record, present when any part of it changed.
    pub control: Option<ControlState>,
    pub updated_at: Timestamp,
}

impl ChangeSet {
    /// True when nothing needs to be written.
    pub fn is_empty(&self) -> bool {
        self.appended_messages.is_empty()
            && self.changed_fields.is_empty()
            && self.control.is_none()
    }

    /// Number of logical sub-mutations carried by this change-set.
    pub fn operation_count(&self) -> usize {
        self.appended_messages.len()
            + self.changed_fields.len()
            + usize::from(self.control.is_some())
    }
}

/// The mutation cannot be described as a patch; the full snapshot must be written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeltaError {
    #[error("conversation identity changed from {expected} to {actual}")]
    IdentityMismatch { expected: LeadId, actual: LeadId },

    #[error("message history was rewritten (expected {expected} stored messages as prefix)")]
    HistoryRewritten { expected: usize },

    #[error("filled field '{0}' was changed or cleared")]
    FieldRewritten(FieldName),
}

/// Remembers the last persisted snapshot of a conversation.
#[derive(Debug, Clone)]
pub struct DeltaTracker {
    lead_id: LeadId,
    message_count: usize,
    tail: Option<MessageId>,
    fields: LeadFields,
    control: ControlState,
}

impl DeltaTracker {
    /// Captures the baseline from a freshly loaded or created conversation.
    pub fn new(baseline: &Conversation) -> Self {
        Self {
            lead_id: baseline.id().clone(),
            message_count: baseline.messages().len(),
            tail: baseline.messages().last().map(|m| m.id),
            fields: baseline.fields().clone(),
            control: baseline.control().clone(),
        }
    }

    /// Computes the change-set that turns the baseline into `after`.
    pub fn diff(&self, after: &Conversation) -> Result<ChangeSet, DeltaError> {
        if after.id() != &self.lead_id {
            return Err(DeltaError::IdentityMismatch {
                expected: self.lead_id.clone(),
                actual: after.id().clone(),
            });
        }

        let messages = after.messages();
        let prefix_intact = messages.len() >= self.message_count
            && match self.tail {
                Some(tail) => messages[self.message_count - 1].id == tail,
                None => true,
            };
        if !prefix_intact {
            return Err(DeltaError::HistoryRewritten {
                expected: self.message_count,
            });
        }

        let mut changed_fields = BTreeMap::new();
        for field in after.fields().iter() {
            let before = self.fields.get(field.name);
            match (before, field.value.as_deref()) {
                (Some(old), Some(new)) if old == new => {}
                (Some(_), _) => return Err(DeltaError::FieldRewritten(field.name)),
                (None, Some(new)) => {
                    changed_fields.insert(field.name, new.to_string());
                }
                (None, None) => {}
            }
        }

        let control = after.control();
        let control_changed = control != &self.control;

        Ok(ChangeSet {
            lead_id: self.lead_id.clone(),
            appended_messages: messages[self.message_count..].to_vec(),
            changed_fields,
            mode_changed: control.mode != self.control.mode,
            advisor_changed: control.advisor != self.control.advisor,
            control: control_changed.then(|| control.clone()),
            updated_at: after.updated_at(),
        })
    }
}
