//! Request and response bodies for the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::{
    AgentMessageCommand, AgentMessageOutcome, LeadMessageCommand, LeadMessageOutcome,
    ModeControlOutcome, ReleaseControlCommand, TakeControlCommand,
};
use crate::domain::conversation::{ConversationMode, FieldName, TransitionTrigger};
use crate::domain::foundation::Timestamp;

fn timestamp_or_now(at: Option<DateTime<Utc>>) -> Timestamp {
    at.map(Timestamp::from_datetime).unwrap_or_else(Timestamp::now)
}

/// A normalised inbound lead event.
#[derive(Debug, Clone, Deserialize)]
pub struct LeadMessageRequest {
    pub lead_id: String,
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Channel message id, used to drop redelivered events.
    #[serde(default)]
    pub event_id: Option<String>,
}

impl From<LeadMessageRequest> for LeadMessageCommand {
    fn from(req: LeadMessageRequest) -> Self {
        let cmd = LeadMessageCommand::new(req.lead_id, req.text, timestamp_or_now(req.timestamp));
        match req.event_id {
            Some(event_id) => cmd.with_event_id(event_id),
            None => cmd,
        }
    }
}

/// An operator message. Agent-side events are stamped with server time, so
/// no timestamp is accepted from the client.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentMessageRequest {
    pub lead_id: String,
    pub text: String,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub takeover: bool,
}

impl From<AgentMessageRequest> for AgentMessageCommand {
    fn from(req: AgentMessageRequest) -> Self {
        let mut cmd = AgentMessageCommand::new(req.lead_id, req.text, Timestamp::now());
        if let Some(operator) = req.operator {
            cmd = cmd.from_operator(operator);
        }
        if req.takeover {
            cmd = cmd.as_takeover();
        }
        cmd
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TakeoverRequest {
    pub lead_id: String,
    pub operator: String,
}

impl From<TakeoverRequest> for TakeControlCommand {
    fn from(req: TakeoverRequest) -> Self {
        TakeControlCommand {
            lead_id: req.lead_id,
            operator: req.operator,
            timestamp: Timestamp::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseRequest {
    pub lead_id: String,
    #[serde(default)]
    pub respond_to_pending: bool,
}

impl From<ReleaseRequest> for ReleaseControlCommand {
    fn from(req: ReleaseRequest) -> Self {
        ReleaseControlCommand {
            lead_id: req.lead_id,
            timestamp: Timestamp::now(),
            respond_to_pending: req.respond_to_pending,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadMessageResponse {
    pub lead_id: String,
    pub duplicate: bool,
    pub mode: ConversationMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionTrigger>,
    pub filled_fields: Vec<FieldName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    pub complete: bool,
}

impl From<LeadMessageOutcome> for LeadMessageResponse {
    fn from(outcome: LeadMessageOutcome) -> Self {
        Self {
            lead_id: outcome.lead_id.to_string(),
            duplicate: outcome.duplicate,
            mode: outcome.mode,
            transition: outcome.transition,
            filled_fields: outcome.filled_fields,
            reply: outcome.reply,
            complete: outcome.complete,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentMessageResponse {
    pub lead_id: String,
    pub message_id: String,
    pub mode: ConversationMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionTrigger>,
    pub delivered: bool,
}

impl From<AgentMessageOutcome> for AgentMessageResponse {
    fn from(outcome: AgentMessageOutcome) -> Self {
        Self {
            lead_id: outcome.lead_id.to_string(),
            message_id: outcome.message_id.to_string(),
            mode: outcome.mode,
            transition: outcome.transition,
            delivered: outcome.delivered,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModeControlResponse {
    pub lead_id: String,
    pub mode: ConversationMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionTrigger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

impl From<ModeControlOutcome> for ModeControlResponse {
    fn from(outcome: ModeControlOutcome) -> Self {
        Self {
            lead_id: outcome.lead_id.to_string(),
            mode: outcome.mode,
            transition: outcome.transition,
            reply: outcome.reply,
        }
    }
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
