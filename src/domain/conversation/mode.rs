//! Conversation mode and the control sub-record that governs hand-off.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{OperatorId, StateMachine, Timestamp};

/// Who drives the conversation: the automated pipeline or a human operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationMode {
    #[default]
    Bot,
    Agent,
}

impl ConversationMode {
    /// Returns true when automated replies are allowed.
    pub fn replies_automatically(&self) -> bool {
        matches!(self, ConversationMode::Bot)
    }
}

impl StateMachine for ConversationMode {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ConversationMode::*;
        matches!((self, target), (Bot, Agent) | (Agent, Bot))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ConversationMode::*;
        match self {
            Bot => vec![Agent],
            Agent => vec![Bot],
        }
    }
}

impl fmt::Display for ConversationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConversationMode::Bot => "bot",
            ConversationMode::Agent => "agent",
        };
        write!(f, "{}", s)
    }
}

/// What caused a mode transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionTrigger {
    Initial,
    ManualTakeover,
    Timeout,
    ManualRelease,
}

impl fmt::Display for TransitionTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransitionTrigger::Initial => "initial",
            TransitionTrigger::ManualTakeover => "manual-takeover",
            TransitionTrigger::Timeout => "timeout",
            TransitionTrigger::ManualRelease => "manual-release",
        };
        write!(f, "{}", s)
    }
}

/// The most recent mode transition of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeTransition {
    pub previous: ConversationMode,
    pub current: ConversationMode,
    pub trigger: TransitionTrigger,
    pub at: Timestamp,
}

impl ModeTransition {
    /// The implicit transition every conversation starts with.
    pub fn initial(at: Timestamp) -> Self {
        Self {
            previous: ConversationMode::Bot,
            current: ConversationMode::Bot,
            trigger: TransitionTrigger::Initial,
            at,
        }
    }
}

/// Mode-related state of a conversation, persisted as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    pub mode: ConversationMode,
    /// Operator assigned to the lead, if any.
    pub advisor: Option<OperatorId>,
    /// When the current mode was entered.
    pub mode_since: Timestamp,
    /// Last time an agent sent a message to this lead.
    pub last_agent_activity: Option<Timestamp>,
    pub last_transition: ModeTransition,
}

impl ControlState {
    /// Fresh control state: bot mode, no advisor.
    pub fn new(at: Timestamp) -> Self {
        Self {
            mode: ConversationMode::Bot,
            advisor: None,
            mode_since: at,
            last_agent_activity: None,
            last_transition: ModeTransition::initial(at),
        }
    }

    /// Reference point for agent inactivity.
    ///
    /// Agent activity that predates the current agent session does not count;
    /// without any agent message in this session the mode entry time is used.
    pub fn agent_inactivity_reference(&self) -> Timestamp {
        match self.last_agent_activity {
            Some(activity) if !activity.is_before(&self.mode_since) => activity,
            _ => self.mode_since,
        }
    }
}
