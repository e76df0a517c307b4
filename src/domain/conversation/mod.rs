//! Conversation domain module.
//!
//! Lead-qualification conversations: messages, slot-filled lead fields,
//! bot/agent mode control and the delta tracking used to persist mutations.

mod aggregate;
mod delta;
mod fields;
mod message;
mod mode;
mod mode_controller;
mod summary;
mod vocabulary;

pub use aggregate::{Conversation, DEFAULT_CHANNEL};
pub use delta::{ChangeSet, DeltaError, DeltaTracker};
pub use fields::{
    FieldName, LeadField, LeadFields, MachineryType, PendingField, HELP_MACHINERY, HELP_OTHER,
};
pub use message::{Message, SenderRole};
pub use mode::{ControlState, ConversationMode, ModeTransition, TransitionTrigger};
pub use mode_controller::{
    ModeController, ModeEvaluation, ModeEvent, DEFAULT_AGENT_TIMEOUT_MINUTES,
};
pub use summary::{ConversationSummary, DEFAULT_RECENT_MESSAGES};
pub use vocabulary::{machinery_mentions, normalize, words};
