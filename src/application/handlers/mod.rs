//! Orchestrator operations, one module per command or query.

mod agent_message;
mod get_conversation;
mod lead_message;
mod mode_control;

pub use agent_message::{AgentMessageCommand, AgentMessageOutcome};
pub use lead_message::{LeadMessageCommand, LeadMessageOutcome};
pub use mode_control::{ModeControlOutcome, ReleaseControlCommand, TakeControlCommand};
