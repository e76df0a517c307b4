//! Application layer - Orchestration of conversation events.
//!
//! Composes the domain rules with the ports: the orchestrator handles one
//! inbound event per unit of work, the persistence dispatcher commits it and
//! the CRM queue mirrors it in the background.

mod crm_queue;
pub mod handlers;
mod orchestrator;
mod persistence;

#[cfg(test)]
pub(crate) mod test_support;

pub use crm_queue::{CrmSyncQueue, DEFAULT_QUEUE_CAPACITY};
pub use handlers::{
    AgentMessageCommand, AgentMessageOutcome, LeadMessageCommand, LeadMessageOutcome,
    ModeControlOutcome, ReleaseControlCommand, TakeControlCommand,
};
pub use orchestrator::{
    Collaborators, ConversationOrchestrator, OrchestratorError, OrchestratorSettings, APOLOGY_REPLY,
};
pub use persistence::{CommitPath, PersistenceDispatcher, PersistenceFailure};
