//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, error types and the state machine
//! trait that form the vocabulary of the lead-qualification domain.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{LeadId, MessageId, OperatorId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
