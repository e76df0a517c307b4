//! Conversation Store Port - Durable repository of conversations.
//!
//! Keyed by lead identity. Supports full-record reads and writes plus a
//! granular patch of a change-set. Backends that cannot apply a change-set
//! atomically must report `PatchOutcome::Unsupported` rather than apply part
//! of it.

use async_trait::async_trait;

use crate::domain::conversation::{ChangeSet, Conversation};
use crate::domain::foundation::{LeadId, Timestamp};

/// Errors that can occur during conversation store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Conversation not found: {0}")]
    NotFound(LeadId),

    #[error("Conversation already exists: {0}")]
    AlreadyExists(LeadId),

    #[error("Write conflict for conversation {0}")]
    Conflict(LeadId),

    #[error("Failed to serialize conversation: {0}")]
    Serialization(String),

    #[error("Stored record is invalid: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Result of a granular patch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Every operation of the change-set was applied atomically.
    Applied,
    /// The backend cannot apply this change-set; nothing was written.
    Unsupported,
}

/// Port for loading and persisting conversations.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Loads a conversation, or `None` when the identity is unknown.
    async fn load(&self, id: &LeadId) -> Result<Option<Conversation>, StoreError>;

    /// Creates an empty conversation for the identity.
    ///
    /// # Errors
    /// Returns `StoreError::AlreadyExists` when a record already exists.
    async fn create(&self, id: &LeadId, at: Timestamp) -> Result<Conversation, StoreError>;

    /// Applies a change-set as one atomic request.
    ///
    /// Messages are appended after the stored history; only changed
    /// sub-fields are written.
    async fn patch(&self, id: &LeadId, changes: &ChangeSet) -> Result<PatchOutcome, StoreError>;

    /// Replaces the whole record with the snapshot (last write wins).
    async fn overwrite(&self, id: &LeadId, snapshot: &Conversation) -> Result<(), StoreError>;
}
