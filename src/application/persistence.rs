//! PersistenceDispatcher - Commits one handling cycle to the conversation store.
//!
//! The primary path sends the change-set as a single patch. Any failure of
//! that path (unsupported, conflict, store error) triggers one immediate
//! overwrite with the full snapshot. Callers only observe success or a
//! terminal failure; `CommitPath` is reported for logging and tests.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::conversation::{ChangeSet, Conversation, DeltaTracker};
use crate::domain::foundation::LeadId;
use crate::ports::{ConversationStore, PatchOutcome, StoreError};

/// Which write reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPath {
    /// Nothing changed; no request was made.
    Skipped,
    /// The change-set was applied as one patch.
    Patch,
    /// The patch path failed and the full snapshot was written.
    Fallback,
    /// The mutation could not be expressed as a change-set; the snapshot was written.
    Overwrite,
}

impl CommitPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitPath::Skipped => "skipped",
            CommitPath::Patch => "patch",
            CommitPath::Fallback => "fallback",
            CommitPath::Overwrite => "overwrite",
        }
    }
}

/// Terminal persistence failures, surfaced to the caller.
#[derive(Debug, Error)]
pub enum PersistenceFailure {
    #[error("failed to load conversation {lead_id}: {source}")]
    Load {
        lead_id: LeadId,
        #[source]
        source: StoreError,
    },

    #[error("failed to create conversation {lead_id}: {source}")]
    Create {
        lead_id: LeadId,
        #[source]
        source: StoreError,
    },

    /// Both the patch and the full-snapshot overwrite failed.
    #[error("failed to commit conversation {lead_id}: {source}")]
    Commit {
        lead_id: LeadId,
        #[source]
        source: StoreError,
    },
}

/// Chooses between patch and full overwrite for each commit.
#[derive(Clone)]
pub struct PersistenceDispatcher {
    store: Arc<dyn ConversationStore>,
}

impl PersistenceDispatcher {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    /// Commits a change-set, falling back to the full snapshot on any patch failure.
    pub async fn commit(
        &self,
        id: &LeadId,
        changes: &ChangeSet,
        snapshot: &Conversation,
    ) -> Result<CommitPath, PersistenceFailure> {
        if changes.is_empty() {
            tracing::debug!(lead_id = %id, "nothing to commit");
            return Ok(CommitPath::Skipped);
        }

        match self.store.patch(id, changes).await {
            Ok(PatchOutcome::Applied) => {
                tracing::info!(
                    lead_id = %id,
                    path = CommitPath::Patch.as_str(),
                    operations = changes.operation_count(),
                    "conversation committed"
                );
                return Ok(CommitPath::Patch);
            }
            Ok(PatchOutcome::Unsupported) => {
                tracing::warn!(lead_id = %id, "patch unsupported by store, writing full snapshot");
            }
            Err(e) => {
                tracing::warn!(lead_id = %id, error = %e, "patch failed, writing full snapshot");
            }
        }

        self.overwrite(id, snapshot, CommitPath::Fallback).await
    }

    /// Diffs the snapshot against the tracker's baseline and commits it.
    ///
    /// When the mutation cannot be described as a change-set the snapshot is
    /// written directly.
    pub async fn commit_tracked(
        &self,
        tracker: &DeltaTracker,
        snapshot: &Conversation,
    ) -> Result<CommitPath, PersistenceFailure> {
        match tracker.diff(snapshot) {
            Ok(changes) => self.commit(snapshot.id(), &changes, snapshot).await,
            Err(e) => {
                tracing::warn!(
                    lead_id = %snapshot.id(),
                    error = %e,
                    "change-set unavailable, writing full snapshot"
                );
                self.overwrite(snapshot.id(), snapshot, CommitPath::Overwrite).await
            }
        }
    }

    async fn overwrite(
        &self,
        id: &LeadId,
        snapshot: &Conversation,
        path: CommitPath,
    ) -> Result<CommitPath, PersistenceFailure> {
        match self.store.overwrite(id, snapshot).await {
            Ok(()) => {
                tracing::info!(lead_id = %id, path = path.as_str(), "conversation committed");
                Ok(path)
            }
            Err(source) => {
                tracing::error!(lead_id = %id, error = %source, "full snapshot overwrite failed");
                Err(PersistenceFailure::Commit {
                    lead_id: id.clone(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryConversationStore;
    use crate::domain::conversation::Message;
    use crate::domain::foundation::Timestamp;
    use std::collections::HashMap;

    fn t(minutes: i64) -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000).plus_minutes(minutes)
    }

    async fn mutated(store: &InMemoryConversationStore) -> (DeltaTracker, Conversation) {
        let id = LeadId::new("5215512345678").unwrap();
        let mut conv = store.create(&id, t(0)).await.unwrap();
        let tracker = DeltaTracker::new(&conv);
        conv.append_message(Message::from_lead("Soy Ana López", t(1)));
        conv.fields_mut()
            .fill_unfilled(&HashMap::from([("nombre".to_string(), "Ana López".to_string())]));
        (tracker, conv)
    }

    #[tokio::test]
    async fn patch_path_issues_a_single_request() {
        let store = Arc::new(InMemoryConversationStore::new());
        let (tracker, conv) = mutated(&store).await;
        let dispatcher = PersistenceDispatcher::new(store.clone());

        let path = dispatcher.commit_tracked(&tracker, &conv).await.unwrap();

        assert_eq!(path, CommitPath::Patch);
        assert_eq!(store.patch_calls(), 1);
        assert_eq!(store.overwrite_calls(), 0);
        assert_eq!(store.load(conv.id()).await.unwrap(), Some(conv));
    }

    #[tokio::test]
    async fn unsupported_patch_falls_back_to_overwrite() {
        let store = Arc::new(InMemoryConversationStore::new().with_patch_unsupported());
        let (tracker, conv) = mutated(&store).await;
        let dispatcher = PersistenceDispatcher::new(store.clone());

        let path = dispatcher.commit_tracked(&tracker, &conv).await.unwrap();

        assert_eq!(path, CommitPath::Fallback);
        assert_eq!(store.overwrite_calls(), 1);
        assert_eq!(store.load(conv.id()).await.unwrap(), Some(conv));
    }

    #[tokio::test]
    async fn failing_patch_falls_back_to_overwrite() {
        let store = Arc::new(InMemoryConversationStore::new().with_failing_patch());
        let (tracker, conv) = mutated(&store).await;
        let dispatcher = PersistenceDispatcher::new(store.clone());

        let path = dispatcher.commit_tracked(&tracker, &conv).await.unwrap();

        assert_eq!(path, CommitPath::Fallback);
        assert_eq!(store.load(conv.id()).await.unwrap(), Some(conv));
    }

    #[tokio::test]
    async fn both_paths_failing_is_terminal() {
        let store = Arc::new(
            InMemoryConversationStore::new()
                .with_failing_patch()
                .with_failing_overwrite(),
        );
        let (tracker, conv) = mutated(&store).await;
        let dispatcher = PersistenceDispatcher::new(store.clone());

        let err = dispatcher.commit_tracked(&tracker, &conv).await.unwrap_err();

        assert!(matches!(err, PersistenceFailure::Commit { .. }));
    }

    #[tokio::test]
    async fn empty_change_set_skips_the_store() {
        let store = Arc::new(InMemoryConversationStore::new());
        let id = LeadId::new("5215512345678").unwrap();
        let conv = store.create(&id, t(0)).await.unwrap();
        let tracker = DeltaTracker::new(&conv);
        let dispatcher = PersistenceDispatcher::new(store.clone());

        let path = dispatcher.commit_tracked(&tracker, &conv).await.unwrap();

        assert_eq!(path, CommitPath::Skipped);
        assert_eq!(store.patch_calls(), 0);
        assert_eq!(store.overwrite_calls(), 0);
    }

    #[tokio::test]
    async fn rewritten_history_goes_straight_to_overwrite() {
        let store = Arc::new(InMemoryConversationStore::new());
        let (tracker, conv) = mutated(&store).await;
        let dispatcher = PersistenceDispatcher::new(store.clone());
        dispatcher.commit_tracked(&tracker, &conv).await.unwrap();

        let tracker = DeltaTracker::new(&conv);
        let rebuilt = Conversation::new(conv.id().clone(), t(0));

        let path = dispatcher.commit_tracked(&tracker, &rebuilt).await.unwrap();

        assert_eq!(path, CommitPath::Overwrite);
        assert_eq!(store.patch_calls(), 1);
    }
}
