//! In-Memory Conversation Store Adapter
//!
//! Keeps durable records in a map behind a lock. Patches are applied under a
//! single write lock, so they are atomic. Failure switches make it usable for
//! exercising the dispatcher's fallback path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::conversation::{ChangeSet, Conversation};
use crate::domain::foundation::{LeadId, Timestamp};
use crate::ports::{ConversationStore, PatchOutcome, StoreError};

use super::record::ConversationRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatchSupport {
    Supported,
    Unsupported,
    Failing,
}

/// In-memory conversation store.
#[derive(Debug, Clone)]
pub struct InMemoryConversationStore {
    records: Arc<RwLock<HashMap<LeadId, ConversationRecord>>>,
    patch_support: PatchSupport,
    failing_overwrite: bool,
    patch_calls: Arc<AtomicUsize>,
    overwrite_calls: Arc<AtomicUsize>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            patch_support: PatchSupport::Supported,
            failing_overwrite: false,
            patch_calls: Arc::new(AtomicUsize::new(0)),
            overwrite_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Reports every patch as unsupported.
    pub fn with_patch_unsupported(mut self) -> Self {
        self.patch_support = PatchSupport::Unsupported;
        self
    }

    /// Fails every patch with a conflict.
    pub fn with_failing_patch(mut self) -> Self {
        self.patch_support = PatchSupport::Failing;
        self
    }

    /// Fails every overwrite with a storage error.
    pub fn with_failing_overwrite(mut self) -> Self {
        self.failing_overwrite = true;
        self
    }

    pub fn patch_calls(&self) -> usize {
        self.patch_calls.load(Ordering::SeqCst)
    }

    pub fn overwrite_calls(&self) -> usize {
        self.overwrite_calls.load(Ordering::SeqCst)
    }

    /// Raw durable record, for inspecting what a write produced.
    pub async fn record(&self, id: &LeadId) -> Option<ConversationRecord> {
        self.records.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(&self, id: &LeadId) -> Result<Option<Conversation>, StoreError> {
        let records = self.records.read().await;
        records.get(id).cloned().map(Conversation::try_from).transpose()
    }

    async fn create(&self, id: &LeadId, at: Timestamp) -> Result<Conversation, StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(id) {
            return Err(StoreError::AlreadyExists(id.clone()));
        }
        let conversation = Conversation::new(id.clone(), at);
        records.insert(id.clone(), ConversationRecord::from(&conversation));
        Ok(conversation)
    }

    async fn patch(&self, id: &LeadId, changes: &ChangeSet) -> Result<PatchOutcome, StoreError> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);
        match self.patch_support {
            PatchSupport::Unsupported => return Ok(PatchOutcome::Unsupported),
            PatchSupport::Failing => return Err(StoreError::Conflict(id.clone())),
            PatchSupport::Supported => {}
        }

        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        record.apply(changes);
        Ok(PatchOutcome::Applied)
    }

    async fn overwrite(&self, id: &LeadId, snapshot: &Conversation) -> Result<(), StoreError> {
        self.overwrite_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_overwrite {
            return Err(StoreError::Io("overwrite disabled".to_string()));
        }
        self.records
            .write()
            .await
            .insert(id.clone(), ConversationRecord::from(snapshot));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::{DeltaTracker, Message};

    fn lead() -> LeadId {
        LeadId::new("5215512345678").unwrap()
    }

    #[tokio::test]
    async fn create_then_load() {
        let store = InMemoryConversationStore::new();
        let created = store.create(&lead(), Timestamp::now()).await.unwrap();

        assert_eq!(store.load(&lead()).await.unwrap(), Some(created));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn create_twice_is_rejected() {
        let store = InMemoryConversationStore::new();
        store.create(&lead(), Timestamp::now()).await.unwrap();

        let result = store.create(&lead(), Timestamp::now()).await;

        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn load_unknown_returns_none() {
        let store = InMemoryConversationStore::new();
        assert!(store.load(&lead()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn patch_of_missing_record_is_not_found() {
        let store = InMemoryConversationStore::new();
        let conv = Conversation::new(lead(), Timestamp::now());
        let tracker = DeltaTracker::new(&conv);
        let mut after = conv.clone();
        after.append_message(Message::from_lead("Hola", Timestamp::now()));

        let result = store.patch(&lead(), &tracker.diff(&after).unwrap()).await;

        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn concurrent_patches_both_append() {
        let store = InMemoryConversationStore::new();
        let base = store.create(&lead(), Timestamp::now()).await.unwrap();
        let tracker = DeltaTracker::new(&base);

        let mut first = base.clone();
        first.append_message(Message::from_lead("uno", Timestamp::now()));
        let mut second = base.clone();
        second.append_message(Message::from_agent("dos", Timestamp::now()));

        store.patch(&lead(), &tracker.diff(&first).unwrap()).await.unwrap();
        store.patch(&lead(), &tracker.diff(&second).unwrap()).await.unwrap();

        let stored = store.load(&lead()).await.unwrap().unwrap();
        assert_eq!(stored.messages().len(), 2);
    }
}
