//! Test doubles shared by the handler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::adapters::crm::LoggingCrmSync;
use crate::adapters::replies::ScriptedReplyGenerator;
use crate::adapters::storage::InMemoryConversationStore;
use crate::domain::conversation::{Conversation, Message};
use crate::domain::foundation::{LeadId, Timestamp};
use crate::ports::{
    DeliveryChannel, DeliveryError, ExtractionError, FieldExtractor, ReplyError, ReplyGenerator,
};

pub use crate::ports::ConversationStore;

use super::{Collaborators, ConversationOrchestrator, CrmSyncQueue, OrchestratorSettings};

pub const LEAD: &str = "5215512345678";

pub fn lead() -> LeadId {
    LeadId::new(LEAD).unwrap()
}

pub fn t(minutes: i64) -> Timestamp {
    Timestamp::from_unix_secs(1_700_000_000).plus_minutes(minutes)
}

/// Extractor returning a canned mapping once, then nothing.
#[derive(Default)]
pub struct StubExtractor {
    next: Mutex<HashMap<String, String>>,
    fail: AtomicBool,
    contexts: Mutex<Vec<Option<String>>>,
}

impl StubExtractor {
    pub fn respond_with(&self, pairs: &[(&str, &str)]) {
        *self.next.lock().unwrap() = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
    }

    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Text of the context message seen by each call.
    pub fn contexts(&self) -> Vec<Option<String>> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl FieldExtractor for StubExtractor {
    async fn extract(
        &self,
        _history: &[Message],
        context: Option<&Message>,
    ) -> Result<HashMap<String, String>, ExtractionError> {
        self.contexts
            .lock()
            .unwrap()
            .push(context.map(|m| m.text.clone()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExtractionError::Unavailable("stub failure".to_string()));
        }
        Ok(std::mem::take(&mut *self.next.lock().unwrap()))
    }
}

/// Delivery channel that records what it was asked to send.
#[derive(Default)]
pub struct RecordingDelivery {
    sent: Mutex<Vec<(LeadId, String)>>,
    fail: AtomicBool,
}

impl RecordingDelivery {
    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, text)| text.clone()).collect()
    }
}

#[async_trait]
impl DeliveryChannel for RecordingDelivery {
    async fn send(&self, to: &LeadId, text: &str) -> Result<bool, DeliveryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeliveryError::Unreachable("stub failure".to_string()));
        }
        self.sent.lock().unwrap().push((to.clone(), text.to_string()));
        Ok(true)
    }
}

pub struct FailingReplies;

#[async_trait]
impl ReplyGenerator for FailingReplies {
    async fn generate(&self, _conversation: &Conversation) -> Result<String, ReplyError> {
        Err(ReplyError::Failed("stub failure".to_string()))
    }
}

pub struct Harness {
    pub store: Arc<InMemoryConversationStore>,
    pub extractor: Arc<StubExtractor>,
    pub delivery: Arc<RecordingDelivery>,
    pub replies: Arc<dyn ReplyGenerator>,
    pub crm: CrmSyncQueue,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(InMemoryConversationStore::new())
    }

    pub fn with_store(store: InMemoryConversationStore) -> Self {
        let (crm, _worker) = CrmSyncQueue::start(Arc::new(LoggingCrmSync), 16);
        Self {
            store: Arc::new(store),
            extractor: Arc::new(StubExtractor::default()),
            delivery: Arc::new(RecordingDelivery::default()),
            replies: Arc::new(ScriptedReplyGenerator::new()),
            crm,
        }
    }

    pub fn with_failing_replies(mut self) -> Self {
        self.replies = Arc::new(FailingReplies);
        self
    }

    pub fn orchestrator(&self) -> ConversationOrchestrator {
        Collaborators {
            store: self.store.clone(),
            extractor: self.extractor.clone(),
            replies: self.replies.clone(),
            delivery: self.delivery.clone(),
            crm: self.crm.clone(),
            settings: OrchestratorSettings::default(),
        }
        .orchestrator()
    }

    pub async fn stored(&self) -> Conversation {
        self.store.load(&lead()).await.unwrap().expect("conversation stored")
    }
}
