//! ConversationOrchestrator - Processes one inbound event end to end.
//!
//! An orchestrator is built for each unit of work from a set of shared
//! collaborators. It holds no conversation state between events: every
//! operation loads the conversation fresh and commits it back.
//!
//! The operations themselves live in `handlers/`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::domain::conversation::{
    Conversation, DeltaTracker, ModeController, DEFAULT_RECENT_MESSAGES,
};
use crate::domain::foundation::{LeadId, MessageId, Timestamp, ValidationError};
use crate::ports::{ConversationStore, DeliveryChannel, FieldExtractor, ReplyGenerator, StoreError};

use super::crm_queue::CrmSyncQueue;
use super::persistence::{CommitPath, PersistenceDispatcher, PersistenceFailure};

/// Sent when reply generation fails.
pub const APOLOGY_REPLY: &str = "Disculpa, hubo un problema técnico. ¿Podrías repetir tu mensaje?";

/// Caller-visible failures of an orchestrator operation.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Malformed payload; nothing was mutated.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(LeadId),

    /// The message could not be delivered. Conversation state, including the
    /// attempted message, was committed.
    #[error("Delivery failed for {lead_id} (message {message_id} was committed): {reason}")]
    Delivery {
        lead_id: LeadId,
        message_id: MessageId,
        reason: String,
    },

    /// Both persistence paths failed; the mutation was discarded.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceFailure),
}

/// Tunables for the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    pub agent_timeout: Duration,
    pub extraction_timeout: Duration,
    pub recent_messages: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            agent_timeout: Duration::from_secs(30 * 60),
            extraction_timeout: Duration::from_secs(10),
            recent_messages: DEFAULT_RECENT_MESSAGES,
        }
    }
}

/// Everything an orchestrator needs, shared across units of work.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ConversationStore>,
    pub extractor: Arc<dyn FieldExtractor>,
    pub replies: Arc<dyn ReplyGenerator>,
    pub delivery: Arc<dyn DeliveryChannel>,
    pub crm: CrmSyncQueue,
    pub settings: OrchestratorSettings,
}

impl Collaborators {
    /// Builds a fresh orchestrator for one unit of work.
    pub fn orchestrator(&self) -> ConversationOrchestrator {
        ConversationOrchestrator::new(self.clone())
    }
}

/// Outcome of a delivery attempt for a message about to be appended.
pub(crate) struct DeliveryAttempt {
    pub delivered: bool,
    pub failure: Option<String>,
}

pub struct ConversationOrchestrator {
    pub(crate) store: Arc<dyn ConversationStore>,
    pub(crate) extractor: Arc<dyn FieldExtractor>,
    pub(crate) replies: Arc<dyn ReplyGenerator>,
    pub(crate) delivery: Arc<dyn DeliveryChannel>,
    pub(crate) crm: CrmSyncQueue,
    pub(crate) dispatcher: PersistenceDispatcher,
    pub(crate) modes: ModeController,
    pub(crate) settings: OrchestratorSettings,
}

impl ConversationOrchestrator {
    pub fn new(collaborators: Collaborators) -> Self {
        let Collaborators {
            store,
            extractor,
            replies,
            delivery,
            crm,
            settings,
        } = collaborators;
        Self {
            dispatcher: PersistenceDispatcher::new(store.clone()),
            modes: ModeController::new(settings.agent_timeout),
            store,
            extractor,
            replies,
            delivery,
            crm,
            settings,
        }
    }

    /// Loads the conversation or creates it on first contact.
    ///
    /// A concurrent create for the same identity is resolved by loading the
    /// record the other unit of work created.
    pub(crate) async fn load_or_create(
        &self,
        id: &LeadId,
        at: Timestamp,
    ) -> Result<(Conversation, DeltaTracker), OrchestratorError> {
        if let Some(conversation) = self.load(id).await? {
            let tracker = DeltaTracker::new(&conversation);
            return Ok((conversation, tracker));
        }

        let conversation = match self.store.create(id, at).await {
            Ok(conversation) => {
                tracing::info!(lead_id = %id, "conversation created");
                conversation
            }
            Err(StoreError::AlreadyExists(_)) => {
                self.load(id).await?.ok_or_else(|| PersistenceFailure::Load {
                    lead_id: id.clone(),
                    source: StoreError::NotFound(id.clone()),
                })?
            }
            Err(source) => {
                return Err(PersistenceFailure::Create {
                    lead_id: id.clone(),
                    source,
                }
                .into())
            }
        };
        let tracker = DeltaTracker::new(&conversation);
        Ok((conversation, tracker))
    }

    /// Loads a conversation that must already exist.
    pub(crate) async fn load_existing(
        &self,
        id: &LeadId,
    ) -> Result<(Conversation, DeltaTracker), OrchestratorError> {
        let conversation = self
            .load(id)
            .await?
            .ok_or_else(|| OrchestratorError::ConversationNotFound(id.clone()))?;
        let tracker = DeltaTracker::new(&conversation);
        Ok((conversation, tracker))
    }

    async fn load(&self, id: &LeadId) -> Result<Option<Conversation>, PersistenceFailure> {
        self.store.load(id).await.map_err(|source| PersistenceFailure::Load {
            lead_id: id.clone(),
            source,
        })
    }

    /// Runs extraction with a deadline. Failures leave the fields untouched.
    pub(crate) async fn extract(&self, conversation: &Conversation) -> HashMap<String, String> {
        let history = conversation.messages();
        let context = conversation.last_non_lead_message();

        match tokio::time::timeout(
            self.settings.extraction_timeout,
            self.extractor.extract(history, context),
        )
        .await
        {
            Ok(Ok(values)) => values,
            Ok(Err(e)) => {
                tracing::warn!(
                    lead_id = %conversation.id(),
                    error = %e,
                    "extraction failed, continuing without it"
                );
                HashMap::new()
            }
            Err(_) => {
                tracing::warn!(
                    lead_id = %conversation.id(),
                    timeout_secs = self.settings.extraction_timeout.as_secs(),
                    "extraction timed out, continuing without it"
                );
                HashMap::new()
            }
        }
    }

    /// Produces the next bot reply, degrading to the apology text.
    pub(crate) async fn generate_reply(&self, conversation: &Conversation) -> String {
        match self.replies.generate(conversation).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!(lead_id = %conversation.id(), "reply generator returned empty text");
                APOLOGY_REPLY.to_string()
            }
            Err(e) => {
                tracing::warn!(lead_id = %conversation.id(), error = %e, "reply generation failed");
                APOLOGY_REPLY.to_string()
            }
        }
    }

    pub(crate) async fn deliver(&self, to: &LeadId, text: &str) -> DeliveryAttempt {
        match self.delivery.send(to, text).await {
            Ok(true) => DeliveryAttempt {
                delivered: true,
                failure: None,
            },
            Ok(false) => {
                tracing::warn!(lead_id = %to, "channel did not accept message");
                DeliveryAttempt {
                    delivered: false,
                    failure: Some("channel did not accept the message".to_string()),
                }
            }
            Err(e) => {
                tracing::warn!(lead_id = %to, error = %e, "message delivery failed");
                DeliveryAttempt {
                    delivered: false,
                    failure: Some(e.to_string()),
                }
            }
        }
    }

    /// Commits the conversation and schedules the CRM mirror when anything was written.
    pub(crate) async fn commit(
        &self,
        tracker: &DeltaTracker,
        conversation: &Conversation,
    ) -> Result<(), OrchestratorError> {
        let path = self.dispatcher.commit_tracked(tracker, conversation).await?;
        if path != CommitPath::Skipped {
            self.crm.schedule(conversation.clone());
        }
        Ok(())
    }
}

/// Time stamped on outbound messages: now, but never before the triggering event.
pub(crate) fn outbound_time(event_at: Timestamp) -> Timestamp {
    std::cmp::max(event_at, Timestamp::now())
}
