//! End-to-end conversation flows through the orchestrator.
//!
//! Uses the in-memory store, the keyword extractor and the scripted reply
//! generator, with a recording delivery channel and CRM sync so the tests
//! can see what left the system.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use leadline::adapters::extraction::KeywordFieldExtractor;
use leadline::adapters::replies::ScriptedReplyGenerator;
use leadline::adapters::storage::{ConversationRecord, InMemoryConversationStore};
use leadline::application::{
    AgentMessageCommand, AgentMessageOutcome, Collaborators, CrmSyncQueue, LeadMessageCommand,
    LeadMessageOutcome, OrchestratorError, OrchestratorSettings, ReleaseControlCommand,
    TakeControlCommand,
};
use leadline::domain::conversation::{
    Conversation, ConversationMode, FieldName, SenderRole, TransitionTrigger,
};
use leadline::domain::foundation::{LeadId, Timestamp};
use leadline::ports::{ConversationStore, CrmSync, DeliveryChannel, DeliveryError, SyncError};

// =============================================================================
// Test Infrastructure
// =============================================================================

const LEAD: &str = "5215512345678";

fn lead() -> LeadId {
    LeadId::new(LEAD).unwrap()
}

/// Fixed base time plus `minutes`.
fn t(minutes: i64) -> Timestamp {
    Timestamp::from_unix_secs(1_767_225_600).plus_minutes(minutes)
}

#[derive(Default)]
struct RecordingDelivery {
    sent: Mutex<Vec<String>>,
}

impl RecordingDelivery {
    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryChannel for RecordingDelivery {
    async fn send(&self, _to: &LeadId, text: &str) -> Result<bool, DeliveryError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(true)
    }
}

struct RejectingDelivery;

#[async_trait]
impl DeliveryChannel for RejectingDelivery {
    async fn send(&self, _to: &LeadId, _text: &str) -> Result<bool, DeliveryError> {
        Err(DeliveryError::Unreachable("connection reset".to_string()))
    }
}

#[derive(Default)]
struct RecordingCrm {
    synced: Mutex<Vec<LeadId>>,
}

#[async_trait]
impl CrmSync for RecordingCrm {
    async fn sync(&self, snapshot: &Conversation) -> Result<(), SyncError> {
        self.synced.lock().unwrap().push(snapshot.id().clone());
        Ok(())
    }
}

struct TestApp {
    store: Arc<InMemoryConversationStore>,
    delivery: Arc<RecordingDelivery>,
    crm: Arc<RecordingCrm>,
    collaborators: Collaborators,
}

impl TestApp {
    fn new() -> Self {
        Self::with_store(InMemoryConversationStore::new())
    }

    fn with_store(store: InMemoryConversationStore) -> Self {
        let store = Arc::new(store);
        let delivery = Arc::new(RecordingDelivery::default());
        let crm = Arc::new(RecordingCrm::default());
        let (queue, _worker) = CrmSyncQueue::start(crm.clone(), 16);
        let collaborators = Collaborators {
            store: store.clone(),
            extractor: Arc::new(KeywordFieldExtractor::new()),
            replies: Arc::new(ScriptedReplyGenerator::new()),
            delivery: delivery.clone(),
            crm: queue,
            settings: OrchestratorSettings::default(),
        };
        Self {
            store,
            delivery,
            crm,
            collaborators,
        }
    }

    async fn lead_says(&self, text: &str, at: Timestamp) -> LeadMessageOutcome {
        self.collaborators
            .orchestrator()
            .handle_lead_message(LeadMessageCommand::new(LEAD, text, at))
            .await
            .unwrap()
    }

    async fn agent_says(&self, text: &str, at: Timestamp) -> AgentMessageOutcome {
        self.collaborators
            .orchestrator()
            .handle_agent_message(AgentMessageCommand::new(LEAD, text, at).from_operator("maria"))
            .await
            .unwrap()
    }

    async fn conversation(&self) -> Conversation {
        self.store.load(&lead()).await.unwrap().unwrap()
    }

    async fn crm_syncs(&self) -> usize {
        // The worker runs in the background; give it a moment to drain.
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.crm.synced.lock().unwrap().len()
    }
}

/// A record with generated ids and wall-clock outbound times removed.
fn comparable(record: &ConversationRecord) -> serde_json::Value {
    let messages: Vec<_> = record
        .messages
        .iter()
        .map(|m| (m.sender, m.text.clone(), m.delivered, m.external_id.clone()))
        .collect();
    serde_json::json!({
        "lead_id": record.lead_id,
        "fields": record.state.fields,
        "mode": record.state.control.mode,
        "advisor": record.state.control.advisor,
        "last_agent_activity": record.state.control.last_agent_activity,
        "messages": messages,
    })
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn unknown_machinery_stays_unfilled_but_gets_a_reply() {
    let app = TestApp::new();

    let outcome = app.lead_says("me interesa una excavadora", t(0)).await;

    assert_eq!(outcome.mode, ConversationMode::Bot);
    assert!(outcome.reply.is_some());
    let conversation = app.conversation().await;
    assert!(!conversation.fields().is_filled(FieldName::TipoMaquinaria));
    assert_eq!(conversation.messages().len(), 2);
    assert_eq!(conversation.messages()[0].sender, SenderRole::Lead);
    assert_eq!(conversation.messages()[1].sender, SenderRole::Bot);
    assert_eq!(app.delivery.sent().len(), 1);
}

#[tokio::test]
async fn confirmation_of_agent_statement_fills_machinery_without_bot_reply() {
    let app = TestApp::new();
    app.lead_says("Hola", t(0)).await;

    let agent = app.agent_says("Supongo que necesitas un rompedor", t(1)).await;
    assert_eq!(agent.mode, ConversationMode::Agent);
    assert_eq!(agent.transition, Some(TransitionTrigger::ManualTakeover));

    let sent_before = app.delivery.sent().len();
    let outcome = app.lead_says("Así es", t(2)).await;

    assert_eq!(outcome.mode, ConversationMode::Agent);
    assert!(outcome.reply.is_none());
    assert!(outcome.filled_fields.contains(&FieldName::TipoMaquinaria));
    let conversation = app.conversation().await;
    assert_eq!(conversation.fields().get(FieldName::TipoMaquinaria), Some("rompedores"));
    assert_eq!(conversation.fields().get(FieldName::TipoAyuda), Some("maquinaria"));
    // Nothing new went out to the lead.
    assert_eq!(app.delivery.sent().len(), sent_before);
}

#[tokio::test]
async fn keyword_flow_moves_from_help_type_to_machinery_details() {
    let app = TestApp::new();

    let first = app.lead_says("Me llamo Ana López", t(0)).await;
    assert!(first.reply.unwrap().starts_with("¿En qué te puedo ayudar?"));

    let second = app.lead_says("Maquinaria", t(1)).await;
    assert_eq!(second.filled_fields, vec![FieldName::TipoAyuda]);
    assert!(second.reply.unwrap().starts_with("¿Qué tipo de maquinaria necesitas?"));

    // A bare yes to the catalogue question picks nothing.
    let third = app.lead_says("Sí", t(2)).await;
    assert!(third.filled_fields.is_empty());
    assert!(third.reply.unwrap().starts_with("¿Qué tipo de maquinaria necesitas?"));

    let fourth = app.lead_says("Un compresor", t(3)).await;
    assert_eq!(fourth.filled_fields, vec![FieldName::TipoMaquinaria]);
    assert!(fourth.reply.unwrap().contains("volumen de aire"));

    let conversation = app.conversation().await;
    assert_eq!(conversation.fields().get(FieldName::Nombre), Some("Ana López"));
    assert_eq!(conversation.fields().get(FieldName::TipoAyuda), Some("maquinaria"));
    assert_eq!(conversation.fields().get(FieldName::TipoMaquinaria), Some("compresor"));
}

#[tokio::test]
async fn agent_mode_holds_until_inactivity_timeout_elapses() {
    let app = TestApp::new();
    app.lead_says("Hola", t(0)).await;
    app.agent_says("Hola, soy María, te atiendo yo", t(10)).await;

    let within = app.lead_says("Ok, gracias", t(10 + 29)).await;
    assert_eq!(within.mode, ConversationMode::Agent);
    assert!(within.reply.is_none());

    let after = app.lead_says("¿Sigues ahí?", t(10 + 31)).await;
    assert_eq!(after.mode, ConversationMode::Bot);
    assert_eq!(after.transition, Some(TransitionTrigger::Timeout));
    assert!(after.reply.is_some());

    let conversation = app.conversation().await;
    assert_eq!(conversation.messages().last().map(|m| m.sender), Some(SenderRole::Bot));
    // The advisor stays on record after the timeout.
    assert_eq!(conversation.control().advisor.as_ref().map(|a| a.as_str()), Some("maria"));
}

#[tokio::test]
async fn lead_messages_in_agent_mode_never_get_automated_replies() {
    let app = TestApp::new();
    app.lead_says("Hola", t(0)).await;
    app.agent_says("Te atiendo yo", t(1)).await;

    for (i, text) in ["Me llamo Ana López", "Necesito un compresor", "ana@sur.mx"]
        .iter()
        .enumerate()
    {
        let outcome = app.lead_says(text, t(2 + i as i64)).await;
        assert!(outcome.reply.is_none());
    }

    let conversation = app.conversation().await;
    let bot_messages = conversation
        .messages()
        .iter()
        .filter(|m| m.sender == SenderRole::Bot)
        .count();
    assert_eq!(bot_messages, 1, "only the greeting before takeover");
    assert_eq!(conversation.fields().get(FieldName::TipoMaquinaria), Some("compresor"));
}

#[tokio::test]
async fn duplicate_event_is_acknowledged_without_side_effects() {
    let app = TestApp::new();
    let orchestrator = app.collaborators.orchestrator();

    let first = orchestrator
        .handle_lead_message(LeadMessageCommand::new(LEAD, "Hola", t(0)).with_event_id("wamid.1"))
        .await
        .unwrap();
    assert!(!first.duplicate);
    let before = app.store.record(&lead()).await.unwrap();
    let syncs_before = app.crm_syncs().await;

    let replay = app
        .collaborators
        .orchestrator()
        .handle_lead_message(LeadMessageCommand::new(LEAD, "Hola", t(0)).with_event_id("wamid.1"))
        .await
        .unwrap();

    assert!(replay.duplicate);
    assert!(replay.reply.is_none());
    assert_eq!(app.store.record(&lead()).await.unwrap(), before);
    assert_eq!(app.delivery.sent().len(), 1);
    assert_eq!(app.crm_syncs().await, syncs_before);
}

#[tokio::test]
async fn repeated_takeover_records_a_single_transition() {
    let app = TestApp::new();
    app.lead_says("Hola", t(0)).await;

    let take = |at| TakeControlCommand {
        lead_id: LEAD.to_string(),
        operator: "maria".to_string(),
        timestamp: at,
    };

    let first = app.collaborators.orchestrator().take_control(take(t(1))).await.unwrap();
    let second = app.collaborators.orchestrator().take_control(take(t(2))).await.unwrap();

    assert_eq!(first.transition, Some(TransitionTrigger::ManualTakeover));
    assert_eq!(second.transition, None);
    assert_eq!(second.mode, ConversationMode::Agent);
    let conversation = app.conversation().await;
    assert_eq!(conversation.control().last_transition.at, t(1));
}

#[tokio::test]
async fn release_answers_the_pending_lead_message() {
    let app = TestApp::new();
    app.lead_says("Hola", t(0)).await;
    app.agent_says("Te atiendo yo", t(1)).await;
    app.lead_says("Me llamo Ana López", t(2)).await;

    let outcome = app
        .collaborators
        .orchestrator()
        .release_control(ReleaseControlCommand {
            lead_id: LEAD.to_string(),
            timestamp: t(3),
            respond_to_pending: true,
        })
        .await
        .unwrap();

    assert_eq!(outcome.mode, ConversationMode::Bot);
    assert_eq!(outcome.transition, Some(TransitionTrigger::ManualRelease));
    assert!(outcome.reply.is_some());
    let summary = app
        .collaborators
        .orchestrator()
        .get_conversation(LEAD)
        .await
        .unwrap();
    assert_eq!(summary.mode, ConversationMode::Bot);
    assert_eq!(summary.filled_fields.get(&FieldName::Nombre).map(String::as_str), Some("Ana López"));
}

#[tokio::test]
async fn delivery_failure_is_reported_after_commit() {
    let store = Arc::new(InMemoryConversationStore::new());
    let (crm, _worker) = CrmSyncQueue::start(Arc::new(RecordingCrm::default()), 4);
    let collaborators = Collaborators {
        store: store.clone(),
        extractor: Arc::new(KeywordFieldExtractor::new()),
        replies: Arc::new(ScriptedReplyGenerator::new()),
        delivery: Arc::new(RejectingDelivery),
        crm,
        settings: OrchestratorSettings::default(),
    };

    let result = collaborators
        .orchestrator()
        .handle_lead_message(LeadMessageCommand::new(LEAD, "Hola", t(0)))
        .await;

    assert!(matches!(result, Err(OrchestratorError::Delivery { .. })));
    let stored = store.load(&lead()).await.unwrap().unwrap();
    assert_eq!(stored.messages().len(), 2);
    assert!(!stored.messages()[1].delivered);
}

#[tokio::test]
async fn patch_and_fallback_paths_store_the_same_conversation() {
    let patched = TestApp::new();
    let fallback = TestApp::with_store(InMemoryConversationStore::new().with_patch_unsupported());

    for app in [&patched, &fallback] {
        app.lead_says("Hola, me llamo Ana López", t(0)).await;
        app.agent_says("Supongo que necesitas un rompedor", t(1)).await;
        app.lead_says("Así es", t(2)).await;
    }

    assert!(patched.store.patch_calls() > 0);
    assert_eq!(patched.store.overwrite_calls(), 0);
    assert!(fallback.store.overwrite_calls() > 0);

    let a = patched.store.record(&lead()).await.unwrap();
    let b = fallback.store.record(&lead()).await.unwrap();
    assert_eq!(comparable(&a), comparable(&b));
    assert_eq!(a.messages.len(), 4);
}

#[tokio::test]
async fn every_commit_schedules_a_crm_sync() {
    let app = TestApp::new();
    app.lead_says("Hola", t(0)).await;
    app.lead_says("Me llamo Ana López", t(1)).await;

    assert_eq!(app.crm_syncs().await, 2);
}
