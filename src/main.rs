//! leadline server binary.
//!
//! Loads configuration, picks adapters, starts the CRM sync worker and
//! serves the HTTP API until interrupted.

use std::sync::Arc;

use thiserror::Error;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use leadline::adapters::crm::{HubSpotClientConfig, HubSpotCrmSync, LoggingCrmSync};
use leadline::adapters::delivery::{
    LoggingDeliveryChannel, WhatsAppClientConfig, WhatsAppDeliveryChannel,
};
use leadline::adapters::extraction::{
    HttpExtractorConfig, HttpFieldExtractor, KeywordFieldExtractor,
};
use leadline::adapters::http::{api_router, AppState, WebhookSecrets};
use leadline::adapters::replies::ScriptedReplyGenerator;
use leadline::adapters::storage::connect_store;
use leadline::application::{Collaborators, CrmSyncQueue, OrchestratorSettings};
use leadline::config::{AppConfig, ConfigError, ValidationError};
use leadline::ports::{
    CrmSync, DeliveryChannel, DeliveryError, ExtractionError, FieldExtractor, StoreError, SyncError,
};

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conversation store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Extraction client: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Delivery channel: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("CRM client: {0}")]
    Crm(#[from] SyncError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        backend = %config.storage.backend,
        "starting leadline"
    );

    let store = connect_store(&config.storage).await?;
    let extractor = build_extractor(&config)?;
    let delivery = build_delivery(&config)?;
    let (crm, crm_worker) =
        CrmSyncQueue::start(build_crm(&config)?, config.conversation.crm_queue_capacity);

    let collaborators = Collaborators {
        store,
        extractor,
        replies: Arc::new(ScriptedReplyGenerator::new()),
        delivery,
        crm,
        settings: OrchestratorSettings {
            agent_timeout: config.conversation.agent_timeout(),
            extraction_timeout: config.conversation.extraction_timeout(),
            recent_messages: config.conversation.recent_messages,
        },
    };

    let agent_token = config
        .agent
        .api_token
        .clone()
        .ok_or(ValidationError::MissingRequired("agent.api_token"))?;

    let mut state = AppState::new(collaborators, agent_token);
    if let Some(verify_token) = config.whatsapp.verify_token.clone() {
        let mut secrets = WebhookSecrets::new(verify_token);
        match config.whatsapp.app_secret.clone() {
            Some(app_secret) => secrets = secrets.with_app_secret(app_secret),
            None => {
                tracing::warn!("WhatsApp webhook enabled without app secret; signatures unchecked")
            }
        }
        tracing::info!("WhatsApp webhook enabled");
        state = state.with_whatsapp_webhook(secrets);
    }

    // Handlers spawn their units of work, so a timeout only ends the response.
    let app = api_router(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last queue sender; the worker drains and exits.
    if let Err(e) = crm_worker.await {
        tracing::warn!(error = %e, "CRM sync worker did not shut down cleanly");
    }
    tracing::info!("shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_extractor(config: &AppConfig) -> Result<Arc<dyn FieldExtractor>, ExtractionError> {
    match &config.extraction.endpoint {
        Some(endpoint) => {
            let mut client = HttpExtractorConfig::new(endpoint.clone())
                .with_timeout(config.conversation.extraction_timeout());
            if let Some(key) = &config.extraction.api_key {
                client = client.with_api_key(key.clone());
            }
            tracing::info!(%endpoint, "using extraction service");
            Ok(Arc::new(HttpFieldExtractor::new(client)?))
        }
        None => {
            tracing::info!("using keyword extractor");
            Ok(Arc::new(KeywordFieldExtractor::new()))
        }
    }
}

fn build_delivery(config: &AppConfig) -> Result<Arc<dyn DeliveryChannel>, DeliveryError> {
    let whatsapp = &config.whatsapp;
    match (&whatsapp.access_token, &whatsapp.phone_number_id) {
        (Some(token), Some(phone_number_id)) => {
            let client = WhatsAppClientConfig::new(token.clone(), phone_number_id.clone())
                .with_api_version(whatsapp.api_version.clone());
            Ok(Arc::new(WhatsAppDeliveryChannel::new(client)?))
        }
        _ => {
            tracing::warn!("WhatsApp not configured; outbound messages are only logged");
            Ok(Arc::new(LoggingDeliveryChannel::new()))
        }
    }
}

fn build_crm(config: &AppConfig) -> Result<Arc<dyn CrmSync>, SyncError> {
    match &config.hubspot.access_token {
        Some(token) => Ok(Arc::new(HubSpotCrmSync::new(HubSpotClientConfig::new(token.clone()))?)),
        None => {
            tracing::info!("HubSpot not configured; CRM sync disabled");
            Ok(Arc::new(LoggingCrmSync))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
