//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `LEADLINE` prefix and
//! nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use leadline::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod conversation;
mod database;
mod error;
mod integrations;
mod server;
mod storage;

pub use conversation::{AgentConfig, ConversationConfig};
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use integrations::{ExtractionConfig, HubSpotConfig, WhatsAppConfig};
pub use server::{Environment, ServerConfig};
pub use storage::{StorageBackend, StorageConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Conversation store backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// Hand-off timeout, extraction deadline and CRM queue size
    #[serde(default)]
    pub conversation: ConversationConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    #[serde(default)]
    pub hubspot: HubSpotConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads `LEADLINE__*` variables:
    ///
    /// - `LEADLINE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `LEADLINE__STORAGE__BACKEND=postgres` -> `storage.backend`
    /// - `LEADLINE__STORAGE__DATABASE__URL=...` -> `storage.database.url`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("LEADLINE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.storage.validate()?;
        self.conversation.validate()?;
        self.agent.validate()?;
        self.whatsapp.validate()?;
        self.extraction.validate(self.is_production())?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
