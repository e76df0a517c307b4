//! Conversation store adapters.
//!
//! Three interchangeable backends share the `ConversationRecord` schema:
//! - `InMemoryConversationStore` - tests and local development
//! - `FileConversationStore` - YAML files, full-snapshot writes only
//! - `PostgresConversationStore` - durable, atomic patches

mod file;
mod in_memory;
mod postgres;
mod record;

pub use file::FileConversationStore;
pub use in_memory::InMemoryConversationStore;
pub use postgres::{PostgresConversationStore, MIGRATOR};
pub use record::{ControlRecord, ConversationRecord, FieldRecord, MessageRecord, StateRecord};

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::ports::{ConversationStore, StoreError};

/// Builds the store selected by configuration.
pub async fn connect_store(
    config: &StorageConfig,
) -> Result<Arc<dyn ConversationStore>, StoreError> {
    let store: Arc<dyn ConversationStore> = match config.backend {
        StorageBackend::Memory => Arc::new(InMemoryConversationStore::new()),
        StorageBackend::File => Arc::new(FileConversationStore::new(&config.file_path)),
        StorageBackend::Postgres => {
            let database = config.database.as_ref().ok_or_else(|| {
                StoreError::Database(
                    "postgres backend selected without database settings".to_string(),
                )
            })?;
            Arc::new(PostgresConversationStore::connect(database).await?)
        }
    };
    tracing::info!(backend = %config.backend, "conversation store ready");
    Ok(store)
}
