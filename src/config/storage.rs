//! Conversation store selection

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

use super::database::DatabaseConfig;
use super::error::ValidationError;

/// Which `ConversationStore` implementation to run.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
    Postgres,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StorageBackend::Memory => "memory",
            StorageBackend::File => "file",
            StorageBackend::Postgres => "postgres",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory for the YAML file store
    #[serde(default = "default_file_path")]
    pub file_path: PathBuf,

    /// Required when `backend` is `postgres`
    pub database: Option<DatabaseConfig>,
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.backend {
            StorageBackend::Memory => Ok(()),
            StorageBackend::File => {
                if self.file_path.as_os_str().is_empty() {
                    return Err(ValidationError::MissingRequired("storage.file_path"));
                }
                Ok(())
            }
            StorageBackend::Postgres => self
                .database
                .as_ref()
                .ok_or(ValidationError::MissingRequired("storage.database.url"))?
                .validate(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            file_path: default_file_path(),
            database: None,
        }
    }
}

fn default_file_path() -> PathBuf {
    PathBuf::from("data/conversations")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_needs_nothing() {
        assert!(StorageConfig::default().validate().is_ok());
    }

    #[test]
    fn postgres_backend_requires_database() {
        let config = StorageConfig {
            backend: StorageBackend::Postgres,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired("storage.database.url"))
        ));

        let config = StorageConfig {
            backend: StorageBackend::Postgres,
            database: Some(DatabaseConfig::for_url("postgres://localhost/leads")),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn backend_names_display_lowercase() {
        assert_eq!(StorageBackend::File.to_string(), "file");
        assert_eq!(StorageBackend::Postgres.to_string(), "postgres");
    }
}
