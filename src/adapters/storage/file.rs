//! File-based Conversation Store Adapter
//!
//! Stores one YAML document per lead under a base directory. A YAML file
//! cannot take a partial update atomically, so `patch` always reports
//! `Unsupported` and commits go through the full-snapshot overwrite.
//! Overwrites write a temporary file and rename it into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::conversation::{ChangeSet, Conversation};
use crate::domain::foundation::{LeadId, Timestamp};
use crate::ports::{ConversationStore, PatchOutcome, StoreError};

use super::record::ConversationRecord;

#[derive(Debug, Clone)]
pub struct FileConversationStore {
    base_path: PathBuf,
}

impl FileConversationStore {
    /// Creates a store rooted at `base_path`. The directory is created on first write.
    ///
    /// # Example
    /// ```ignore
    /// let store = FileConversationStore::new("./data/conversations");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn record_path(&self, id: &LeadId) -> PathBuf {
        self.base_path.join(format!("{}.yaml", file_stem(id)))
    }

    async fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))
    }

    fn serialize(conversation: &Conversation) -> Result<String, StoreError> {
        serde_yaml::to_string(&ConversationRecord::from(conversation))
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

/// Lead ids may contain characters that are not safe in file names.
fn file_stem(id: &LeadId) -> String {
    id.as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    async fn load(&self, id: &LeadId) -> Result<Option<Conversation>, StoreError> {
        let path = self.record_path(id);
        let yaml = match fs::read_to_string(&path).await {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };

        let record: ConversationRecord =
            serde_yaml::from_str(&yaml).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        if record.lead_id != id.as_str() {
            return Err(StoreError::Corrupt(format!(
                "file {} holds conversation {}",
                path.display(),
                record.lead_id
            )));
        }
        Conversation::try_from(record).map(Some)
    }

    async fn create(&self, id: &LeadId, at: Timestamp) -> Result<Conversation, StoreError> {
        self.ensure_dir().await?;
        let conversation = Conversation::new(id.clone(), at);
        let yaml = Self::serialize(&conversation)?;

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.record_path(id))
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(id.clone()))
            }
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };
        file.write_all(yaml.as_bytes())
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        file.flush().await.map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(conversation)
    }

    async fn patch(&self, _id: &LeadId, _changes: &ChangeSet) -> Result<PatchOutcome, StoreError> {
        Ok(PatchOutcome::Unsupported)
    }

    async fn overwrite(&self, id: &LeadId, snapshot: &Conversation) -> Result<(), StoreError> {
        self.ensure_dir().await?;
        let yaml = Self::serialize(snapshot)?;

        let path = self.record_path(id);
        let tmp = path.with_extension("yaml.tmp");
        fs::write(&tmp, yaml)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(())
    }
}
