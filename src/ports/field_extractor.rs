//! Field Extractor Port - Slot-filling from free text.
//!
//! The extractor sees the full history plus the most recent bot or agent
//! message, which is the context the lead is answering. It returns a mapping
//! of field name to value and never mutates its inputs.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::conversation::Message;

/// Errors from the extraction pipeline. Always non-fatal to message handling.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Extraction service unavailable: {0}")]
    Unavailable(String),

    #[error("Extraction timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid extraction response: {0}")]
    InvalidResponse(String),
}

/// Port for extracting lead fields from a conversation.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Extracts field values from the history.
    ///
    /// `context` is the latest non-lead message, if any. The result may be
    /// empty and may name fields that are already filled.
    async fn extract(
        &self,
        history: &[Message],
        context: Option<&Message>,
    ) -> Result<HashMap<String, String>, ExtractionError>;
}
