//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Longest channel-scoped lead identity we accept (E.164 plus channel prefixes).
const MAX_LEAD_ID_LEN: usize = 64;

/// Channel-scoped identity of a lead (e.g. a WhatsApp phone number).
///
/// This is the partition key of the conversation store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LeadId(String);

impl LeadId {
    /// Creates a new LeadId, rejecting blank, oversized or whitespace-bearing values.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("lead_id"));
        }
        if trimmed.len() > MAX_LEAD_ID_LEN {
            return Err(ValidationError::invalid_format(
                "lead_id",
                format!("must be at most {} characters", MAX_LEAD_ID_LEN),
            ));
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ValidationError::invalid_format(
                "lead_id",
                "must not contain whitespace or control characters",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LeadId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LeadId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LeadId> for String {
    fn from(id: LeadId) -> Self {
        id.0
    }
}

/// Unique identifier for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new random MessageId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a MessageId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier of a human operator (advisor) who can take over a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorId(String);

impl OperatorId {
    /// Creates a new OperatorId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("operator_id"));
        }
        Ok(Self(id.trim().to_string()))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_id_accepts_phone_numbers() {
        let id = LeadId::new("5215512345678").unwrap();
        assert_eq!(id.as_str(), "5215512345678");
    }

    #[test]
    fn lead_id_trims_surrounding_whitespace() {
        let id = LeadId::new("  5215512345678\n").unwrap();
        assert_eq!(id.as_str(), "5215512345678");
    }

    #[test]
    fn lead_id_rejects_empty() {
        assert!(matches!(
            LeadId::new("   "),
            Err(ValidationError::EmptyField { .. })
        ));
    }

    #[test]
    fn lead_id_rejects_inner_whitespace() {
        assert!(matches!(
            LeadId::new("521 551"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn lead_id_rejects_oversized_values() {
        let long = "1".repeat(MAX_LEAD_ID_LEN + 1);
        assert!(LeadId::new(long).is_err());
    }

    #[test]
    fn lead_id_deserialization_validates() {
        let ok: Result<LeadId, _> = serde_json::from_str("\"5215512345678\"");
        assert!(ok.is_ok());

        let bad: Result<LeadId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn message_id_generates_unique_values() {
        assert_ne!(MessageId::new(), MessageId::new());
    }

    #[test]
    fn message_id_parses_from_string() {
        let id = MessageId::new();
        let parsed: MessageId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn operator_id_rejects_blank() {
        assert!(OperatorId::new("").is_err());
        assert!(OperatorId::new("  ").is_err());
        assert_eq!(OperatorId::new("asesor-1").unwrap().as_str(), "asesor-1");
    }
}
