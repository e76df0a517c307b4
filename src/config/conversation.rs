//! Conversation handling and operator access

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Minimum length of the shared agent token.
const MIN_AGENT_TOKEN_LEN: usize = 16;

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// Minutes of operator silence before a conversation returns to the bot
    #[serde(default = "default_agent_timeout")]
    pub agent_timeout_minutes: u64,

    /// Deadline for one extraction call
    #[serde(default = "default_extraction_timeout")]
    pub extraction_timeout_secs: u64,

    /// Pending CRM snapshots before new ones are dropped
    #[serde(default = "default_crm_queue_capacity")]
    pub crm_queue_capacity: usize,

    /// Messages returned in a conversation summary
    #[serde(default = "default_recent_messages")]
    pub recent_messages: usize,
}

impl ConversationConfig {
    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_minutes * 60)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=1440).contains(&self.agent_timeout_minutes) {
            return Err(ValidationError::InvalidAgentTimeout);
        }
        if !(1..=120).contains(&self.extraction_timeout_secs) {
            return Err(ValidationError::InvalidExtractionTimeout);
        }
        if self.crm_queue_capacity == 0 {
            return Err(ValidationError::InvalidQueueCapacity);
        }
        Ok(())
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            agent_timeout_minutes: default_agent_timeout(),
            extraction_timeout_secs: default_extraction_timeout(),
            crm_queue_capacity: default_crm_queue_capacity(),
            recent_messages: default_recent_messages(),
        }
    }
}

fn default_agent_timeout() -> u64 {
    30
}

fn default_extraction_timeout() -> u64 {
    10
}

fn default_crm_queue_capacity() -> usize {
    256
}

fn default_recent_messages() -> usize {
    10
}

/// Access for human operators.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AgentConfig {
    /// Bearer token expected on `/api/agent/*` and `/api/conversations/*`
    pub api_token: Option<Secret<String>>,
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let token = self
            .api_token
            .as_ref()
            .ok_or(ValidationError::MissingRequired("agent.api_token"))?;
        if token.expose_secret().len() < MIN_AGENT_TOKEN_LEN {
            return Err(ValidationError::AgentTokenTooShort(MIN_AGENT_TOKEN_LEN));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_hand_off_policy() {
        let config = ConversationConfig::default();
        assert_eq!(config.agent_timeout(), Duration::from_secs(30 * 60));
        assert_eq!(config.extraction_timeout(), Duration::from_secs(10));
        assert_eq!(config.crm_queue_capacity, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_timeouts() {
        let config = ConversationConfig {
            agent_timeout_minutes: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidAgentTimeout)));

        let config = ConversationConfig {
            extraction_timeout_secs: 600,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidExtractionTimeout)));
    }

    #[test]
    fn agent_token_is_required_and_long_enough() {
        assert!(AgentConfig::default().validate().is_err());

        let short = AgentConfig {
            api_token: Some(Secret::new("abc".to_string())),
        };
        assert!(matches!(short.validate(), Err(ValidationError::AgentTokenTooShort(16))));

        let ok = AgentConfig {
            api_token: Some(Secret::new("0123456789abcdef".to_string())),
        };
        assert!(ok.validate().is_ok());
    }
}
