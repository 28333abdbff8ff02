//! Common traits and configuration for role agents

use async_trait::async_trait;
use roster_core::{CommandContext, CommandResponse, CoreError};
use std::time::Duration;
use thiserror::Error;

use crate::{CommandInfo, LlmError, Role};

/// Errors a command handler can fail with.
///
/// None of these reach a caller directly; the registry turns them into a
/// failed [`CommandResponse`].
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Parse error: {0}")]
    Parse(#[from] CoreError),

    #[error("Invalid context: {0}")]
    InvalidContext(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Common interface for all role agents
#[async_trait]
pub trait RoleAgent: Send + Sync {
    /// Unique agent identifier
    fn id(&self) -> &str;

    /// Which role this agent plays
    fn role(&self) -> Role;

    /// Registered commands, in registration order
    fn commands(&self) -> Vec<CommandInfo>;

    /// Run a command by name. Never fails; failures are in the response.
    async fn execute_command(&self, name: &str, context: CommandContext) -> CommandResponse;
}

/// Agent configuration.
///
/// Immutable once an agent holds it: each invocation gets a snapshot, and
/// [`crate::Agent::with_config`] produces a new agent instead of mutating.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Unique agent ID
    pub id: String,
    /// Upper bound on a single model call
    pub timeout: Duration,
    /// User input beyond this many characters is cut before prompting
    pub max_input_chars: usize,
    /// Language the model is asked to answer in
    pub language: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string()[..8].to_string(),
            timeout: Duration::from_secs(120),
            max_input_chars: 12_000,
            language: "English".to_string(),
        }
    }
}

impl AgentConfig {
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars.max(1);
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = AgentConfig::default()
            .with_id("pm-1")
            .with_timeout(Duration::from_secs(5))
            .with_max_input_chars(0)
            .with_language("German");

        assert_eq!(config.id, "pm-1");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_input_chars, 1);
        assert_eq!(config.language, "German");
    }

    #[test]
    fn test_default_id_is_short() {
        assert_eq!(AgentConfig::default().id.len(), 8);
    }

    #[test]
    fn test_error_messages() {
        let err = AgentError::from(LlmError::RateLimited);
        assert_eq!(err.to_string(), "LLM error: Rate limited");
        let err = AgentError::Timeout(Duration::from_secs(3));
        assert_eq!(err.to_string(), "Model call timed out after 3s");
    }
}
