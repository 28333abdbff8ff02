//! Command input and output contract
//!
//! Every command receives a [`CommandContext`] and every caller gets back a
//! [`CommandResponse`], whether the command ran, failed, or does not exist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Input handed to a command handler
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandContext {
    /// Free text from the user
    #[serde(default)]
    pub user_input: String,
    /// Free-form options bag
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl CommandContext {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            options: Map::new(),
        }
    }

    pub fn with_option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    /// String option, if present and a string
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    /// String option or a default when absent or blank
    pub fn option_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.option(key)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(default)
    }

    /// User input or a default when blank
    pub fn input_or<'a>(&'a self, default: &'a str) -> &'a str {
        if self.user_input.trim().is_empty() {
            default
        } else {
            &self.user_input
        }
    }
}

/// Metadata attached to every response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub command: String,
    pub timestamp: DateTime<Utc>,
    /// Wall-clock handler time in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Opaque template identifier associated with the command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl ResponseMetadata {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            timestamp: Utc::now(),
            duration: None,
            template: None,
            agent: None,
        }
    }

    pub fn with_duration(mut self, millis: u64) -> Self {
        self.duration = Some(millis);
        self
    }

    pub fn with_template(mut self, template: Option<&str>) -> Self {
        self.template = template.map(str::to_string);
        self
    }

    pub fn with_agent(mut self, agent: &str) -> Self {
        self.agent = Some(agent.to_string());
        self
    }
}

/// The only thing a caller ever receives from a command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: ResponseMetadata,
}

impl CommandResponse {
    pub fn success(data: Value, output: String, metadata: ResponseMetadata) -> Self {
        Self {
            success: true,
            data: Some(data),
            output: Some(output),
            error: None,
            metadata,
        }
    }

    pub fn failure(error: impl Into<String>, metadata: ResponseMetadata) -> Self {
        Self {
            success: false,
            data: None,
            output: None,
            error: Some(error.into()),
            metadata,
        }
    }

    /// Response for a command name nobody registered
    pub fn not_found(command: &str) -> Self {
        Self::failure(
            format!("Command '{}' not found", command),
            ResponseMetadata::new(command),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_shape() {
        let response = CommandResponse::not_found("bogus");
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Command 'bogus' not found"));
        assert_eq!(response.metadata.command, "bogus");
        assert!(response.metadata.duration.is_none());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
        assert!(json["metadata"].get("duration").is_none());
        let stamp = json["metadata"]["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[test]
    fn test_context_defaults() {
        let ctx = CommandContext::new("  ").with_option("epic", "Checkout");
        assert_eq!(ctx.input_or("nothing given"), "nothing given");
        assert_eq!(ctx.option("epic"), Some("Checkout"));
        assert_eq!(ctx.option_or("sprint", "Sprint 1"), "Sprint 1");
        assert_eq!(ctx.option("missing"), None);
    }

    #[test]
    fn test_context_from_json() {
        let ctx: CommandContext =
            serde_json::from_str(r#"{"user_input":"build a todo app"}"#).unwrap();
        assert_eq!(ctx.user_input, "build a todo app");
        assert!(ctx.options.is_empty());
    }
}
