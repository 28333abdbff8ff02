//! Command registry
//!
//! Each agent owns a name -> handler table built once at construction. The
//! registry is the error boundary: whatever a handler does, the caller gets a
//! [`CommandResponse`].

use futures::future::BoxFuture;
use futures::FutureExt;
use roster_core::{CommandContext, CommandResponse, Markdown, ResponseMetadata};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::{AgentConfig, AgentError, Persona, SharedBackend};

/// What a successful handler hands back
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Typed response serialized to JSON
    pub data: Value,
    /// Markdown rendering of the same response
    pub output: String,
}

impl CommandOutput {
    pub fn new<T: Serialize>(data: &T, output: String) -> Result<Self, AgentError> {
        Ok(Self {
            data: serde_json::to_value(data)?,
            output,
        })
    }
}

/// A typed response a command can parse out of a model reply and render back
pub trait Report: Serialize + Sized + Send {
    /// Build the response from raw model text. Malformed text yields
    /// defaults and fewer records, not an error.
    fn parse(reply: &str) -> Result<Self, AgentError>;

    fn to_markdown(&self) -> String;
}

pub type HandlerFuture<'a> = BoxFuture<'a, Result<CommandOutput, AgentError>>;

/// Handler signature every command uses
pub type Handler = for<'a> fn(Invocation<'a>) -> HandlerFuture<'a>;

/// Everything a handler may touch during one call
#[derive(Clone, Copy)]
pub struct Invocation<'a> {
    pub context: &'a CommandContext,
    pub config: &'a AgentConfig,
    pub persona: &'a Persona,
    pub registry: &'a CommandRegistry,
    backend: &'a SharedBackend,
}

impl<'a> Invocation<'a> {
    pub fn new(
        context: &'a CommandContext,
        config: &'a AgentConfig,
        persona: &'a Persona,
        registry: &'a CommandRegistry,
        backend: &'a SharedBackend,
    ) -> Self {
        Self {
            context,
            config,
            persona,
            registry,
            backend,
        }
    }

    /// User input, defaulted when blank and cut to the configured limit
    pub fn input(&self, default: &'a str) -> &'a str {
        truncate_chars(self.context.input_or(default), self.config.max_input_chars)
    }

    /// String option or default
    pub fn option(&self, key: &str, default: &'a str) -> &'a str {
        self.context.option_or(key, default)
    }

    /// Send a prompt to the model, bounded by the configured timeout
    pub async fn ask(&self, prompt: &str) -> Result<String, AgentError> {
        let system = self.persona.system_prompt(&self.config.language);

        debug!(
            agent = %self.config.id,
            model = self.backend.model_name(),
            prompt_chars = prompt.len(),
            "calling model"
        );

        let reply = tokio::time::timeout(self.config.timeout, self.backend.generate(&system, prompt))
            .await
            .map_err(|_| AgentError::Timeout(self.config.timeout))??;

        debug!(agent = %self.config.id, reply_chars = reply.len(), "model replied");
        Ok(reply)
    }

    /// Ask, parse the reply as `R`, render it
    pub async fn report<R: Report>(&self, prompt: String) -> Result<CommandOutput, AgentError> {
        let reply = self.ask(&prompt).await?;
        let report = R::parse(&reply)?;
        let output = report.to_markdown();
        CommandOutput::new(&report, output)
    }
}

/// Cut `text` to at most `max` characters on a char boundary
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// A registered command
#[derive(Clone, Copy)]
pub struct Command {
    pub name: &'static str,
    pub description: &'static str,
    /// Opaque template identifier reported in response metadata
    pub template: Option<&'static str>,
    pub handler: Handler,
}

impl Command {
    pub fn new(name: &'static str, description: &'static str, handler: Handler) -> Self {
        Self {
            name,
            description,
            template: None,
            handler,
        }
    }

    pub fn template(mut self, template: &'static str) -> Self {
        self.template = Some(template);
        self
    }

    pub fn info(&self) -> CommandInfo {
        CommandInfo {
            name: self.name.to_string(),
            description: self.description.to_string(),
            template: self.template.map(str::to_string),
        }
    }
}

/// Listing entry for a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandInfo {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// Name -> command table, read-only after construction
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, Command>,
    order: Vec<&'static str>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command; a later registration under the same name replaces it
    pub fn register(&mut self, command: Command) {
        if self.commands.insert(command.name, command).is_none() {
            self.order.push(command.name);
        }
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, command: Command) -> Self {
        self.register(command);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Commands in registration order
    pub fn list(&self) -> Vec<CommandInfo> {
        self.order
            .iter()
            .filter_map(|name| self.commands.get(name))
            .map(Command::info)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Look up and run a command, converting every outcome into a response
    pub async fn execute(&self, name: &str, invocation: Invocation<'_>) -> CommandResponse {
        let Some(command) = self.get(name) else {
            warn!(agent = %invocation.config.id, "Command '{}' not found", name);
            return CommandResponse::not_found(name);
        };

        let metadata = ResponseMetadata::new(name)
            .with_template(command.template)
            .with_agent(&invocation.config.id);

        info!(agent = %invocation.config.id, command = name, "executing command");
        let started = Instant::now();

        let outcome = AssertUnwindSafe((command.handler)(invocation))
            .catch_unwind()
            .await;

        let elapsed = started.elapsed().as_millis() as u64;
        let metadata = metadata.with_duration(elapsed);

        match outcome {
            Ok(Ok(result)) => {
                info!(agent = %invocation.config.id, command = name, duration_ms = elapsed, "command finished");
                CommandResponse::success(result.data, result.output, metadata)
            }
            Ok(Err(e)) => {
                warn!(agent = %invocation.config.id, command = name, "command failed: {}", e);
                CommandResponse::failure(e.to_string(), metadata)
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "handler panicked".to_string());
                warn!(agent = %invocation.config.id, command = name, "command panicked: {}", message);
                CommandResponse::failure(message, metadata)
            }
        }
    }
}

/// The `help` command every agent answers without calling the model
pub fn help_command() -> Command {
    Command::new("help", "List the commands this agent understands", help)
}

#[derive(Debug, Serialize)]
struct HelpListing {
    agent: String,
    commands: Vec<CommandInfo>,
}

fn help(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let listing = HelpListing {
            agent: inv.persona.persona.name.clone(),
            commands: inv.registry.list(),
        };

        let mut doc = Markdown::titled(&format!("{} commands", listing.agent));
        let lines: Vec<String> = listing
            .commands
            .iter()
            .map(|c| format!("`{}`: {}", c.name, c.description))
            .collect();
        doc.bullets(&lines);

        CommandOutput::new(&listing, doc.finish())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LlmBackend, LlmError, Role};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct EchoBackend;

    #[async_trait]
    impl LlmBackend for EchoBackend {
        async fn generate(&self, _system: &str, user: &str) -> Result<String, LlmError> {
            Ok(format!("echo: {}", user))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl LlmBackend for FailingBackend {
        async fn generate(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            Err(LlmError::Api("boom".to_string()))
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    struct SlowBackend;

    #[async_trait]
    impl LlmBackend for SlowBackend {
        async fn generate(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    #[derive(Serialize)]
    struct Echo {
        reply: String,
    }

    fn echo(inv: Invocation<'_>) -> HandlerFuture<'_> {
        Box::pin(async move {
            let reply = inv.ask(inv.input("nothing")).await?;
            let output = reply.clone();
            CommandOutput::new(&Echo { reply }, output)
        })
    }

    fn blow_up() -> Result<CommandOutput, AgentError> {
        panic!("handler exploded")
    }

    fn explode(_inv: Invocation<'_>) -> HandlerFuture<'_> {
        Box::pin(async move { blow_up() })
    }

    fn registry() -> CommandRegistry {
        CommandRegistry::new()
            .with(Command::new("echo", "Echo the input", echo).template("echo-tmpl"))
            .with(Command::new("explode", "Always panics", explode))
            .with(help_command())
    }

    async fn run(
        backend: SharedBackend,
        config: AgentConfig,
        name: &str,
        ctx: CommandContext,
    ) -> CommandResponse {
        let registry = registry();
        let persona = Persona::fallback(Role::Dev);
        let inv = Invocation::new(&ctx, &config, &persona, &registry, &backend);
        registry.execute(name, inv).await
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let backend: SharedBackend = Arc::new(EchoBackend);
        let response = run(backend, AgentConfig::default(), "bogus", CommandContext::default()).await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Command 'bogus' not found"));
        assert_eq!(response.metadata.command, "bogus");
        assert!(response.metadata.duration.is_none());
    }

    #[tokio::test]
    async fn test_success_wraps_metadata() {
        let backend: SharedBackend = Arc::new(EchoBackend);
        let config = AgentConfig::default().with_id("dev-1");
        let response = run(backend, config, "echo", CommandContext::new("hello")).await;

        assert!(response.success);
        assert_eq!(response.output.as_deref(), Some("echo: hello"));
        assert_eq!(response.data.unwrap()["reply"], "echo: hello");
        assert_eq!(response.metadata.template.as_deref(), Some("echo-tmpl"));
        assert_eq!(response.metadata.agent.as_deref(), Some("dev-1"));
        assert!(response.metadata.duration.is_some());
    }

    #[tokio::test]
    async fn test_model_failure_becomes_response() {
        let backend: SharedBackend = Arc::new(FailingBackend);
        let response = run(backend, AgentConfig::default(), "echo", CommandContext::new("x")).await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("LLM error: API error: boom"));
        assert!(response.metadata.duration.is_some());
    }

    #[tokio::test]
    async fn test_model_timeout_becomes_response() {
        let backend: SharedBackend = Arc::new(SlowBackend);
        let config = AgentConfig::default().with_timeout(Duration::from_millis(20));
        let response = run(backend, config, "echo", CommandContext::new("x")).await;

        assert!(!response.success);
        assert!(response.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_panic_becomes_response() {
        let backend: SharedBackend = Arc::new(EchoBackend);
        let response = run(backend, AgentConfig::default(), "explode", CommandContext::default()).await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("handler exploded"));
    }

    #[tokio::test]
    async fn test_input_is_truncated_and_defaulted() {
        let backend: SharedBackend = Arc::new(EchoBackend);
        let config = AgentConfig::default().with_max_input_chars(3);
        let response = run(backend.clone(), config, "echo", CommandContext::new("héllo")).await;
        assert_eq!(response.output.as_deref(), Some("echo: hél"));

        let response = run(backend, AgentConfig::default(), "echo", CommandContext::new(" ")).await;
        assert_eq!(response.output.as_deref(), Some("echo: nothing"));
    }

    #[tokio::test]
    async fn test_help_lists_commands_in_order() {
        let backend: SharedBackend = Arc::new(FailingBackend);
        let response = run(backend, AgentConfig::default(), "help", CommandContext::default()).await;

        assert!(response.success);
        let names: Vec<_> = response.data.unwrap()["commands"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["echo", "explode", "help"]);
        assert!(response.output.unwrap().contains("`echo`: Echo the input"));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let registry = registry().with(Command::new("echo", "Second echo", echo));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("echo").unwrap().description, "Second echo");
        assert_eq!(registry.list()[0].name, "echo");
    }
}
