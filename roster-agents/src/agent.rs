//! The role agent
//!
//! One type serves every role: the role picks the command table and the
//! persona, everything else (config snapshot, model call, error boundary) is
//! shared.

use async_trait::async_trait;
use roster_core::{CommandContext, CommandResponse};
use std::sync::Arc;

use crate::{
    help_command, AgentConfig, CommandInfo, CommandRegistry, Invocation, Persona,
    PersonaRegistry, Role, RoleAgent, SharedBackend,
};

/// An agent playing one role
#[derive(Clone)]
pub struct Agent {
    role: Role,
    config: Arc<AgentConfig>,
    persona: Arc<Persona>,
    backend: SharedBackend,
    registry: Arc<CommandRegistry>,
}

impl Agent {
    /// Create an agent with the embedded persona for its role
    pub fn new(role: Role, config: AgentConfig, backend: SharedBackend) -> Self {
        let persona = PersonaRegistry::embedded().for_role(role);
        Self::with_persona(role, config, backend, persona)
    }

    /// Create an agent with an explicit persona
    pub fn with_persona(
        role: Role,
        config: AgentConfig,
        backend: SharedBackend,
        persona: Persona,
    ) -> Self {
        let registry = role.commands().with(help_command());

        Self {
            role,
            config: Arc::new(config),
            persona: Arc::new(persona),
            backend,
            registry: Arc::new(registry),
        }
    }

    /// A copy of this agent running with a different configuration.
    ///
    /// The command table and persona are shared; in-flight calls on the
    /// original keep their own snapshot.
    pub fn with_config(&self, config: AgentConfig) -> Self {
        Self {
            config: Arc::new(config),
            ..self.clone()
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }
}

#[async_trait]
impl RoleAgent for Agent {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn role(&self) -> Role {
        self.role
    }

    fn commands(&self) -> Vec<CommandInfo> {
        self.registry.list()
    }

    async fn execute_command(&self, name: &str, context: CommandContext) -> CommandResponse {
        let config = Arc::clone(&self.config);
        let invocation = Invocation::new(
            &context,
            &config,
            &self.persona,
            &self.registry,
            &self.backend,
        );
        self.registry.execute(name, invocation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LlmBackend, LlmError};
    use std::sync::Mutex;

    /// Records the system prompt it was called with
    struct CapturingBackend {
        systems: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmBackend for CapturingBackend {
        async fn generate(&self, system: &str, _user: &str) -> Result<String, LlmError> {
            self.systems.lock().unwrap().push(system.to_string());
            Ok("### Login Risk\nProbability: high\n".to_string())
        }

        fn model_name(&self) -> &str {
            "capture"
        }
    }

    fn backend() -> Arc<CapturingBackend> {
        Arc::new(CapturingBackend {
            systems: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_agent_registers_help() {
        let agent = Agent::new(Role::Qa, AgentConfig::default(), backend());
        let names: Vec<_> = agent.commands().into_iter().map(|c| c.name).collect();
        assert!(names.contains(&"help".to_string()));
        assert!(names.contains(&"risk-profile".to_string()));
        assert_eq!(agent.role(), Role::Qa);
    }

    #[tokio::test]
    async fn test_with_config_does_not_touch_original() {
        let capture = backend();
        let agent = Agent::new(Role::Architect, AgentConfig::default().with_id("arch-1"), capture.clone());
        let german = agent.with_config(AgentConfig::default().with_id("arch-2").with_language("German"));

        assert_eq!(agent.id(), "arch-1");
        assert_eq!(german.id(), "arch-2");

        let response = german
            .execute_command("risk-assessment", CommandContext::new("payments"))
            .await;
        assert!(response.success);
        assert_eq!(response.metadata.agent.as_deref(), Some("arch-2"));

        agent
            .execute_command("risk-assessment", CommandContext::new("payments"))
            .await;

        let systems = capture.systems.lock().unwrap();
        assert!(systems[0].contains("Answer in German"));
        assert!(systems[1].contains("Answer in English"));
    }

    #[tokio::test]
    async fn test_unknown_command_on_agent() {
        let agent = Agent::new(Role::Pm, AgentConfig::default(), backend());
        let response = agent.execute_command("bogus", CommandContext::default()).await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Command 'bogus' not found"));
    }
}
