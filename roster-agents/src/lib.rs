//! Roster Agents
//!
//! Role agents that prompt a language model and turn its markdown reply into
//! typed records:
//! - **Analyst**: market research, brainstorming, project briefs
//! - **Architect**: architecture, technology stack, technical risk
//! - **PM**: PRDs, project plans, stakeholder maps
//! - **SM**: user stories, sprint plans, retrospectives
//! - **Dev**: implementation plans, code review, debugging
//! - **QA**: test plans, story review gates, risk profiles
//! - **UX**: user personas, user flows, UI specs
//! - **Master**: documents and checklists
//! - **Orchestrator**: workflow plans and agent routing
//!
//! ## Modular Personas
//!
//! Each role's system prompt is a TOML persona file in `prompts/`.
//! See [`persona::PersonaRegistry`] for loading and overriding them.

pub mod agent;
pub mod backend;
pub mod persona;
pub mod prompt;
pub mod records;
pub mod registry;
pub mod role;
pub mod traits;

pub mod analyst;
pub mod architect;
pub mod dev;
pub mod master;
pub mod orchestrator;
pub mod pm;
pub mod qa;
pub mod sm;
pub mod ux;

pub use agent::Agent;
pub use backend::*;
pub use persona::*;
pub use prompt::Prompt;
pub use registry::*;
pub use role::Role;
pub use traits::*;

#[cfg(test)]
pub(crate) mod testing {
    //! Canned-reply backend shared by the role module tests

    use async_trait::async_trait;
    use roster_core::{CommandContext, CommandResponse};
    use std::sync::{Arc, Mutex};

    use crate::{Agent, AgentConfig, LlmBackend, LlmError, Role, RoleAgent};

    /// Returns a fixed reply and remembers every user prompt
    pub struct CannedBackend {
        reply: String,
        pub prompts: Mutex<Vec<String>>,
    }

    impl CannedBackend {
        pub fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmBackend for CannedBackend {
        async fn generate(&self, _system: &str, user: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(user.to_string());
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    /// Run one command against a role agent backed by `backend`
    pub async fn run(
        role: Role,
        backend: &Arc<CannedBackend>,
        command: &str,
        context: CommandContext,
    ) -> CommandResponse {
        let agent = Agent::new(role, AgentConfig::default(), backend.clone());
        agent.execute_command(command, context).await
    }
}
