//! Crew Coordinator
//!
//! Holds one agent per role and runs work against them:
//! - single commands, routed by role
//! - workflow plans, stage by stage; steps inside a stage run concurrently
//! - a runtime budget checked before each stage and enforced during it

use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use roster_agents::orchestrator::WorkflowPlan;
use roster_agents::records::WorkflowStep;
use roster_agents::{Agent, AgentConfig, PersonaRegistry, Role, RoleAgent, SharedBackend};
use roster_core::{CommandContext, CommandResponse, ResponseMetadata};

/// Option key under which a step receives the outputs of its dependencies
pub const PREVIOUS_OUTPUT: &str = "previous_output";

/// Errors from crew-level operations
#[derive(Debug, Error)]
pub enum CrewError {
    #[error("Planning failed: {0}")]
    Planning(String),

    #[error("Plan is malformed: {0}")]
    InvalidPlan(#[from] serde_json::Error),
}

/// Crew configuration
pub struct CrewConfig {
    /// LLM backend shared by every agent
    pub backend: SharedBackend,
    /// Base configuration; each agent gets its own id
    pub agent_config: AgentConfig,
    /// Personas to draw system prompts from
    pub personas: PersonaRegistry,
    /// Whole-workflow budget (zero = unlimited)
    pub max_runtime: Duration,
}

/// The role agent crew
pub struct Crew {
    agents: HashMap<Role, Arc<dyn RoleAgent>>,
    max_runtime: Duration,
}

impl Crew {
    /// Create a crew with one agent for every role
    pub fn new(config: CrewConfig) -> Self {
        let mut crew = Self::empty(config.max_runtime);

        for role in Role::ALL {
            let agent_config = config
                .agent_config
                .clone()
                .with_id(&format!("{}-1", role.as_str()));
            let agent = Agent::with_persona(
                role,
                agent_config,
                config.backend.clone(),
                config.personas.for_role(role),
            );
            crew = crew.with_agent(Arc::new(agent));
        }

        info!("Initialized crew with {} agents", crew.agents.len());
        crew
    }

    /// A crew with no agents
    pub fn empty(max_runtime: Duration) -> Self {
        Self {
            agents: HashMap::new(),
            max_runtime,
        }
    }

    /// Add or replace the agent for its role
    pub fn with_agent(mut self, agent: Arc<dyn RoleAgent>) -> Self {
        self.agents.insert(agent.role(), agent);
        self
    }

    pub fn agent(&self, role: Role) -> Option<&Arc<dyn RoleAgent>> {
        self.agents.get(&role)
    }

    /// Roles with an agent, in canonical order
    pub fn roles(&self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| self.agents.contains_key(role))
            .collect()
    }

    /// Run one command on the agent for `role`
    pub async fn run(&self, role: Role, command: &str, context: CommandContext) -> CommandResponse {
        match self.agents.get(&role) {
            Some(agent) => agent.execute_command(command, context).await,
            None => {
                warn!("No agent for role '{}'", role);
                CommandResponse::failure(
                    format!("No agent for role '{}'", role),
                    ResponseMetadata::new(command),
                )
            }
        }
    }

    /// Ask the orchestrator for a workflow plan
    pub async fn plan(&self, goal: &str) -> Result<WorkflowPlan, CrewError> {
        let response = self
            .run(Role::Orchestrator, "plan-workflow", CommandContext::new(goal))
            .await;

        if !response.success {
            return Err(CrewError::Planning(
                response.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let data = response
            .data
            .ok_or_else(|| CrewError::Planning("orchestrator returned no plan".to_string()))?;
        Ok(serde_json::from_value(data)?)
    }

    /// Run a plan stage by stage.
    ///
    /// Every step gets `context`'s options plus the outputs of the steps it
    /// depends on; a step whose dependency failed is not run. When the budget
    /// runs out mid-stage, steps that already finished keep their outcome,
    /// unfinished ones are recorded as stopped, later stages are skipped and
    /// the run is marked incomplete.
    pub async fn run_workflow(&self, plan: &WorkflowPlan, context: &CommandContext) -> WorkflowRun {
        let started = Instant::now();
        let stages = plan.stages();
        let mut outcomes: Vec<Option<StepOutcome>> = vec![None; plan.steps.len()];
        let mut stopped = None;

        info!(
            "Workflow starting: {} steps in {} stages",
            plan.steps.len(),
            stages.len()
        );

        for (stage_no, stage) in stages.iter().enumerate() {
            let remaining = self.remaining(started);
            if remaining == Some(Duration::ZERO) {
                warn!("Workflow reached maximum runtime before stage {}", stage_no + 1);
                stopped = Some(format!(
                    "runtime budget exhausted before stage {}",
                    stage_no + 1
                ));
                break;
            }

            debug!("Stage {}: steps {:?}", stage_no + 1, stage);
            // Each step carries its own deadline so finished steps survive a timeout
            let runs = stage.iter().map(|&idx| {
                let step = self.run_step(plan, idx, stage_no, &outcomes, context);
                async move {
                    match remaining {
                        Some(budget) => tokio::time::timeout(budget, step).await.ok(),
                        None => Some(step.await),
                    }
                }
            });
            let finished = join_all(runs).await;

            let mut unfinished = 0;
            for (&idx, outcome) in stage.iter().zip(finished) {
                let outcome = outcome.unwrap_or_else(|| {
                    unfinished += 1;
                    let step = &plan.steps[idx];
                    StepOutcome::new(
                        step,
                        stage_no,
                        CommandResponse::failure(
                            "Stopped: runtime budget exhausted",
                            ResponseMetadata::new(&step.command),
                        ),
                    )
                });
                outcomes[idx] = Some(outcome);
            }

            if unfinished > 0 {
                warn!(
                    "Workflow reached maximum runtime during stage {} ({} steps stopped)",
                    stage_no + 1,
                    unfinished
                );
                stopped = Some(format!(
                    "runtime budget exhausted during stage {}",
                    stage_no + 1
                ));
                break;
            }
        }

        let steps: Vec<StepOutcome> = outcomes.into_iter().flatten().collect();
        let completed = stopped.is_none() && steps.len() == plan.steps.len();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            "Workflow finished: {}/{} steps ran, {} succeeded ({} ms)",
            steps.len(),
            plan.steps.len(),
            steps.iter().filter(|s| s.response.success).count(),
            elapsed_ms
        );

        WorkflowRun {
            goal: plan.goal.clone(),
            completed,
            stopped,
            elapsed_ms,
            steps,
        }
    }

    /// Time left in the budget, `None` when unlimited
    fn remaining(&self, started: Instant) -> Option<Duration> {
        if self.max_runtime.is_zero() {
            None
        } else {
            Some(self.max_runtime.saturating_sub(started.elapsed()))
        }
    }

    async fn run_step(
        &self,
        plan: &WorkflowPlan,
        idx: usize,
        stage: usize,
        outcomes: &[Option<StepOutcome>],
        context: &CommandContext,
    ) -> StepOutcome {
        let step = &plan.steps[idx];
        let mut previous = Vec::new();
        let mut failed_dep = None;

        for dep in plan.dependencies(idx) {
            match outcomes.get(dep).and_then(Option::as_ref) {
                Some(outcome) if outcome.response.success => {
                    if let Some(output) = &outcome.response.output {
                        previous.push(output.trim().to_string());
                    }
                }
                _ => {
                    failed_dep = Some(plan.steps[dep].id.clone());
                    break;
                }
            }
        }

        let response = if let Some(dep) = failed_dep {
            CommandResponse::failure(
                format!("Skipped: dependency {} did not succeed", dep),
                ResponseMetadata::new(&step.command),
            )
        } else {
            match step.agent.parse::<Role>() {
                Ok(role) => {
                    let mut step_context = context.clone();
                    if !step.input.trim().is_empty() {
                        step_context.user_input = step.input.clone();
                    }
                    if !previous.is_empty() {
                        step_context = step_context
                            .with_option(PREVIOUS_OUTPUT, previous.join("\n\n---\n\n"));
                    }
                    info!("Running {} ({} {})", step.id, role, step.command);
                    self.run(role, &step.command, step_context).await
                }
                Err(e) => CommandResponse::failure(e, ResponseMetadata::new(&step.command)),
            }
        };

        StepOutcome::new(step, stage, response)
    }
}

/// What one workflow step produced
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub id: String,
    pub title: String,
    pub agent: String,
    pub command: String,
    /// 1-based stage number
    pub stage: usize,
    pub response: CommandResponse,
}

impl StepOutcome {
    fn new(step: &WorkflowStep, stage: usize, response: CommandResponse) -> Self {
        Self {
            id: step.id.clone(),
            title: step.title.clone(),
            agent: step.agent.clone(),
            command: step.command.clone(),
            stage: stage + 1,
            response,
        }
    }
}

/// Result of a workflow run, complete or not
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRun {
    pub goal: String,
    /// Every step ran (successfully or not) within the budget
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped: Option<String>,
    pub elapsed_ms: u64,
    /// Steps that ran or were stopped by the budget, in plan order
    pub steps: Vec<StepOutcome>,
}

impl WorkflowRun {
    pub fn succeeded(&self) -> usize {
        self.steps.iter().filter(|s| s.response.success).count()
    }

    /// Markdown report: one section per step with its output or error
    pub fn to_markdown(&self) -> String {
        let mut doc = roster_core::Markdown::titled("Workflow Run");
        doc.field("Goal", &self.goal)
            .field("Steps succeeded", format!("{}/{}", self.succeeded(), self.steps.len()))
            .field("Elapsed", format!("{} ms", self.elapsed_ms));
        if let Some(reason) = &self.stopped {
            doc.field("Stopped", reason);
        }

        for step in &self.steps {
            doc.heading(2, &format!("{} {} ({} {})", step.id, step.title, step.agent, step.command));
            match (&step.response.output, &step.response.error) {
                (Some(output), _) => doc.paragraph(output),
                (None, Some(error)) => doc.paragraph(&format!("> Failed: {}", error)),
                (None, None) => doc.paragraph("> No output"),
            };
        }
        doc.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use roster_agents::{LlmBackend, LlmError};
    use std::sync::Mutex;

    const PLAN: &str = "\
Workflow Goal: launch
### Step 1: Research
Agent: analyst
Command: research
### Step 2: Risks
Agent: architect
Command: risk-assessment
Depends On: STEP_1
### Step 3: Tests
Agent: qa
Command: test-plan
Depends On: STEP_1
### Step 4: Stories
Agent: sm
Command: create-story
Depends On: STEP_2, STEP_3
";

    /// Replies with a plan to planning prompts and a risk record otherwise;
    /// prompts starting with `slow_prefix` wait `delay` first
    struct ScriptedBackend {
        prompts: Mutex<Vec<String>>,
        delay: Duration,
        slow_prefix: &'static str,
    }

    impl ScriptedBackend {
        fn new(delay: Duration) -> Arc<Self> {
            Self::slow_on("", delay)
        }

        fn slow_on(slow_prefix: &'static str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                delay,
                slow_prefix,
            })
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn generate(&self, _system: &str, user: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(user.to_string());
            if user.starts_with("Plan a workflow") {
                return Ok(PLAN.to_string());
            }
            if user.starts_with(self.slow_prefix) {
                tokio::time::sleep(self.delay).await;
            }
            Ok("### Scope Risk\nProbability: high\n".to_string())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn crew(backend: Arc<ScriptedBackend>, max_runtime: Duration) -> Crew {
        Crew::new(CrewConfig {
            backend,
            agent_config: AgentConfig::default(),
            personas: PersonaRegistry::embedded(),
            max_runtime,
        })
    }

    fn step(n: usize, agent: &str, command: &str, deps: &[&str]) -> WorkflowStep {
        WorkflowStep {
            id: format!("STEP_{}", n),
            title: format!("{}", n),
            agent: agent.to_string(),
            command: command.to_string(),
            input: String::new(),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_crew_has_every_role() {
        let crew = crew(ScriptedBackend::new(Duration::ZERO), Duration::ZERO);
        assert_eq!(crew.roles(), Role::ALL.to_vec());
        assert_eq!(crew.agent(Role::Qa).unwrap().id(), "qa-1");
    }

    #[tokio::test]
    async fn test_missing_role_is_failure_response() {
        let crew = Crew::empty(Duration::ZERO);
        let response = crew.run(Role::Dev, "debug", CommandContext::new("x")).await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("No agent for role 'dev'"));
        assert_eq!(response.metadata.command, "debug");
    }

    #[tokio::test]
    async fn test_plan_and_run_workflow() {
        let backend = ScriptedBackend::new(Duration::ZERO);
        let crew = crew(backend.clone(), Duration::ZERO);

        let plan = crew.plan("launch").await.unwrap();
        assert_eq!(plan.steps.len(), 4);
        assert_eq!(plan.stages(), vec![vec![0], vec![1, 2], vec![3]]);

        let run = crew.run_workflow(&plan, &CommandContext::new("meal planner")).await;

        assert!(run.completed);
        assert_eq!(run.succeeded(), 4);
        let ids: Vec<_> = run.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["STEP_1", "STEP_2", "STEP_3", "STEP_4"]);
        assert_eq!(run.steps[3].stage, 3);

        // The last step saw both of its dependencies' outputs
        let prompts = backend.prompts.lock().unwrap();
        let story_prompt = prompts.last().unwrap();
        assert!(story_prompt.contains("Earlier work to build on"));
        assert_eq!(story_prompt.matches("\n---\n").count(), 1);
        assert!(run.to_markdown().contains("## STEP_4 4: Stories (sm create-story)"));
    }

    #[tokio::test]
    async fn test_failed_dependency_skips_step() {
        let crew = crew(ScriptedBackend::new(Duration::ZERO), Duration::ZERO);
        let plan = WorkflowPlan::new(
            "broken",
            vec![
                step(1, "wizard", "cast", &[]),
                step(2, "qa", "test-plan", &["STEP_1"]),
                step(3, "dev", "no-such-command", &[]),
            ],
        );

        let run = crew.run_workflow(&plan, &CommandContext::default()).await;

        assert!(run.completed);
        assert_eq!(run.succeeded(), 0);
        assert_eq!(run.steps[0].response.error.as_deref(), Some("unknown role: wizard"));
        assert_eq!(
            run.steps[1].response.error.as_deref(),
            Some("Skipped: dependency STEP_1 did not succeed")
        );
        assert_eq!(
            run.steps[2].response.error.as_deref(),
            Some("Command 'no-such-command' not found")
        );
    }

    #[tokio::test]
    async fn test_budget_keeps_finished_steps() {
        let backend = ScriptedBackend::slow_on("Write a test plan", Duration::from_millis(500));
        let crew = crew(backend, Duration::from_millis(100));
        let plan = WorkflowPlan::new(
            "slow",
            vec![
                step(1, "qa", "risk-profile", &[]),
                step(2, "qa", "test-plan", &[]),
                step(3, "sm", "create-story", &["STEP_1"]),
            ],
        );

        let run = crew.run_workflow(&plan, &CommandContext::default()).await;

        assert!(!run.completed);
        assert_eq!(
            run.stopped.as_deref(),
            Some("runtime budget exhausted during stage 1")
        );
        // The fast step of the stage survives, the slow one is stopped, stage 2 never runs
        assert_eq!(run.steps.len(), 2);
        assert_eq!(run.steps[0].id, "STEP_1");
        assert!(run.steps[0].response.success);
        assert_eq!(run.steps[1].id, "STEP_2");
        assert_eq!(
            run.steps[1].response.error.as_deref(),
            Some("Stopped: runtime budget exhausted")
        );
        assert_eq!(run.succeeded(), 1);
        assert!(run.elapsed_ms < 500);
    }

    #[tokio::test]
    async fn test_stopped_step_is_reported() {
        let crew = crew(ScriptedBackend::new(Duration::from_millis(300)), Duration::from_millis(50));
        let plan = WorkflowPlan::new(
            "slow",
            vec![
                step(1, "qa", "risk-profile", &[]),
                step(2, "qa", "test-plan", &["STEP_1"]),
            ],
        );

        let run = crew.run_workflow(&plan, &CommandContext::default()).await;

        assert!(!run.completed);
        assert_eq!(run.steps.len(), 1);
        assert!(!run.steps[0].response.success);
        assert!(run.to_markdown().contains("> Failed: Stopped: runtime budget exhausted"));
    }

    #[tokio::test]
    async fn test_empty_plan_completes() {
        let crew = crew(ScriptedBackend::new(Duration::ZERO), Duration::ZERO);
        let run = crew
            .run_workflow(&WorkflowPlan::new("nothing", Vec::new()), &CommandContext::default())
            .await;
        assert!(run.completed);
        assert!(run.steps.is_empty());
    }
}
