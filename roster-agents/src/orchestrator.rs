//! Orchestrator commands
//!
//! Plans multi-agent workflows and routes requests to the right agent. The
//! plan is plain data; running it is up to the caller.

use roster_core::{extract, find_field, section, section_items, Extract, Markdown};
use serde::{Deserialize, Serialize};

use crate::records::WorkflowStep;
use crate::{AgentError, Command, CommandRegistry, HandlerFuture, Invocation, Prompt, Report, Role};

pub fn commands() -> CommandRegistry {
    CommandRegistry::new()
        .with(
            Command::new("plan-workflow", "Plan a multi-agent workflow", plan_workflow)
                .template("workflow-plan-tmpl"),
        )
        .with(
            Command::new(
                "recommend-agent",
                "Pick the agent and command for a request",
                recommend_agent,
            )
            .template("agent-recommendation-tmpl"),
        )
}

/// One line per role listing its commands, for prompts
fn roster_overview() -> String {
    Role::ALL
        .iter()
        .map(|role| {
            let names: Vec<String> = role.commands().list().into_iter().map(|c| c.name).collect();
            format!("- {} ({}): {}", role.as_str(), role.title(), names.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// plan-workflow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowPlan {
    pub goal: String,
    pub steps: Vec<WorkflowStep>,
    /// Steps naming an unknown agent, command or dependency
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl WorkflowPlan {
    /// Build a plan from steps, checking each against the role tables
    pub fn new(goal: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        let mut warnings = Vec::new();

        for (idx, step) in steps.iter().enumerate() {
            match step.agent.parse::<Role>() {
                Ok(role) if !role.commands().contains(&step.command) => warnings.push(format!(
                    "{}: {} has no command '{}'",
                    step.id, role, step.command
                )),
                Ok(_) => {}
                Err(e) => warnings.push(format!("{}: {}", step.id, e)),
            }

            for dep in &step.depends_on {
                if is_blank_dependency(dep) {
                    continue;
                }
                if resolve_dependency(&steps, idx, dep).is_none() {
                    warnings.push(format!(
                        "{}: dependency '{}' is not an earlier step",
                        step.id, dep
                    ));
                }
            }
        }

        Self {
            goal: goal.into(),
            steps,
            warnings,
        }
    }

    /// Indices of the earlier steps `idx` waits for
    pub fn dependencies(&self, idx: usize) -> Vec<usize> {
        let Some(step) = self.steps.get(idx) else {
            return Vec::new();
        };

        let mut deps: Vec<usize> = step
            .depends_on
            .iter()
            .filter_map(|dep| resolve_dependency(&self.steps, idx, dep))
            .collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }

    /// Step indices grouped into stages; every step runs after all of its
    /// dependencies' stages, steps within a stage are independent
    pub fn stages(&self) -> Vec<Vec<usize>> {
        let mut level = vec![0usize; self.steps.len()];
        for idx in 0..self.steps.len() {
            let after = self
                .dependencies(idx)
                .into_iter()
                .map(|dep| level[dep] + 1)
                .max()
                .unwrap_or(0);
            level[idx] = after;
        }

        let depth = level.iter().copied().max().map_or(0, |max| max + 1);
        let mut stages = vec![Vec::new(); depth];
        for (idx, stage) in level.into_iter().enumerate() {
            stages[stage].push(idx);
        }
        stages
    }
}

fn is_blank_dependency(dep: &str) -> bool {
    matches!(dep.trim().to_lowercase().as_str(), "" | "none" | "-" | "n/a")
}

/// Resolve a dependency reference ("STEP_2", "Step 2", "2" or a step title)
/// to the index of a step before `idx`
fn resolve_dependency(steps: &[WorkflowStep], idx: usize, dep: &str) -> Option<usize> {
    let dep = dep.trim().to_lowercase();

    let numbered = dep
        .strip_prefix("step")
        .unwrap_or(&dep)
        .trim_start_matches([' ', '_', '-', '#'])
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1));

    let target = numbered.or_else(|| {
        steps
            .iter()
            .position(|s| s.title.to_lowercase() == dep || s.id.to_lowercase() == dep)
    })?;

    (target < idx).then_some(target)
}

impl Report for WorkflowPlan {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        let steps: Vec<WorkflowStep> = extract(reply)?;
        let goal = find_field(&lines, "Workflow Goal")
            .or_else(|| section(&lines, "Goal"))
            .unwrap_or_default();
        Ok(Self::new(goal, steps))
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("Workflow Plan");
        doc.field("Goal", &self.goal);

        for (n, stage) in self.stages().iter().enumerate() {
            doc.heading(2, &format!("Stage {}", n + 1));
            for &idx in stage {
                let step = &self.steps[idx];
                let after: Vec<String> = self
                    .dependencies(idx)
                    .into_iter()
                    .map(|dep| self.steps[dep].id.clone())
                    .collect();
                doc.heading(3, &format!("{} {}", step.id, step.title))
                    .field("Agent", &step.agent)
                    .field("Command", &step.command)
                    .field("Input", &step.input)
                    .field("After", after.join(", "));
            }
        }
        if !self.warnings.is_empty() {
            doc.heading(2, "Warnings").bullets(&self.warnings);
        }
        doc.finish()
    }
}

fn plan_workflow(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(format!(
            "Plan a workflow that reaches the goal below using these agents and \
             commands. Use at most {} steps. A step may depend on earlier steps \
             only; refer to them as STEP_<n>.",
            inv.option("max_steps", "eight")
        ))
        .input("Available agents", &roster_overview())
        .input("Goal", inv.input("deliver a new feature"))
        .prior(inv.option("previous_output", ""))
        .field("Workflow Goal", "one sentence")
        .records("Steps", &WorkflowStep::SCHEMA, "step")
        .build();

        inv.report::<WorkflowPlan>(prompt).await
    })
}

// ---------------------------------------------------------------------------
// recommend-agent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct AgentRecommendation {
    /// Agent as the model named it
    pub agent_name: String,
    /// Resolved role, when the name is one
    pub role: Option<Role>,
    pub command: String,
    /// Whether the resolved role has that command
    pub command_known: bool,
    pub reason: String,
    pub alternatives: Vec<String>,
}

impl Report for AgentRecommendation {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        let agent_name = find_field(&lines, "Agent").unwrap_or_default();
        let command = find_field(&lines, "Command").unwrap_or_default();
        let role = agent_name.parse::<Role>().ok();
        let command_known = role.is_some_and(|role| role.commands().contains(&command));

        Ok(Self {
            agent_name,
            role,
            command,
            command_known,
            reason: find_field(&lines, "Reason").unwrap_or_default(),
            alternatives: section_items(&lines, "Alternatives"),
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("Agent Recommendation");
        match self.role {
            Some(role) => doc.field("Agent", format!("{} ({})", role.title(), role)),
            None => doc.field("Agent", format!("{} (unknown)", self.agent_name)),
        };
        doc.field("Command", &self.command).paragraph(&self.reason);
        if self.role.is_some() && !self.command_known {
            doc.paragraph(&format!(
                "> `{}` is not a registered command of this agent.",
                self.command
            ));
        }
        if !self.alternatives.is_empty() {
            doc.heading(2, "Alternatives").bullets(&self.alternatives);
        }
        doc.finish()
    }
}

fn recommend_agent(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new("Pick the single best agent and command for the request below.")
            .input("Available agents", &roster_overview())
            .input("Request", inv.input("help me start a project"))
            .field("Agent", "agent id")
            .field("Command", "command name")
            .field("Reason", "one sentence")
            .section("Alternatives", "bullet list of other agent/command pairs")
            .build();

        inv.report::<AgentRecommendation>(prompt).await
    })
}
