//! UX expert commands
//!
//! User personas, user flows and UI specifications.

use roster_core::{extract, find_field, section_items, Extract, Markdown};
use serde::Serialize;

use crate::records::{FlowStep, Screen, UserPersona};
use crate::{AgentError, Command, CommandRegistry, HandlerFuture, Invocation, Prompt, Report};

pub fn commands() -> CommandRegistry {
    CommandRegistry::new()
        .with(
            Command::new("create-personas", "Define the product's user personas", create_personas)
                .template("personas-tmpl"),
        )
        .with(
            Command::new("user-flow", "Map a user flow step by step", user_flow)
                .template("user-flow-tmpl"),
        )
        .with(
            Command::new("ui-spec", "Specify screens and their components", ui_spec)
                .template("front-end-spec-tmpl"),
        )
}

// ---------------------------------------------------------------------------
// create-personas
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PersonaSet {
    pub primary: String,
    pub personas: Vec<UserPersona>,
}

impl Report for PersonaSet {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        let personas: Vec<UserPersona> = extract(reply)?;
        let primary = find_field(&lines, "Primary Persona")
            .or_else(|| personas.first().map(|p| p.title.clone()))
            .unwrap_or_default();

        Ok(Self { primary, personas })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("User Personas");
        doc.field("Primary persona", &self.primary)
            .section("Personas", &self.personas, |doc, p| {
                doc.heading(3, &p.title).field("Role", &p.role);
                if !p.quote.is_empty() {
                    doc.paragraph(&format!("> {}", p.quote.trim_matches('"')));
                }
                doc.list("Goals", &p.goals)
                    .list("Pain points", &p.pain_points)
                    .field("Tech savviness", &p.tech_savviness);
            });
        doc.finish()
    }
}

fn create_personas(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(format!(
            "Define {} user personas for the product below, grounded in who would \
             actually use it.",
            inv.option("count", "three")
        ))
        .input("Product", inv.input("a new software product"))
        .prior(inv.option("previous_output", ""))
        .field("Primary Persona", "name of the most important persona")
        .records("Personas", &UserPersona::SCHEMA, "persona")
        .build();

        inv.report::<PersonaSet>(prompt).await
    })
}

// ---------------------------------------------------------------------------
// user-flow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct UserFlow {
    pub name: String,
    pub entry_point: String,
    pub steps: Vec<FlowStep>,
    pub success_criteria: Vec<String>,
}

impl UserFlow {
    /// Steps that describe what happens when things go wrong
    pub fn error_paths(&self) -> Vec<&FlowStep> {
        self.steps.iter().filter(|s| !s.error_path.is_empty()).collect()
    }
}

impl Report for UserFlow {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        Ok(Self {
            name: find_field(&lines, "Flow").unwrap_or_default(),
            entry_point: find_field(&lines, "Entry Point").unwrap_or_default(),
            steps: extract(reply)?,
            success_criteria: section_items(&lines, "Success Criteria"),
        })
    }

    fn to_markdown(&self) -> String {
        let title = match self.name.as_str() {
            "" => "User Flow".to_string(),
            name => format!("User Flow: {}", name),
        };
        let mut doc = Markdown::titled(&title);
        doc.field("Entry point", &self.entry_point)
            .field("Error paths", self.error_paths().len());

        let outline: Vec<String> = self
            .steps
            .iter()
            .enumerate()
            .map(|(n, s)| format!("{}. {}", n + 1, s.title))
            .collect();
        if !outline.is_empty() {
            doc.heading(2, "Outline").paragraph(&outline.join("\n"));
        }

        doc.section("Steps", &self.steps, |doc, s| {
            doc.heading(3, &s.title)
                .field("Screen", &s.screen)
                .field("Action", &s.action)
                .field("Outcome", &s.outcome)
                .field("On error", &s.error_path);
        });
        if !self.success_criteria.is_empty() {
            doc.heading(2, "Success Criteria").bullets(&self.success_criteria);
        }
        doc.finish()
    }
}

fn user_flow(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(
            "Map the user flow below step by step, including what the user sees \
             when something goes wrong.",
        )
        .input("Task the user wants to complete", inv.input("sign up"))
        .input("Persona", inv.option("persona", ""))
        .prior(inv.option("previous_output", ""))
        .field("Flow", "flow name")
        .field("Entry Point", "where the user starts")
        .records("Steps", &FlowStep::SCHEMA, "step")
        .section("Success Criteria", "bullet list")
        .build();

        inv.report::<UserFlow>(prompt).await
    })
}

// ---------------------------------------------------------------------------
// ui-spec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct UiSpec {
    pub design_principles: Vec<String>,
    pub screens: Vec<Screen>,
    pub accessibility: Vec<String>,
}

impl Report for UiSpec {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        Ok(Self {
            design_principles: section_items(&lines, "Design Principles"),
            screens: extract(reply)?,
            accessibility: section_items(&lines, "Accessibility"),
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("UI Specification");
        if !self.design_principles.is_empty() {
            doc.heading(2, "Design Principles").bullets(&self.design_principles);
        }
        doc.section("Screens", &self.screens, |doc, s| {
            doc.heading(3, &s.title)
                .paragraph(&s.purpose)
                .list("Components", &s.components)
                .list("Interactions", &s.interactions)
                .list("States", &s.states);
        });
        if !self.accessibility.is_empty() {
            doc.heading(2, "Accessibility").bullets(&self.accessibility);
        }
        doc.finish()
    }
}

fn ui_spec(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(format!(
            "Write a UI specification for the product below. Target platform: {}.",
            inv.option("platform", "responsive web")
        ))
        .input("Product", inv.input("a new software product"))
        .prior(inv.option("previous_output", ""))
        .section("Design Principles", "bullet list")
        .records("Screens", &Screen::SCHEMA, "screen")
        .section("Accessibility", "bullet list")
        .build();

        inv.report::<UiSpec>(prompt).await
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{run, CannedBackend};
    use crate::Role;
    use roster_core::CommandContext;

    #[test]
    fn test_personas_default_primary() {
        let reply = "\
### Persona: Busy Parent
Role: working parent of two
Goals: plan meals fast, save money
Pain Points: picky kids
Tech Savviness: Medium
Quote: \"I have ten minutes.\"
### Persona: Student
Tech Savviness: high
";
        let set = PersonaSet::parse(reply).unwrap();

        assert_eq!(set.primary, "Busy Parent");
        assert_eq!(set.personas.len(), 2);
        assert_eq!(set.personas[0].goals, vec!["plan meals fast", "save money"]);
        assert_eq!(set.personas[1].tech_savviness, "high");
        assert!(set.to_markdown().contains("> I have ten minutes."));
    }

    #[tokio::test]
    async fn test_user_flow_command() {
        let reply = "\
Flow: Checkout
Entry Point: cart page
### Step 1: Review cart
Screen: Cart
Action: tap Checkout
### Step 2: Pay
Screen: Payment
Action: enter card
Outcome: receipt shown
Error Path: card declined message with retry
";
        let backend = CannedBackend::new(reply);
        let response = run(Role::Ux, &backend, "user-flow", CommandContext::new("buy groceries")).await;

        assert!(response.success);
        let data = response.data.unwrap();
        assert_eq!(data["name"], "Checkout");
        assert_eq!(data["steps"][1]["id"], "FLOW_2");
        assert_eq!(data["steps"][1]["title"], "2: Pay");

        let output = response.output.unwrap();
        assert!(output.starts_with("# User Flow: Checkout"));
        assert!(output.contains("**Error paths:** 1"));
    }

    #[test]
    fn test_ui_spec_screens() {
        let reply = "\
## Design Principles
- one primary action per screen
### Screen: Dashboard
Purpose: overview of the week
Components: calendar, shopping list
States: empty, loading, loaded
";
        let spec = UiSpec::parse(reply).unwrap();
        assert_eq!(spec.design_principles, vec!["one primary action per screen"]);
        assert_eq!(spec.screens[0].components, vec!["calendar", "shopping list"]);
        assert_eq!(spec.screens[0].states.len(), 3);
    }
}
