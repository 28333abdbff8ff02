//! Product manager commands
//!
//! PRDs, project plans and stakeholder analysis.

use roster_core::{extract, find_field, section, section_items, Extract, Markdown};
use serde::Serialize;

use crate::records::{Epic, Phase, Requirement, Risk, Stakeholder};
use crate::{AgentError, Command, CommandRegistry, HandlerFuture, Invocation, Prompt, Report};

pub fn commands() -> CommandRegistry {
    CommandRegistry::new()
        .with(
            Command::new("create-prd", "Write a product requirements document", create_prd)
                .template("prd-tmpl"),
        )
        .with(
            Command::new("project-plan", "Break a project into phases", project_plan)
                .template("project-plan-tmpl"),
        )
        .with(
            Command::new(
                "stakeholder-analysis",
                "Map stakeholders by interest and influence",
                stakeholder_analysis,
            )
            .template("stakeholder-analysis-tmpl"),
        )
}

// ---------------------------------------------------------------------------
// create-prd
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Prd {
    pub product_name: String,
    pub overview: String,
    pub goals: Vec<String>,
    pub requirements: Vec<Requirement>,
    pub epics: Vec<Epic>,
    pub out_of_scope: Vec<String>,
}

impl Prd {
    pub fn must_haves(&self) -> impl Iterator<Item = &Requirement> {
        self.requirements.iter().filter(|r| r.priority == "must")
    }

    fn requirements_of(&self, kind: &str) -> Vec<&Requirement> {
        self.requirements.iter().filter(|r| r.kind == kind).collect()
    }
}

impl Report for Prd {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        Ok(Self {
            product_name: find_field(&lines, "Product Name").unwrap_or_default(),
            overview: section(&lines, "Overview").unwrap_or_default(),
            goals: section_items(&lines, "Goals"),
            requirements: extract(reply)?,
            epics: extract(reply)?,
            out_of_scope: section_items(&lines, "Out of Scope"),
        })
    }

    fn to_markdown(&self) -> String {
        let title = match self.product_name.as_str() {
            "" => "Product Requirements".to_string(),
            name => format!("{} PRD", name),
        };
        let mut doc = Markdown::titled(&title);
        doc.paragraph(&self.overview);
        if !self.goals.is_empty() {
            doc.heading(2, "Goals").bullets(&self.goals);
        }

        let render = |doc: &mut Markdown, r: &&Requirement| {
            doc.heading(3, &format!("{} {}", r.id, r.title))
                .paragraph(&r.description)
                .field("Priority", &r.priority)
                .list("Acceptance Criteria", &r.acceptance_criteria);
        };
        doc.section("Functional Requirements", &self.requirements_of("functional"), render)
            .section(
                "Non-Functional Requirements",
                &self.requirements_of("non-functional"),
                render,
            )
            .section("Epics", &self.epics, |doc, e| {
                doc.heading(3, &e.title)
                    .field("Goal", &e.goal)
                    .field("Priority", &e.priority)
                    .list("Stories", &e.stories);
            });

        if !self.out_of_scope.is_empty() {
            doc.heading(2, "Out of Scope").bullets(&self.out_of_scope);
        }
        doc.finish()
    }
}

fn create_prd(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(
            "Write a product requirements document. Use MoSCoW priorities and \
             give every requirement testable acceptance criteria.",
        )
        .input("Product", inv.input("a new software product"))
        .prior(inv.option("previous_output", ""))
        .field("Product Name", "name")
        .section("Overview", "paragraph")
        .section("Goals", "bullet list")
        .records("Requirements", &Requirement::SCHEMA, "requirement")
        .records("Epics", &Epic::SCHEMA, "epic")
        .section("Out of Scope", "bullet list")
        .build();

        inv.report::<Prd>(prompt).await
    })
}

// ---------------------------------------------------------------------------
// project-plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ProjectPlan {
    pub phases: Vec<Phase>,
    pub risks: Vec<Risk>,
    pub milestones: Vec<String>,
    /// Sum of phase durations, in weeks
    pub total_duration: f64,
}

impl Report for ProjectPlan {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        let phases: Vec<Phase> = extract(reply)?;
        let total_duration = phases.iter().map(|p| p.duration).sum();

        Ok(Self {
            phases,
            risks: extract(reply)?,
            milestones: section_items(&lines, "Milestones"),
            total_duration,
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("Project Plan");
        doc.field("Total duration", format!("{} weeks", self.total_duration))
            .section("Phases", &self.phases, |doc, p| {
                doc.heading(3, &p.title)
                    .paragraph(&p.description)
                    .field("Duration", format!("{} weeks", p.duration))
                    .list("Deliverables", &p.deliverables)
                    .list("Dependencies", &p.dependencies);
            });
        if !self.milestones.is_empty() {
            doc.heading(2, "Milestones").bullets(&self.milestones);
        }
        doc.section("Risks", &self.risks, |doc, r| {
            doc.heading(3, &r.title)
                .field("Probability", &r.probability)
                .field("Impact", &r.impact)
                .field("Mitigation", &r.mitigation);
        });
        doc.finish()
    }
}

fn project_plan(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(format!(
            "Plan the project below in sequential phases. Durations are in weeks; \
             the team has {} people.",
            inv.option("team_size", "five")
        ))
        .input("Project", inv.input("a new software product"))
        .prior(inv.option("previous_output", ""))
        .records("Phases", &Phase::SCHEMA, "phase")
        .section("Milestones", "bullet list")
        .records("Risks", &Risk::SCHEMA, "delivery risk")
        .build();

        inv.report::<ProjectPlan>(prompt).await
    })
}

// ---------------------------------------------------------------------------
// stakeholder-analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StakeholderMap {
    pub stakeholders: Vec<Stakeholder>,
    pub communication_plan: Vec<String>,
}

impl StakeholderMap {
    /// Quadrant of the interest/influence grid a stakeholder falls in
    pub fn quadrant(stakeholder: &Stakeholder) -> &'static str {
        let interested = stakeholder.interest == "high";
        let influential = stakeholder.influence == "high";
        match (influential, interested) {
            (true, true) => "Manage closely",
            (true, false) => "Keep satisfied",
            (false, true) => "Keep informed",
            (false, false) => "Monitor",
        }
    }
}

impl Report for StakeholderMap {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        Ok(Self {
            stakeholders: extract(reply)?,
            communication_plan: section_items(&lines, "Communication Plan"),
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("Stakeholder Analysis");
        doc.section("Stakeholders", &self.stakeholders, |doc, s| {
            doc.heading(3, &s.title)
                .field("Role", &s.role)
                .field("Interest", &s.interest)
                .field("Influence", &s.influence)
                .field("Strategy", Self::quadrant(s))
                .list("Concerns", &s.concerns)
                .field("Engagement", &s.engagement);
        });
        if !self.communication_plan.is_empty() {
            doc.heading(2, "Communication Plan").bullets(&self.communication_plan);
        }
        doc.finish()
    }
}

fn stakeholder_analysis(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new("Identify and analyse the stakeholders of the project below.")
            .input("Project", inv.input("a new software product"))
            .prior(inv.option("previous_output", ""))
            .records("Stakeholders", &Stakeholder::SCHEMA, "stakeholder")
            .section("Communication Plan", "bullet list")
            .build();

        inv.report::<StakeholderMap>(prompt).await
    })
}
