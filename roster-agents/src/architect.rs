//! Architect commands
//!
//! System architecture, technology stack selection and technical risk.

use roster_core::{extract, find_field, match_choice, section, section_items, Extract, Markdown};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::records::{Component, Decision, Risk, Technology};
use crate::{AgentError, Command, CommandRegistry, HandlerFuture, Invocation, Prompt, Report};

pub fn commands() -> CommandRegistry {
    CommandRegistry::new()
        .with(
            Command::new(
                "design-architecture",
                "Design the system architecture",
                design_architecture,
            )
            .template("architecture-tmpl"),
        )
        .with(
            Command::new("tech-stack", "Recommend a technology stack", tech_stack)
                .template("tech-stack-tmpl"),
        )
        .with(
            Command::new("risk-assessment", "Assess technical risks", risk_assessment)
                .template("risk-assessment-tmpl"),
        )
}

// ---------------------------------------------------------------------------
// design-architecture
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Architecture {
    pub style: String,
    pub overview: String,
    pub components: Vec<Component>,
    pub decisions: Vec<Decision>,
    pub quality_attributes: Vec<String>,
}

impl Report for Architecture {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        Ok(Self {
            style: find_field(&lines, "Architecture Style").unwrap_or_default(),
            overview: section(&lines, "Overview").unwrap_or_default(),
            components: extract(reply)?,
            decisions: extract(reply)?,
            quality_attributes: section_items(&lines, "Quality Attributes"),
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("System Architecture");
        doc.field("Style", &self.style).paragraph(&self.overview);

        doc.section("Components", &self.components, |doc, c| {
            doc.heading(3, &c.title)
                .paragraph(&c.responsibility)
                .field("Technology", &c.technology)
                .list("Depends on", &c.dependencies)
                .list("Interfaces", &c.interfaces);
        })
        .section("Decisions", &self.decisions, |doc, d| {
            doc.heading(3, &format!("{}: {}", d.id, d.title))
                .field("Status", &d.status)
                .field("Context", &d.context)
                .field("Rationale", &d.rationale)
                .list("Consequences", &d.consequences);
        });

        if !self.quality_attributes.is_empty() {
            doc.heading(2, "Quality Attributes").bullets(&self.quality_attributes);
        }
        doc.finish()
    }
}

fn design_architecture(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(
            "Design a system architecture for the product below. Name each \
             component once and record the key decisions.",
        )
        .input("Product", inv.input("a web application"))
        .input("Constraints", inv.option("constraints", ""))
        .prior(inv.option("previous_output", ""))
        .field("Architecture Style", "e.g. modular monolith, microservices")
        .section("Overview", "paragraph")
        .records("Components", &Component::SCHEMA, "component")
        .records("Decisions", &Decision::SCHEMA, "architecture decision")
        .section("Quality Attributes", "bullet list")
        .build();

        inv.report::<Architecture>(prompt).await
    })
}

// ---------------------------------------------------------------------------
// tech-stack
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TechStack {
    pub technologies: Vec<Technology>,
    pub rationale: String,
}

impl TechStack {
    /// Technologies grouped by category; uncategorized ones under "Other"
    pub fn by_category(&self) -> BTreeMap<&str, Vec<&Technology>> {
        let mut groups: BTreeMap<&str, Vec<&Technology>> = BTreeMap::new();
        for tech in &self.technologies {
            let category = if tech.category.is_empty() {
                "Other"
            } else {
                tech.category.as_str()
            };
            groups.entry(category).or_default().push(tech);
        }
        groups
    }
}

impl Report for TechStack {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        Ok(Self {
            technologies: extract(reply)?,
            rationale: section(&lines, "Rationale").unwrap_or_default(),
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("Technology Stack");
        for (category, techs) in self.by_category() {
            doc.heading(2, category);
            for tech in techs {
                doc.heading(3, &tech.title)
                    .field("Purpose", &tech.purpose)
                    .field("Maturity", &tech.maturity)
                    .list("Alternatives", &tech.alternatives);
            }
        }
        if !self.rationale.is_empty() {
            doc.heading(2, "Rationale").paragraph(&self.rationale);
        }
        doc.finish()
    }
}

fn tech_stack(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(
            "Recommend a technology stack for the project below. Cover frontend, \
             backend, data storage, infrastructure and tooling where relevant.",
        )
        .input("Project", inv.input("a web application"))
        .input("Team skills", inv.option("team_skills", ""))
        .prior(inv.option("previous_output", ""))
        .records("Technologies", &Technology::SCHEMA, "technology")
        .section("Rationale", "paragraph")
        .build();

        inv.report::<TechStack>(prompt).await
    })
}

// ---------------------------------------------------------------------------
// risk-assessment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    pub overall_risk: String,
    pub summary: String,
    pub risks: Vec<Risk>,
}

impl RiskAssessment {
    /// Risks scoring 6 or more (high on one axis, at least medium on the other)
    pub fn critical(&self) -> Vec<&Risk> {
        self.risks.iter().filter(|risk| risk.score() >= 6).collect()
    }
}

impl Report for RiskAssessment {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        let overall_risk = find_field(&lines, "Overall Risk")
            .map(|value| match_choice(&value, &["low", "medium", "high", "critical"], "medium"))
            .unwrap_or_else(|| "medium".to_string());

        Ok(Self {
            overall_risk,
            summary: section(&lines, "Summary").unwrap_or_default(),
            risks: extract(reply)?,
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("Technical Risk Assessment");
        doc.field("Overall Risk", &self.overall_risk)
            .field("Critical risks", self.critical().len())
            .paragraph(&self.summary)
            .section("Risks", &self.risks, |doc, r| {
                doc.heading(3, &r.title)
                    .paragraph(&r.description)
                    .field("Probability", &r.probability)
                    .field("Impact", &r.impact)
                    .field("Score", r.score())
                    .field("Mitigation", &r.mitigation)
                    .field("Owner", &r.owner);
            });
        doc.finish()
    }
}

fn risk_assessment(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(
            "Identify the technical risks of the system below: scalability, \
             security, integration, data and delivery risks.",
        )
        .input("System", inv.input("the proposed architecture"))
        .prior(inv.option("previous_output", ""))
        .field("Overall Risk", "low | medium | high | critical")
        .section("Summary", "paragraph")
        .records("Risks", &Risk::SCHEMA, "risk")
        .build();

        inv.report::<RiskAssessment>(prompt).await
    })
}
