//! Business analyst commands
//!
//! Market research, brainstorming sessions and project briefs.

use roster_core::{extract, find_field, section, section_items, Extract, Markdown};
use serde::Serialize;

use crate::records::{Competitor, Idea, Opportunity, Risk, Stakeholder};
use crate::{AgentError, Command, CommandRegistry, HandlerFuture, Invocation, Prompt, Report};

pub fn commands() -> CommandRegistry {
    CommandRegistry::new()
        .with(
            Command::new("research", "Research a market and its competitors", research)
                .template("market-research-tmpl"),
        )
        .with(
            Command::new("brainstorm", "Run a structured brainstorming session", brainstorm)
                .template("brainstorming-output-tmpl"),
        )
        .with(
            Command::new("project-brief", "Draft a project brief", project_brief)
                .template("project-brief-tmpl"),
        )
}

// ---------------------------------------------------------------------------
// research
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MarketResearch {
    pub summary: String,
    pub market_size: String,
    pub growth_rate: String,
    pub competitors: Vec<Competitor>,
    pub opportunities: Vec<Opportunity>,
    pub trends: Vec<String>,
}

impl Report for MarketResearch {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        Ok(Self {
            summary: section(&lines, "Summary").unwrap_or_default(),
            market_size: find_field(&lines, "Market Size").unwrap_or_default(),
            growth_rate: find_field(&lines, "Growth Rate").unwrap_or_default(),
            competitors: extract(reply)?,
            opportunities: extract(reply)?,
            trends: section_items(&lines, "Trends"),
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("Market Research");
        doc.paragraph(&self.summary)
            .field("Market Size", &self.market_size)
            .field("Growth Rate", &self.growth_rate)
            .section("Competitors", &self.competitors, |doc, c| {
                doc.heading(3, &c.title)
                    .field("Positioning", &c.positioning)
                    .field("Market Share", format!("{}%", c.market_share))
                    .list("Strengths", &c.strengths)
                    .list("Weaknesses", &c.weaknesses);
            })
            .section("Opportunities", &self.opportunities, |doc, o| {
                doc.heading(3, &o.title)
                    .paragraph(&o.description)
                    .field("Potential", &o.potential)
                    .field("Segment", &o.segment);
            });
        if !self.trends.is_empty() {
            doc.heading(2, "Trends").bullets(&self.trends);
        }
        doc.finish()
    }
}

fn research(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(format!(
            "Research the market for the following product idea. Focus: {}.",
            inv.option("focus", "overall market")
        ))
        .input("Product idea", inv.input("a new software product"))
        .prior(inv.option("previous_output", ""))
        .field("Market Size", "estimate with unit")
        .field("Growth Rate", "yearly percentage")
        .section("Summary", "two or three sentences")
        .records("Competitors", &Competitor::SCHEMA, "competitor")
        .records("Opportunities", &Opportunity::SCHEMA, "opportunity")
        .section("Trends", "bullet list")
        .build();

        inv.report::<MarketResearch>(prompt).await
    })
}

// ---------------------------------------------------------------------------
// brainstorm
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Brainstorm {
    pub technique: String,
    pub ideas: Vec<Idea>,
    pub themes: Vec<String>,
    pub next_steps: Vec<String>,
}

impl Brainstorm {
    /// High impact, low effort
    pub fn quick_wins(&self) -> Vec<&Idea> {
        self.ideas
            .iter()
            .filter(|idea| idea.impact == "high" && idea.effort == "low")
            .collect()
    }
}

impl Report for Brainstorm {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        Ok(Self {
            technique: find_field(&lines, "Technique").unwrap_or_default(),
            ideas: extract(reply)?,
            themes: section_items(&lines, "Themes"),
            next_steps: section_items(&lines, "Next Steps"),
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("Brainstorming Session");
        doc.field("Technique", &self.technique);

        let quick_wins: Vec<String> = self.quick_wins().iter().map(|i| i.title.clone()).collect();
        doc.list("Quick wins", &quick_wins);

        doc.section("Ideas", &self.ideas, |doc, idea| {
            doc.heading(3, &idea.title)
                .paragraph(&idea.description)
                .field("Category", &idea.category)
                .field("Impact", &idea.impact)
                .field("Effort", &idea.effort);
        });
        if !self.themes.is_empty() {
            doc.heading(2, "Themes").bullets(&self.themes);
        }
        if !self.next_steps.is_empty() {
            doc.heading(2, "Next Steps").bullets(&self.next_steps);
        }
        doc.finish()
    }
}

fn brainstorm(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let technique = inv.option("technique", "mind mapping");
        let prompt = Prompt::new(format!(
            "Facilitate a brainstorming session on the topic below using the {} technique. \
             Aim for {} distinct ideas.",
            technique,
            inv.option("idea_count", "eight")
        ))
        .input("Topic", inv.input("new product features"))
        .prior(inv.option("previous_output", ""))
        .field("Technique", technique)
        .records("Ideas", &Idea::SCHEMA, "idea")
        .section("Themes", "bullet list of recurring themes")
        .section("Next Steps", "bullet list")
        .build();

        inv.report::<Brainstorm>(prompt).await
    })
}

// ---------------------------------------------------------------------------
// project-brief
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ProjectBrief {
    pub project_name: String,
    pub problem: String,
    pub solution: String,
    pub target_users: String,
    pub goals: Vec<String>,
    pub success_metrics: Vec<String>,
    pub constraints: Vec<String>,
    pub stakeholders: Vec<Stakeholder>,
    pub risks: Vec<Risk>,
}

impl Report for ProjectBrief {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        Ok(Self {
            project_name: find_field(&lines, "Project Name").unwrap_or_default(),
            problem: section(&lines, "Problem").unwrap_or_default(),
            solution: section(&lines, "Solution").unwrap_or_default(),
            target_users: section(&lines, "Target Users").unwrap_or_default(),
            goals: section_items(&lines, "Goals"),
            success_metrics: section_items(&lines, "Success Metrics"),
            constraints: section_items(&lines, "Constraints"),
            stakeholders: extract(reply)?,
            risks: extract(reply)?,
        })
    }

    fn to_markdown(&self) -> String {
        let title = if self.project_name.is_empty() {
            "Project Brief".to_string()
        } else {
            format!("Project Brief: {}", self.project_name)
        };

        let mut doc = Markdown::titled(&title);
        for (heading, body) in [
            ("Problem", &self.problem),
            ("Solution", &self.solution),
            ("Target Users", &self.target_users),
        ] {
            if !body.is_empty() {
                doc.heading(2, heading).paragraph(body);
            }
        }
        for (heading, items) in [
            ("Goals", &self.goals),
            ("Success Metrics", &self.success_metrics),
            ("Constraints", &self.constraints),
        ] {
            if !items.is_empty() {
                doc.heading(2, heading).bullets(items);
            }
        }
        doc.section("Stakeholders", &self.stakeholders, |doc, s| {
            doc.heading(3, &s.title)
                .field("Role", &s.role)
                .field("Interest", &s.interest)
                .field("Influence", &s.influence);
        })
        .section("Risks", &self.risks, |doc, r| {
            doc.heading(3, &r.title)
                .paragraph(&r.description)
                .field("Probability", &r.probability)
                .field("Impact", &r.impact)
                .field("Mitigation", &r.mitigation);
        });
        doc.finish()
    }
}

fn project_brief(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new("Write a concise project brief for the idea below.")
            .input("Idea", inv.input("a new software product"))
            .prior(inv.option("previous_output", ""))
            .field("Project Name", "short name")
            .section("Problem", "paragraph")
            .section("Solution", "paragraph")
            .section("Target Users", "paragraph")
            .section("Goals", "bullet list")
            .section("Success Metrics", "bullet list")
            .section("Constraints", "bullet list")
            .records("Stakeholders", &Stakeholder::SCHEMA, "stakeholder")
            .records("Risks", &Risk::SCHEMA, "risk")
            .build();

        inv.report::<ProjectBrief>(prompt).await
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{run, CannedBackend};
    use crate::Role;
    use roster_core::CommandContext;

    const RESEARCH_REPLY: &str = "\
Market Size: $20B
Growth Rate: 12% yearly

## Summary
Meal-kit delivery is crowded but growing.

## Competitors
### Competitor: HelloFresh
Positioning: mainstream family kits
Strengths: scale, brand
Weaknesses: price
Market Share: 35%

### Competitor: Blue Apron
Positioning: premium recipes
Market Share: 8 percent

## Opportunities
### Opportunity: Diet-specific kits
Description: keto and vegan plans
Potential: High
Segment: health-conscious adults

## Trends
- sustainable packaging
- local sourcing
";

    #[test]
    fn test_parse_market_research() {
        let report = MarketResearch::parse(RESEARCH_REPLY).unwrap();

        assert_eq!(report.summary, "Meal-kit delivery is crowded but growing.");
        assert_eq!(report.market_size, "$20B");
        assert_eq!(report.competitors.len(), 2);
        assert_eq!(report.competitors[0].id, "COMPETITOR_1");
        assert_eq!(report.competitors[0].strengths, vec!["scale", "brand"]);
        assert_eq!(report.competitors[1].market_share, 8.0);
        assert!(report.competitors[1].weaknesses.is_empty());
        assert_eq!(report.opportunities[0].potential, "high");
        assert_eq!(report.trends, vec!["sustainable packaging", "local sourcing"]);
    }

    #[tokio::test]
    async fn test_research_command() {
        let backend = CannedBackend::new(RESEARCH_REPLY);
        let context = CommandContext::new("vegan meal kits").with_option("focus", "Europe");
        let response = run(Role::Analyst, &backend, "research", context).await;

        assert!(response.success);
        assert_eq!(
            response.metadata.template.as_deref(),
            Some("market-research-tmpl")
        );
        let data = response.data.unwrap();
        assert_eq!(data["competitors"][0]["title"], "HelloFresh");

        let output = response.output.unwrap();
        assert!(output.starts_with("# Market Research"));
        assert!(output.contains("### HelloFresh"));

        let prompt = backend.last_prompt();
        assert!(prompt.contains("Focus: Europe"));
        assert!(prompt.contains("vegan meal kits"));
        assert!(prompt.contains("### Competitor: <name>"));
    }

    #[test]
    fn test_brainstorm_quick_wins() {
        let reply = "\
Technique: SCAMPER
### Idea: Referral credits
Impact: high
Effort: low
### Idea: AR recipe view
Impact: high
Effort: high
";
        let report = Brainstorm::parse(reply).unwrap();
        assert_eq!(report.technique, "SCAMPER");
        assert_eq!(report.ideas.len(), 2);
        let wins: Vec<_> = report.quick_wins().iter().map(|i| i.title.as_str()).collect();
        assert_eq!(wins, vec!["Referral credits"]);
        assert!(report.to_markdown().contains("- Referral credits"));
    }

    #[tokio::test]
    async fn test_project_brief_from_prose_reply() {
        // A reply without any record headings still produces a brief.
        let backend = CannedBackend::new("We could not produce a brief.");
        let response = run(Role::Analyst, &backend, "project-brief", CommandContext::default()).await;

        assert!(response.success);
        let data = response.data.unwrap();
        assert_eq!(data["stakeholders"].as_array().unwrap().len(), 0);
        assert_eq!(data["problem"], "");
        assert!(backend.last_prompt().contains("a new software product"));
    }
}
