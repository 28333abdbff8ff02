//! QA commands
//!
//! Test plans, story review gates and risk profiles. Gate decisions fall back
//! to rules over the extracted records when the model does not state one.

use roster_core::{
    extract, find_field, match_choice, section, section_items, Extract, Markdown,
};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::records::{Issue, Risk, TestCase};
use crate::{AgentError, Command, CommandRegistry, HandlerFuture, Invocation, Prompt, Report};

/// Quality gate outcomes
pub const GATES: &[&str] = &["pass", "concerns", "fail", "waived"];

pub fn commands() -> CommandRegistry {
    CommandRegistry::new()
        .with(
            Command::new("test-plan", "Design test cases for a feature", test_plan)
                .template("test-plan-tmpl"),
        )
        .with(
            Command::new("review-story", "Review a story and decide its gate", review_story)
                .template("qa-gate-tmpl"),
        )
        .with(
            Command::new("risk-profile", "Score risks by probability and impact", risk_profile)
                .template("risk-profile-tmpl"),
        )
}

// ---------------------------------------------------------------------------
// test-plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TestPlan {
    pub scope: String,
    pub test_cases: Vec<TestCase>,
    /// Number of cases per test type
    pub coverage: BTreeMap<String, usize>,
    pub out_of_scope: Vec<String>,
}

impl Report for TestPlan {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        let test_cases: Vec<TestCase> = extract(reply)?;

        let mut coverage = BTreeMap::new();
        for case in &test_cases {
            *coverage.entry(case.kind.clone()).or_insert(0) += 1;
        }

        Ok(Self {
            scope: section(&lines, "Scope").unwrap_or_default(),
            test_cases,
            coverage,
            out_of_scope: section_items(&lines, "Out of Scope"),
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("Test Plan");
        doc.paragraph(&self.scope);

        let coverage: Vec<String> = self
            .coverage
            .iter()
            .map(|(kind, count)| format!("{}: {}", kind, count))
            .collect();
        doc.list("Coverage", &coverage);

        doc.section("Test Cases", &self.test_cases, |doc, tc| {
            doc.heading(3, &format!("{} {}", tc.id, tc.title))
                .field("Type", &tc.kind)
                .field("Priority", &tc.priority)
                .list("Preconditions", &tc.preconditions)
                .list("Steps", &tc.steps)
                .field("Expected", &tc.expected_result);
        });
        if !self.out_of_scope.is_empty() {
            doc.heading(2, "Out of Scope").bullets(&self.out_of_scope);
        }
        doc.finish()
    }
}

fn test_plan(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(format!(
            "Write a test plan for the feature below. Test levels to cover: {}.",
            inv.option("levels", "unit, integration, e2e")
        ))
        .input("Feature", inv.input("the current story"))
        .prior(inv.option("previous_output", ""))
        .section("Scope", "paragraph")
        .records("Test Cases", &TestCase::SCHEMA, "test case")
        .section("Out of Scope", "bullet list")
        .build();

        inv.report::<TestPlan>(prompt).await
    })
}

// ---------------------------------------------------------------------------
// review-story
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StoryReview {
    pub gate: String,
    pub summary: String,
    pub strengths: Vec<String>,
    pub issues: Vec<Issue>,
}

/// Gate implied by issue severities
fn gate_from_issues(issues: &[Issue]) -> &'static str {
    if issues.iter().any(|i| i.severity == "critical") {
        "fail"
    } else if issues.iter().any(|i| i.severity == "high") {
        "concerns"
    } else {
        "pass"
    }
}

impl Report for StoryReview {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        let issues: Vec<Issue> = extract(reply)?;
        let gate = match find_field(&lines, "Gate") {
            Some(value) => match_choice(&value, GATES, gate_from_issues(&issues)),
            None => gate_from_issues(&issues).to_string(),
        };

        Ok(Self {
            gate,
            summary: section(&lines, "Summary").unwrap_or_default(),
            strengths: section_items(&lines, "Strengths"),
            issues,
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("Story Review");
        doc.field("Gate", self.gate.to_uppercase())
            .paragraph(&self.summary);
        if !self.strengths.is_empty() {
            doc.heading(2, "Strengths").bullets(&self.strengths);
        }
        doc.section("Issues", &self.issues, |doc, i| {
            doc.heading(3, &format!("{} ({})", i.title, i.severity))
                .field("Category", &i.category)
                .paragraph(&i.description)
                .field("Recommendation", &i.recommendation);
        });
        doc.finish()
    }
}

fn review_story(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(
            "Review the story and its implementation notes below against its \
             acceptance criteria, then decide the quality gate.",
        )
        .input("Story", inv.input("the current story"))
        .prior(inv.option("previous_output", ""))
        .field("Gate", &GATES.join(" | "))
        .section("Summary", "paragraph")
        .section("Strengths", "bullet list")
        .records("Issues", &Issue::SCHEMA, "issue")
        .build();

        inv.report::<StoryReview>(prompt).await
    })
}

// ---------------------------------------------------------------------------
// risk-profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ScoredRisk {
    #[serde(flatten)]
    pub risk: Risk,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskProfile {
    /// Highest first; ties keep reply order
    pub risks: Vec<ScoredRisk>,
    pub highest_score: u8,
    pub gate: String,
}

impl Report for RiskProfile {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let extracted: Vec<Risk> = extract(reply)?;
        let mut risks: Vec<ScoredRisk> = extracted
            .into_iter()
            .map(|risk| ScoredRisk {
                score: risk.score(),
                risk,
            })
            .collect();
        risks.sort_by(|a, b| b.score.cmp(&a.score));

        let highest_score = risks.first().map(|r| r.score).unwrap_or(0);
        let gate = match highest_score {
            9.. => "fail",
            6..=8 => "concerns",
            _ => "pass",
        };

        Ok(Self {
            risks,
            highest_score,
            gate: gate.to_string(),
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("Risk Profile");
        doc.field("Gate", self.gate.to_uppercase())
            .field("Highest score", self.highest_score);

        let rows: Vec<String> = self
            .risks
            .iter()
            .map(|r| format!("{} | {} | {}", r.score, r.risk.id, r.risk.title))
            .collect();
        if !rows.is_empty() {
            doc.heading(2, "Matrix").bullets(&rows);
        }

        doc.section("Risks", &self.risks, |doc, r| {
            doc.heading(3, &r.risk.title)
                .paragraph(&r.risk.description)
                .field("Probability", &r.risk.probability)
                .field("Impact", &r.risk.impact)
                .field("Mitigation", &r.risk.mitigation);
        });
        doc.finish()
    }
}

fn risk_profile(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(
            "Profile the delivery and quality risks of the story below. Rate \
             probability and impact separately.",
        )
        .input("Story", inv.input("the current story"))
        .prior(inv.option("previous_output", ""))
        .records("Risks", &Risk::SCHEMA, "risk")
        .build();

        inv.report::<RiskProfile>(prompt).await
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{run, CannedBackend};
    use crate::Role;
    use roster_core::CommandContext;

    #[test]
    fn test_test_plan_coverage() {
        let reply = "\
## Scope
Checkout flow.

### Test Case: Valid card
Type: Unit
Priority: high
Steps: open cart, pay, see receipt
Expected Result: order confirmed
### Test Case: Declined card
Type: End-to-end (e2e)
### Test Case: Expired card
Type: unit
";
        let plan = TestPlan::parse(reply).unwrap();

        assert_eq!(plan.test_cases.len(), 3);
        assert_eq!(plan.test_cases[0].id, "TC_1");
        assert_eq!(plan.test_cases[0].steps.len(), 3);
        assert_eq!(plan.test_cases[0].expected_result, "order confirmed");
        assert_eq!(plan.coverage.get("unit"), Some(&2));
        assert_eq!(plan.coverage.get("e2e"), Some(&1));
        assert!(plan.to_markdown().contains("- unit: 2"));
    }

    #[tokio::test]
    async fn test_review_story_stated_gate() {
        let reply = "\
Gate: CONCERNS
## Summary
Mostly complete.
### Issue: No rate limit
Severity: medium
Category: security
";
        let backend = CannedBackend::new(reply);
        let response = run(Role::Qa, &backend, "review-story", CommandContext::new("story 1.2")).await;

        assert!(response.success);
        assert_eq!(response.metadata.template.as_deref(), Some("qa-gate-tmpl"));
        let data = response.data.unwrap();
        assert_eq!(data["gate"], "concerns");
        assert_eq!(data["issues"][0]["category"], "security");
        assert!(response.output.unwrap().contains("**Gate:** CONCERNS"));
    }

    #[test]
    fn test_review_gate_inferred_from_issues() {
        let review = StoryReview::parse("### Issue: Data loss\nSeverity: critical\n").unwrap();
        assert_eq!(review.gate, "fail");

        let review = StoryReview::parse("### Issue: Slow page\nSeverity: high\n").unwrap();
        assert_eq!(review.gate, "concerns");

        let review = StoryReview::parse("Gate: maybe\n").unwrap();
        assert_eq!(review.gate, "pass");
    }

    #[test]
    fn test_risk_profile_sorts_and_gates() {
        let reply = "\
### Minor Risk
Probability: low
Impact: low
### Outage Risk
Probability: high
Impact: high
### Drift Risk
Probability: high
";
        let profile = RiskProfile::parse(reply).unwrap();

        let order: Vec<_> = profile.risks.iter().map(|r| r.risk.id.as_str()).collect();
        assert_eq!(order, vec!["RISK_2", "RISK_3", "RISK_1"]);
        assert_eq!(profile.highest_score, 9);
        assert_eq!(profile.gate, "fail");
        assert!(profile.to_markdown().contains("- 9 | RISK_2 | Outage"));
    }

    #[test]
    fn test_empty_risk_profile_passes() {
        let profile = RiskProfile::parse("No risks identified.").unwrap();
        assert!(profile.risks.is_empty());
        assert_eq!(profile.gate, "pass");
    }
}
