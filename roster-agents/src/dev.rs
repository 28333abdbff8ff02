//! Developer commands
//!
//! Implementation planning, code review and debugging.

use roster_core::{
    extract, find_field, match_choice, section, section_items, Extract, Markdown,
};
use serde::Serialize;

use crate::records::{Cause, Finding, Task};
use crate::{AgentError, Command, CommandRegistry, HandlerFuture, Invocation, Prompt, Report};

pub fn commands() -> CommandRegistry {
    CommandRegistry::new()
        .with(
            Command::new(
                "implement-story",
                "Plan the implementation of a story",
                implement_story,
            )
            .template("implementation-tmpl"),
        )
        .with(
            Command::new("code-review", "Review code and list findings", code_review)
                .template("code-review-tmpl"),
        )
        .with(Command::new("debug", "Find likely causes of a bug", debug).template("debug-tmpl"))
}

// ---------------------------------------------------------------------------
// implement-story
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ImplementationPlan {
    pub approach: String,
    pub tasks: Vec<Task>,
    /// Every file touched by any task, first mention first
    pub files: Vec<String>,
    pub testing: Vec<String>,
    pub total_hours: f64,
}

impl Report for ImplementationPlan {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        let tasks: Vec<Task> = extract(reply)?;

        let mut files: Vec<String> = Vec::new();
        for file in tasks.iter().flat_map(|t| &t.files) {
            if !files.contains(file) {
                files.push(file.clone());
            }
        }

        Ok(Self {
            approach: section(&lines, "Approach").unwrap_or_default(),
            total_hours: tasks.iter().map(|t| t.estimate).sum(),
            tasks,
            files,
            testing: section_items(&lines, "Testing"),
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("Implementation Plan");
        doc.paragraph(&self.approach)
            .field("Estimated effort", format!("{}h", self.total_hours))
            .section("Tasks", &self.tasks, |doc, t| {
                doc.heading(3, &format!("{} {}", t.id, t.title))
                    .paragraph(&t.description)
                    .field("Estimate", format!("{}h", t.estimate))
                    .list("Files", &t.files);
            });
        if !self.files.is_empty() {
            let files: Vec<String> = self.files.iter().map(|f| format!("`{}`", f)).collect();
            doc.heading(2, "Files Touched").bullets(&files);
        }
        if !self.testing.is_empty() {
            doc.heading(2, "Testing").bullets(&self.testing);
        }
        doc.finish()
    }
}

fn implement_story(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(format!(
            "Plan the implementation of the story below in small tasks, each \
             estimated in hours and listing the files it touches. Language: {}.",
            inv.option("language", "the project's main language")
        ))
        .input("Story", inv.input("the current story"))
        .input("Codebase notes", inv.option("codebase", ""))
        .prior(inv.option("previous_output", ""))
        .section("Approach", "paragraph")
        .records("Tasks", &Task::SCHEMA, "task")
        .section("Testing", "bullet list")
        .build();

        inv.report::<ImplementationPlan>(prompt).await
    })
}

// ---------------------------------------------------------------------------
// code-review
// ---------------------------------------------------------------------------

const VERDICTS: &[&str] = &["approve", "request changes", "comment"];

#[derive(Debug, Clone, Serialize)]
pub struct CodeReview {
    pub verdict: String,
    pub summary: String,
    pub findings: Vec<Finding>,
}

impl CodeReview {
    /// Findings that should block a merge
    pub fn blocking(&self) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| matches!(f.severity.as_str(), "high" | "critical"))
            .collect()
    }
}

impl Report for CodeReview {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        let findings: Vec<Finding> = extract(reply)?;
        let verdict = match find_field(&lines, "Verdict") {
            Some(value) => match_choice(&value, VERDICTS, "comment"),
            None if findings.iter().any(|f| f.severity == "critical") => {
                "request changes".to_string()
            }
            None => "comment".to_string(),
        };

        Ok(Self {
            verdict,
            summary: section(&lines, "Summary").unwrap_or_default(),
            findings,
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("Code Review");
        doc.field("Verdict", &self.verdict)
            .field("Blocking findings", self.blocking().len())
            .paragraph(&self.summary)
            .section("Findings", &self.findings, |doc, f| {
                doc.heading(3, &format!("[{}] {}", f.severity, f.title))
                    .field("Location", &f.location)
                    .paragraph(&f.description)
                    .field("Suggestion", &f.suggestion);
            });
        doc.finish()
    }
}

fn code_review(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(format!(
            "Review the code below for correctness, security, performance and \
             readability. Focus: {}.",
            inv.option("focus", "everything")
        ))
        .input("Code", inv.input("(no code supplied)"))
        .prior(inv.option("previous_output", ""))
        .field("Verdict", &VERDICTS.join(" | "))
        .section("Summary", "paragraph")
        .records("Findings", &Finding::SCHEMA, "finding")
        .build();

        inv.report::<CodeReview>(prompt).await
    })
}

// ---------------------------------------------------------------------------
// debug
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct DebugReport {
    pub analysis: String,
    pub causes: Vec<Cause>,
    pub next_steps: Vec<String>,
}

impl DebugReport {
    /// First cause with the highest likelihood
    pub fn most_likely(&self) -> Option<&Cause> {
        ["high", "medium", "low"]
            .iter()
            .find_map(|level| self.causes.iter().find(|c| c.likelihood == *level))
    }
}

impl Report for DebugReport {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        Ok(Self {
            analysis: section(&lines, "Analysis").unwrap_or_default(),
            causes: extract(reply)?,
            next_steps: section_items(&lines, "Next Steps"),
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("Debug Report");
        doc.paragraph(&self.analysis);
        if let Some(cause) = self.most_likely() {
            doc.field("Most likely cause", &cause.title);
        }
        doc.section("Possible Causes", &self.causes, |doc, c| {
            doc.heading(3, &c.title)
                .field("Likelihood", &c.likelihood)
                .field("Evidence", &c.evidence)
                .field("Fix", &c.fix);
        });
        if !self.next_steps.is_empty() {
            doc.heading(2, "Next Steps").bullets(&self.next_steps);
        }
        doc.finish()
    }
}

fn debug(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(
            "Diagnose the bug below. List the possible causes from most to least \
             likely, with the evidence for each and a fix.",
        )
        .input("Bug report", inv.input("an unexplained failure"))
        .input("Error output", inv.option("error", ""))
        .prior(inv.option("previous_output", ""))
        .section("Analysis", "paragraph")
        .records("Causes", &Cause::SCHEMA, "cause")
        .section("Next Steps", "bullet list")
        .build();

        inv.report::<DebugReport>(prompt).await
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{run, CannedBackend};
    use crate::Role;
    use roster_core::CommandContext;

    #[test]
    fn test_implementation_plan_collects_files() {
        let reply = "\
## Approach
Add a token table and an endpoint.

### Task: Migration
Estimate: 2
Files: migrations/004.sql
### Task: Endpoint
Estimate: 3.5h
Files: src/routes/reset.rs, migrations/004.sql
";
        let plan = ImplementationPlan::parse(reply).unwrap();

        assert_eq!(plan.approach, "Add a token table and an endpoint.");
        assert_eq!(plan.files, vec!["migrations/004.sql", "src/routes/reset.rs"]);
        assert_eq!(plan.total_hours, 5.5);
        assert!(plan.to_markdown().contains("- `src/routes/reset.rs`"));
    }

    #[tokio::test]
    async fn test_code_review_command() {
        let reply = "\
Verdict: Request changes
### Finding: SQL built with format!
Severity: Critical
Location: src/db.rs:42
Suggestion: use bound parameters
### Finding: Long function
Severity: low
";
        let backend = CannedBackend::new(reply);
        let response = run(
            Role::Dev,
            &backend,
            "code-review",
            CommandContext::new("fn main() {}").with_option("focus", "security"),
        )
        .await;

        assert!(response.success);
        let data = response.data.unwrap();
        assert_eq!(data["verdict"], "request changes");
        assert_eq!(data["findings"][0]["severity"], "critical");
        assert_eq!(data["findings"][0]["location"], "src/db.rs:42");
        assert!(response.output.unwrap().contains("**Blocking findings:** 1"));
        assert!(backend.last_prompt().contains("Focus: security"));
    }

    #[test]
    fn test_verdict_inferred_without_field() {
        let review = CodeReview::parse("### Finding: Panic on empty input\nSeverity: critical\n").unwrap();
        assert_eq!(review.verdict, "request changes");

        let review = CodeReview::parse("Looks fine to me.").unwrap();
        assert_eq!(review.verdict, "comment");
        assert!(review.findings.is_empty());
    }

    #[test]
    fn test_most_likely_cause() {
        let reply = "\
### Cause: Stale cache
Likelihood: medium
### Cause: Clock skew
Likelihood: High
Evidence: tokens expire early on one node
";
        let report = DebugReport::parse(reply).unwrap();
        assert_eq!(report.most_likely().unwrap().title, "Clock skew");
        assert!(report.to_markdown().contains("**Most likely cause:** Clock skew"));
    }
}
