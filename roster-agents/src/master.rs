//! Master commands
//!
//! General-purpose document drafting and checklist execution for any role.

use roster_core::{extract, find_field, section, section_items, Extract, Markdown};
use serde::Serialize;

use crate::records::{Check, DocSection};
use crate::{AgentError, Command, CommandRegistry, HandlerFuture, Invocation, Prompt, Report};

pub fn commands() -> CommandRegistry {
    CommandRegistry::new()
        .with(
            Command::new("create-doc", "Draft a document of any type", create_doc)
                .template("document-tmpl"),
        )
        .with(
            Command::new(
                "execute-checklist",
                "Walk a checklist item by item",
                execute_checklist,
            )
            .template("checklist-tmpl"),
        )
}

// ---------------------------------------------------------------------------
// create-doc
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub title: String,
    pub purpose: String,
    pub sections: Vec<DocSection>,
    pub open_questions: Vec<String>,
}

impl Report for Document {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        Ok(Self {
            title: find_field(&lines, "Document Title").unwrap_or_default(),
            purpose: section(&lines, "Purpose").unwrap_or_default(),
            sections: extract(reply)?,
            open_questions: section_items(&lines, "Open Questions"),
        })
    }

    fn to_markdown(&self) -> String {
        let title = if self.title.is_empty() { "Document" } else { self.title.as_str() };
        let mut doc = Markdown::titled(title);
        doc.paragraph(&self.purpose);

        // Document sections render as level-2 headings of their own
        for s in &self.sections {
            doc.heading(2, &s.title)
                .paragraph(&s.purpose)
                .list("Key points", &s.key_points)
                .field("Owner", &s.owner);
        }
        if !self.open_questions.is_empty() {
            doc.heading(2, "Open Questions").bullets(&self.open_questions);
        }
        doc.finish()
    }
}

fn create_doc(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(format!(
            "Draft a {} for the subject below. Keep each section focused.",
            inv.option("doc_type", "design document")
        ))
        .input("Subject", inv.input("the current project"))
        .prior(inv.option("previous_output", ""))
        .field("Document Title", "title")
        .section("Purpose", "paragraph")
        .records("Sections", &DocSection::SCHEMA, "section")
        .section("Open Questions", "bullet list")
        .build();

        inv.report::<Document>(prompt).await
    })
}

// ---------------------------------------------------------------------------
// execute-checklist
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChecklistTally {
    pub pass: usize,
    pub fail: usize,
    pub partial: usize,
    pub not_applicable: usize,
    pub pending: usize,
}

impl ChecklistTally {
    fn count(checks: &[Check]) -> Self {
        let mut tally = Self::default();
        for check in checks {
            match check.status.as_str() {
                "pass" => tally.pass += 1,
                "fail" => tally.fail += 1,
                "partial" => tally.partial += 1,
                "n/a" => tally.not_applicable += 1,
                _ => tally.pending += 1,
            }
        }
        tally
    }

    /// Share of applicable items that passed, 0-100
    pub fn completion(&self) -> f64 {
        let applicable = self.pass + self.fail + self.partial + self.pending;
        if applicable == 0 {
            return 0.0;
        }
        (self.pass as f64 * 100.0 / applicable as f64).round()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChecklistResult {
    pub checklist: String,
    pub checks: Vec<Check>,
    pub tally: ChecklistTally,
    pub completion: f64,
    /// "fail" if anything failed, "incomplete" while items are partial or
    /// pending, otherwise "pass"
    pub outcome: String,
}

impl Report for ChecklistResult {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        let checks: Vec<Check> = extract(reply)?;
        let tally = ChecklistTally::count(&checks);

        let outcome = if tally.fail > 0 {
            "fail"
        } else if tally.partial + tally.pending > 0 || checks.is_empty() {
            "incomplete"
        } else {
            "pass"
        };

        Ok(Self {
            checklist: find_field(&lines, "Checklist").unwrap_or_default(),
            completion: tally.completion(),
            outcome: outcome.to_string(),
            tally,
            checks,
        })
    }

    fn to_markdown(&self) -> String {
        let title = match self.checklist.as_str() {
            "" => "Checklist".to_string(),
            name => format!("Checklist: {}", name),
        };
        let mut doc = Markdown::titled(&title);
        doc.field("Outcome", self.outcome.to_uppercase())
            .field("Completion", format!("{}%", self.completion))
            .field(
                "Tally",
                format!(
                    "{} pass, {} fail, {} partial, {} pending, {} n/a",
                    self.tally.pass,
                    self.tally.fail,
                    self.tally.partial,
                    self.tally.pending,
                    self.tally.not_applicable
                ),
            );

        let items: Vec<String> = self
            .checks
            .iter()
            .map(|c| {
                let mark = match c.status.as_str() {
                    "pass" => "[x]",
                    "n/a" => "[-]",
                    _ => "[ ]",
                };
                match c.notes.as_str() {
                    "" => format!("{} {} ({})", mark, c.title, c.status),
                    notes => format!("{} {} ({}): {}", mark, c.title, c.status, notes),
                }
            })
            .collect();
        if !items.is_empty() {
            doc.heading(2, "Items").bullets(&items);
        }
        doc.finish()
    }
}

fn execute_checklist(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let checklist = inv.option("checklist", "definition of done");
        let prompt = Prompt::new(format!(
            "Execute the {} checklist against the material below. Judge every \
             item separately and cite evidence.",
            checklist
        ))
        .input("Material", inv.input("the current work item"))
        .input("Checklist items", inv.option("items", ""))
        .prior(inv.option("previous_output", ""))
        .field("Checklist", checklist)
        .records("Items", &Check::SCHEMA, "checklist item")
        .build();

        inv.report::<ChecklistResult>(prompt).await
    })
}
