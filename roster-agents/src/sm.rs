//! Scrum master commands
//!
//! Story drafting, sprint planning and retrospectives.

use roster_core::{extract, find_field, parse_number, section, section_items, Extract, Markdown};
use serde::Serialize;

use crate::records::{ActionItem, Task, UserStory};
use crate::{AgentError, Command, CommandRegistry, HandlerFuture, Invocation, Prompt, Report};

pub fn commands() -> CommandRegistry {
    CommandRegistry::new()
        .with(
            Command::new("create-story", "Draft the next user story with tasks", create_story)
                .template("story-tmpl"),
        )
        .with(
            Command::new("sprint-plan", "Plan a sprint against team capacity", sprint_plan)
                .template("sprint-plan-tmpl"),
        )
        .with(
            Command::new("retrospective", "Run a sprint retrospective", retrospective)
                .template("retrospective-tmpl"),
        )
}

fn render_story(doc: &mut Markdown, story: &UserStory) {
    doc.heading(3, &format!("{}: {}", story.id, story.title))
        .paragraph(&story.statement())
        .field("Story Points", story.story_points)
        .field("Priority", &story.priority)
        .list("Acceptance Criteria", &story.acceptance_criteria);
}

fn total_points(stories: &[UserStory]) -> f64 {
    stories.iter().map(|s| s.story_points).sum()
}

// ---------------------------------------------------------------------------
// create-story
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StoryDraft {
    pub stories: Vec<UserStory>,
    pub tasks: Vec<Task>,
    pub dev_notes: String,
    pub total_points: f64,
}

impl Report for StoryDraft {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        let stories: Vec<UserStory> = extract(reply)?;

        Ok(Self {
            total_points: total_points(&stories),
            stories,
            tasks: extract(reply)?,
            dev_notes: section(&lines, "Dev Notes").unwrap_or_default(),
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("User Story");
        doc.section("Stories", &self.stories, render_story)
            .section("Tasks", &self.tasks, |doc, t| {
                doc.heading(3, &t.title)
                    .paragraph(&t.description)
                    .field("Estimate", format!("{}h", t.estimate))
                    .field("Status", &t.status);
            });
        if !self.dev_notes.is_empty() {
            doc.heading(2, "Dev Notes").paragraph(&self.dev_notes);
        }
        doc.finish()
    }
}

fn create_story(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(
            "Draft the next user story from the epic or requirement below, small \
             enough for one sprint, and break it into tasks estimated in hours.",
        )
        .input("Epic or requirement", inv.input("the next feature in the backlog"))
        .prior(inv.option("previous_output", ""))
        .records("Stories", &UserStory::SCHEMA, "story")
        .records("Tasks", &Task::SCHEMA, "task")
        .section("Dev Notes", "paragraph")
        .build();

        inv.report::<StoryDraft>(prompt).await
    })
}

// ---------------------------------------------------------------------------
// sprint-plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SprintPlan {
    pub sprint_goal: String,
    /// Story points the team can take on
    pub capacity: f64,
    pub stories: Vec<UserStory>,
    pub committed_points: f64,
    pub over_capacity: bool,
}

impl Report for SprintPlan {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        let stories: Vec<UserStory> = extract(reply)?;
        let capacity = find_field(&lines, "Capacity")
            .and_then(|value| parse_number(&value))
            .unwrap_or(0.0);
        let committed_points = total_points(&stories);

        Ok(Self {
            sprint_goal: find_field(&lines, "Sprint Goal").unwrap_or_default(),
            capacity,
            over_capacity: capacity > 0.0 && committed_points > capacity,
            committed_points,
            stories,
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("Sprint Plan");
        doc.field("Sprint Goal", &self.sprint_goal)
            .field(
                "Committed",
                format!("{} of {} points", self.committed_points, self.capacity),
            );
        if self.over_capacity {
            doc.paragraph("> Commitment exceeds capacity; move the lowest priority stories out.");
        }
        doc.section("Stories", &self.stories, render_story);
        doc.finish()
    }
}

fn sprint_plan(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let capacity = inv.option("capacity", "30");
        if !parse_number(capacity).is_some_and(|points| points > 0.0) {
            return Err(AgentError::InvalidContext(format!(
                "capacity must be a positive number of story points, got '{}'",
                capacity
            )));
        }

        let prompt = Prompt::new(format!(
            "Plan a {} sprint from the backlog below. The team's capacity is {} \
             story points; do not exceed it.",
            inv.option("sprint_length", "two-week"),
            capacity
        ))
        .input("Backlog", inv.input("the current product backlog"))
        .prior(inv.option("previous_output", ""))
        .field("Sprint Goal", "one sentence")
        .field("Capacity", "story points")
        .records("Committed Stories", &UserStory::SCHEMA, "story")
        .build();

        inv.report::<SprintPlan>(prompt).await
    })
}

// ---------------------------------------------------------------------------
// retrospective
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Retrospective {
    pub went_well: Vec<String>,
    pub to_improve: Vec<String>,
    pub actions: Vec<ActionItem>,
}

impl Report for Retrospective {
    fn parse(reply: &str) -> Result<Self, AgentError> {
        let lines: Vec<&str> = reply.lines().collect();
        Ok(Self {
            went_well: section_items(&lines, "Went Well"),
            to_improve: section_items(&lines, "To Improve"),
            actions: extract(reply)?,
        })
    }

    fn to_markdown(&self) -> String {
        let mut doc = Markdown::titled("Sprint Retrospective");
        for (heading, items) in [("Went Well", &self.went_well), ("To Improve", &self.to_improve)] {
            if !items.is_empty() {
                doc.heading(2, heading).bullets(items);
            }
        }
        doc.section("Action Items", &self.actions, |doc, a| {
            doc.heading(3, &a.title)
                .field("Owner", &a.owner)
                .field("Due", &a.due)
                .field("Priority", &a.priority);
        });
        doc.finish()
    }
}

fn retrospective(inv: Invocation<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let prompt = Prompt::new(
            "Facilitate a retrospective for the sprint described below. Keep action \
             items concrete and give each an owner.",
        )
        .input("Sprint notes", inv.input("the last sprint"))
        .prior(inv.option("previous_output", ""))
        .section("Went Well", "bullet list")
        .section("To Improve", "bullet list")
        .records("Action Items", &ActionItem::SCHEMA, "action")
        .build();

        inv.report::<Retrospective>(prompt).await
    })
}
