//! Record catalogue
//!
//! Every record type the agents extract, each with its schema. The schema is
//! the only place a record's labels, match order and defaults are written
//! down; the struct mirrors its keys.

use roster_core::{CoreError, Extract, FieldBinding, FieldRule, RecordSchema};
use serde::{Deserialize, Serialize};

use FieldRule::{List, Text};

const LEVEL: FieldRule = FieldRule::LEVEL;
const SEVERITY: FieldRule = FieldRule::SEVERITY;
const COUNT: FieldRule = FieldRule::COUNT;

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub id: String,
    pub title: String,
    pub description: String,
    pub probability: String,
    pub impact: String,
    pub mitigation: String,
    pub owner: String,
}

impl Extract for Risk {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Risk",
        "RISK",
        &[
            FieldBinding::new("Description", "description", Text),
            FieldBinding::new("Probability", "probability", LEVEL),
            FieldBinding::new("Impact", "impact", LEVEL),
            FieldBinding::new("Mitigation", "mitigation", Text),
            FieldBinding::new("Owner", "owner", Text),
        ],
    );
}

impl Risk {
    /// Probability x impact on a 1..=9 scale
    pub fn score(&self) -> u8 {
        level_weight(&self.probability) * level_weight(&self.impact)
    }
}

fn level_weight(level: &str) -> u8 {
    match level {
        "low" => 1,
        "high" => 3,
        _ => 2,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stakeholder {
    pub id: String,
    pub title: String,
    pub role: String,
    pub interest: String,
    pub influence: String,
    pub concerns: Vec<String>,
    pub engagement: String,
}

impl Extract for Stakeholder {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Stakeholder",
        "STAKEHOLDER",
        &[
            FieldBinding::new("Role", "role", Text),
            FieldBinding::new("Interest", "interest", LEVEL),
            FieldBinding::new("Influence", "influence", LEVEL),
            FieldBinding::new("Concerns", "concerns", List),
            FieldBinding::new("Engagement", "engagement", Text),
        ],
    );
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Hours
    pub estimate: f64,
    pub assignee: String,
    pub status: String,
    pub files: Vec<String>,
}

impl Extract for Task {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Task",
        "TASK",
        &[
            FieldBinding::new("Description", "description", Text),
            FieldBinding::new("Estimate", "estimate", COUNT),
            FieldBinding::new("Assignee", "assignee", Text),
            FieldBinding::new(
                "Status",
                "status",
                FieldRule::Choice {
                    options: &["todo", "in progress", "done", "blocked"],
                    default: "todo",
                },
            ),
            FieldBinding::new("Files", "files", List),
        ],
    );
}

// ---------------------------------------------------------------------------
// Analyst
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub id: String,
    pub title: String,
    pub positioning: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    /// Percent
    pub market_share: f64,
}

impl Extract for Competitor {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Competitor",
        "COMPETITOR",
        &[
            FieldBinding::new("Positioning", "positioning", Text),
            FieldBinding::new("Strengths", "strengths", List),
            FieldBinding::new("Weaknesses", "weaknesses", List),
            FieldBinding::new("Market Share", "market_share", COUNT),
        ],
    );
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub title: String,
    pub description: String,
    pub potential: String,
    pub segment: String,
}

impl Extract for Opportunity {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Opportunity",
        "OPP",
        &[
            FieldBinding::new("Description", "description", Text),
            FieldBinding::new("Potential", "potential", LEVEL),
            FieldBinding::new("Segment", "segment", Text),
        ],
    );
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub impact: String,
    pub effort: String,
}

impl Extract for Idea {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Idea",
        "IDEA",
        &[
            FieldBinding::new("Description", "description", Text),
            FieldBinding::new("Category", "category", Text),
            FieldBinding::new("Impact", "impact", LEVEL),
            FieldBinding::new("Effort", "effort", LEVEL),
        ],
    );
}

// ---------------------------------------------------------------------------
// Architect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub title: String,
    pub responsibility: String,
    pub technology: String,
    pub dependencies: Vec<String>,
    pub interfaces: Vec<String>,
}

impl Extract for Component {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Component",
        "CMP",
        &[
            FieldBinding::new("Responsibility", "responsibility", Text),
            FieldBinding::new("Technology", "technology", Text),
            FieldBinding::new("Dependencies", "dependencies", List),
            FieldBinding::new("Interfaces", "interfaces", List),
        ],
    );
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub title: String,
    pub context: String,
    pub rationale: String,
    pub consequences: Vec<String>,
    pub status: String,
}

impl Extract for Decision {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Decision",
        "ADR",
        &[
            FieldBinding::new("Context", "context", Text),
            FieldBinding::new("Rationale", "rationale", Text),
            FieldBinding::new("Consequences", "consequences", List),
            FieldBinding::new(
                "Status",
                "status",
                FieldRule::Choice {
                    options: &["proposed", "accepted", "superseded", "deprecated"],
                    default: "proposed",
                },
            ),
        ],
    );
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    pub id: String,
    pub title: String,
    pub category: String,
    pub purpose: String,
    pub alternatives: Vec<String>,
    pub maturity: String,
}

impl Extract for Technology {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Technology",
        "TECH",
        &[
            FieldBinding::new("Category", "category", Text),
            FieldBinding::new("Purpose", "purpose", Text),
            FieldBinding::new("Alternatives", "alternatives", List),
            FieldBinding::new(
                "Maturity",
                "maturity",
                FieldRule::Choice {
                    options: &["experimental", "emerging", "stable", "mature"],
                    default: "stable",
                },
            ),
        ],
    );
}

// ---------------------------------------------------------------------------
// PM
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub kind: String,
    pub priority: String,
    pub acceptance_criteria: Vec<String>,
}

impl Extract for Requirement {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Requirement",
        "REQ",
        &[
            FieldBinding::new("Description", "description", Text),
            // "non-functional" contains "functional", so it is listed first
            FieldBinding::new(
                "Type",
                "kind",
                FieldRule::Choice {
                    options: &["non-functional", "functional"],
                    default: "functional",
                },
            ),
            FieldBinding::new(
                "Priority",
                "priority",
                FieldRule::Choice {
                    options: &["must", "should", "could", "won't"],
                    default: "should",
                },
            ),
            FieldBinding::new("Acceptance Criteria", "acceptance_criteria", List),
        ],
    );
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epic {
    pub id: String,
    pub title: String,
    pub goal: String,
    pub stories: Vec<String>,
    pub priority: String,
}

impl Extract for Epic {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Epic",
        "EPIC",
        &[
            FieldBinding::new("Goal", "goal", Text),
            FieldBinding::new("Stories", "stories", List),
            FieldBinding::new("Priority", "priority", LEVEL),
        ],
    );
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Weeks
    pub duration: f64,
    pub deliverables: Vec<String>,
    pub dependencies: Vec<String>,
}

impl Extract for Phase {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Phase",
        "PHASE",
        &[
            FieldBinding::new("Description", "description", Text),
            FieldBinding::new("Duration", "duration", COUNT),
            FieldBinding::new("Deliverables", "deliverables", List),
            FieldBinding::new("Dependencies", "dependencies", List),
        ],
    );
}

// ---------------------------------------------------------------------------
// SM
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStory {
    pub id: String,
    pub title: String,
    pub role: String,
    pub goal: String,
    pub benefit: String,
    pub acceptance_criteria: Vec<String>,
    pub story_points: f64,
    pub priority: String,
}

impl Extract for UserStory {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Story",
        "STORY",
        &[
            FieldBinding::new("Role", "role", Text),
            FieldBinding::new("Goal", "goal", Text),
            FieldBinding::new("Benefit", "benefit", Text),
            FieldBinding::new("Acceptance Criteria", "acceptance_criteria", List),
            FieldBinding::new("Story Points", "story_points", COUNT),
            FieldBinding::new("Priority", "priority", LEVEL),
        ],
    );
}

impl UserStory {
    /// "As a ..., I want ..., so that ..."
    pub fn statement(&self) -> String {
        format!(
            "As a {}, I want {}, so that {}.",
            or_blank(&self.role),
            or_blank(&self.goal),
            or_blank(self.benefit.trim_end_matches('.'))
        )
    }
}

fn or_blank(value: &str) -> &str {
    if value.is_empty() {
        "..."
    } else {
        value
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: String,
    pub title: String,
    pub owner: String,
    pub due: String,
    pub priority: String,
}

impl Extract for ActionItem {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Action",
        "ACTION",
        &[
            FieldBinding::new("Owner", "owner", Text),
            FieldBinding::new("Due", "due", Text),
            FieldBinding::new("Priority", "priority", LEVEL),
        ],
    );
}

// ---------------------------------------------------------------------------
// Dev
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub title: String,
    pub severity: String,
    pub location: String,
    pub description: String,
    pub suggestion: String,
}

impl Extract for Finding {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Finding",
        "FINDING",
        &[
            FieldBinding::new("Severity", "severity", SEVERITY),
            FieldBinding::new("Location", "location", Text),
            FieldBinding::new("Description", "description", Text),
            FieldBinding::new("Suggestion", "suggestion", Text),
        ],
    );
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cause {
    pub id: String,
    pub title: String,
    pub likelihood: String,
    pub evidence: String,
    pub fix: String,
}

impl Extract for Cause {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Cause",
        "CAUSE",
        &[
            FieldBinding::new("Likelihood", "likelihood", LEVEL),
            FieldBinding::new("Evidence", "evidence", Text),
            FieldBinding::new("Fix", "fix", Text),
        ],
    );
}

// ---------------------------------------------------------------------------
// QA
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub title: String,
    pub kind: String,
    pub priority: String,
    pub preconditions: Vec<String>,
    pub steps: Vec<String>,
    pub expected_result: String,
}

impl Extract for TestCase {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Test Case",
        "TC",
        &[
            FieldBinding::new(
                "Type",
                "kind",
                FieldRule::Choice {
                    options: &["unit", "integration", "e2e", "performance", "security", "manual"],
                    default: "unit",
                },
            ),
            FieldBinding::new("Priority", "priority", LEVEL),
            FieldBinding::new("Preconditions", "preconditions", List),
            FieldBinding::new("Steps", "steps", List),
            FieldBinding::new("Expected Result", "expected_result", Text),
        ],
    );
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub severity: String,
    pub category: String,
    pub description: String,
    pub recommendation: String,
}

impl Extract for Issue {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Issue",
        "ISSUE",
        &[
            FieldBinding::new("Severity", "severity", SEVERITY),
            FieldBinding::new("Category", "category", Text),
            FieldBinding::new("Description", "description", Text),
            FieldBinding::new("Recommendation", "recommendation", Text),
        ],
    );
}

// ---------------------------------------------------------------------------
// UX
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPersona {
    pub id: String,
    pub title: String,
    pub role: String,
    pub goals: Vec<String>,
    pub pain_points: Vec<String>,
    pub tech_savviness: String,
    pub quote: String,
}

impl Extract for UserPersona {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Persona",
        "PERSONA",
        &[
            FieldBinding::new("Role", "role", Text),
            FieldBinding::new("Goals", "goals", List),
            FieldBinding::new("Pain Points", "pain_points", List),
            FieldBinding::new("Tech Savviness", "tech_savviness", LEVEL),
            FieldBinding::new("Quote", "quote", Text),
        ],
    );
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStep {
    pub id: String,
    pub title: String,
    pub screen: String,
    pub action: String,
    pub outcome: String,
    pub error_path: String,
}

impl Extract for FlowStep {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Step",
        "FLOW",
        &[
            FieldBinding::new("Screen", "screen", Text),
            FieldBinding::new("Action", "action", Text),
            FieldBinding::new("Outcome", "outcome", Text),
            FieldBinding::new("Error Path", "error_path", Text),
        ],
    );
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub id: String,
    pub title: String,
    pub purpose: String,
    pub components: Vec<String>,
    pub interactions: Vec<String>,
    pub states: Vec<String>,
}

impl Extract for Screen {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Screen",
        "SCREEN",
        &[
            FieldBinding::new("Purpose", "purpose", Text),
            FieldBinding::new("Components", "components", List),
            FieldBinding::new("Interactions", "interactions", List),
            FieldBinding::new("States", "states", List),
        ],
    );
}

// ---------------------------------------------------------------------------
// Master
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocSection {
    pub id: String,
    pub title: String,
    pub purpose: String,
    pub key_points: Vec<String>,
    pub owner: String,
}

impl Extract for DocSection {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Section",
        "SECTION",
        &[
            FieldBinding::new("Purpose", "purpose", Text),
            FieldBinding::new("Key Points", "key_points", List),
            FieldBinding::new("Owner", "owner", Text),
        ],
    );
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub id: String,
    pub title: String,
    pub status: String,
    pub evidence: String,
    pub notes: String,
}

impl Extract for Check {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Check",
        "CHECK",
        &[
            FieldBinding::new(
                "Status",
                "status",
                FieldRule::Choice {
                    options: &["pass", "fail", "partial", "n/a"],
                    default: "pending",
                },
            ),
            FieldBinding::new("Evidence", "evidence", Text),
            FieldBinding::new("Notes", "notes", Text),
        ],
    );
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    pub title: String,
    pub agent: String,
    pub command: String,
    pub input: String,
    pub depends_on: Vec<String>,
}

impl Extract for WorkflowStep {
    const SCHEMA: RecordSchema = RecordSchema::new(
        "Step",
        "STEP",
        &[
            FieldBinding::new("Agent", "agent", Text),
            FieldBinding::new("Command", "command", Text),
            FieldBinding::new("Input", "input", Text),
            FieldBinding::new("Depends On", "depends_on", List),
        ],
    );
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Built-in schemas by name, for tools that scan saved replies
pub const SCHEMAS: &[(&str, RecordSchema)] = &[
    ("risk", Risk::SCHEMA),
    ("stakeholder", Stakeholder::SCHEMA),
    ("task", Task::SCHEMA),
    ("competitor", Competitor::SCHEMA),
    ("opportunity", Opportunity::SCHEMA),
    ("idea", Idea::SCHEMA),
    ("component", Component::SCHEMA),
    ("decision", Decision::SCHEMA),
    ("technology", Technology::SCHEMA),
    ("requirement", Requirement::SCHEMA),
    ("epic", Epic::SCHEMA),
    ("phase", Phase::SCHEMA),
    ("story", UserStory::SCHEMA),
    ("action", ActionItem::SCHEMA),
    ("finding", Finding::SCHEMA),
    ("cause", Cause::SCHEMA),
    ("test-case", TestCase::SCHEMA),
    ("issue", Issue::SCHEMA),
    ("persona", UserPersona::SCHEMA),
    ("flow-step", FlowStep::SCHEMA),
    ("screen", Screen::SCHEMA),
    ("section", DocSection::SCHEMA),
    ("check", Check::SCHEMA),
    ("workflow-step", WorkflowStep::SCHEMA),
];

pub fn schema_by_name(name: &str) -> Result<RecordSchema, CoreError> {
    let wanted = name.trim().to_lowercase().replace('_', "-");
    SCHEMAS
        .iter()
        .find(|(n, _)| *n == wanted)
        .map(|(_, schema)| *schema)
        .ok_or_else(|| CoreError::UnknownSchema(name.to_string()))
}
