//! Prompt assembly
//!
//! Commands describe the reply layout they expect in the prompt itself. Record
//! layouts are rendered straight from a schema so the labels the model is
//! shown are the labels the scanner looks for.

use roster_core::{FieldRule, RecordSchema};

/// Builder for a user prompt
#[derive(Debug, Default)]
pub struct Prompt {
    task: String,
    inputs: Vec<(String, String)>,
    layout: Vec<String>,
}

impl Prompt {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Self::default()
        }
    }

    /// Labelled block of input text; blank values are dropped
    pub fn input(mut self, label: &str, text: &str) -> Self {
        if !text.trim().is_empty() {
            self.inputs.push((label.to_string(), text.trim().to_string()));
        }
        self
    }

    /// Output of an earlier step this command builds on
    pub fn prior(self, text: &str) -> Self {
        self.input("Earlier work to build on", text)
    }

    /// A single `Label: <hint>` line in the reply
    pub fn field(mut self, label: &str, hint: &str) -> Self {
        self.layout.push(format!("{}: <{}>", label, hint));
        self
    }

    /// A `## Title` section holding prose or a list
    pub fn section(mut self, title: &str, hint: &str) -> Self {
        self.layout.push(format!("## {}\n<{}>", title, hint));
        self
    }

    /// A repeated record block under a `## Title` section
    pub fn records(mut self, title: &str, schema: &RecordSchema, what: &str) -> Self {
        self.layout.push(format!(
            "## {}\nRepeat this block for every {}:\n{}",
            title,
            what,
            record_layout(schema)
        ));
        self
    }

    pub fn build(self) -> String {
        let mut out = self.task.trim().to_string();

        for (label, text) in &self.inputs {
            out.push_str(&format!("\n\n{}:\n{}", label, text));
        }

        if !self.layout.is_empty() {
            out.push_str("\n\nReply in exactly this layout:\n\n");
            out.push_str(&self.layout.join("\n\n"));
        }

        out.push('\n');
        out
    }
}

/// The heading and `Label: <hint>` lines for one record of `schema`
pub fn record_layout(schema: &RecordSchema) -> String {
    let mut lines = vec![format!("{} {}: <name>", schema.heading, schema.keyword)];

    for binding in schema.fields {
        let hint = match binding.rule {
            FieldRule::Text => "text".to_string(),
            FieldRule::List => "item, item, ...".to_string(),
            FieldRule::Number { .. } => "number".to_string(),
            FieldRule::Choice { options, .. } => options.join(" | "),
        };
        lines.push(format!("{}: <{}>", binding.label, hint));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Risk;
    use roster_core::{extract, Extract};

    #[test]
    fn test_record_layout_uses_schema_labels() {
        let layout = record_layout(&Risk::SCHEMA);
        assert!(layout.starts_with("### Risk: <name>"));
        assert!(layout.contains("Probability: <low | medium | high>"));
        assert!(layout.contains("Mitigation: <text>"));
    }

    #[test]
    fn test_layout_scans_as_a_record() {
        // The layout shown to the model is itself a valid reply.
        let risks: Vec<Risk> = extract(&record_layout(&Risk::SCHEMA)).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].title, "<name>");
    }

    #[test]
    fn test_blank_inputs_are_dropped() {
        let prompt = Prompt::new("Review the story.")
            .input("Story", "Login with email")
            .prior("   ")
            .field("Gate", "pass | fail")
            .build();

        assert!(prompt.starts_with("Review the story.\n\nStory:\nLogin with email"));
        assert!(!prompt.contains("Earlier work"));
        assert!(prompt.ends_with("Gate: <pass | fail>\n"));
    }
}
