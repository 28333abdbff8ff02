//! Declarative record schemas
//!
//! A schema names the heading keyword that opens a record, the prefix used for
//! its synthetic ids, and the ordered field bindings with their defaults. It is
//! the single source of defaults for a record type.

use serde::de::DeserializeOwned;

use crate::{FieldValue, DEFAULT_CHOICE, HEADING_TOKEN};

/// How a bound field turns a line into a value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRule {
    /// Trailing text after the label; defaults to an empty string
    Text,
    /// Comma-separated items after the label; defaults to an empty list
    List,
    /// Leading number after the label
    Number { default: f64 },
    /// One of a closed set of lowercase options
    Choice {
        options: &'static [&'static str],
        default: &'static str,
    },
}

impl FieldRule {
    /// Low/medium/high scale defaulting to medium
    pub const LEVEL: FieldRule = FieldRule::Choice {
        options: &["low", "medium", "high"],
        default: DEFAULT_CHOICE,
    };

    /// Low/medium/high/critical scale defaulting to medium
    pub const SEVERITY: FieldRule = FieldRule::Choice {
        options: &["low", "medium", "high", "critical"],
        default: DEFAULT_CHOICE,
    };

    /// Number defaulting to zero
    pub const COUNT: FieldRule = FieldRule::Number { default: 0.0 };

    /// The value a field holds before (or without) a matching line
    pub fn default_value(&self) -> FieldValue {
        match self {
            FieldRule::Text => FieldValue::Text(String::new()),
            FieldRule::List => FieldValue::List(Vec::new()),
            FieldRule::Number { default } => FieldValue::Number(*default),
            FieldRule::Choice { default, .. } => FieldValue::Text(default.to_string()),
        }
    }
}

/// Binds a label in the model's text to a key in the record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBinding {
    /// Label as it appears in text, e.g. "Acceptance Criteria"
    pub label: &'static str,
    /// Key in the assembled record, e.g. "acceptance_criteria"
    pub key: &'static str,
    pub rule: FieldRule,
}

impl FieldBinding {
    pub const fn new(label: &'static str, key: &'static str, rule: FieldRule) -> Self {
        Self { label, key, rule }
    }
}

/// Shape of one repeating record type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordSchema {
    /// Keyword a heading must contain, e.g. "Risk"
    pub keyword: &'static str,
    /// Prefix for synthetic ids, e.g. "RISK"
    pub id_prefix: &'static str,
    /// Token a heading line must start with
    pub heading: &'static str,
    /// Bindings in match priority order
    pub fields: &'static [FieldBinding],
}

impl RecordSchema {
    pub const fn new(
        keyword: &'static str,
        id_prefix: &'static str,
        fields: &'static [FieldBinding],
    ) -> Self {
        Self {
            keyword,
            id_prefix,
            heading: HEADING_TOKEN,
            fields,
        }
    }

    /// Use a different heading token (e.g. "##")
    pub const fn with_heading(mut self, heading: &'static str) -> Self {
        self.heading = heading;
        self
    }

    /// Whether a trimmed line opens a record of this type
    pub fn is_heading(&self, line: &str) -> bool {
        line.starts_with(self.heading) && line.contains(self.keyword)
    }

    /// Synthetic id for the record at `position` (1-based)
    pub fn record_id(&self, position: usize) -> String {
        format!("{}_{}", self.id_prefix, position)
    }

    /// Look up a binding by record key
    pub fn binding(&self, key: &str) -> Option<&FieldBinding> {
        self.fields.iter().find(|binding| binding.key == key)
    }
}

/// A typed record that can be assembled from a schema.
///
/// The struct's serde field names must match the schema keys, plus `id` and
/// `title`. Number fields deserialize from `f64`.
pub trait Extract: DeserializeOwned {
    const SCHEMA: RecordSchema;
}

#[cfg(test)]
mod tests {
    use super::*;

    const RISK: RecordSchema = RecordSchema::new(
        "Risk",
        "RISK",
        &[FieldBinding::new("Impact", "impact", FieldRule::LEVEL)],
    );

    #[test]
    fn test_heading_detection() {
        assert!(RISK.is_heading("### Login Risk"));
        assert!(!RISK.is_heading("Login Risk"));
        assert!(!RISK.is_heading("### Login"));
        // Substring containment: prose in a heading still opens a record
        assert!(RISK.is_heading("### Risky assumptions"));
    }

    #[test]
    fn test_custom_heading_token() {
        let schema = RISK.with_heading("##");
        assert!(schema.is_heading("## Risk: outage"));
        assert!(schema.is_heading("### Risk: outage"));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(FieldRule::Text.default_value(), FieldValue::Text(String::new()));
        assert_eq!(FieldRule::List.default_value(), FieldValue::List(Vec::new()));
        assert_eq!(FieldRule::COUNT.default_value(), FieldValue::Number(0.0));
        assert_eq!(
            FieldRule::LEVEL.default_value(),
            FieldValue::Text("medium".to_string())
        );
    }

    #[test]
    fn test_record_id() {
        assert_eq!(RISK.record_id(3), "RISK_3");
        assert!(RISK.binding("impact").is_some());
        assert!(RISK.binding("owner").is_none());
    }
}
